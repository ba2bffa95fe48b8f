// File: crates/chart-data/src/series.rs
// Summary: Series data; one series' schema, store and stacking info behind name-based access.

use std::collections::HashMap;

use tracing::debug;

use crate::dimensions::{prepare_series_data_schema, SchemaOptions, SeriesDimensionDefine};
use crate::error::Result;
use crate::provider::DefaultDataProvider;
use crate::schema::SeriesDataSchema;
use crate::source::Source;
use crate::stack::{enable_data_stack, StackInfo, StackOptions, StackStrategy};
use crate::store::ColumnarStore;

/// A series' view of its data.
///
/// Dimensions are addressed by name; the schema maps names to store columns, falling
/// back to source names for dimensions the schema omitted.
#[derive(Clone)]
pub struct SeriesData {
    id: String,
    schema: SeriesDataSchema,
    store: ColumnarStore,
    name_to_def: HashMap<String, usize>,
    calculation: StackInfo,
    stack: Option<String>,
    stack_strategy: StackStrategy,
}

impl SeriesData {
    /// Wrap an already ingested store.
    pub fn new(id: impl Into<String>, schema: SeriesDataSchema, store: ColumnarStore) -> Self {
        let mut data = Self {
            id: id.into(),
            schema,
            store,
            name_to_def: HashMap::new(),
            calculation: StackInfo::default(),
            stack: None,
            stack_strategy: StackStrategy::default(),
        };
        data.index_names();
        data
    }

    /// Resolve a schema over `source` and ingest it into a private store.
    pub fn from_source(id: impl Into<String>, source: Source, options: SchemaOptions) -> Result<Self> {
        let schema = prepare_series_data_schema(&source, options);
        let store_schema = schema.make_store_schema();
        let dim_count = store_schema.dimensions.len();
        let provider = DefaultDataProvider::new(source, Some(dim_count))?.into_shared();
        let mut store = ColumnarStore::new();
        store.init_data(provider, store_schema.dimensions, None)?;
        Ok(Self::new(id, schema, store))
    }

    fn index_names(&mut self) {
        self.name_to_def.clear();
        for (i, def) in self.schema.dimensions.iter().enumerate() {
            if let Some(name) = &def.name {
                self.name_to_def.entry(name.clone()).or_insert(i);
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &SeriesDataSchema {
        &self.schema
    }

    pub fn store(&self) -> &ColumnarStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ColumnarStore {
        &mut self.store
    }

    /// Swap in a derived store (filtered, sampled) over the same columns.
    pub fn set_store(&mut self, store: ColumnarStore) {
        self.store = store;
    }

    pub fn dimensions(&self) -> &[SeriesDimensionDefine] {
        &self.schema.dimensions
    }

    pub fn get_dimension_info(&self, name: &str) -> Option<&SeriesDimensionDefine> {
        self.name_to_def.get(name).map(|&i| &self.schema.dimensions[i])
    }

    /// Store column of a dimension name.
    pub fn get_dimension_index(&self, name: &str) -> Option<usize> {
        match self.get_dimension_info(name) {
            Some(def) => Some(def.store_dim_index),
            None => self.schema.get_source_dimension_index(name),
        }
    }

    /// Name of the first data dimension on `coord_dim`.
    pub fn map_dimension(&self, coord_dim: &str) -> Option<&str> {
        self.map_dimensions_all(coord_dim).into_iter().next()
    }

    /// Names of the data dimensions on `coord_dim`, by position within the coordinate.
    pub fn map_dimensions_all(&self, coord_dim: &str) -> Vec<&str> {
        let mut dims: Vec<&SeriesDimensionDefine> = self
            .schema
            .dimensions
            .iter()
            .filter(|d| d.coord_dim.as_deref() == Some(coord_dim))
            .collect();
        dims.sort_by_key(|d| d.coord_dim_index);
        dims.into_iter().filter_map(|d| d.name.as_deref()).collect()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Value of a named dimension at a filtered index; NaN when unknown.
    pub fn get(&self, name: &str, idx: usize) -> f64 {
        self.get_dimension_index(name).map_or(f64::NAN, |d| self.store.get(d, idx))
    }

    pub fn get_by_raw_index(&self, name: &str, raw_idx: usize) -> f64 {
        self.get_dimension_index(name).map_or(f64::NAN, |d| self.store.get_by_raw_index(d, raw_idx))
    }

    pub fn get_calculation_info(&self) -> &StackInfo {
        &self.calculation
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn stack_strategy(&self) -> StackStrategy {
        self.stack_strategy
    }

    /// Enable stacking under `stack`, adding the calculated dimensions to this series.
    /// Once the calculated dimensions exist, later calls only change the key and strategy.
    pub fn enable_stack(&mut self, stack: &str, options: &StackOptions) -> &StackInfo {
        if self.calculation.stack_result_dimension.is_some() {
            self.stack = (!stack.is_empty()).then(|| stack.to_string());
            self.stack_strategy = options.strategy;
            return &self.calculation;
        }
        self.calculation =
            enable_data_stack(&self.id, Some(stack), &mut self.schema, Some(&mut self.store), options);
        self.stack = (!stack.is_empty()).then(|| stack.to_string());
        self.stack_strategy = options.strategy;
        self.index_names();
        debug!(series = %self.id, stack, stacked = self.calculation.is_stacked(), "series stack");
        &self.calculation
    }
}
