// File: crates/chart-data/src/schema.rs
// Summary: Series data schema; store column layout, sharing hash and output dimension names.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::dimensions::SeriesDimensionDefine;
use crate::source::{SourceDimension, SourceHeader};
use crate::store::StoreDimension;
use crate::types::{DimensionType, SourceFormat, OMIT_DIMENSION_THRESHOLD};

/// Whether every source dimension has a definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionLayout {
    Full,
    /// Only referenced dimensions are defined; the rest are found by source name.
    Omitted,
}

/// Column layout for a store plus the key under which it may be shared.
#[derive(Clone, Debug)]
pub struct StoreSchema {
    pub dimensions: Vec<StoreDimension>,
    pub hash: String,
}

/// Resolved dimensions of one series over one source.
#[derive(Clone, Debug)]
pub struct SeriesDataSchema {
    pub dimensions: Vec<SeriesDimensionDefine>,
    source: Rc<SourceHeader>,
    full_dimension_count: usize,
    layout: DimensionLayout,
}

impl SeriesDataSchema {
    pub fn new(
        source: Rc<SourceHeader>,
        dimensions: Vec<SeriesDimensionDefine>,
        full_dimension_count: usize,
        layout: DimensionLayout,
    ) -> Self {
        Self { dimensions, source, full_dimension_count, layout }
    }

    pub fn source(&self) -> &Rc<SourceHeader> {
        &self.source
    }

    pub fn full_dimension_count(&self) -> usize {
        self.full_dimension_count
    }

    pub fn layout(&self) -> DimensionLayout {
        self.layout
    }

    pub fn is_dimension_omitted(&self) -> bool {
        self.layout == DimensionLayout::Omitted
    }

    /// Source dimension index by name; only answered when dimensions are omitted.
    pub fn get_source_dimension_index(&self, name: &str) -> Option<usize> {
        match self.layout {
            DimensionLayout::Omitted => self.source.dimension_index_by_name(name),
            DimensionLayout::Full => None,
        }
    }

    pub fn get_source_dimension(&self, index: usize) -> Option<&SourceDimension> {
        self.source.dimension(index)
    }

    /// Walk every store column with the series definition covering it, if any.
    fn each_full_dimension(&self, mut f: impl FnMut(usize, Option<&SeriesDimensionDefine>)) {
        let mut series_idx = 0;
        for full_idx in 0..self.full_dimension_count {
            match self.dimensions.get(series_idx) {
                Some(def) if def.store_dim_index == full_idx => {
                    series_idx += 1;
                    f(full_idx, Some(def));
                }
                _ => f(full_idx, None),
            }
        }
    }

    /// Column types for a store and its sharing hash. Series whose hashes match can
    /// read the same store.
    pub fn make_store_schema(&self) -> StoreSchema {
        let by_name = self.source.format == SourceFormat::ObjectRows;
        let strict = self.full_dimension_count <= OMIT_DIMENSION_THRESHOLD;
        let mut dims = Vec::with_capacity(self.full_dimension_count);
        let mut dim_hash = String::new();

        self.each_full_dimension(|full_idx, def| {
            let (property, dim_type, ordinal_meta) = match def {
                Some(def) => (def.name.clone(), def.dim_type, def.ordinal_meta.clone()),
                None => match self.get_source_dimension(full_idx) {
                    Some(src) => (src.name.clone(), src.dim_type, None),
                    None => (None, None, None),
                },
            };
            let property = property.filter(|_| by_name);

            if let Some(p) = &property {
                if !def.is_some_and(|d| d.is_calculation_coord) {
                    if strict {
                        dim_hash.push_str(&p.replace('`', "`1").replace('$', "`2"));
                    } else {
                        dim_hash.push_str(p);
                    }
                }
            }
            dim_hash.push('$');
            dim_hash.push(dim_type.map_or('f', DimensionType::short_code));
            if let Some(meta) = &ordinal_meta {
                let _ = write!(dim_hash, "{}", meta.uid());
            }
            dim_hash.push('$');

            dims.push(StoreDimension {
                dim_type: dim_type.unwrap_or_default(),
                property,
                ordinal_meta,
                ordinal_offset: 0,
            });
        });

        let hash = format!("{}$${}$${}", self.source.series_layout_by, self.source.start_index, dim_hash);
        StoreSchema { dimensions: dims, hash }
    }

    /// One name per store column; calculated columns have none.
    pub fn make_output_dimension_names(&self) -> Vec<Option<String>> {
        let mut names = Vec::with_capacity(self.full_dimension_count);
        self.each_full_dimension(|full_idx, def| {
            names.push(match def {
                Some(def) if def.is_calculation_coord => None,
                Some(def) => def.name.clone(),
                None => self.get_source_dimension(full_idx).and_then(|s| s.name.clone()),
            });
        });
        names
    }

    /// Add a stack-derived dimension. The schema switches to omitted layout, since a
    /// shared store may now carry columns private to one series.
    pub fn append_calculation_dimension(&mut self, mut def: SeriesDimensionDefine) {
        def.is_calculation_coord = true;
        self.dimensions.push(def);
        self.full_dimension_count += 1;
        self.layout = DimensionLayout::Omitted;
    }
}
