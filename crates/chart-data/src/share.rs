// File: crates/chart-data/src/share.rs
// Summary: Store sharing cache; series over one source with equal store schemas read one store.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::provider::DefaultDataProvider;
use crate::schema::SeriesDataSchema;
use crate::source::Source;
use crate::store::ColumnarStore;

/// Ingested stores of one source, keyed by store schema hash.
///
/// Callers get shallow clones: column buffers are shared, calculated columns added
/// later stay private to the clone.
pub struct SharedStoreCache {
    source: Source,
    stores: HashMap<String, ColumnarStore>,
}

impl SharedStoreCache {
    pub fn new(source: Source) -> Self {
        Self { source, stores: HashMap::new() }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Store for `schema`, ingesting the source on first request for its hash.
    pub fn get_or_create(&mut self, schema: &SeriesDataSchema) -> Result<ColumnarStore> {
        let store_schema = schema.make_store_schema();
        if let Some(store) = self.stores.get(&store_schema.hash) {
            debug!(hash = %store_schema.hash, "shared store hit");
            return Ok(store.clone_store(&[]));
        }
        let dim_count = store_schema.dimensions.len();
        let provider = DefaultDataProvider::new(self.source.clone(), Some(dim_count))?.into_shared();
        let mut store = ColumnarStore::new();
        store.init_data(provider, store_schema.dimensions, None)?;
        debug!(hash = %store_schema.hash, dims = dim_count, "shared store created");
        let shared = store.clone_store(&[]);
        self.stores.insert(store_schema.hash, store);
        Ok(shared)
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Drop every cached store, e.g. when the source data is replaced.
    pub fn clear(&mut self) {
        self.stores.clear();
    }
}
