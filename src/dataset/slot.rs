use super::store::RowStore;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Holds at most one loaded dataset per process.
///
/// The mutex is held across the load itself, so concurrent requests naming
/// the same dataset coalesce into a single file read; a request naming a
/// different dataset replaces the slot.
pub struct DatasetSlot {
    inner: Mutex<Option<(String, Arc<RowStore>)>>,
}

impl DatasetSlot {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Returns the store for `dataset_key`, loading it on first use.
    pub async fn get_or_load(&self, dataset_key: &str) -> Result<Arc<RowStore>> {
        let mut slot = self.inner.lock().await;

        if let Some((loaded_key, store)) = slot.as_ref() {
            if loaded_key == dataset_key {
                return Ok(store.clone());
            }
        }

        tracing::info!("Loading dataset: {}", dataset_key);
        let store = Arc::new(RowStore::load(Path::new(dataset_key))?);
        tracing::info!(
            "Dataset loaded: {} ({} rows)",
            dataset_key,
            store.total_rows()
        );

        *slot = Some((dataset_key.to_string(), store.clone()));
        Ok(store)
    }

    /// Pre-seeds the slot, bypassing the filesystem. Test hook.
    pub async fn seed(&self, dataset_key: &str, store: RowStore) {
        let mut slot = self.inner.lock().await;
        *slot = Some((dataset_key.to_string(), Arc::new(store)));
    }
}

impl Default for DatasetSlot {
    fn default() -> Self {
        Self::new()
    }
}
