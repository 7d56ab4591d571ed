//! Named file stores configured for this process.
//!
//! Callers address a store by name; the registry hands back the backend
//! behind the shared [`FileStore`] contract.

use crate::config::StoreConfig;
use crate::services::{disk_file_store::DiskFileStore, file_store::FileStore};
use anyhow::{Context, Result, bail};
use std::{collections::BTreeMap, sync::Arc};
use tracing::info;

/// Backend type accepted in store configuration.
pub const DISK_STORE_TYPE: &str = "disk";

#[derive(Clone, Default)]
pub struct FileStoreRegistry {
    stores: Arc<BTreeMap<String, Arc<dyn FileStore>>>,
}

impl FileStoreRegistry {
    pub fn new(stores: BTreeMap<String, Arc<dyn FileStore>>) -> Self {
        Self {
            stores: Arc::new(stores),
        }
    }

    /// Build every configured store. Only disk stores can be built here; the
    /// object-storage backend lives outside this crate.
    pub async fn from_config(configs: &[StoreConfig]) -> Result<Self> {
        let mut stores: BTreeMap<String, Arc<dyn FileStore>> = BTreeMap::new();
        for cfg in configs {
            if stores.contains_key(&cfg.name) {
                bail!("file store '{}' is configured more than once", cfg.name);
            }
            let store: Arc<dyn FileStore> = match cfg.store_type.as_str() {
                DISK_STORE_TYPE => {
                    if cfg.base_path.as_os_str().is_empty() {
                        bail!("a base path is required for disk file store '{}'", cfg.name);
                    }
                    let disk = DiskFileStore::open(&cfg.base_path)
                        .await
                        .with_context(|| format!("failed to create disk file store '{}'", cfg.name))?;
                    Arc::new(disk)
                }
                other => bail!(
                    "unsupported file store type '{}' for file store '{}'",
                    other,
                    cfg.name
                ),
            };
            info!(
                "initialized file store '{}' of type '{}' at {}",
                cfg.name,
                cfg.store_type,
                cfg.base_path.display()
            );
            stores.insert(cfg.name.clone(), store);
        }
        Ok(Self::new(stores))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FileStore>> {
        self.stores.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn FileStore>)> {
        self.stores.iter().map(|(name, store)| (name.as_str(), store))
    }
}
