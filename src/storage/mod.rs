//! Storage layer for Propdesk
//!
//! Every table lives in one JSON document (`data/store.json`) so that a
//! transaction commit is a single atomic file replacement. Tables are held in
//! memory behind a lock and handed out as copies to transactions.

pub mod file_io;
pub mod table;
pub mod traits;
pub mod transaction;

pub use file_io::{read_json, write_atomic, write_json_atomic};
pub use table::RecordTable;
pub use traits::{Repository, Transaction, TransactionManager};
pub use transaction::StoreTransaction;

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::paths::PropdeskPaths;
use crate::error::{PropdeskError, PropdeskResult};
use crate::models::{EntityType, Record};
use crate::registry::EntityRegistry;

/// On-disk layout of the store file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default = "default_store_version")]
    schema_version: u32,
    #[serde(default)]
    tables: BTreeMap<EntityType, Vec<Value>>,
}

fn default_store_version() -> u32 {
    1
}

/// Main storage coordinator
pub struct Storage {
    paths: PropdeskPaths,
    registry: EntityRegistry,
    tables: RwLock<BTreeMap<EntityType, RecordTable>>,
}

impl Storage {
    /// Create a store for the standard entity registry
    pub fn new(paths: PropdeskPaths) -> PropdeskResult<Self> {
        Self::with_registry(paths, EntityRegistry::standard())
    }

    /// Create a store for a custom entity registry
    pub fn with_registry(paths: PropdeskPaths, registry: EntityRegistry) -> PropdeskResult<Self> {
        paths.ensure_directories()?;

        let tables = empty_tables(&registry);
        Ok(Self {
            paths,
            registry,
            tables: RwLock::new(tables),
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &PropdeskPaths {
        &self.paths
    }

    /// Get the entity registry this store validates against
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Load all tables from disk
    pub fn load(&self) -> PropdeskResult<()> {
        let file_data: StoreData = read_json(self.paths.store_file())?;

        let mut loaded = empty_tables(&self.registry);
        for (entity_type, values) in file_data.tables {
            let descriptor = self.registry.get(entity_type).ok_or_else(|| {
                PropdeskError::Storage(format!(
                    "store holds {} records but {} is not registered",
                    entity_type, entity_type
                ))
            })?;
            loaded.insert(
                entity_type,
                RecordTable::from_values(entity_type, descriptor.natural_key, values)?,
            );
        }

        let mut tables = self.tables.write().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *tables = loaded;

        debug!(path = %self.paths.store_file().display(), "store loaded");
        Ok(())
    }

    /// Save all tables to disk
    pub fn save(&self) -> PropdeskResult<()> {
        let tables = self.tables.read().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        write_json_atomic(self.paths.store_file(), &store_data(&tables))
    }

    /// Number of records per registered entity type
    pub fn counts(&self) -> PropdeskResult<BTreeMap<EntityType, usize>> {
        let tables = self.tables.read().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(tables.iter().map(|(t, table)| (*t, table.len())).collect())
    }

    /// Check if the store file exists
    pub fn is_initialized(&self) -> bool {
        self.paths.store_file().exists()
    }

    /// Persist a committed transaction's tables and make them current
    pub(crate) fn replace_tables(
        &self,
        staged: BTreeMap<EntityType, RecordTable>,
    ) -> PropdeskResult<()> {
        let mut tables = self.tables.write().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        write_json_atomic(self.paths.store_file(), &store_data(&staged))?;
        *tables = staged;

        info!("store transaction committed");
        Ok(())
    }
}

fn empty_tables(registry: &EntityRegistry) -> BTreeMap<EntityType, RecordTable> {
    registry
        .descriptors()
        .iter()
        .map(|d| (d.entity_type, RecordTable::new(d.entity_type, d.natural_key)))
        .collect()
}

fn store_data(tables: &BTreeMap<EntityType, RecordTable>) -> StoreData {
    StoreData {
        schema_version: default_store_version(),
        tables: tables
            .iter()
            .map(|(t, table)| (*t, table.to_values()))
            .collect(),
    }
}

impl Repository for Storage {
    fn fetch_all(&self, entity_type: EntityType) -> PropdeskResult<Vec<Record>> {
        let tables = self.tables.read().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        tables
            .get(&entity_type)
            .map(|table| table.records().to_vec())
            .ok_or_else(|| {
                PropdeskError::Storage(format!("{} is not a registered entity type", entity_type))
            })
    }
}

impl TransactionManager for Storage {
    fn begin(&self) -> PropdeskResult<Box<dyn Transaction + '_>> {
        let tables = self.tables.read().map_err(|e| {
            PropdeskError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        debug!("store transaction started");
        Ok(Box::new(StoreTransaction::new(self, tables.clone())))
    }
}
