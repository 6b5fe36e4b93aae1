//! Store transactions
//!
//! A transaction works on a private copy of every table taken at `begin`.
//! Inserts and updates are validated against the registry (required fields,
//! natural-key uniqueness, references to other tables as seen inside the
//! transaction). `commit` hands the copy back to the store, which persists
//! it with one atomic file replacement; anything else leaves the store as it
//! was.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::record::scalar_to_string;
use crate::models::{EntityType, NaturalKey, Record, ID_FIELD};
use crate::registry::EntityDescriptor;

use super::table::RecordTable;
use super::traits::Transaction;
use super::Storage;

/// A transaction over the JSON file store
pub struct StoreTransaction<'a> {
    storage: &'a Storage,
    staged: BTreeMap<EntityType, RecordTable>,
    dirty: bool,
}

impl<'a> StoreTransaction<'a> {
    pub(crate) fn new(storage: &'a Storage, staged: BTreeMap<EntityType, RecordTable>) -> Self {
        Self {
            storage,
            staged,
            dirty: false,
        }
    }

    fn descriptor(&self, entity_type: EntityType) -> PropdeskResult<&'a EntityDescriptor> {
        self.storage.registry().get(entity_type).ok_or_else(|| {
            PropdeskError::Storage(format!("{} is not a registered entity type", entity_type))
        })
    }

    fn table(&self, entity_type: EntityType) -> PropdeskResult<&RecordTable> {
        self.staged.get(&entity_type).ok_or_else(|| {
            PropdeskError::Storage(format!("no table for entity type {}", entity_type))
        })
    }

    fn table_mut(&mut self, entity_type: EntityType) -> PropdeskResult<&mut RecordTable> {
        self.staged.get_mut(&entity_type).ok_or_else(|| {
            PropdeskError::Storage(format!("no table for entity type {}", entity_type))
        })
    }

    /// Check required fields and references
    fn validate(&self, descriptor: &EntityDescriptor, record: &Record) -> PropdeskResult<()> {
        for field in descriptor.required {
            match record.get(field) {
                None | Some(Value::Null) => {
                    return Err(PropdeskError::Validation(format!(
                        "missing required field '{}'",
                        field
                    )))
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    return Err(PropdeskError::Validation(format!(
                        "required field '{}' is empty",
                        field
                    )))
                }
                Some(_) => {}
            }
        }

        for reference in descriptor.references {
            let value = match record.get(reference.field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let target_id = scalar_to_string(value).ok_or_else(|| {
                PropdeskError::Validation(format!(
                    "'{}' must hold a {} id, found {}",
                    reference.field, reference.target, value
                ))
            })?;

            if !self.table(reference.target)?.contains_id(&target_id) {
                return Err(PropdeskError::Validation(format!(
                    "'{}' references unknown {} record '{}'",
                    reference.field, reference.target, target_id
                )));
            }
        }

        Ok(())
    }

    fn natural_key(
        &self,
        descriptor: &EntityDescriptor,
        record: &Record,
    ) -> PropdeskResult<NaturalKey> {
        if descriptor.natural_key.is_empty() {
            return Err(PropdeskError::Validation(format!(
                "{} is append-only and has no natural key",
                descriptor.entity_type
            )));
        }

        record.natural_key(descriptor.natural_key).ok_or_else(|| {
            PropdeskError::Validation(format!(
                "missing natural key field(s): {}",
                descriptor.natural_key.join(", ")
            ))
        })
    }
}

/// Give a record a fresh UUID if it has no id
fn ensure_id(mut record: Record) -> Record {
    if record.id().is_none() {
        record.set(ID_FIELD, Value::String(Uuid::new_v4().to_string()));
    }
    record
}

impl Transaction for StoreTransaction<'_> {
    fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &NaturalKey,
    ) -> PropdeskResult<Option<Record>> {
        Ok(self.table(entity_type)?.find_by_key(key).cloned())
    }

    fn insert(&mut self, record: Record) -> PropdeskResult<Record> {
        let entity_type = record.entity_type();
        let descriptor = self.descriptor(entity_type)?;
        let key = self.natural_key(descriptor, &record)?;

        let table = self.table(entity_type)?;
        if table.find_by_key(&key).is_some() {
            return Err(PropdeskError::Duplicate {
                entity_type,
                identifier: key.to_string(),
            });
        }
        if let Some(id) = record.id() {
            if table.contains_id(&id) {
                return Err(PropdeskError::Validation(format!(
                    "id '{}' is already used by another {} record",
                    id, entity_type
                )));
            }
        }

        self.validate(descriptor, &record)?;

        let record = ensure_id(record);
        self.table_mut(entity_type)?.push(record.clone());
        self.dirty = true;
        Ok(record)
    }

    fn update(&mut self, record: Record) -> PropdeskResult<Record> {
        let entity_type = record.entity_type();
        let descriptor = self.descriptor(entity_type)?;
        let id = record.id().ok_or_else(|| {
            PropdeskError::Validation("cannot update a record without an id".into())
        })?;

        let table = self.table(entity_type)?;
        if table.find_by_id(&id).is_none() {
            return Err(PropdeskError::NotFound {
                entity_type: "Record",
                identifier: format!("{}/{}", entity_type, id),
            });
        }
        if descriptor.conflict_policy.checks_uniqueness() {
            let key = self.natural_key(descriptor, &record)?;
            if let Some(other) = table.find_by_key(&key) {
                if other.id().as_deref() != Some(id.as_str()) {
                    return Err(PropdeskError::Duplicate {
                        entity_type,
                        identifier: key.to_string(),
                    });
                }
            }
        }

        self.validate(descriptor, &record)?;

        self.table_mut(entity_type)?.replace(&id, record.clone())?;
        self.dirty = true;
        Ok(record)
    }

    fn append(&mut self, record: Record) -> PropdeskResult<Record> {
        let entity_type = record.entity_type();
        let descriptor = self.descriptor(entity_type)?;
        self.validate(descriptor, &record)?;

        let record = ensure_id(record);
        self.table_mut(entity_type)?.push(record.clone());
        self.dirty = true;
        Ok(record)
    }

    fn commit(self: Box<Self>) -> PropdeskResult<()> {
        if !self.dirty {
            debug!("transaction has no writes; nothing to commit");
            return Ok(());
        }
        let this = *self;
        this.storage.replace_tables(this.staged)
    }

    fn rollback(self: Box<Self>) -> PropdeskResult<()> {
        debug!(dirty = self.dirty, "transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::paths::PropdeskPaths;
    use crate::models::{EntityType, NaturalKey, Record};
    use crate::storage::{Repository, Storage, Transaction, TransactionManager};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = PropdeskPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load().unwrap();
        (temp_dir, storage)
    }

    fn record(entity_type: EntityType, value: Value) -> Record {
        Record::from_value(entity_type, value).unwrap()
    }

    #[test]
    fn test_insert_assigns_id() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();

        let stored = tx
            .insert(record(EntityType::Users, json!({"email": "ana@example.com", "name": "Ana"})))
            .unwrap();

        assert!(stored.id().is_some());
        tx.commit().unwrap();
        assert_eq!(storage.fetch_all(EntityType::Users).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_duplicate_natural_key() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();

        tx.insert(record(EntityType::Users, json!({"email": "ana@example.com", "name": "Ana"})))
            .unwrap();
        let err = tx
            .insert(record(EntityType::Users, json!({"email": "ANA@example.com", "name": "Ana B"})))
            .unwrap_err();

        assert!(err.is_duplicate());
    }

    #[test]
    fn test_insert_missing_required_field() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();

        let err = tx
            .insert(record(EntityType::Properties, json!({"referenceCode": "P-1"})))
            .unwrap_err();

        assert!(err.to_string().contains("missing required field 'title'"));
    }

    #[test]
    fn test_reference_must_exist_in_transaction() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();

        let err = tx
            .insert(record(
                EntityType::Properties,
                json!({"referenceCode": "P-1", "title": "Loft", "agentId": "u-1"}),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("unknown users record 'u-1'"));

        tx.insert(record(
            EntityType::Users,
            json!({"id": "u-1", "email": "ana@example.com", "name": "Ana"}),
        ))
        .unwrap();
        tx.insert(record(
            EntityType::Properties,
            json!({"referenceCode": "P-1", "title": "Loft", "agentId": "u-1"}),
        ))
        .unwrap();
    }

    #[test]
    fn test_update_replaces_by_id() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();
        tx.insert(record(
            EntityType::SiteSettings,
            json!({"id": "s-1", "name": "siteTitle", "value": "Old"}),
        ))
        .unwrap();

        tx.update(record(
            EntityType::SiteSettings,
            json!({"id": "s-1", "name": "siteTitle", "value": "New"}),
        ))
        .unwrap();

        let found = tx
            .find_by_natural_key(EntityType::SiteSettings, &NaturalKey::from_parts(["siteTitle"]))
            .unwrap()
            .unwrap();
        assert_eq!(found.get("value"), Some(&json!("New")));
    }

    #[test]
    fn test_append_skips_uniqueness() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();

        for _ in 0..2 {
            tx.append(record(EntityType::ActivityLog, json!({"id": "a-1", "action": "login"})))
                .unwrap();
        }
        tx.commit().unwrap();

        assert_eq!(storage.fetch_all(EntityType::ActivityLog).unwrap().len(), 2);
    }

    #[test]
    fn test_rollback_leaves_store_untouched() {
        let (_temp, storage) = create_test_storage();
        let store_file = storage.paths().store_file();

        let mut tx = storage.begin().unwrap();
        tx.insert(record(EntityType::Users, json!({"email": "ana@example.com", "name": "Ana"})))
            .unwrap();
        tx.rollback().unwrap();

        assert!(storage.fetch_all(EntityType::Users).unwrap().is_empty());
        assert!(!store_file.exists());
    }

    #[test]
    fn test_uncommitted_writes_are_invisible() {
        let (_temp, storage) = create_test_storage();
        let mut tx = storage.begin().unwrap();
        tx.insert(record(EntityType::Users, json!({"email": "ana@example.com", "name": "Ana"})))
            .unwrap();

        assert!(storage.fetch_all(EntityType::Users).unwrap().is_empty());
        drop(tx);
        assert!(storage.fetch_all(EntityType::Users).unwrap().is_empty());
    }
}
