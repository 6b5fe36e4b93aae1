//! Restore-time conflict resolution
//!
//! Each entity type has one fixed [`ConflictPolicy`] in the registry, so a
//! given snapshot always restores the same way whoever runs it.

use tracing::debug;

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::Record;
use crate::registry::{ConflictPolicy, EntityDescriptor, EntityRegistry};
use crate::storage::Transaction;

/// What happened to one incoming record
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No record shared the natural key; the incoming record was inserted
    Inserted(Record),
    /// Append-only type; the record was added without a uniqueness check
    Appended(Record),
    /// An existing record kept its fields; the incoming record was dropped
    Skipped { existing: Record, warning: String },
    /// Incoming fields were merged into the existing record
    Merged { before: Record, after: Record },
}

impl Resolution {
    /// The record now stored for this natural key
    pub fn stored(&self) -> &Record {
        match self {
            Resolution::Inserted(record) | Resolution::Appended(record) => record,
            Resolution::Skipped { existing, .. } => existing,
            Resolution::Merged { after, .. } => after,
        }
    }

    /// Whether the store was written
    pub fn is_write(&self) -> bool {
        !matches!(self, Resolution::Skipped { .. })
    }
}

/// Applies per-entity-type conflict policies inside a transaction
pub struct ConflictResolver<'a> {
    registry: &'a EntityRegistry,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        Self { registry }
    }

    fn descriptor(&self, record: &Record) -> PropdeskResult<&'a EntityDescriptor> {
        self.registry.get(record.entity_type()).ok_or_else(|| {
            PropdeskError::Validation(format!(
                "{} is not a registered entity type",
                record.entity_type()
            ))
        })
    }

    /// Store an incoming record, resolving a natural-key collision by policy
    pub fn place(&self, tx: &mut dyn Transaction, incoming: Record) -> PropdeskResult<Resolution> {
        let descriptor = self.descriptor(&incoming)?;

        if descriptor.conflict_policy == ConflictPolicy::AppendAlways {
            return tx.append(incoming).map(Resolution::Appended);
        }

        match tx.insert(incoming.clone()) {
            Ok(stored) => Ok(Resolution::Inserted(stored)),
            Err(e) if e.is_duplicate() => {
                let key = incoming
                    .natural_key(descriptor.natural_key)
                    .ok_or_else(|| PropdeskError::Validation("natural key vanished".into()))?;
                let existing = tx
                    .find_by_natural_key(descriptor.entity_type, &key)?
                    .ok_or_else(|| {
                        PropdeskError::Transaction(format!(
                            "{} reported a collision on '{}' but holds no such record",
                            descriptor.entity_type, key
                        ))
                    })?;
                self.resolve(tx, incoming, existing)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the entity type's policy to a record whose natural key is taken
    pub fn resolve(
        &self,
        tx: &mut dyn Transaction,
        incoming: Record,
        existing: Record,
    ) -> PropdeskResult<Resolution> {
        let descriptor = self.descriptor(&incoming)?;
        let entity_type = descriptor.entity_type;

        match descriptor.conflict_policy {
            ConflictPolicy::SkipIfExists => {
                let key = existing
                    .natural_key(descriptor.natural_key)
                    .map(|k| k.to_string())
                    .unwrap_or_default();
                debug!(entity_type = %entity_type, key = %key, "kept existing record");
                Ok(Resolution::Skipped {
                    existing,
                    warning: format!("{}: skipped existing record with key '{}'", entity_type, key),
                })
            }
            ConflictPolicy::UpsertOnConflict => {
                let mut merged = existing.clone();
                merged.merge_from(&incoming);
                let after = tx.update(merged)?;
                debug!(entity_type = %entity_type, id = ?after.id(), "merged into existing record");
                Ok(Resolution::Merged {
                    before: existing,
                    after,
                })
            }
            ConflictPolicy::AppendAlways => tx.append(incoming).map(Resolution::Appended),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PropdeskPaths;
    use crate::models::EntityType;
    use crate::storage::{Repository, Storage, TransactionManager};
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
    fn test_skip_keeps_existing_fields() {
        let (_temp, storage) = create_test_storage();
        let registry = EntityRegistry::standard();
        let resolver = ConflictResolver::new(&registry);
        let mut tx = storage.begin().unwrap();

        let existing = json!({"id": "u-1", "email": "ana@example.com", "name": "Ana"});
        resolver
            .place(tx.as_mut(), record(EntityType::Users, existing.clone()))
            .unwrap();

        let resolution = resolver
            .place(
                tx.as_mut(),
                record(
                    EntityType::Users,
                    json!({"id": "u-9", "email": " ANA@example.com", "name": "Someone else"}),
                ),
            )
            .unwrap();

        match &resolution {
            Resolution::Skipped { existing: kept, warning } => {
                assert_eq!(kept.clone().into_value(), existing);
                assert_eq!(
                    warning,
                    "users: skipped existing record with key 'ana@example.com'"
                );
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
        assert!(!resolution.is_write());

        tx.commit().unwrap();
        let users = storage.fetch_all(EntityType::Users).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].get("name"), Some(&json!("Ana")));
    }

    #[test]
    fn test_upsert_merges_and_keeps_id() {
        let (_temp, storage) = create_test_storage();
        let registry = EntityRegistry::standard();
        let resolver = ConflictResolver::new(&registry);
        let mut tx = storage.begin().unwrap();

        resolver
            .place(
                tx.as_mut(),
                record(
                    EntityType::Properties,
                    json!({"id": "p-1", "referenceCode": "P-1", "title": "Loft", "rooms": 2}),
                ),
            )
            .unwrap();

        let resolution = resolver
            .place(
                tx.as_mut(),
                record(
                    EntityType::Properties,
                    json!({"id": "p-7", "referenceCode": "p-1", "title": "Sunny loft"}),
                ),
            )
            .unwrap();

        match resolution {
            Resolution::Merged { before, after } => {
                assert_eq!(before.get("title"), Some(&json!("Loft")));
                assert_eq!(after.id(), Some("p-1".to_string()));
                assert_eq!(after.get("title"), Some(&json!("Sunny loft")));
                assert_eq!(after.get("rooms"), Some(&json!(2)));
                assert_eq!(after.get("referenceCode"), Some(&json!("p-1")));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_append_always_allows_repeats() {
        let (_temp, storage) = create_test_storage();
        let registry = EntityRegistry::standard();
        let resolver = ConflictResolver::new(&registry);
        let mut tx = storage.begin().unwrap();

        for _ in 0..3 {
            let resolution = resolver
                .place(
                    tx.as_mut(),
                    record(EntityType::ActivityLog, json!({"action": "login"})),
                )
                .unwrap();
            assert!(matches!(resolution, Resolution::Appended(_)));
        }
        tx.commit().unwrap();

        assert_eq!(storage.fetch_all(EntityType::ActivityLog).unwrap().len(), 3);
    }

    #[test]
    fn test_other_failures_propagate() {
        let (_temp, storage) = create_test_storage();
        let registry = EntityRegistry::standard();
        let resolver = ConflictResolver::new(&registry);
        let mut tx = storage.begin().unwrap();

        let err = resolver
            .place(
                tx.as_mut(),
                record(EntityType::Users, json!({"email": "ana@example.com"})),
            )
            .unwrap_err();
        assert!(!err.is_duplicate());
        assert!(err.to_string().contains("name"));
    }
}
