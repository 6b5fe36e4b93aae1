//! In-memory record table
//!
//! Holds the records of one entity type in insertion order, with lookup
//! indexes by surrogate id and by normalized natural key.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::{EntityType, NaturalKey, Record};

/// Records of one entity type
#[derive(Debug, Clone)]
pub struct RecordTable {
    entity_type: EntityType,
    key_fields: &'static [&'static str],
    records: Vec<Record>,
    /// Index: id -> position (first record wins for append-only duplicates)
    by_id: HashMap<String, usize>,
    /// Index: natural key -> position
    by_key: HashMap<NaturalKey, usize>,
}

impl RecordTable {
    /// Create an empty table
    pub fn new(entity_type: EntityType, key_fields: &'static [&'static str]) -> Self {
        Self {
            entity_type,
            key_fields,
            records: Vec::new(),
            by_id: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    /// Build a table from stored JSON values
    pub fn from_values(
        entity_type: EntityType,
        key_fields: &'static [&'static str],
        values: Vec<Value>,
    ) -> PropdeskResult<Self> {
        let mut table = Self::new(entity_type, key_fields);
        for (index, value) in values.into_iter().enumerate() {
            let record = Record::from_value(entity_type, value).map_err(|e| {
                PropdeskError::Storage(format!("{}[{}] is corrupt: {}", entity_type, index, e))
            })?;
            table.push(record);
        }
        Ok(table)
    }

    /// The entity type held by this table
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Natural key of a record under this table's key fields
    pub fn key_of(&self, record: &Record) -> Option<NaturalKey> {
        record.natural_key(self.key_fields)
    }

    /// Find a record by natural key
    pub fn find_by_key(&self, key: &NaturalKey) -> Option<&Record> {
        self.by_key.get(key).map(|&i| &self.records[i])
    }

    /// Find a record by id
    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// Whether a record with this id exists
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Append a record, indexing its id and natural key
    pub fn push(&mut self, record: Record) {
        let position = self.records.len();
        if let Some(id) = record.id() {
            self.by_id.entry(id).or_insert(position);
        }
        if let Some(key) = self.key_of(&record) {
            self.by_key.entry(key).or_insert(position);
        }
        self.records.push(record);
    }

    /// Replace the record with the given id, re-indexing its natural key
    pub fn replace(&mut self, id: &str, record: Record) -> PropdeskResult<()> {
        let position = *self.by_id.get(id).ok_or_else(|| PropdeskError::NotFound {
            entity_type: "Record",
            identifier: format!("{}/{}", self.entity_type, id),
        })?;

        if let Some(old_key) = self.key_of(&self.records[position]) {
            if self.by_key.get(&old_key) == Some(&position) {
                self.by_key.remove(&old_key);
            }
        }
        if let Some(new_key) = self.key_of(&record) {
            self.by_key.insert(new_key, position);
        }

        self.records[position] = record;
        Ok(())
    }

    /// Convert to stored JSON values
    pub fn to_values(&self) -> Vec<Value> {
        self.records.iter().cloned().map(Record::into_value).collect()
    }
}
