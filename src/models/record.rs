//! Generic tagged records
//!
//! Entity shapes differ and evolve independently of the backup engine, so a
//! record is a JSON object tagged with its entity type rather than a typed
//! struct per entity.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use super::entity::EntityType;
use crate::error::{PropdeskError, PropdeskResult};

/// Name of the surrogate identifier field shared by all entity types
pub const ID_FIELD: &str = "id";

/// A single persisted record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity_type: EntityType,
    fields: Map<String, Value>,
}

impl Record {
    /// Create a record from an already-built field map
    pub fn new(entity_type: EntityType, fields: Map<String, Value>) -> Self {
        Self {
            entity_type,
            fields,
        }
    }

    /// Create a record from a JSON value, which must be an object
    pub fn from_value(entity_type: EntityType, value: Value) -> PropdeskResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(entity_type, fields)),
            other => Err(PropdeskError::Validation(format!(
                "expected a JSON object, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// The entity type tag
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// All fields of the record
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Get a single field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a single field, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// The surrogate id, if present and a string or number
    pub fn id(&self) -> Option<String> {
        self.get(ID_FIELD).and_then(scalar_to_string)
    }

    /// Compute the record's natural key over the given fields
    ///
    /// Returns `None` when any key field is missing or null. Append-only
    /// types declare no key fields and always yield `None`.
    pub fn natural_key(&self, key_fields: &[&str]) -> Option<NaturalKey> {
        if key_fields.is_empty() {
            return None;
        }

        let mut parts = Vec::with_capacity(key_fields.len());
        for field in key_fields {
            match self.get(field) {
                None | Some(Value::Null) => return None,
                Some(Value::String(s)) => parts.push(NaturalKey::normalize(s)),
                Some(other) => parts.push(other.to_string()),
            }
        }
        Some(NaturalKey(parts))
    }

    /// Merge another record's fields into this one, keeping this record's id
    pub fn merge_from(&mut self, incoming: &Record) {
        for (field, value) in &incoming.fields {
            if field == ID_FIELD {
                continue;
            }
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Convert the record back into its JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Normalized natural key of a record
///
/// String parts are trimmed and lowercased so that `Ana@Example.com ` and
/// `ana@example.com` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey(Vec<String>);

impl NaturalKey {
    /// Normalize a string key part for comparison
    pub fn normalize(part: &str) -> String {
        part.trim().to_lowercase()
    }

    /// Build a key from raw parts, normalizing each
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(parts.into_iter().map(|p| Self::normalize(p.as_ref())).collect())
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Render a scalar JSON value as a string; objects, arrays and null yield `None`
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: Value) -> Record {
        Record::from_value(EntityType::Users, value).unwrap()
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Record::from_value(EntityType::Users, json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_natural_key_is_normalized() {
        let a = user(json!({"email": " Ana@Example.com"}));
        let b = user(json!({"email": "ana@example.com"}));
        assert_eq!(a.natural_key(&["email"]), b.natural_key(&["email"]));
        assert_eq!(
            a.natural_key(&["email"]).unwrap().to_string(),
            "ana@example.com"
        );
    }

    #[test]
    fn test_natural_key_missing_or_null() {
        let r = user(json!({"email": null, "name": "Ana"}));
        assert!(r.natural_key(&["email"]).is_none());
        assert!(r.natural_key(&["phone"]).is_none());
        assert!(r.natural_key(&[]).is_none());
    }

    #[test]
    fn test_numeric_id() {
        let r = user(json!({"id": 42}));
        assert_eq!(r.id(), Some("42".to_string()));
    }

    #[test]
    fn test_merge_keeps_identity() {
        let mut existing = user(json!({"id": "u-1", "email": "ana@example.com", "name": "Ana"}));
        let incoming = user(json!({"id": "u-9", "email": "ana@example.com", "name": "Ana Maria", "phone": "555"}));

        existing.merge_from(&incoming);

        assert_eq!(existing.id(), Some("u-1".to_string()));
        assert_eq!(existing.get("name"), Some(&json!("Ana Maria")));
        assert_eq!(existing.get("phone"), Some(&json!("555")));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let r = user(json!({"email": "ana@example.com"}));
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"email": "ana@example.com"})
        );
    }
}
