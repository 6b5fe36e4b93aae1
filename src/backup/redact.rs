//! Sensitive field redaction
//!
//! Strips credentials and secrets from records before they leave the store.
//! Only key names are inspected, never values, so the same walker handles
//! every entity shape. A key is removed when it matches the entity type's
//! denylist (case-insensitive exact match) or when its lowercase form
//! contains one of the universal sensitive substrings. Both rules apply at
//! every nesting level, including objects inside arrays.
//!
//! The substring rule over-redacts harmless names such as `keyword` or
//! `hashtag`; those removals are reported as [`RemovalReason::Heuristic`] so
//! they can be reviewed and promoted into a denylist.

use std::fmt;

use serde_json::{Map, Value};

use crate::models::Record;
use crate::registry::{EntityDescriptor, EntityRegistry};

/// Substrings that mark a key as sensitive regardless of entity type
pub const UNIVERSAL_SENSITIVE_PATTERNS: &[&str] =
    &["password", "token", "secret", "key", "hash", "salt"];

/// Why a field was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Named in the entity type's denylist
    Denylist,
    /// Matched only a universal sensitive substring
    Heuristic,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Denylist => write!(f, "denylist"),
            RemovalReason::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// A single removed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Location of the field, e.g. `profile.apiKey` or `contacts[2].token`
    pub path: String,
    pub reason: RemovalReason,
}

/// Redacts records of one entity type
#[derive(Debug, Clone, Copy)]
pub struct Redactor<'a> {
    denylist: &'a [&'a str],
    patterns: &'a [&'a str],
}

impl<'a> Redactor<'a> {
    /// Create a redactor with an explicit denylist and the universal patterns
    pub fn new(denylist: &'a [&'a str]) -> Self {
        Self {
            denylist,
            patterns: UNIVERSAL_SENSITIVE_PATTERNS,
        }
    }

    /// Create a redactor for a registered entity type
    pub fn for_descriptor(descriptor: &'a EntityDescriptor) -> Self {
        Self::new(descriptor.denylist)
    }

    /// Replace the universal substring list
    pub fn with_patterns(mut self, patterns: &'a [&'a str]) -> Self {
        self.patterns = patterns;
        self
    }

    /// Decide whether a key must be removed, and why
    ///
    /// The denylist wins when both rules match.
    pub fn classify(&self, key: &str) -> Option<RemovalReason> {
        if self.denylist.iter().any(|d| d.eq_ignore_ascii_case(key)) {
            return Some(RemovalReason::Denylist);
        }

        let lower = key.to_lowercase();
        if self.patterns.iter().any(|p| lower.contains(p)) {
            return Some(RemovalReason::Heuristic);
        }

        None
    }

    /// Return a redacted copy of a record
    pub fn redact(&self, record: &Record) -> Record {
        self.redact_with_report(record).0
    }

    /// Return a redacted copy of a record plus every removal made
    pub fn redact_with_report(&self, record: &Record) -> (Record, Vec<Removal>) {
        let mut removals = Vec::new();
        let fields = self.redact_map(record.fields(), "", &mut removals);
        (Record::new(record.entity_type(), fields), removals)
    }

    /// Return a redacted copy of an arbitrary JSON value
    pub fn redact_value(&self, value: &Value) -> Value {
        self.walk(value, "", &mut Vec::new())
    }

    fn walk(&self, value: &Value, path: &str, removals: &mut Vec<Removal>) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_map(map, path, removals)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.walk(item, &format!("{}[{}]", path, i), removals))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    fn redact_map(
        &self,
        map: &Map<String, Value>,
        path: &str,
        removals: &mut Vec<Removal>,
    ) -> Map<String, Value> {
        let mut kept = Map::new();

        for (key, value) in map {
            let field_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };

            match self.classify(key) {
                Some(reason) => removals.push(Removal {
                    path: field_path,
                    reason,
                }),
                None => {
                    kept.insert(key.clone(), self.walk(value, &field_path, removals));
                }
            }
        }

        kept
    }
}

/// Redact a record using its entity type's registered denylist
///
/// Unregistered types fall back to the universal patterns alone.
pub fn redact_record(record: &Record, registry: &EntityRegistry) -> Record {
    match registry.get(record.entity_type()) {
        Some(descriptor) => Redactor::for_descriptor(descriptor).redact(record),
        None => Redactor::new(&[]).redact(record),
    }
}
