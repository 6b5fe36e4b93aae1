//! Property-based tests for sensitive field redaction.
//!
//! - Idempotence: redact(redact(r)) == redact(r)
//! - Completeness: no key left anywhere in the output matches a removal rule
//! - Preservation: top-level fields matching no rule survive unchanged

use propdesk::backup::{redact_record, Redactor};
use propdesk::models::{EntityType, Record};
use propdesk::registry::EntityRegistry;
use proptest::prelude::*;
use serde_json::{Map, Value};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("password".to_string()),
        Just("passwordHash".to_string()),
        Just("apiKey".to_string()),
        Just("resetToken".to_string()),
        Just("SALT".to_string()),
        Just("email".to_string()),
        Just("name".to_string()),
        Just("keyword".to_string()),
        prop::string::string_regex("[a-zA-Z]{1,12}").unwrap(),
    ]
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        prop::string::string_regex("[a-z0-9 @.]{0,20}")
            .unwrap()
            .prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(key_strategy(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn fields_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

fn entity_type_strategy() -> impl Strategy<Value = EntityType> {
    prop::sample::select(EntityType::ALL.to_vec())
}

fn assert_no_removable_keys(redactor: &Redactor<'_>, value: &Value) -> Result<(), TestCaseError> {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                prop_assert!(redactor.classify(key).is_none(), "kept removable key {}", key);
                assert_no_removable_keys(redactor, nested)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                assert_no_removable_keys(redactor, item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

// =============================================================================
// REDACTION PROPERTY TESTS
// =============================================================================

proptest! {
    #[test]
    fn redaction_is_idempotent(entity_type in entity_type_strategy(), fields in fields_strategy()) {
        let registry = EntityRegistry::standard();
        let record = Record::new(entity_type, fields);

        let once = redact_record(&record, &registry);
        let twice = redact_record(&once, &registry);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn redacted_records_hold_no_sensitive_keys(
        entity_type in entity_type_strategy(),
        fields in fields_strategy(),
    ) {
        let registry = EntityRegistry::standard();
        let descriptor = registry.get(entity_type).unwrap();
        let redactor = Redactor::for_descriptor(descriptor);

        let redacted = redactor.redact(&Record::new(entity_type, fields));
        assert_no_removable_keys(&redactor, &redacted.into_value())?;
    }

    #[test]
    fn benign_scalar_fields_survive(fields in fields_strategy()) {
        let redactor = Redactor::new(&[]);
        let record = Record::new(EntityType::Properties, fields.clone());
        let redacted = redactor.redact(&record);

        for (key, value) in &fields {
            let is_scalar = !value.is_object() && !value.is_array();
            if redactor.classify(key).is_none() && is_scalar {
                prop_assert_eq!(redacted.get(key), Some(value));
            }
        }
    }

    #[test]
    fn reported_removals_match_dropped_top_level_keys(fields in fields_strategy()) {
        let registry = EntityRegistry::standard();
        let redactor = Redactor::for_descriptor(registry.get(EntityType::Users).unwrap());
        let record = Record::new(EntityType::Users, fields.clone());

        let (redacted, removals) = redactor.redact_with_report(&record);

        for key in fields.keys() {
            let reported = removals.iter().any(|r| &r.path == key);
            prop_assert_eq!(reported, redacted.get(key).is_none());
        }
    }
}
