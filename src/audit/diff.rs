//! Change summaries for audited updates

use serde_json::Value;

/// Longest string value shown verbatim in a summary
const MAX_SHOWN_CHARS: usize = 40;

/// Summarize the differences between two record values
///
/// Nested objects are compared field by field (`address.city: ...`); arrays
/// of different lengths are summarized by size. Returns `None` when nothing
/// changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let mut changes = Vec::new();
    collect_changes(before, after, "", &mut changes);

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn collect_changes(before: &Value, after: &Value, path: &str, changes: &mut Vec<String>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let field = join_path(path, key);
                match new.get(key) {
                    Some(new_value) => collect_changes(old_value, new_value, &field, changes),
                    None => changes.push(format!("{}: {} -> (removed)", field, describe(old_value))),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    changes.push(format!(
                        "{}: (added) -> {}",
                        join_path(path, key),
                        describe(new_value)
                    ));
                }
            }
        }
        (Value::Array(old), Value::Array(new)) if old.len() == new.len() => {
            for (i, (old_item, new_item)) in old.iter().zip(new).enumerate() {
                collect_changes(old_item, new_item, &format!("{}[{}]", path, i), changes);
            }
        }
        _ if before != after => {
            let label = if path.is_empty() { "value" } else { path };
            changes.push(format!("{}: {} -> {}", label, describe(before), describe(after)));
        }
        _ => {}
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > MAX_SHOWN_CHARS => {
            let shown: String = s.chars().take(MAX_SHOWN_CHARS - 3).collect();
            format!("\"{}...\"", shown)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
        scalar => scalar.to_string(),
    }
}
