//! Classification of document values into leaves and nested records.

use serde_json::{Map, Value};

use crate::error::DecomposeError;

/// What a single `key: value` pair of a group instance holds.
#[derive(Debug)]
pub(crate) enum Slot<'a> {
    /// Null, empty string, empty list or object: contributes nothing.
    Empty,
    /// Scalar leaf, already normalised for output.
    Leaf(Value),
    /// A 1:1 embedded record.
    One(&'a Map<String, Value>),
    /// A list of child records.
    Many(Vec<&'a Map<String, Value>>),
}

/// Classify `value` found under `key` inside an instance of `group`.
///
/// `nested` says whether `key` is configured as a child field group.
pub(crate) fn classify<'a>(
    group: &str,
    key: &str,
    value: &'a Value,
    nested: bool,
) -> Result<Slot<'a>, DecomposeError> {
    let slot = match value {
        Value::Null => Slot::Empty,
        Value::String(text) if text.is_empty() => Slot::Empty,
        Value::Object(map) if map.is_empty() => Slot::Empty,
        Value::Object(map) => Slot::One(map),
        Value::Array(items) => classify_list(group, key, items)?,
        scalar => Slot::Leaf(scalar.clone()),
    };
    if nested && matches!(slot, Slot::Leaf(_)) {
        return Err(DecomposeError::ExpectedNested {
            group: group.to_string(),
            key: key.to_string(),
        });
    }
    Ok(slot)
}

fn classify_list<'a>(
    group: &str,
    key: &str,
    items: &'a [Value],
) -> Result<Slot<'a>, DecomposeError> {
    if items.iter().all(|item| !item.is_object() && !item.is_array()) {
        return Ok(join_scalars(items).map_or(Slot::Empty, Slot::Leaf));
    }
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => records.push(map),
            _ => {
                return Err(DecomposeError::MixedList {
                    group: group.to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(Slot::Many(records))
}

/// Lists of scalars become one comma-separated string.
fn join_scalars(items: &[Value]) -> Option<Value> {
    let parts: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(Value::String(parts.join(", ")))
    }
}

/// The id value of a group instance, if it carries a usable one.
pub(crate) fn record_id(map: &Map<String, Value>, id_key: &str) -> Option<Value> {
    match map.get(id_key)? {
        Value::Null | Value::Object(_) | Value::Array(_) => None,
        Value::String(text) if text.is_empty() => None,
        scalar => Some(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_values_are_skipped() {
        for value in [json!(null), json!(""), json!([]), json!({}), json!([null, ""])] {
            let slot = classify("cases", "x", &value, false).expect("classify");
            assert!(matches!(slot, Slot::Empty), "{value} should be empty");
        }
    }

    #[test]
    fn scalar_lists_are_joined() {
        let value = json!(["Lung", "Liver", 3]);
        match classify("cases.diagnoses", "sites", &value, false).expect("classify") {
            Slot::Leaf(joined) => assert_eq!(joined, json!("Lung, Liver, 3")),
            other => panic!("unexpected slot: {other:?}"),
        }
    }

    #[test]
    fn mixed_lists_are_rejected() {
        let value = json!([{"a": 1}, 2]);
        let err = classify("cases", "diagnoses", &value, true).unwrap_err();
        assert!(matches!(err, DecomposeError::MixedList { .. }));
    }

    #[test]
    fn scalar_under_group_key_is_rejected() {
        let err = classify("cases", "diagnoses", &json!("oops"), true).unwrap_err();
        assert!(matches!(err, DecomposeError::ExpectedNested { .. }));
    }
}
