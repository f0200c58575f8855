//! Reference lookup inside resource payloads
//!
//! Payloads are arbitrary JSON trees. A reference field such as
//! `infrastructureRef` may sit at any depth, so the search walks nested
//! records. Tie-breaking is positional and relies on objects keeping their
//! insertion order (serde_json `preserve_order`):
//!
//! - a direct key match at a level wins immediately, even over matches
//!   already found in earlier sibling subtrees;
//! - otherwise the last sibling subtree that yields a match wins;
//! - arrays and scalars are leaves and are never searched.

use serde_json::Value;

/// Find the value stored under `field` somewhere in `fragment`.
///
/// A match whose value is `null` counts as no match.
pub fn locate_reference<'a>(fragment: &'a Value, field: &str) -> Option<&'a Value> {
    search(fragment, field).filter(|v| !v.is_null())
}

fn search<'a>(fragment: &'a Value, field: &str) -> Option<&'a Value> {
    let record = match fragment {
        Value::Object(record) => record,
        _ => return None,
    };

    let mut result = None;
    for (key, value) in record {
        if key == field {
            return Some(value);
        }
        if let Some(found) = search(value, field) {
            if !found.is_null() {
                result = Some(found);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_match() {
        let payload = json!({"a": {"b": {"infrastructureRef": {"kind": "X", "name": "y"}}}});
        assert_eq!(
            locate_reference(&payload, "infrastructureRef"),
            Some(&json!({"kind": "X", "name": "y"}))
        );
    }

    #[test]
    fn test_absent_field() {
        let payload = json!({"a": {"b": 1}, "c": "d"});
        assert_eq!(locate_reference(&payload, "configRef"), None);
    }

    #[test]
    fn test_non_record_is_leaf() {
        assert_eq!(locate_reference(&json!([{"configRef": 1}]), "configRef"), None);
        assert_eq!(locate_reference(&json!("configRef"), "configRef"), None);
        assert_eq!(locate_reference(&Value::Null, "configRef"), None);
    }

    #[test]
    fn test_sequences_are_not_descended() {
        let payload = json!({"items": [{"configRef": {"kind": "A", "name": "a"}}]});
        assert_eq!(locate_reference(&payload, "configRef"), None);
    }

    #[test]
    fn test_direct_match_beats_earlier_nested_match() {
        let payload = json!({
            "first": {"configRef": "nested"},
            "configRef": "direct",
        });
        assert_eq!(locate_reference(&payload, "configRef"), Some(&json!("direct")));
    }

    #[test]
    fn test_direct_match_skips_later_siblings() {
        let payload = json!({
            "configRef": "direct",
            "later": {"configRef": "nested"},
        });
        assert_eq!(locate_reference(&payload, "configRef"), Some(&json!("direct")));
    }

    #[test]
    fn test_last_sibling_subtree_wins() {
        let payload = json!({
            "one": {"deep": {"configRef": "first"}},
            "two": {"configRef": "second"},
            "three": {"nothing": true},
        });
        assert_eq!(locate_reference(&payload, "configRef"), Some(&json!("second")));
    }

    #[test]
    fn test_null_match_is_no_match() {
        assert_eq!(locate_reference(&json!({"configRef": null}), "configRef"), None);

        // A later null subtree does not erase an earlier hit.
        let payload = json!({
            "one": {"configRef": "kept"},
            "two": {"configRef": null},
        });
        assert_eq!(locate_reference(&payload, "configRef"), Some(&json!("kept")));

        // A direct null still ends the level, dropping the pending hit.
        let payload = json!({
            "one": {"configRef": "dropped"},
            "configRef": null,
        });
        assert_eq!(locate_reference(&payload, "configRef"), None);
    }

    #[test]
    fn test_match_value_is_not_searched() {
        let payload = json!({"spec": {"configRef": {"configRef": "inner"}}});
        assert_eq!(
            locate_reference(&payload, "configRef"),
            Some(&json!({"configRef": "inner"}))
        );
    }
}
