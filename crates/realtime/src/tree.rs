//! Helpers for reading and writing a JSON document tree by path.
//!
//! The store never keeps `null` values or empty objects: writing `null`
//! deletes, and parents left empty by a delete disappear with it.

use serde_json::{Map, Value};

/// Drop `null` members and empty objects, recursively
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}

/// Value stored at `segments`, if any
pub fn get_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Replace the value at `segments`. Writing `null` removes it.
pub fn set_at(root: &mut Value, segments: &[String], value: Value) {
    let value = normalize(value);
    let Some((head, rest)) = segments.split_first() else {
        *root = value;
        return;
    };

    if value.is_null() {
        let emptied = match root {
            Value::Object(map) => {
                if rest.is_empty() {
                    map.remove(head);
                } else if let Some(child) = map.get_mut(head) {
                    set_at(child, rest, Value::Null);
                    if child.is_null() {
                        map.remove(head);
                    }
                }
                map.is_empty()
            }
            _ => false,
        };
        if emptied {
            *root = Value::Null;
        }
        return;
    }

    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
    }
}

/// Apply a partial update: each member of `fields` is written below `segments`
pub fn merge_at(root: &mut Value, segments: &[String], fields: Map<String, Value>) {
    for (key, value) in fields {
        let mut target = segments.to_vec();
        target.extend(key.split('/').filter(|s| !s.is_empty()).map(String::from));
        set_at(root, &target, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut root = Value::Null;
        set_at(&mut root, &segs("items/a/title"), json!("Wallet"));
        assert_eq!(root, json!({"items": {"a": {"title": "Wallet"}}}));
        assert_eq!(get_at(&root, &segs("items/a/title")), Some(&json!("Wallet")));
    }

    #[test]
    fn deleting_last_child_prunes_parents() {
        let mut root = json!({"items": {"a": {"title": "Wallet"}}, "users": {"u": {"name": "Jo"}}});
        set_at(&mut root, &segs("items/a"), Value::Null);
        assert_eq!(root, json!({"users": {"u": {"name": "Jo"}}}));
        assert!(get_at(&root, &segs("items")).is_none());
    }

    #[test]
    fn merge_only_touches_named_fields() {
        let mut root = json!({"items": {"a": {"title": "Wallet", "status_id": 1}}});
        let mut fields = Map::new();
        fields.insert("status_id".into(), json!(2));
        fields.insert("location".into(), Value::Null);
        merge_at(&mut root, &segs("items/a"), fields);
        assert_eq!(root, json!({"items": {"a": {"title": "Wallet", "status_id": 2}}}));
    }

    #[test]
    fn normalize_strips_nulls() {
        let value = normalize(json!({"a": null, "b": {"c": null}, "d": 1}));
        assert_eq!(value, json!({"d": 1}));
    }
}
