//! Tree operations shared by the stores
//!
//! A stored tree only holds leaves (non-null scalars) and non-empty
//! objects. Writes go through `normalize`, reads through `denormalize`,
//! which mirrors how a realtime database handles nulls and arrays.

use std::collections::BTreeMap;
use super::errors::StoreError;
use super::path::{validate_key, Path, PathError, MAX_DEPTH};
use super::value::Value;

/// Bring a value written at `at` into stored form.
///
/// Returns `None` when nothing would be stored (null, empty containers).
/// Leaves may not end up deeper than `MAX_DEPTH` segments.
pub fn normalize(value: Value, at: &Path) -> Result<Option<Value>, StoreError> {
    let mut location = at.segments().to_vec();
    normalize_below(value, &mut location)
}

fn normalize_below(value: Value, location: &mut Vec<String>) -> Result<Option<Value>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::Float(f) if !f.is_finite() => {
            Err(StoreError::InvalidData(format!("cannot store non-finite number {}", f)))
        }
        Value::Array(items) => {
            let map = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect();
            normalize_object(map, location)
        }
        Value::Object(map) => normalize_object(map, location),
        _ if location.len() > MAX_DEPTH => Err(PathError::TooDeep(location.join("/")).into()),
        scalar => Ok(Some(scalar)),
    }
}

fn normalize_object(map: BTreeMap<String, Value>, location: &mut Vec<String>) -> Result<Option<Value>, StoreError> {
    let mut stored = BTreeMap::new();

    for (key, child) in map {
        validate_key(&key)?;

        location.push(key.clone());
        let child = normalize_below(child, location);
        location.pop();

        if let Some(child) = child? {
            stored.insert(key, child);
        }
    }

    if stored.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(stored)))
    }
}

/// Turn a stored value back into what readers see.
///
/// Objects whose keys are all array indices, and dense enough, come back as arrays.
pub fn denormalize(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };

    let mut map: BTreeMap<String, Value> = map
        .into_iter()
        .map(|(key, child)| (key, denormalize(child)))
        .collect();

    let indices: Option<Vec<usize>> = map.keys().map(|key| array_index(key)).collect();
    match indices.and_then(|indices| indices.into_iter().max().map(|max| (max, map.len()))) {
        Some((max, count)) if max < count * 2 => {
            let items = (0..=max)
                .map(|index| map.remove(&index.to_string()).unwrap_or(Value::Null))
                .collect();
            Value::Array(items)
        }
        _ => Value::Object(map),
    }
}

/// Parse a key written the way an array index is written ("0", "17", never "007")
fn array_index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Find the stored value below `node` at the given segments
pub fn get<'a>(node: Option<&'a Value>, segments: &[String]) -> Option<&'a Value> {
    let mut current = node?;

    for segment in segments {
        current = current.get(segment)?;
    }

    Some(current)
}

/// Replace the value below `node` at the given segments; `None` removes it.
///
/// Leaves in the way are replaced by objects, and objects left empty are pruned.
pub fn set_at(node: &mut Option<Value>, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !matches!(node, Some(Value::Object(_))) {
        if value.is_none() {
            return;
        }
        *node = Some(Value::Object(BTreeMap::new()));
    }

    if let Some(Value::Object(map)) = node {
        let mut child = map.remove(head);
        set_at(&mut child, rest, value);

        if let Some(child) = child {
            map.insert(head.clone(), child);
        }

        if map.is_empty() {
            *node = None;
        }
    }
}

/// Validate a merge-update payload at `at` and turn it into a list of writes.
///
/// Each key of the payload is a path relative to the update location; the
/// returned targets are absolute. Nothing is written if any entry is
/// invalid, so callers can apply the result without further checks.
pub fn prepare_update(at: &Path, patch: Value) -> Result<Vec<(Path, Option<Value>)>, StoreError> {
    let Value::Object(entries) = patch else {
        return Err(StoreError::InvalidData(format!(
            "update payload must be an object, got {}",
            patch.type_name()
        )));
    };

    let mut writes = Vec::with_capacity(entries.len());
    for (key, child) in entries {
        let relative: Path = key.parse()?;
        if relative.is_root() {
            return Err(StoreError::InvalidData("update keys must not be empty".to_string()));
        }
        let target = at.join(&relative)?;
        let value = normalize(child, &target)?;
        writes.push((target, value));
    }

    for (i, (a, _)) in writes.iter().enumerate() {
        for (b, _) in &writes[i + 1..] {
            if a.starts_with(b) || b.starts_with(a) {
                return Err(StoreError::InvalidData(format!(
                    "update keys `{}` and `{}` overlap",
                    a, b
                )));
            }
        }
    }

    Ok(writes)
}

/// Collect every leaf below `prefix` together with its full path
pub fn flatten(prefix: &Path, value: &Value, out: &mut Vec<(Path, Value)>) -> Result<(), StoreError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = prefix.join(&key.parse::<Path>()?)?;
                flatten(&child_path, child, out)?;
            }
        }
        leaf => out.push((prefix.clone(), leaf.clone())),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn segs(path: &str) -> Vec<String> {
        path.parse::<Path>().unwrap().segments().to_vec()
    }

    #[test]
    fn test_normalize_drops_nulls_and_empty_containers() {
        let written = v(json!({"a": null, "b": {}, "c": [], "d": {"e": null}, "f": 1}));
        let stored = normalize(written, &Path::root()).unwrap();
        assert_eq!(stored, Some(v(json!({"f": 1}))));

        assert_eq!(normalize(Value::Null, &Path::root()).unwrap(), None);
        assert_eq!(normalize(v(json!({})), &Path::root()).unwrap(), None);
    }

    #[test]
    fn test_normalize_rejects_bad_data() {
        assert!(matches!(
            normalize(v(json!({"a.b": 1})), &Path::root()),
            Err(StoreError::PathError(_))
        ));
        assert!(matches!(
            normalize(Value::Float(f64::NAN), &Path::root()),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_arrays_round_trip_through_objects() {
        let stored = normalize(v(json!(["a", "b", "c"])), &Path::root()).unwrap().unwrap();
        assert_eq!(stored, v(json!({"0": "a", "1": "b", "2": "c"})));
        assert_eq!(denormalize(stored), v(json!(["a", "b", "c"])));
    }

    #[test]
    fn test_sparse_arrays() {
        // Holes are filled with null while the object is dense enough
        let stored = normalize(v(json!(["a", null, "c"])), &Path::root()).unwrap().unwrap();
        assert_eq!(denormalize(stored), v(json!(["a", null, "c"])));

        let sparse = v(json!({"0": "a", "9": "b"}));
        assert_eq!(denormalize(sparse.clone()), sparse);

        let padded = v(json!({"01": "a"}));
        assert_eq!(denormalize(padded.clone()), padded);
    }

    #[test]
    fn test_set_and_get() {
        let mut root = None;
        set_at(&mut root, &segs("users/alice/name"), Some("Alice".into()));
        set_at(&mut root, &segs("users/bob/name"), Some("Bob".into()));

        assert_eq!(get(root.as_ref(), &segs("users/alice/name")), Some(&Value::from("Alice")));
        assert_eq!(
            get(root.as_ref(), &segs("users")).cloned(),
            Some(v(json!({"alice": {"name": "Alice"}, "bob": {"name": "Bob"}})))
        );
        assert_eq!(get(root.as_ref(), &segs("users/carol")), None);
        assert_eq!(get(root.as_ref(), &segs("users/alice/name/first")), None);
    }

    #[test]
    fn test_write_below_leaf_replaces_it() {
        let mut root = None;
        set_at(&mut root, &segs("a"), Some(1.into()));
        set_at(&mut root, &segs("a/b"), Some(2.into()));

        assert_eq!(root, Some(v(json!({"a": {"b": 2}}))));
    }

    #[test]
    fn test_remove_prunes_empty_parents() {
        let mut root = None;
        set_at(&mut root, &segs("a/b/c"), Some(1.into()));
        set_at(&mut root, &segs("a/x"), Some(2.into()));

        set_at(&mut root, &segs("a/b/c"), None);
        assert_eq!(root, Some(v(json!({"a": {"x": 2}}))));

        set_at(&mut root, &segs("a/x"), None);
        assert_eq!(root, None);

        // removing something absent is a no-op
        set_at(&mut root, &segs("nothing/here"), None);
        assert_eq!(root, None);
    }

    #[test]
    fn test_prepare_update() {
        let at = segs_path("users/bob");
        let writes = prepare_update(&at, v(json!({"name": "Bob", "profile/age": 31, "gone": null}))).unwrap();
        assert_eq!(writes.len(), 3);
        assert!(writes.contains(&(segs_path("users/bob/profile/age"), Some(31.into()))));
        assert!(writes.contains(&(segs_path("users/bob/gone"), None)));

        assert!(matches!(prepare_update(&at, "x".into()), Err(StoreError::InvalidData(_))));
        assert!(matches!(
            prepare_update(&at, v(json!({"a": 1, "a/b": 2}))),
            Err(StoreError::InvalidData(_))
        ));
        assert!(matches!(
            prepare_update(&at, v(json!({"a$": 1}))),
            Err(StoreError::PathError(_))
        ));
    }

    fn segs_path(path: &str) -> Path {
        path.parse().unwrap()
    }

    /// `depth` objects wrapped around a single leaf
    fn nested(depth: usize) -> Value {
        let mut value = Value::from(1);
        for _ in 0..depth {
            value = Value::Object(BTreeMap::from([("k".to_string(), value)]));
        }
        value
    }

    #[test]
    fn test_normalize_limits_depth() {
        assert!(normalize(nested(MAX_DEPTH), &Path::root()).unwrap().is_some());
        assert!(matches!(
            normalize(nested(MAX_DEPTH + 1), &Path::root()),
            Err(StoreError::PathError(PathError::TooDeep(_)))
        ));

        // the location written to counts towards the limit
        let at = segs_path("a/b");
        assert!(normalize(nested(MAX_DEPTH - 2), &at).is_ok());
        assert!(matches!(
            normalize(nested(MAX_DEPTH - 1), &at),
            Err(StoreError::PathError(PathError::TooDeep(_)))
        ));

        // nothing is stored that deep, so nothing is rejected
        let empty = Value::Object(BTreeMap::from([("k".to_string(), Value::Null)]));
        assert_eq!(normalize(empty, &segs_path(&vec!["a"; MAX_DEPTH].join("/"))).unwrap(), None);

        let deep_update = Value::Object(BTreeMap::from([("x".to_string(), nested(MAX_DEPTH - 1))]));
        assert!(matches!(
            prepare_update(&segs_path("a"), deep_update),
            Err(StoreError::PathError(PathError::TooDeep(_)))
        ));
    }

    #[test]
    fn test_flatten() {
        let mut leaves = Vec::new();
        let value = v(json!({"name": "John", "address": {"city": "Rome"}}));
        flatten(&segs_path("users/john"), &value, &mut leaves).unwrap();

        leaves.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            leaves,
            vec![
                (segs_path("users/john/address/city"), Value::from("Rome")),
                (segs_path("users/john/name"), Value::from("John")),
            ]
        );
    }
}
