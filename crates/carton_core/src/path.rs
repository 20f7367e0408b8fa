//! Dotted-path traversal over nested field maps.
//!
//! A path like `"a.b.c"` addresses a value nested inside [`Value::Map`]
//! layers. Read paths fail softly as soon as a segment is absent or an
//! intermediate is not a map; upserts instead replace such intermediates
//! with fresh empty maps and keep going.

use carton_codec::Value;
use std::collections::BTreeMap;

/// The field map a document owns.
pub(crate) type FieldMap = BTreeMap<String, Value>;

fn empty_map() -> Value {
    Value::Map(BTreeMap::new())
}

/// Resolves a dotted path to a value, read-only.
pub(crate) fn lookup<'a>(fields: &'a FieldMap, path: &str) -> Option<&'a Value> {
    let mut current = fields;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = match value {
            Value::Map(m) => m,
            _ => return None,
        };
    }
    None
}

/// Writes a value at a dotted path, creating intermediate maps as needed.
/// Missing or non-map intermediates are replaced with fresh empty maps.
pub(crate) fn upsert(fields: &mut FieldMap, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, intermediates) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = fields;
    for segment in intermediates {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(empty_map);
        if !matches!(slot, Value::Map(_)) {
            *slot = empty_map();
        }
        current = match slot {
            Value::Map(m) => m,
            _ => unreachable!("slot was just made a map"),
        };
    }
    current.insert((*last).to_string(), value);
}

/// Replaces the value at a dotted path. Returns false without touching
/// the map when any part of the path, the final key included, is absent.
pub(crate) fn update(fields: &mut FieldMap, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, intermediates) = match segments.split_last() {
        Some(split) => split,
        None => return false,
    };

    let mut current = fields;
    for segment in intermediates {
        current = match current.get_mut(*segment) {
            Some(Value::Map(m)) => m,
            _ => return false,
        };
    }
    if !current.contains_key(*last) {
        return false;
    }
    current.insert((*last).to_string(), value);
    true
}

/// Collects the dotted key paths of a field map, lexicographically sorted.
///
/// With `include_subfields`, nested maps expand into their own dotted
/// paths instead of appearing as a single key; an empty nested map
/// therefore contributes nothing.
pub(crate) fn keys(fields: &FieldMap, include_subfields: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(fields.len());
    collect_keys(fields, include_subfields, None, &mut out);
    out.sort();
    out
}

fn collect_keys(
    fields: &FieldMap,
    include_subfields: bool,
    prefix: Option<&str>,
    out: &mut Vec<String>,
) {
    for (key, value) in fields {
        let dotted = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        if include_subfields {
            if let Value::Map(sub) = value {
                collect_keys(sub, include_subfields, Some(&dotted), out);
                continue;
            }
        }
        out.push(dotted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> FieldMap {
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), Value::Int(1));
        inner.insert("y".to_string(), Value::Int(2));

        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::Map(inner));
        fields.insert("b".to_string(), Value::Int(3));
        fields
    }

    #[test]
    fn lookup_top_level_and_nested() {
        let fields = fixture();
        assert_eq!(lookup(&fields, "b"), Some(&Value::Int(3)));
        assert_eq!(lookup(&fields, "a.x"), Some(&Value::Int(1)));
        assert!(matches!(lookup(&fields, "a"), Some(Value::Map(_))));
    }

    #[test]
    fn lookup_fails_softly() {
        let fields = fixture();
        assert_eq!(lookup(&fields, "missing"), None);
        assert_eq!(lookup(&fields, "a.z"), None);
        // b is not a map, so it cannot be traversed through
        assert_eq!(lookup(&fields, "b.x"), None);
        assert_eq!(lookup(&fields, "a.x.deep"), None);
    }

    #[test]
    fn upsert_creates_intermediate_maps() {
        let mut fields = FieldMap::new();
        upsert(&mut fields, "a.b.c", Value::Int(1));

        assert_eq!(lookup(&fields, "a.b.c"), Some(&Value::Int(1)));
        assert!(matches!(lookup(&fields, "a.b"), Some(Value::Map(_))));
    }

    #[test]
    fn upsert_replaces_non_map_intermediates() {
        let mut fields = fixture();
        upsert(&mut fields, "b.c", Value::Int(9));
        assert_eq!(lookup(&fields, "b.c"), Some(&Value::Int(9)));
    }

    #[test]
    fn upsert_overwrites_existing_value() {
        let mut fields = fixture();
        upsert(&mut fields, "a.x", Value::Int(10));
        assert_eq!(lookup(&fields, "a.x"), Some(&Value::Int(10)));
        // sibling untouched
        assert_eq!(lookup(&fields, "a.y"), Some(&Value::Int(2)));
    }

    #[test]
    fn update_requires_existing_path() {
        let mut fields = fixture();
        assert!(update(&mut fields, "a.x", Value::Int(5)));
        assert_eq!(lookup(&fields, "a.x"), Some(&Value::Int(5)));

        assert!(!update(&mut fields, "a.z", Value::Int(5)));
        assert!(!update(&mut fields, "c.d", Value::Int(5)));
        assert_eq!(fields, {
            let mut expected = fixture();
            update(&mut expected, "a.x", Value::Int(5));
            expected
        });
    }

    #[test]
    fn keys_without_subfields() {
        assert_eq!(keys(&fixture(), false), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn keys_with_subfields_are_sorted_dotted_paths() {
        assert_eq!(
            keys(&fixture(), true),
            vec!["a.x".to_string(), "a.y".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn keys_sorting_crosses_expansion_boundaries() {
        let mut fields = fixture();
        fields.insert("a-side".to_string(), Value::Int(0));
        assert_eq!(
            keys(&fields, true),
            vec![
                "a-side".to_string(),
                "a.x".to_string(),
                "a.y".to_string(),
                "b".to_string()
            ]
        );
    }

    #[test]
    fn empty_nested_map_contributes_no_paths() {
        let mut fields = fixture();
        fields.insert("empty".to_string(), Value::Map(BTreeMap::new()));
        assert_eq!(
            keys(&fields, true),
            vec!["a.x".to_string(), "a.y".to_string(), "b".to_string()]
        );
        // without expansion the key itself is listed
        assert_eq!(
            keys(&fields, false),
            vec!["a".to_string(), "b".to_string(), "empty".to_string()]
        );
    }
}
