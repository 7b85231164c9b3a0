//! Stable intra-partition ordering.
//!
//! Sorting operates on row indices, never on the rows themselves. The sort
//! is stable: rows that compare equal on every sort key keep their input
//! order, which makes evaluation deterministic for identical input.
//!
//! Null placement is independent of direction. The SQL default is NULLS
//! LAST; a key may override it either way.

use std::cmp::Ordering;

use oriel_core::{compare_values, Value};

use crate::error::{WindowError, WindowResult};
use crate::spec::SortKey;

use super::row::{Row, Schema};

/// A sort key with its column resolved to an index and null placement made
/// explicit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedSortKey {
    pub index: usize,
    pub ascending: bool,
    pub nulls_first: bool,
}

/// Resolves sort keys against a schema.
pub(crate) fn resolve_sort_keys(
    schema: &Schema,
    keys: &[SortKey],
) -> WindowResult<Vec<ResolvedSortKey>> {
    keys.iter()
        .map(|key| {
            let index = schema
                .index_of(&key.column)
                .ok_or_else(|| WindowError::UnknownColumn { name: key.column.clone() })?;
            Ok(ResolvedSortKey {
                index,
                ascending: key.ascending,
                // SQL default: NULLS LAST.
                nulls_first: key.nulls_first.unwrap_or(false),
            })
        })
        .collect()
}

/// Compares two key values in the sort order defined by `key`.
///
/// Nulls are placed per the key's null placement regardless of direction;
/// direction reverses only the non-null comparison.
pub(crate) fn compare_key_values(a: &Value, b: &Value, key: &ResolvedSortKey) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if key.nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if key.nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let ord = compare_values(a, b, false);
            if key.ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

/// Compares two rows on all sort keys, in key order.
pub(crate) fn compare_rows(a: &Row, b: &Row, keys: &[ResolvedSortKey]) -> Ordering {
    for key in keys {
        let va = a.get(key.index).unwrap_or(&Value::Null);
        let vb = b.get(key.index).unwrap_or(&Value::Null);
        let ord = compare_key_values(va, vb, key);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Returns true when two rows are peers: equal on every sort key.
///
/// With no sort keys every row is a peer of every other.
pub(crate) fn peers_equal(a: &Row, b: &Row, keys: &[ResolvedSortKey]) -> bool {
    compare_rows(a, b, keys) == Ordering::Equal
}

/// Stably sorts `indices` (positions into `rows`) by the sort keys.
pub(crate) fn sort_partition(rows: &[Row], indices: &mut [usize], keys: &[ResolvedSortKey]) {
    if keys.is_empty() {
        return;
    }
    indices.sort_by(|&a, &b| compare_rows(&rows[a], &rows[b], keys));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn make_rows(values: &[Value]) -> Vec<Row> {
        let schema = Arc::new(Schema::new(vec!["k".to_string()]));
        values.iter().map(|v| Row::new(Arc::clone(&schema), vec![v.clone()])).collect()
    }

    fn sorted_order(rows: &[Row], key: SortKey) -> Vec<usize> {
        let keys = resolve_sort_keys(rows[0].schema(), &[key]).unwrap();
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        sort_partition(rows, &mut indices, &keys);
        indices
    }

    #[test]
    fn ascending_nulls_last_by_default() {
        let rows =
            make_rows(&[Value::Int(3), Value::Null, Value::Int(1), Value::Int(2)]);
        assert_eq!(sorted_order(&rows, SortKey::asc("k")), vec![2, 3, 0, 1]);
    }

    #[test]
    fn descending_keeps_null_placement() {
        let rows =
            make_rows(&[Value::Int(3), Value::Null, Value::Int(1), Value::Int(2)]);
        // Nulls stay last even though direction is reversed.
        assert_eq!(sorted_order(&rows, SortKey::desc("k")), vec![0, 3, 2, 1]);
        assert_eq!(sorted_order(&rows, SortKey::desc("k").nulls_first()), vec![1, 0, 3, 2]);
    }

    #[test]
    fn stable_on_ties() {
        let rows = make_rows(&[Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(1)]);
        // Tied rows keep input order.
        assert_eq!(sorted_order(&rows, SortKey::asc("k")), vec![0, 2, 3, 1]);
    }

    #[test]
    fn mixed_numeric_comparison() {
        let rows = make_rows(&[Value::Float(1.5), Value::Int(2), Value::Int(1)]);
        assert_eq!(sorted_order(&rows, SortKey::asc("k")), vec![2, 0, 1]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let rows = make_rows(&[Value::Int(1)]);
        let err = resolve_sort_keys(rows[0].schema(), &[SortKey::asc("missing")]).unwrap_err();
        assert!(matches!(err, WindowError::UnknownColumn { name } if name == "missing"));
    }

    #[test]
    fn peers_compare_on_all_keys() {
        let schema = Arc::new(Schema::new(vec!["a".to_string(), "b".to_string()]));
        let r1 = Row::new(Arc::clone(&schema), vec![Value::Int(1), Value::Int(10)]);
        let r2 = Row::new(Arc::clone(&schema), vec![Value::Int(1), Value::Int(20)]);
        let keys = resolve_sort_keys(&schema, &[SortKey::asc("a"), SortKey::asc("b")]).unwrap();

        assert!(peers_equal(&r1, &r1, &keys));
        assert!(!peers_equal(&r1, &r2, &keys));
        assert!(peers_equal(&r1, &r2, &keys[..1]));
    }
}
