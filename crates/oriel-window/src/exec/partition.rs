//! Partition grouping.
//!
//! Groups an input batch by null-safe partition-key equality (the same
//! equality SQL `GROUP BY` uses: nulls match nulls). Input order is
//! preserved within each group, and groups come out in first-appearance
//! order, so evaluation output is reproducible for identical input.

use std::collections::HashMap;

use oriel_core::Value;

use crate::error::{WindowError, WindowResult};

use super::row::Row;

/// One partition: the shared key values and the input-batch indices of its
/// rows, in input order.
#[derive(Debug)]
pub(crate) struct Partition {
    /// The partition-key values shared by every row in this partition.
    pub key: Vec<Value>,
    /// Indices into the input batch.
    pub rows: Vec<usize>,
}

impl Partition {
    /// Number of rows in the partition.
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Display form of the key for error context and logging.
    pub(crate) fn key_display(&self) -> String {
        self.key.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// Groups `rows` into partitions by the values of `key_columns`.
///
/// With no key columns the whole batch is a single partition. When
/// `max_rows` is non-zero, a partition growing beyond it fails with
/// [`WindowError::ResourceExhausted`] naming the partition key.
pub(crate) fn partition_rows(
    rows: &[Row],
    key_columns: &[usize],
    max_rows: usize,
) -> WindowResult<Vec<Partition>> {
    if key_columns.is_empty() {
        let all = Partition { key: Vec::new(), rows: (0..rows.len()).collect() };
        if max_rows > 0 && all.len() > max_rows {
            return Err(exhausted(&all, max_rows));
        }
        return Ok(vec![all]);
    }

    let mut partitions: Vec<Partition> = Vec::new();
    let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut key_buffer: Vec<u8> = Vec::with_capacity(64);

    for (row_idx, row) in rows.iter().enumerate() {
        key_buffer.clear();
        for &col in key_columns {
            encode_value(row.get(col).unwrap_or(&Value::Null), &mut key_buffer);
        }

        let partition_idx = match index.get(&key_buffer) {
            Some(&i) => i,
            None => {
                let key =
                    key_columns.iter().map(|&c| row.get(c).cloned().unwrap_or(Value::Null)).collect();
                partitions.push(Partition { key, rows: Vec::new() });
                index.insert(key_buffer.clone(), partitions.len() - 1);
                partitions.len() - 1
            }
        };

        let partition = &mut partitions[partition_idx];
        partition.rows.push(row_idx);
        if max_rows > 0 && partition.len() > max_rows {
            return Err(exhausted(partition, max_rows));
        }
    }

    Ok(partitions)
}

fn exhausted(partition: &Partition, limit: usize) -> WindowError {
    WindowError::ResourceExhausted {
        partition: partition.key_display(),
        rows: partition.len(),
        limit,
    }
}

/// Encodes a value into a type-tagged, unambiguous byte key.
///
/// Nulls get their own tag, which makes null equal to null for grouping.
fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(0),
        Value::Bool(b) => {
            buf.push(1);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(2);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float(f) => {
            buf.push(3);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::String(s) => {
            buf.push(4);
            buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
    }
}
