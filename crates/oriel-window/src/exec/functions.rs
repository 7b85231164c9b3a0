//! Window function kinds and their per-partition evaluation.
//!
//! All functions evaluate a sorted partition in a single left-to-right
//! pass. Frame aggregates keep incremental state (running sums, a count,
//! or a monotonic deque for min/max) so a sliding frame costs O(1)
//! amortized per row instead of a rescan. Ranking and offset functions
//! address positions and peer groups directly and ignore the frame.
//!
//! Evaluation returns `Ok(None)` when cancellation is observed; a
//! cancelled partition emits nothing.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use oriel_core::{compare_values, Value};

use crate::error::{WindowError, WindowResult};
use crate::spec::FrameSpec;

use super::context::CancellationToken;
use super::frame::FrameCursor;
use super::row::{Row, Schema};
use super::sort::{peers_equal, ResolvedSortKey};

/// Aggregate functions usable over a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunc {
    /// Count of non-null values in the frame.
    Count,
    /// Sum of values in the frame; integer inputs stay integer.
    Sum,
    /// Arithmetic mean of values in the frame, always a float.
    Avg,
    /// Smallest value in the frame.
    Min,
    /// Largest value in the frame.
    Max,
}

impl std::fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        };
        write!(f, "{name}")
    }
}

/// A window function.
///
/// Ranking and offset functions address partition positions and peer
/// groups; only [`WindowFunc::Aggregate`] respects the frame clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowFunc {
    /// Sequential position within the partition, starting at 1.
    RowNumber,
    /// Rank with gaps: peers share a rank, the next group jumps.
    Rank,
    /// Rank without gaps: peer groups are numbered consecutively.
    DenseRank,
    /// `(rank - 1) / (partition size - 1)`; 0 for a single-row partition.
    PercentRank,
    /// Fraction of rows at or before the current row's peer group.
    CumeDist,
    /// Splits the partition into `n` buckets as evenly as possible and
    /// returns the 1-based bucket number.
    Ntile(i64),
    /// Value of `column` from the row `offset` positions earlier, or
    /// `default` when that row falls outside the partition. A negative
    /// offset looks forward.
    Lag {
        /// The column to read.
        column: String,
        /// How many rows back to look.
        offset: i64,
        /// Emitted when the offset row does not exist.
        default: Value,
    },
    /// Value of `column` from the row `offset` positions later, or
    /// `default` when that row falls outside the partition.
    Lead {
        /// The column to read.
        column: String,
        /// How many rows ahead to look.
        offset: i64,
        /// Emitted when the offset row does not exist.
        default: Value,
    },
    /// Value of `column` in the first row of the partition.
    FirstValue {
        /// The column to read.
        column: String,
    },
    /// Value of `column` in the last row of the partition.
    LastValue {
        /// The column to read.
        column: String,
    },
    /// Value of `column` in the `n`-th row of the partition (1-based);
    /// null when the partition has fewer than `n` rows.
    NthValue {
        /// The column to read.
        column: String,
        /// 1-based position.
        n: i64,
    },
    /// An aggregate evaluated over each row's frame.
    Aggregate {
        /// The aggregate to apply.
        func: AggregateFunc,
        /// The column to aggregate.
        column: String,
    },
}

impl WindowFunc {
    /// The SQL-style function name, used in errors and logging.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::RowNumber => "row_number".to_string(),
            Self::Rank => "rank".to_string(),
            Self::DenseRank => "dense_rank".to_string(),
            Self::PercentRank => "percent_rank".to_string(),
            Self::CumeDist => "cume_dist".to_string(),
            Self::Ntile(_) => "ntile".to_string(),
            Self::Lag { .. } => "lag".to_string(),
            Self::Lead { .. } => "lead".to_string(),
            Self::FirstValue { .. } => "first_value".to_string(),
            Self::LastValue { .. } => "last_value".to_string(),
            Self::NthValue { .. } => "nth_value".to_string(),
            Self::Aggregate { func, .. } => func.to_string(),
        }
    }

    /// Whether the function needs an ordered window to be meaningful.
    #[must_use]
    pub fn requires_order(&self) -> bool {
        matches!(
            self,
            Self::Rank
                | Self::DenseRank
                | Self::PercentRank
                | Self::CumeDist
                | Self::Ntile(_)
                | Self::Lag { .. }
                | Self::Lead { .. }
        )
    }
}

impl std::fmt::Display for WindowFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ntile(n) => write!(f, "ntile({n})"),
            Self::Lag { column, offset, .. } => write!(f, "lag({column}, {offset})"),
            Self::Lead { column, offset, .. } => write!(f, "lead({column}, {offset})"),
            Self::FirstValue { column } => write!(f, "first_value({column})"),
            Self::LastValue { column } => write!(f, "last_value({column})"),
            Self::NthValue { column, n } => write!(f, "nth_value({column}, {n})"),
            Self::Aggregate { func, column } => write!(f, "{func}({column})"),
            other => write!(f, "{}()", other.name()),
        }
    }
}

/// A function with its argument column resolved and arguments validated.
#[derive(Debug, Clone)]
pub(crate) enum ResolvedFunc {
    RowNumber,
    Rank,
    DenseRank,
    PercentRank,
    CumeDist,
    Ntile(u64),
    /// Shared shape for lag and lead; `offset` is already signed so that
    /// positive means backward.
    Shift { column: usize, offset: i64, default: Value },
    NthValue { column: usize, n: u64 },
    Aggregate { func: AggregateFunc, column: usize },
}

/// Resolves a function's column references against the schema and checks
/// its arguments.
pub(crate) fn resolve_func(func: &WindowFunc, schema: &Schema) -> WindowResult<ResolvedFunc> {
    let col = |name: &str| -> WindowResult<usize> {
        schema
            .index_of(name)
            .ok_or_else(|| WindowError::UnknownColumn { name: name.to_string() })
    };
    match func {
        WindowFunc::RowNumber => Ok(ResolvedFunc::RowNumber),
        WindowFunc::Rank => Ok(ResolvedFunc::Rank),
        WindowFunc::DenseRank => Ok(ResolvedFunc::DenseRank),
        WindowFunc::PercentRank => Ok(ResolvedFunc::PercentRank),
        WindowFunc::CumeDist => Ok(ResolvedFunc::CumeDist),
        WindowFunc::Ntile(n) => {
            if *n < 1 {
                return Err(WindowError::invalid_argument(
                    "ntile",
                    format!("bucket count must be positive, got {n}"),
                ));
            }
            Ok(ResolvedFunc::Ntile(*n as u64))
        }
        WindowFunc::Lag { column, offset, default } => Ok(ResolvedFunc::Shift {
            column: col(column)?,
            offset: *offset,
            default: default.clone(),
        }),
        WindowFunc::Lead { column, offset, default } => Ok(ResolvedFunc::Shift {
            column: col(column)?,
            // lead(n) is lag(-n).
            offset: offset.checked_neg().unwrap_or(i64::MAX),
            default: default.clone(),
        }),
        WindowFunc::FirstValue { column } => {
            Ok(ResolvedFunc::NthValue { column: col(column)?, n: 1 })
        }
        WindowFunc::LastValue { column } => {
            // Resolved per partition; 0 marks "last".
            Ok(ResolvedFunc::NthValue { column: col(column)?, n: 0 })
        }
        WindowFunc::NthValue { column, n } => {
            if *n < 1 {
                return Err(WindowError::invalid_argument(
                    "nth_value",
                    format!("position must be positive, got {n}"),
                ));
            }
            Ok(ResolvedFunc::NthValue { column: col(column)?, n: *n as u64 })
        }
        WindowFunc::Aggregate { func, column } => {
            Ok(ResolvedFunc::Aggregate { func: *func, column: col(column)? })
        }
    }
}

/// Evaluates one function over one sorted partition.
///
/// `sorted` holds input-batch row indices in window order. The output has
/// one value per partition row, in the same sorted order. Returns
/// `Ok(None)` if cancellation was observed mid-partition.
pub(crate) fn eval_partition(
    func: &ResolvedFunc,
    func_name: &str,
    frame: FrameSpec,
    rows: &[Row],
    sorted: &[usize],
    keys: &[ResolvedSortKey],
    partition_name: &str,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    match func {
        ResolvedFunc::RowNumber => {
            eval_positional(sorted, cancel, |pos| Value::Int(pos as i64 + 1))
        }
        ResolvedFunc::Rank => eval_ranks(rows, sorted, keys, cancel, |rank, _| {
            Value::Int(rank as i64)
        }),
        ResolvedFunc::DenseRank => eval_ranks(rows, sorted, keys, cancel, |_, dense| {
            Value::Int(dense as i64)
        }),
        ResolvedFunc::PercentRank => {
            let n = sorted.len();
            eval_ranks(rows, sorted, keys, cancel, move |rank, _| {
                if n <= 1 {
                    Value::Float(0.0)
                } else {
                    Value::Float((rank - 1) as f64 / (n - 1) as f64)
                }
            })
        }
        ResolvedFunc::CumeDist => eval_cume_dist(rows, sorted, keys, cancel),
        ResolvedFunc::Ntile(buckets) => eval_ntile(sorted, *buckets, cancel),
        ResolvedFunc::Shift { column, offset, default } => {
            eval_shift(rows, sorted, *column, *offset, default, cancel)
        }
        ResolvedFunc::NthValue { .. } => eval_nth(rows, sorted, func, cancel),
        ResolvedFunc::Aggregate { func: agg, column } => eval_aggregate(
            *agg,
            *column,
            func_name,
            frame,
            rows,
            sorted,
            keys,
            partition_name,
            cancel,
        ),
    }
}

fn eval_positional(
    sorted: &[usize],
    cancel: &CancellationToken,
    f: impl Fn(usize) -> Value,
) -> WindowResult<Option<Vec<Value>>> {
    let mut out = Vec::with_capacity(sorted.len());
    for pos in 0..sorted.len() {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        out.push(f(pos));
    }
    Ok(Some(out))
}

/// Drives rank and dense_rank: calls `f(rank, dense_rank)` per row, where
/// peers share both numbers.
fn eval_ranks(
    rows: &[Row],
    sorted: &[usize],
    keys: &[ResolvedSortKey],
    cancel: &CancellationToken,
    f: impl Fn(usize, usize) -> Value,
) -> WindowResult<Option<Vec<Value>>> {
    let mut out = Vec::with_capacity(sorted.len());
    let mut rank = 1usize;
    let mut dense = 1usize;
    for pos in 0..sorted.len() {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        if pos > 0 && !peers_equal(&rows[sorted[pos]], &rows[sorted[pos - 1]], keys) {
            rank = pos + 1;
            dense += 1;
        }
        out.push(f(rank, dense));
    }
    Ok(Some(out))
}

fn eval_cume_dist(
    rows: &[Row],
    sorted: &[usize],
    keys: &[ResolvedSortKey],
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    let n = sorted.len();
    let mut out = Vec::with_capacity(n);
    let mut peer_hi = 0usize;
    for pos in 0..n {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        if pos >= peer_hi {
            peer_hi = pos + 1;
            while peer_hi < n && peers_equal(&rows[sorted[peer_hi]], &rows[sorted[pos]], keys) {
                peer_hi += 1;
            }
        }
        out.push(Value::Float(peer_hi as f64 / n as f64));
    }
    Ok(Some(out))
}

fn eval_ntile(
    sorted: &[usize],
    buckets: u64,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    let n = sorted.len() as u64;
    let base = if buckets == 0 { 0 } else { n / buckets };
    let remainder = if buckets == 0 { 0 } else { n % buckets };
    // The first `remainder` buckets hold one extra row.
    let big = remainder * (base + 1);

    let mut out = Vec::with_capacity(sorted.len());
    for pos in 0..n {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let bucket = if pos < big {
            pos / (base + 1)
        } else if base > 0 {
            remainder + (pos - big) / base
        } else {
            pos
        };
        out.push(Value::Int(bucket as i64 + 1));
    }
    Ok(Some(out))
}

fn eval_shift(
    rows: &[Row],
    sorted: &[usize],
    column: usize,
    offset: i64,
    default: &Value,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    let n = sorted.len();
    let mut out = Vec::with_capacity(n);
    for pos in 0..n {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let source = (pos as i128) - i128::from(offset);
        let value = if source >= 0 && source < n as i128 {
            rows[sorted[source as usize]].get(column).cloned().unwrap_or(Value::Null)
        } else {
            default.clone()
        };
        out.push(value);
    }
    Ok(Some(out))
}

fn eval_nth(
    rows: &[Row],
    sorted: &[usize],
    func: &ResolvedFunc,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    let ResolvedFunc::NthValue { column, n } = func else {
        unreachable!("eval_nth called with a non-nth function");
    };
    let len = sorted.len();
    // n == 0 marks last_value.
    let source = if *n == 0 {
        len.checked_sub(1)
    } else if (*n as usize) <= len {
        Some(*n as usize - 1)
    } else {
        None
    };
    let value = source
        .map_or(Value::Null, |s| rows[sorted[s]].get(*column).cloned().unwrap_or(Value::Null));

    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        out.push(value.clone());
    }
    Ok(Some(out))
}

/// Incremental state for sum, avg, and count.
///
/// Integers accumulate in i128 so the running total cannot overflow; the
/// i64 fit is checked only when a sum is emitted. Any float in the frame
/// makes the emitted sum a float.
#[derive(Debug, Default)]
struct NumericAcc {
    int_sum: i128,
    float_sum: f64,
    ints: usize,
    floats: usize,
}

impl NumericAcc {
    fn count(&self) -> usize {
        self.ints + self.floats
    }

    fn apply(&mut self, value: &Value, sign: i128, func_name: &str) -> WindowResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::Int(i) => {
                self.int_sum += sign * i128::from(*i);
                if sign > 0 {
                    self.ints += 1;
                } else {
                    self.ints -= 1;
                }
                Ok(())
            }
            Value::Float(f) => {
                self.float_sum += sign as f64 * f;
                if sign > 0 {
                    self.floats += 1;
                } else {
                    self.floats -= 1;
                }
                Ok(())
            }
            other => Err(WindowError::invalid_argument(
                func_name,
                format!("expected a numeric column, found {}", other.type_name()),
            )),
        }
    }

    fn sum(&self, func_name: &str, partition_name: &str) -> WindowResult<Value> {
        if self.count() == 0 {
            return Ok(Value::Null);
        }
        if self.floats > 0 {
            return Ok(Value::Float(self.int_sum as f64 + self.float_sum));
        }
        i64::try_from(self.int_sum).map(Value::Int).map_err(|_| {
            WindowError::ArithmeticOverflow {
                function: func_name.to_string(),
                partition: partition_name.to_string(),
            }
        })
    }

    fn avg(&self) -> Value {
        if self.count() == 0 {
            return Value::Null;
        }
        let total = self.int_sum as f64 + self.float_sum;
        Value::Float(total / self.count() as f64)
    }
}

/// A monotonic deque over frame positions for sliding min or max.
///
/// Entries are (sorted position, value); the front is always the current
/// extreme. Frame edges only move forward, so each position enters and
/// leaves the deque at most once.
struct ExtremeAcc {
    deque: VecDeque<(usize, Value)>,
    /// `Less` keeps minima, `Greater` keeps maxima.
    keep: std::cmp::Ordering,
}

impl ExtremeAcc {
    fn new(keep: std::cmp::Ordering) -> Self {
        Self { deque: VecDeque::new(), keep }
    }

    fn push(&mut self, pos: usize, value: &Value) {
        if value.is_null() {
            return;
        }
        while let Some((_, back)) = self.deque.back() {
            let ord = compare_values(value, back, false);
            if ord == self.keep || ord == std::cmp::Ordering::Equal {
                self.deque.pop_back();
            } else {
                break;
            }
        }
        self.deque.push_back((pos, value.clone()));
    }

    fn evict_before(&mut self, lo: usize) {
        while self.deque.front().is_some_and(|(p, _)| *p < lo) {
            self.deque.pop_front();
        }
    }

    fn current(&self) -> Value {
        self.deque.front().map_or(Value::Null, |(_, v)| v.clone())
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_aggregate(
    agg: AggregateFunc,
    column: usize,
    func_name: &str,
    frame: FrameSpec,
    rows: &[Row],
    sorted: &[usize],
    keys: &[ResolvedSortKey],
    partition_name: &str,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<Value>>> {
    let n = sorted.len();
    let mut cursor = FrameCursor::new(frame, keys)?;
    let mut out = Vec::with_capacity(n);

    let mut numeric = NumericAcc::default();
    let mut extreme = match agg {
        AggregateFunc::Min => Some(ExtremeAcc::new(std::cmp::Ordering::Less)),
        AggregateFunc::Max => Some(ExtremeAcc::new(std::cmp::Ordering::Greater)),
        _ => None,
    };
    let mut cur_lo = 0usize;
    let mut cur_hi = 0usize;

    for pos in 0..n {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let (lo, hi) = cursor.frame_for(rows, sorted, pos)?;

        if let Some(extreme) = extreme.as_mut() {
            for p in cur_hi.max(lo)..hi {
                let v = rows[sorted[p]].get(column).unwrap_or(&Value::Null);
                extreme.push(p, v);
            }
            extreme.evict_before(lo);
            out.push(extreme.current());
        } else {
            for p in cur_hi.max(lo)..hi {
                let v = rows[sorted[p]].get(column).unwrap_or(&Value::Null);
                numeric.apply(v, 1, func_name)?;
            }
            for p in cur_lo..lo.min(cur_hi) {
                let v = rows[sorted[p]].get(column).unwrap_or(&Value::Null);
                numeric.apply(v, -1, func_name)?;
            }
            out.push(match agg {
                AggregateFunc::Count => Value::Int(numeric.count() as i64),
                AggregateFunc::Sum => numeric.sum(func_name, partition_name)?,
                AggregateFunc::Avg => numeric.avg(),
                AggregateFunc::Min | AggregateFunc::Max => unreachable!(),
            });
        }

        cur_lo = lo.max(cur_lo);
        cur_hi = hi.max(cur_hi);
    }
    Ok(Some(out))
}
