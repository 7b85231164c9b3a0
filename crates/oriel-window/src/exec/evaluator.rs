//! Batch window evaluation.
//!
//! [`evaluate`] is the crate entry point: it takes a materialized batch of
//! rows plus a list of window expressions and produces one output column
//! per expression, aligned with the input row order. Each expression is
//! partitioned, sorted, and evaluated independently; with parallelism
//! enabled, distinct partitions run concurrently under an advisory row
//! budget that gates new partition starts.
//!
//! Cancellation is a normal outcome, not an error: a cancelled batch
//! returns [`Evaluation::Cancelled`] with no partial output.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use oriel_core::Value;

use crate::error::{WindowError, WindowResult};
use crate::spec::{FrameSpec, WindowSpec};

use super::context::{CancellationToken, EvalContext, MemoryBudget};
use super::frame::FrameCursor;
use super::functions::{resolve_func, ResolvedFunc, WindowFunc};
use super::partition::{partition_rows, Partition};
use super::row::{Row, Schema};
use super::sort::{resolve_sort_keys, sort_partition, ResolvedSortKey};

/// A window function bound to a window specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowExpr {
    /// The function to evaluate.
    pub func: WindowFunc,
    /// Partitioning, ordering, and frame.
    pub spec: WindowSpec,
}

impl WindowExpr {
    /// Binds `func` to `spec`.
    #[must_use]
    pub fn new(func: WindowFunc, spec: WindowSpec) -> Self {
        Self { func, spec }
    }
}

/// The outcome of a batch evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// One output column per expression, aligned with the input rows.
    Complete(Vec<Vec<Value>>),
    /// Cancellation was observed; no output was produced.
    Cancelled,
}

impl Evaluation {
    /// Returns the output columns, or `None` if the batch was cancelled.
    #[must_use]
    pub fn into_columns(self) -> Option<Vec<Vec<Value>>> {
        match self {
            Self::Complete(columns) => Some(columns),
            Self::Cancelled => None,
        }
    }
}

/// An expression with every name resolved and its partitions built.
struct ResolvedExpr {
    func: ResolvedFunc,
    name: String,
    frame: FrameSpec,
    keys: Vec<ResolvedSortKey>,
    partitions: Vec<Partition>,
}

/// Evaluates `exprs` over `rows`.
///
/// Returns one column of values per expression, in input-row order.
/// Expressions are independent; each may partition and order the batch
/// differently.
///
/// # Errors
///
/// Fails with `UnknownColumn` for unresolved names, `InvalidFrame` or
/// `InvalidArgument` for malformed expressions, `ResourceExhausted` when a
/// partition exceeds the configured row budget, and `ArithmeticOverflow`
/// when an integer aggregate leaves the 64-bit range. Any error fails the
/// whole batch; no partial output is returned.
pub fn evaluate(
    rows: &[Row],
    exprs: &[WindowExpr],
    ctx: &EvalContext,
) -> WindowResult<Evaluation> {
    ctx.record_rows_in(rows.len() as u64);
    debug!(rows = rows.len(), exprs = exprs.len(), "evaluating window batch");

    if exprs.is_empty() {
        return Ok(Evaluation::Complete(Vec::new()));
    }
    if rows.is_empty() {
        return Ok(Evaluation::Complete(vec![Vec::new(); exprs.len()]));
    }

    let schema = rows[0].schema();
    let max_rows = ctx.config().max_rows_in_memory;

    let mut resolved = Vec::with_capacity(exprs.len());
    for expr in exprs {
        resolved.push(resolve_expr(expr, schema, rows, max_rows)?);
    }
    for expr in &resolved {
        ctx.record_partitions(expr.partitions.len() as u64);
    }

    let total_partitions: usize = resolved.iter().map(|e| e.partitions.len()).sum();
    let parallel = ctx.config().parallel && total_partitions > 1;
    let outcome = if parallel {
        evaluate_parallel(rows, &resolved, ctx)?
    } else {
        evaluate_sequential(rows, &resolved, ctx)?
    };

    match outcome {
        Some(columns) => {
            ctx.record_values_out((rows.len() * exprs.len()) as u64);
            debug!(
                partitions = total_partitions,
                elapsed_ms = ctx.stats().elapsed().as_millis() as u64,
                "window batch complete"
            );
            Ok(Evaluation::Complete(columns))
        }
        None => {
            warn!("window batch cancelled");
            Ok(Evaluation::Cancelled)
        }
    }
}

fn resolve_expr(
    expr: &WindowExpr,
    schema: &Schema,
    rows: &[Row],
    max_rows: usize,
) -> WindowResult<ResolvedExpr> {
    let key_columns: Vec<usize> = expr
        .spec
        .partition_keys
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .ok_or_else(|| WindowError::UnknownColumn { name: name.clone() })
        })
        .collect::<WindowResult<_>>()?;
    let keys = resolve_sort_keys(schema, &expr.spec.order_keys)?;
    let func = resolve_func(&expr.func, schema)?;

    if expr.func.requires_order() && keys.is_empty() {
        return Err(WindowError::invalid_argument(
            expr.func.name(),
            "requires an ordered window",
        ));
    }
    // Reject malformed frames up front, even for functions that ignore
    // the frame clause.
    FrameCursor::new(expr.spec.frame, &keys)?;

    let partitions = partition_rows(rows, &key_columns, max_rows)?;
    Ok(ResolvedExpr {
        func,
        name: expr.func.name(),
        frame: expr.spec.frame,
        keys,
        partitions,
    })
}

/// Evaluates one partition of one expression.
///
/// Output pairs are (input row index, value); `Ok(None)` means
/// cancellation was observed mid-partition.
fn run_partition(
    rows: &[Row],
    expr: &ResolvedExpr,
    partition: &Partition,
    cancel: &CancellationToken,
) -> WindowResult<Option<Vec<(usize, Value)>>> {
    let mut sorted = partition.rows.clone();
    sort_partition(rows, &mut sorted, &expr.keys);

    let values = super::functions::eval_partition(
        &expr.func,
        &expr.name,
        expr.frame,
        rows,
        &sorted,
        &expr.keys,
        &partition.key_display(),
        cancel,
    )?;
    Ok(values.map(|vals| sorted.into_iter().zip(vals).collect()))
}

fn evaluate_sequential(
    rows: &[Row],
    resolved: &[ResolvedExpr],
    ctx: &EvalContext,
) -> WindowResult<Option<Vec<Vec<Value>>>> {
    let cancel = ctx.cancellation_token();
    let mut columns = vec![vec![Value::Null; rows.len()]; resolved.len()];

    for (expr_idx, expr) in resolved.iter().enumerate() {
        for partition in &expr.partitions {
            let Some(pairs) = run_partition(rows, expr, partition, &cancel)? else {
                return Ok(None);
            };
            for (row_idx, value) in pairs {
                columns[expr_idx][row_idx] = value;
            }
        }
    }
    Ok(Some(columns))
}

fn evaluate_parallel(
    rows: &[Row],
    resolved: &[ResolvedExpr],
    ctx: &EvalContext,
) -> WindowResult<Option<Vec<Vec<Value>>>> {
    let cancel = ctx.cancellation_token();
    let budget = MemoryBudget::new(ctx.config().max_rows_in_memory);
    let results: Mutex<Vec<(usize, Vec<(usize, Value)>)>> = Mutex::new(Vec::new());
    let failure: Mutex<Option<WindowError>> = Mutex::new(None);

    rayon::scope(|scope| {
        for (expr_idx, expr) in resolved.iter().enumerate() {
            for partition in &expr.partitions {
                let cancel = &cancel;
                let budget = &budget;
                let results = &results;
                let failure = &failure;
                scope.spawn(move |_| {
                    if cancel.is_cancelled() || lock(failure).is_some() {
                        return;
                    }
                    // The partitioner already rejected partitions larger
                    // than the whole budget, so admission terminates.
                    budget.acquire(partition.len());
                    let outcome = run_partition(rows, expr, partition, cancel);
                    budget.release(partition.len());

                    match outcome {
                        Ok(Some(pairs)) => lock(results).push((expr_idx, pairs)),
                        Ok(None) => {}
                        Err(err) => {
                            let mut failure = lock(failure);
                            if failure.is_none() {
                                *failure = Some(err);
                            }
                        }
                    }
                });
            }
        }
    });

    if let Some(err) = lock(&failure).take() {
        return Err(err);
    }
    if cancel.is_cancelled() {
        return Ok(None);
    }

    let mut columns = vec![vec![Value::Null; rows.len()]; resolved.len()];
    for (expr_idx, pairs) in lock(&results).drain(..) {
        for (row_idx, value) in pairs {
            columns[expr_idx][row_idx] = value;
        }
    }
    Ok(Some(columns))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
