//! The window evaluation engine.
//!
//! Evaluation is batch-oriented: the caller hands a slice of materialized
//! rows plus a list of window expressions to [`evaluate`], and receives one
//! output column per expression. Data flows through a fixed pipeline per
//! expression: partitioner, sorter, frame cursor, function evaluation.
//! Only the sorter reorders rows; everything downstream is a single
//! left-to-right pass per partition.
//!
//! # Modules
//!
//! - `context` - evaluation context (cancellation, budget, stats)
//! - `row` - row and schema types
//! - `partition` - null-safe partition grouping
//! - `sort` - stable intra-partition ordering
//! - `frame` - monotonic two-pointer frame materialization
//! - `functions` - window function kinds and their per-partition evaluation
//! - `evaluator` - the batch entry point

mod context;
mod evaluator;
mod frame;
mod functions;
mod partition;
mod row;
mod sort;

#[cfg(test)]
mod proptest_tests;

// Re-exports
pub use context::{CancellationToken, EvalConfig, EvalContext, EvalStats};
pub use evaluator::{evaluate, Evaluation, WindowExpr};
pub use functions::{AggregateFunc, WindowFunc};
pub use row::{Row, Schema};
