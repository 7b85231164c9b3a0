//! Oriel Window
//!
//! A self-contained evaluation core for SQL window functions. The crate
//! consumes materialized rows whose partition keys, ordering keys, and
//! function inputs have already been resolved to named columns, and
//! produces one output column per requested window expression, aligned
//! positionally with the input rows.
//!
//! # Architecture
//!
//! Evaluation is a fixed pipeline per expression:
//!
//! 1. **Partition** - rows are grouped by null-safe partition-key equality
//! 2. **Sort** - each partition is stably ordered by the declared sort keys
//! 3. **Frame** - a monotonic two-pointer cursor materializes the per-row
//!    frame (`ROWS` or `RANGE` mode)
//! 4. **Evaluate** - the window function computes one value per row,
//!    incrementally for aggregates
//!
//! Distinct partitions evaluate in parallel; within a partition evaluation
//! is strictly sequential.
//!
//! # Modules
//!
//! - [`spec`] - immutable window specifications ([`WindowSpec`] builder)
//! - [`exec`] - the evaluation engine and its context
//! - [`error`] - error types for evaluation
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use oriel_window::{
//!     evaluate, EvalContext, Evaluation, Row, Schema, SortKey, Value, WindowExpr,
//!     WindowFunc, WindowSpec,
//! };
//!
//! let schema = Arc::new(Schema::new(vec!["region".into(), "amount".into()]));
//! let rows: Vec<Row> = [("east", 10), ("east", 30), ("west", 20)]
//!     .into_iter()
//!     .map(|(r, a)| Row::new(Arc::clone(&schema), vec![r.into(), i64::from(a).into()]))
//!     .collect();
//!
//! let spec = WindowSpec::new()
//!     .partition_by(["region"])
//!     .order_by([SortKey::asc("amount")]);
//! let expr = WindowExpr::new(WindowFunc::RowNumber, spec);
//!
//! let ctx = EvalContext::new();
//! match evaluate(&rows, &[expr], &ctx).unwrap() {
//!     Evaluation::Complete(columns) => {
//!         assert_eq!(columns[0], vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
//!     }
//!     Evaluation::Cancelled => unreachable!(),
//! }
//! ```

pub mod error;
pub mod exec;
pub mod spec;

// Re-export commonly used items at the crate root
pub use oriel_core::Value;

pub use error::{WindowError, WindowResult};
pub use exec::{
    evaluate, AggregateFunc, CancellationToken, EvalConfig, EvalContext, EvalStats, Evaluation,
    Row, Schema, WindowExpr, WindowFunc,
};
pub use spec::{
    FrameBound, FrameMode, FrameSpec, SortKey, WindowSpec, CURRENT_ROW, UNBOUNDED_FOLLOWING,
    UNBOUNDED_PRECEDING,
};
