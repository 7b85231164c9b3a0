//! Evaluation context for window batches.
//!
//! The context carries everything the evaluator needs beyond the rows
//! themselves: cancellation state, the memory budget, statistics, and
//! runtime configuration. There is no ambient engine handle; callers pass
//! a context explicitly to every batch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

/// Default maximum rows a single partition may materialize (1 million).
pub const DEFAULT_MAX_ROWS_IN_MEMORY: usize = 1_000_000;

/// Configuration options for window evaluation.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum number of rows that may be resident per partition, and the
    /// advisory budget shared by concurrently evaluating partitions.
    ///
    /// A single partition exceeding this limit fails with
    /// `ResourceExhausted`. Set to 0 to disable the limit.
    pub max_rows_in_memory: usize,
    /// Whether distinct partitions may evaluate in parallel.
    pub parallel: bool,
}

impl EvalConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_rows_in_memory: DEFAULT_MAX_ROWS_IN_MEMORY, parallel: true }
    }

    /// Sets the row budget. Set to 0 to disable.
    #[must_use]
    pub const fn with_max_rows_in_memory(mut self, limit: usize) -> Self {
        self.max_rows_in_memory = limit;
        self
    }

    /// Enables or disables partition-level parallelism.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics collected during evaluation.
#[derive(Debug)]
pub struct EvalStats {
    /// When the context was created.
    start_time: Instant,
    /// Number of input rows consumed.
    rows_in: AtomicU64,
    /// Number of partitions evaluated.
    partitions: AtomicU64,
    /// Number of output values produced.
    values_out: AtomicU64,
}

impl EvalStats {
    /// Creates new statistics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rows_in: AtomicU64::new(0),
            partitions: AtomicU64::new(0),
            values_out: AtomicU64::new(0),
        }
    }

    /// Returns the number of input rows consumed.
    #[inline]
    #[must_use]
    pub fn rows_in(&self) -> u64 {
        self.rows_in.load(Ordering::Relaxed)
    }

    /// Returns the number of partitions evaluated.
    #[inline]
    #[must_use]
    pub fn partitions(&self) -> u64 {
        self.partitions.load(Ordering::Relaxed)
    }

    /// Returns the number of output values produced.
    #[inline]
    #[must_use]
    pub fn values_out(&self) -> u64 {
        self.values_out.load(Ordering::Relaxed)
    }

    /// Returns the elapsed time since context creation.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for EvalStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for cancelling an in-flight evaluation.
///
/// Can be shared between threads to allow cancellation from outside the
/// evaluating thread. The evaluator checks the flag at every row boundary
/// and stops cleanly without emitting partial output.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancels the associated evaluation.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if cancellation was requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluation context for one or more window batches.
///
/// The context provides:
/// - Cancellation support
/// - Evaluation statistics
/// - Runtime configuration
#[derive(Debug)]
pub struct EvalContext {
    /// Cancellation handle, shareable with other threads.
    cancel: CancellationToken,
    /// Evaluation statistics.
    stats: EvalStats,
    /// Configuration options.
    config: EvalConfig,
}

impl EvalContext {
    /// Creates a new context with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new(), stats: EvalStats::new(), config: EvalConfig::new() }
    }

    /// Sets the evaluation configuration.
    #[must_use]
    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a cancellation token sharing this context's flag.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the evaluation.
    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Checks if the evaluation has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the evaluation statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &EvalStats {
        &self.stats
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Records input rows consumed.
    #[inline]
    pub(crate) fn record_rows_in(&self, count: u64) {
        self.stats.rows_in.fetch_add(count, Ordering::Relaxed);
    }

    /// Records partitions evaluated.
    #[inline]
    pub(crate) fn record_partitions(&self, count: u64) {
        self.stats.partitions.fetch_add(count, Ordering::Relaxed);
    }

    /// Records output values produced.
    #[inline]
    pub(crate) fn record_values_out(&self, count: u64) {
        self.stats.values_out.fetch_add(count, Ordering::Relaxed);
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An advisory row budget shared by concurrently evaluating partitions.
///
/// Admission blocks new partition starts while the in-flight total would
/// exceed the budget; in-flight partitions are never interrupted. Callers
/// must reject partitions larger than the whole budget before acquiring,
/// otherwise admission could wait forever.
#[derive(Debug)]
pub(crate) struct MemoryBudget {
    /// Budget in rows; 0 disables gating.
    limit: usize,
    /// Rows currently reserved by in-flight partitions.
    in_flight: Mutex<usize>,
    /// Signalled whenever a reservation is released.
    released: Condvar,
}

impl MemoryBudget {
    pub(crate) fn new(limit: usize) -> Self {
        Self { limit, in_flight: Mutex::new(0), released: Condvar::new() }
    }

    /// Reserves `rows` from the budget, blocking until they fit.
    ///
    /// A reservation always succeeds immediately when nothing is in
    /// flight, so a `rows > limit` partition must be rejected upstream.
    pub(crate) fn acquire(&self, rows: usize) {
        if self.limit == 0 {
            return;
        }
        let mut in_flight =
            self.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        while *in_flight > 0 && *in_flight + rows > self.limit {
            in_flight =
                self.released.wait(in_flight).unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *in_flight += rows;
    }

    /// Releases a reservation made by [`acquire`](Self::acquire).
    pub(crate) fn release(&self, rows: usize) {
        if self.limit == 0 {
            return;
        }
        let mut in_flight =
            self.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(rows);
        drop(in_flight);
        self.released.notify_all();
    }
}
