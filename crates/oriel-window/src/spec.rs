//! Immutable window specifications.
//!
//! A [`WindowSpec`] describes partitioning, ordering, and the frame over
//! which window functions are evaluated. Specs are built fluently; every
//! mutator returns a new spec, so intermediate specs stay valid and can be
//! shared between expressions:
//!
//! ```
//! use oriel_window::{SortKey, WindowSpec};
//!
//! // PARTITION BY country ORDER BY date ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
//! let base = WindowSpec::new().partition_by(["country"]).order_by(["date"]);
//! let running = base.rows_between(oriel_window::UNBOUNDED_PRECEDING, 0);
//!
//! // The base spec is still usable for a different frame.
//! let centered = base.rows_between(-3, 3);
//! # let _ = (running, centered);
//! ```
//!
//! # Unbounded sentinels
//!
//! For wire compatibility with callers that encode "unbounded" as extreme
//! integers, any boundary offset at or beyond the representable 64-bit
//! extreme clamps to the corresponding unbounded variant: offsets
//! `<= -i64::MAX` become `UNBOUNDED PRECEDING` and offsets `>= i64::MAX`
//! become `UNBOUNDED FOLLOWING`. This clamping is a contract callers may
//! rely on. Internally only the tagged [`FrameBound`] variants exist; the
//! sentinel values never travel past spec construction.

use serde::{Deserialize, Serialize};

/// Sentinel offset for `UNBOUNDED PRECEDING` in [`WindowSpec::rows_between`]
/// and [`WindowSpec::range_between`].
pub const UNBOUNDED_PRECEDING: i64 = i64::MIN;

/// Sentinel offset for `UNBOUNDED FOLLOWING` in [`WindowSpec::rows_between`]
/// and [`WindowSpec::range_between`].
pub const UNBOUNDED_FOLLOWING: i64 = i64::MAX;

/// Offset denoting the current row.
pub const CURRENT_ROW: i64 = 0;

/// One edge of a window frame.
///
/// Offsets are magnitudes; the direction is carried by the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameBound {
    /// The frame edge is the partition start.
    UnboundedPreceding,
    /// N rows (ROWS mode) or N key-value units (RANGE mode) before the
    /// current row.
    Preceding(i64),
    /// The current row (ROWS mode) or its peer group (RANGE mode).
    CurrentRow,
    /// N rows or N key-value units after the current row.
    Following(i64),
    /// The frame edge is the partition end.
    UnboundedFollowing,
}

impl FrameBound {
    /// Builds a bound from a signed offset relative to the current row.
    ///
    /// Negative offsets precede the current row, positive offsets follow
    /// it, and zero is the current row. Offsets at or beyond the 64-bit
    /// extremes clamp to the unbounded variants.
    #[must_use]
    pub fn from_offset(offset: i64) -> Self {
        if offset <= -i64::MAX {
            Self::UnboundedPreceding
        } else if offset == i64::MAX {
            Self::UnboundedFollowing
        } else if offset < 0 {
            Self::Preceding(-offset)
        } else if offset == 0 {
            Self::CurrentRow
        } else {
            Self::Following(offset)
        }
    }
}

impl std::fmt::Display for FrameBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            Self::Preceding(n) => write!(f, "{n} PRECEDING"),
            Self::CurrentRow => write!(f, "CURRENT ROW"),
            Self::Following(n) => write!(f, "{n} FOLLOWING"),
            Self::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

/// Frame mode: positional or value-distance boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameMode {
    /// Boundaries are row-count offsets from the current row.
    Rows,
    /// Boundaries are value-distance offsets on the ordering key.
    Range,
}

/// A window frame: mode plus start and end bounds (both inclusive).
///
/// `start <= end` is validated at evaluation time, since bounds are
/// relative offsets whose ordering depends on the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// The frame mode.
    pub mode: FrameMode,
    /// The frame start bound.
    pub start: FrameBound,
    /// The frame end bound.
    pub end: FrameBound,
}

impl FrameSpec {
    /// The default frame: the whole partition.
    #[must_use]
    pub const fn whole_partition() -> Self {
        Self {
            mode: FrameMode::Rows,
            start: FrameBound::UnboundedPreceding,
            end: FrameBound::UnboundedFollowing,
        }
    }
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self::whole_partition()
    }
}

/// A sort key: column, direction, and null placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// The resolved column name to sort by.
    pub column: String,
    /// Ascending (`true`) or descending order.
    pub ascending: bool,
    /// Where nulls sort, independent of direction. `None` means the SQL
    /// default, NULLS LAST.
    pub nulls_first: Option<bool>,
}

impl SortKey {
    /// Creates an ascending sort key.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: true, nulls_first: None }
    }

    /// Creates a descending sort key.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: false, nulls_first: None }
    }

    /// Sorts nulls before all non-null values.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    /// Sorts nulls after all non-null values.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }
}

impl From<&str> for SortKey {
    fn from(column: &str) -> Self {
        Self::asc(column)
    }
}

impl From<String> for SortKey {
    fn from(column: String) -> Self {
        Self::asc(column)
    }
}

/// An immutable window specification: partitioning, ordering, and frame.
///
/// Built via the fluent methods below; each returns a new spec and leaves
/// the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Resolved partition-key column names.
    pub partition_keys: Vec<String>,
    /// Sort keys applied within each partition.
    pub order_keys: Vec<SortKey>,
    /// The frame evaluated for each row.
    pub frame: FrameSpec,
}

impl WindowSpec {
    /// Creates an empty spec: no partitioning, no ordering, whole-partition
    /// frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new spec with the partitioning columns replaced.
    #[must_use]
    pub fn partition_by<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = self.clone();
        spec.partition_keys = columns.into_iter().map(Into::into).collect();
        spec
    }

    /// Returns a new spec with the ordering replaced.
    ///
    /// Accepts plain column names (ascending, NULLS LAST) or explicit
    /// [`SortKey`]s.
    #[must_use]
    pub fn order_by<I, K>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SortKey>,
    {
        let mut spec = self.clone();
        spec.order_keys = keys.into_iter().map(Into::into).collect();
        spec
    }

    /// Returns a new spec with a ROWS-mode frame from `start` to `end`
    /// (both inclusive, offsets relative to the current row).
    ///
    /// Negative offsets precede the current row, `0` is the current row.
    /// Offsets at or beyond the 64-bit extremes are treated as unbounded;
    /// see [`UNBOUNDED_PRECEDING`] and [`UNBOUNDED_FOLLOWING`].
    #[must_use]
    pub fn rows_between(&self, start: i64, end: i64) -> Self {
        let mut spec = self.clone();
        spec.frame = FrameSpec {
            mode: FrameMode::Rows,
            start: FrameBound::from_offset(start),
            end: FrameBound::from_offset(end),
        };
        spec
    }

    /// Returns a new spec with a RANGE-mode frame from `start` to `end`
    /// (both inclusive, offsets in ordering-key units).
    ///
    /// Requires a single orderable ordering key at evaluation time. The
    /// same sentinel clamping as [`rows_between`](Self::rows_between)
    /// applies.
    #[must_use]
    pub fn range_between(&self, start: i64, end: i64) -> Self {
        let mut spec = self.clone();
        spec.frame = FrameSpec {
            mode: FrameMode::Range,
            start: FrameBound::from_offset(start),
            end: FrameBound::from_offset(end),
        };
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_from_offset() {
        assert_eq!(FrameBound::from_offset(-3), FrameBound::Preceding(3));
        assert_eq!(FrameBound::from_offset(0), FrameBound::CurrentRow);
        assert_eq!(FrameBound::from_offset(5), FrameBound::Following(5));
    }

    #[test]
    fn sentinel_clamping() {
        assert_eq!(FrameBound::from_offset(i64::MIN), FrameBound::UnboundedPreceding);
        assert_eq!(FrameBound::from_offset(-i64::MAX), FrameBound::UnboundedPreceding);
        assert_eq!(FrameBound::from_offset(i64::MAX), FrameBound::UnboundedFollowing);
        // One inside the extreme stays bounded.
        assert_eq!(FrameBound::from_offset(-(i64::MAX - 1)), FrameBound::Preceding(i64::MAX - 1));
        assert_eq!(FrameBound::from_offset(i64::MAX - 1), FrameBound::Following(i64::MAX - 1));
    }

    #[test]
    fn builder_returns_new_specs() {
        let base = WindowSpec::new().partition_by(["country"]).order_by(["date"]);
        let bounded = base.rows_between(-1, 1);

        // The intermediate spec is untouched and reusable.
        assert_eq!(base.frame, FrameSpec::whole_partition());
        assert_eq!(bounded.frame.mode, FrameMode::Rows);
        assert_eq!(bounded.frame.start, FrameBound::Preceding(1));
        assert_eq!(bounded.partition_keys, vec!["country".to_string()]);

        let ranged = base.range_between(UNBOUNDED_PRECEDING, 0);
        assert_eq!(ranged.frame.mode, FrameMode::Range);
        assert_eq!(ranged.frame.start, FrameBound::UnboundedPreceding);
        assert_eq!(ranged.frame.end, FrameBound::CurrentRow);
    }

    #[test]
    fn order_by_sets_ordering_not_partitioning() {
        let spec = WindowSpec::new().order_by([SortKey::desc("ts").nulls_first()]);
        assert!(spec.partition_keys.is_empty());
        assert_eq!(spec.order_keys.len(), 1);
        assert!(!spec.order_keys[0].ascending);
        assert_eq!(spec.order_keys[0].nulls_first, Some(true));
    }
}
