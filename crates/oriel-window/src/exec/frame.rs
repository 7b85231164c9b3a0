//! Frame materialization.
//!
//! A [`FrameCursor`] turns the frame clause of a window spec into a
//! half-open index range over a sorted partition, one range per row. ROWS
//! frames are pure position arithmetic. RANGE frames are resolved with
//! monotonic pointers: because the partition is sorted and the offsets are
//! constant, the frame edges only ever move forward, so materializing all
//! frames of a partition is linear in its row count.
//!
//! In RANGE mode a `CURRENT ROW` bound means the current row's peer group
//! edge, and rows whose ordering key is null frame their own null peer
//! group for offset bounds as well.

use oriel_core::Value;

use crate::error::{WindowError, WindowResult};
use crate::spec::{FrameBound, FrameMode, FrameSpec};

use super::row::Row;
use super::sort::{compare_key_values, peers_equal, ResolvedSortKey};

/// Resolves frames for one sorted partition.
///
/// [`FrameCursor::frame_for`] must be called with `pos` increasing from 0;
/// the internal pointers never move backward.
#[derive(Debug)]
pub(crate) struct FrameCursor<'a> {
    frame: FrameSpec,
    keys: &'a [ResolvedSortKey],
    /// Start pointer for RANGE offset bounds.
    lo: usize,
    /// End pointer (exclusive) for RANGE offset bounds.
    hi: usize,
    /// Current peer group, half-open.
    peer_lo: usize,
    peer_hi: usize,
}

impl<'a> FrameCursor<'a> {
    /// Validates the frame clause and builds a cursor.
    ///
    /// Fails with `InvalidFrame` when the bounds are statically inverted,
    /// when an edge points the wrong way, or when a RANGE frame with
    /// offsets lacks exactly one ordering key.
    pub(crate) fn new(frame: FrameSpec, keys: &'a [ResolvedSortKey]) -> WindowResult<Self> {
        if frame.start == FrameBound::UnboundedFollowing {
            return Err(WindowError::invalid_frame("frame start cannot be UNBOUNDED FOLLOWING"));
        }
        if frame.end == FrameBound::UnboundedPreceding {
            return Err(WindowError::invalid_frame("frame end cannot be UNBOUNDED PRECEDING"));
        }
        for bound in [frame.start, frame.end] {
            if let FrameBound::Preceding(n) | FrameBound::Following(n) = bound {
                if n < 0 {
                    return Err(WindowError::invalid_frame(format!(
                        "negative frame offset magnitude {n}"
                    )));
                }
            }
        }
        if bound_rank(frame.start) > bound_rank(frame.end) {
            return Err(WindowError::invalid_frame(format!(
                "frame start {} is beyond frame end {}",
                frame.start, frame.end
            )));
        }
        if frame.mode == FrameMode::Range && frame_has_offset(&frame) && keys.len() != 1 {
            return Err(WindowError::invalid_frame(
                "RANGE frame with offsets requires exactly one ordering key",
            ));
        }
        Ok(Self { frame, keys, lo: 0, hi: 0, peer_lo: 0, peer_hi: 0 })
    }

    /// Returns the half-open frame `[start, end)` for the row at sorted
    /// position `pos`. An empty frame comes back with `start == end`.
    pub(crate) fn frame_for(
        &mut self,
        rows: &[Row],
        sorted: &[usize],
        pos: usize,
    ) -> WindowResult<(usize, usize)> {
        match self.frame.mode {
            FrameMode::Rows => Ok(self.rows_frame(sorted.len(), pos)),
            FrameMode::Range => self.range_frame(rows, sorted, pos),
        }
    }

    fn rows_frame(&self, n: usize, pos: usize) -> (usize, usize) {
        let n = n as i128;
        let p = pos as i128;
        let lo = match self.frame.start {
            FrameBound::UnboundedPreceding => 0,
            FrameBound::Preceding(k) => p - i128::from(k),
            FrameBound::CurrentRow => p,
            FrameBound::Following(k) => p + i128::from(k),
            FrameBound::UnboundedFollowing => n,
        };
        let hi = match self.frame.end {
            FrameBound::UnboundedPreceding => -1,
            FrameBound::Preceding(k) => p - i128::from(k),
            FrameBound::CurrentRow => p,
            FrameBound::Following(k) => p + i128::from(k),
            FrameBound::UnboundedFollowing => n - 1,
        };
        let lo = lo.max(0);
        let hi = hi.min(n - 1);
        if lo > hi {
            let empty = lo.min(n) as usize;
            (empty, empty)
        } else {
            (lo as usize, (hi + 1) as usize)
        }
    }

    fn range_frame(
        &mut self,
        rows: &[Row],
        sorted: &[usize],
        pos: usize,
    ) -> WindowResult<(usize, usize)> {
        let n = sorted.len();
        self.advance_peers(rows, sorted, pos);

        let key = self.keys.first();
        let current = key.map_or(&Value::Null, |k| {
            rows[sorted[pos]].get(k.index).unwrap_or(&Value::Null)
        });

        let lo = match self.frame.start {
            FrameBound::UnboundedPreceding => 0,
            FrameBound::CurrentRow => self.peer_lo,
            FrameBound::Preceding(m) | FrameBound::Following(m) => {
                // Validation guarantees a single key for offset bounds.
                let k = key.copied().unwrap_or(ResolvedSortKey {
                    index: 0,
                    ascending: true,
                    nulls_first: false,
                });
                if current.is_null() {
                    self.peer_lo
                } else {
                    let preceding = matches!(self.frame.start, FrameBound::Preceding(_));
                    let target = range_target(current, m, preceding, k.ascending)?;
                    while self.lo < n {
                        let v = rows[sorted[self.lo]].get(k.index).unwrap_or(&Value::Null);
                        if compare_key_values(v, &target, &k) == std::cmp::Ordering::Less {
                            self.lo += 1;
                        } else {
                            break;
                        }
                    }
                    self.lo
                }
            }
            // Rejected by validation.
            FrameBound::UnboundedFollowing => n,
        };

        let hi = match self.frame.end {
            FrameBound::UnboundedFollowing => n,
            FrameBound::CurrentRow => self.peer_hi,
            FrameBound::Preceding(m) | FrameBound::Following(m) => {
                let k = key.copied().unwrap_or(ResolvedSortKey {
                    index: 0,
                    ascending: true,
                    nulls_first: false,
                });
                if current.is_null() {
                    self.peer_hi
                } else {
                    let preceding = matches!(self.frame.end, FrameBound::Preceding(_));
                    let target = range_target(current, m, preceding, k.ascending)?;
                    while self.hi < n {
                        let v = rows[sorted[self.hi]].get(k.index).unwrap_or(&Value::Null);
                        if compare_key_values(v, &target, &k) != std::cmp::Ordering::Greater {
                            self.hi += 1;
                        } else {
                            break;
                        }
                    }
                    self.hi
                }
            }
            // Rejected by validation.
            FrameBound::UnboundedPreceding => 0,
        };

        if hi < lo {
            Ok((lo, lo))
        } else {
            Ok((lo, hi))
        }
    }

    /// Moves the peer-group window forward to cover `pos`.
    ///
    /// With no ordering keys every row is a peer, so the group is the
    /// whole partition.
    fn advance_peers(&mut self, rows: &[Row], sorted: &[usize], pos: usize) {
        if pos < self.peer_hi {
            return;
        }
        self.peer_lo = pos;
        self.peer_hi = pos + 1;
        let current = &rows[sorted[pos]];
        while self.peer_hi < sorted.len()
            && peers_equal(&rows[sorted[self.peer_hi]], current, self.keys)
        {
            self.peer_hi += 1;
        }
    }
}

fn frame_has_offset(frame: &FrameSpec) -> bool {
    matches!(frame.start, FrameBound::Preceding(_) | FrameBound::Following(_))
        || matches!(frame.end, FrameBound::Preceding(_) | FrameBound::Following(_))
}

/// Orders bounds by the position they can resolve to, for static
/// inversion checks.
fn bound_rank(bound: FrameBound) -> i128 {
    match bound {
        FrameBound::UnboundedPreceding => i128::MIN,
        FrameBound::Preceding(n) => -i128::from(n),
        FrameBound::CurrentRow => 0,
        FrameBound::Following(n) => i128::from(n),
        FrameBound::UnboundedFollowing => i128::MAX,
    }
}

/// Computes the ordering-key value at the requested frame edge.
///
/// "Preceding" always means toward the partition start, so the arithmetic
/// direction flips with a descending key. Saturating integer arithmetic is
/// exact here: a target past the i64 extremes lies beyond every key.
fn range_target(
    key: &Value,
    magnitude: i64,
    preceding: bool,
    ascending: bool,
) -> WindowResult<Value> {
    let subtract = preceding == ascending;
    match key {
        Value::Int(k) => Ok(Value::Int(if subtract {
            k.saturating_sub(magnitude)
        } else {
            k.saturating_add(magnitude)
        })),
        Value::Float(f) => {
            let m = magnitude as f64;
            Ok(Value::Float(if subtract { f - m } else { f + m }))
        }
        other => Err(WindowError::invalid_frame(format!(
            "RANGE frame requires a numeric ordering key, found {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::WindowError;
    use crate::spec::SortKey;

    use super::super::row::Schema;
    use super::super::sort::resolve_sort_keys;
    use super::*;

    fn make_rows(values: &[Value]) -> Vec<Row> {
        let schema = Arc::new(Schema::new(vec!["k".to_string()]));
        values.iter().map(|v| Row::new(Arc::clone(&schema), vec![v.clone()])).collect()
    }

    fn keys(rows: &[Row], key: SortKey) -> Vec<ResolvedSortKey> {
        resolve_sort_keys(rows[0].schema(), &[key]).unwrap()
    }

    fn all_frames(
        rows: &[Row],
        keys: &[ResolvedSortKey],
        frame: FrameSpec,
    ) -> Vec<(usize, usize)> {
        let sorted: Vec<usize> = (0..rows.len()).collect();
        let mut cursor = FrameCursor::new(frame, keys).unwrap();
        (0..rows.len()).map(|pos| cursor.frame_for(rows, &sorted, pos).unwrap()).collect()
    }

    fn rows_frame(start: FrameBound, end: FrameBound) -> FrameSpec {
        FrameSpec { mode: FrameMode::Rows, start, end }
    }

    fn range_frame(start: FrameBound, end: FrameBound) -> FrameSpec {
        FrameSpec { mode: FrameMode::Range, start, end }
    }

    #[test]
    fn rows_sliding_window_clamps_at_edges() {
        let rows = make_rows(&vec![Value::Int(1); 5]);
        let frames = all_frames(
            &rows,
            &[],
            rows_frame(FrameBound::Preceding(1), FrameBound::Following(1)),
        );
        assert_eq!(frames, vec![(0, 2), (0, 3), (1, 4), (2, 5), (3, 5)]);
    }

    #[test]
    fn rows_frame_past_partition_is_empty() {
        let rows = make_rows(&vec![Value::Int(1); 3]);
        let frames = all_frames(
            &rows,
            &[],
            rows_frame(FrameBound::Following(5), FrameBound::Following(9)),
        );
        for (lo, hi) in frames {
            assert_eq!(lo, hi);
        }
    }

    #[test]
    fn rows_running_frame() {
        let rows = make_rows(&vec![Value::Int(1); 4]);
        let frames = all_frames(
            &rows,
            &[],
            rows_frame(FrameBound::UnboundedPreceding, FrameBound::CurrentRow),
        );
        assert_eq!(frames, vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn range_includes_all_tied_keys() {
        let rows =
            make_rows(&[Value::Int(1), Value::Int(2), Value::Int(2), Value::Int(3)]);
        let sort = keys(&rows, SortKey::asc("k"));
        let frames = all_frames(
            &rows,
            &sort,
            range_frame(FrameBound::Preceding(1), FrameBound::Following(1)),
        );
        assert_eq!(frames, vec![(0, 3), (0, 4), (0, 4), (1, 4)]);
        // Tied rows (positions 1 and 2) get identical frames.
        assert_eq!(frames[1], frames[2]);
    }

    #[test]
    fn range_descending_direction() {
        let rows =
            make_rows(&[Value::Int(3), Value::Int(2), Value::Int(2), Value::Int(1)]);
        let sort = keys(&rows, SortKey::desc("k"));
        let frames = all_frames(
            &rows,
            &sort,
            range_frame(FrameBound::Preceding(1), FrameBound::Following(1)),
        );
        assert_eq!(frames, vec![(0, 3), (0, 4), (0, 4), (1, 4)]);
    }

    #[test]
    fn range_current_row_means_peer_group() {
        let rows =
            make_rows(&[Value::Int(1), Value::Int(2), Value::Int(2), Value::Int(3)]);
        let sort = keys(&rows, SortKey::asc("k"));
        let frames = all_frames(
            &rows,
            &sort,
            range_frame(FrameBound::UnboundedPreceding, FrameBound::CurrentRow),
        );
        assert_eq!(frames, vec![(0, 1), (0, 3), (0, 3), (0, 4)]);
    }

    #[test]
    fn range_null_key_frames_its_peer_group() {
        // NULLS LAST: nulls at positions 3 and 4.
        let rows = make_rows(&[
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Null,
            Value::Null,
        ]);
        let sort = keys(&rows, SortKey::asc("k"));
        let frames = all_frames(
            &rows,
            &sort,
            range_frame(FrameBound::Preceding(1), FrameBound::Following(1)),
        );
        assert_eq!(frames[0], (0, 2));
        assert_eq!(frames[2], (1, 3));
        // Null rows see only their null peers.
        assert_eq!(frames[3], (3, 5));
        assert_eq!(frames[4], (3, 5));
    }

    #[test]
    fn range_empty_gap() {
        let rows = make_rows(&[Value::Int(0), Value::Int(10), Value::Int(20)]);
        let sort = keys(&rows, SortKey::asc("k"));
        let frames = all_frames(
            &rows,
            &sort,
            range_frame(FrameBound::Following(1), FrameBound::Following(5)),
        );
        for (lo, hi) in frames {
            assert_eq!(lo, hi);
        }
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = FrameCursor::new(
            rows_frame(FrameBound::Following(2), FrameBound::Preceding(1)),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::InvalidFrame { .. }));

        let err = FrameCursor::new(
            rows_frame(FrameBound::UnboundedFollowing, FrameBound::UnboundedFollowing),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::InvalidFrame { .. }));
    }

    #[test]
    fn negative_magnitude_rejected() {
        // Unreachable through the offset constructors, but the bound
        // fields are public.
        let err = FrameCursor::new(
            rows_frame(FrameBound::Preceding(-2), FrameBound::CurrentRow),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::InvalidFrame { .. }));
    }

    #[test]
    fn range_offsets_require_one_ordering_key() {
        let err = FrameCursor::new(
            range_frame(FrameBound::Preceding(1), FrameBound::CurrentRow),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::InvalidFrame { .. }));
    }

    #[test]
    fn range_rejects_non_numeric_key() {
        let rows = make_rows(&[Value::from("a"), Value::from("b")]);
        let sort = keys(&rows, SortKey::asc("k"));
        let sorted: Vec<usize> = (0..rows.len()).collect();
        let mut cursor = FrameCursor::new(
            range_frame(FrameBound::Preceding(1), FrameBound::CurrentRow),
            &sort,
        )
        .unwrap();
        let err = cursor.frame_for(&rows, &sorted, 0).unwrap_err();
        assert!(matches!(err, WindowError::InvalidFrame { .. }));
    }
}
