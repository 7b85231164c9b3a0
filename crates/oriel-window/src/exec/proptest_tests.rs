//! Property tests for frame materialization and evaluation.

use std::sync::Arc;

use proptest::prelude::*;

use oriel_core::Value;

use crate::spec::{FrameBound, FrameMode, FrameSpec, SortKey, WindowSpec};

use super::context::{EvalConfig, EvalContext};
use super::evaluator::{evaluate, WindowExpr};
use super::frame::FrameCursor;
use super::functions::{AggregateFunc, WindowFunc};
use super::row::{Row, Schema};
use super::sort::resolve_sort_keys;

fn make_rows(values: &[i64]) -> Vec<Row> {
    let schema = Arc::new(Schema::new(vec!["k".to_string()]));
    values.iter().map(|&v| Row::new(Arc::clone(&schema), vec![Value::Int(v)])).collect()
}

fn cursor_frames(values: &[i64], frame: FrameSpec) -> Vec<(usize, usize)> {
    let rows = make_rows(values);
    let schema = Arc::new(Schema::new(vec!["k".to_string()]));
    let keys = resolve_sort_keys(&schema, &[SortKey::asc("k")]).unwrap();
    let sorted: Vec<usize> = (0..rows.len()).collect();
    let mut cursor = FrameCursor::new(frame, &keys).unwrap();
    (0..rows.len()).map(|pos| cursor.frame_for(&rows, &sorted, pos).unwrap()).collect()
}

/// Reference ROWS frame: clamp `[pos + start, pos + end]` to the
/// partition.
fn naive_rows_frame(n: usize, pos: usize, start: i64, end: i64) -> (usize, usize) {
    let lo = (pos as i64 + start).max(0);
    let hi = (pos as i64 + end).min(n as i64 - 1);
    if lo > hi {
        let empty = lo.clamp(0, n as i64) as usize;
        (empty, empty)
    } else {
        (lo as usize, hi as usize + 1)
    }
}

/// Reference RANGE frame over sorted non-null integer keys: every row
/// whose key lies within the value distance.
fn naive_range_frame(keys: &[i64], pos: usize, start: i64, end: i64) -> (usize, usize) {
    let lo_key = keys[pos] + start;
    let hi_key = keys[pos] + end;
    let lo = keys.iter().position(|&k| k >= lo_key).unwrap_or(keys.len());
    let hi = keys.iter().rposition(|&k| k <= hi_key).map_or(lo, |i| i + 1);
    if hi < lo {
        (lo, lo)
    } else {
        (lo, hi)
    }
}

fn sorted_keys() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(-50i64..50, 0..40).prop_map(|mut v| {
        v.sort_unstable();
        v
    })
}

proptest! {
    #[test]
    fn rows_frames_match_reference(
        keys in sorted_keys(),
        start in -6i64..6,
        span in 0i64..6,
    ) {
        let end = start + span;
        let frame = FrameSpec {
            mode: FrameMode::Rows,
            start: FrameBound::from_offset(start),
            end: FrameBound::from_offset(end),
        };
        let frames = cursor_frames(&keys, frame);
        for (pos, &frame) in frames.iter().enumerate() {
            prop_assert_eq!(frame, naive_rows_frame(keys.len(), pos, start, end));
        }
    }

    #[test]
    fn range_frames_match_reference(
        keys in sorted_keys(),
        start in -6i64..1,
        span in 0i64..8,
    ) {
        let end = start + span;
        let frame = FrameSpec {
            mode: FrameMode::Range,
            start: FrameBound::from_offset(start),
            end: FrameBound::from_offset(end),
        };
        let frames = cursor_frames(&keys, frame);
        for (pos, &frame) in frames.iter().enumerate() {
            prop_assert_eq!(frame, naive_range_frame(&keys, pos, start, end));
        }
    }

    #[test]
    fn frame_edges_are_monotone(
        keys in sorted_keys(),
        start in -6i64..6,
        span in 0i64..6,
        range_mode in any::<bool>(),
    ) {
        let (start, end) = if range_mode {
            // RANGE offsets relative to the current key.
            (start.min(0), (start.min(0) + span))
        } else {
            (start, start + span)
        };
        let frame = FrameSpec {
            mode: if range_mode { FrameMode::Range } else { FrameMode::Rows },
            start: FrameBound::from_offset(start),
            end: FrameBound::from_offset(end),
        };
        let frames = cursor_frames(&keys, frame);
        for pair in frames.windows(2) {
            prop_assert!(pair[1].0 >= pair[0].0);
            prop_assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[test]
    fn sentinel_offsets_equal_explicit_unbounded(keys in sorted_keys()) {
        let clamped = FrameSpec {
            mode: FrameMode::Rows,
            start: FrameBound::from_offset(-i64::MAX),
            end: FrameBound::from_offset(i64::MAX),
        };
        let frames = cursor_frames(&keys, clamped);
        let whole = cursor_frames(&keys, FrameSpec::whole_partition());
        prop_assert_eq!(frames, whole);
    }

    #[test]
    fn sliding_sum_matches_rescan(
        values in proptest::collection::vec(-100i64..100, 1..30),
        back in 0i64..5,
        ahead in 0i64..5,
    ) {
        let rows = make_rows(&values);
        let expr = WindowExpr::new(
            WindowFunc::Aggregate { func: AggregateFunc::Sum, column: "k".to_string() },
            WindowSpec::new().order_by(["k"]).rows_between(-back, ahead),
        );
        let ctx = EvalContext::new().with_config(EvalConfig::new().with_parallel(false));
        let out = evaluate(&rows, &[expr], &ctx)
            .unwrap()
            .into_columns()
            .expect("not cancelled");

        let mut sorted = values.clone();
        sorted.sort_unstable();
        // values are distinct positions after sort; recompute per input row
        // by its sorted position, matching stable sort order.
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by_key(|&i| values[i]);
        for (sorted_pos, &input_idx) in order.iter().enumerate() {
            let lo = sorted_pos.saturating_sub(back as usize);
            let hi = (sorted_pos + ahead as usize + 1).min(sorted.len());
            let expected: i64 = sorted[lo..hi].iter().sum();
            prop_assert_eq!(&out[0][input_idx], &Value::Int(expected));
        }
    }

    #[test]
    fn parallel_matches_sequential(
        data in proptest::collection::vec((0u8..4, -50i64..50), 0..60),
    ) {
        let schema = Arc::new(Schema::new(vec!["g".to_string(), "v".to_string()]));
        let rows: Vec<Row> = data
            .iter()
            .map(|&(g, v)| {
                Row::new(
                    Arc::clone(&schema),
                    vec![Value::Int(i64::from(g)), Value::Int(v)],
                )
            })
            .collect();
        let exprs = vec![
            WindowExpr::new(
                WindowFunc::RowNumber,
                WindowSpec::new().partition_by(["g"]).order_by(["v"]),
            ),
            WindowExpr::new(
                WindowFunc::Aggregate { func: AggregateFunc::Min, column: "v".to_string() },
                WindowSpec::new().partition_by(["g"]).order_by(["v"]).rows_between(-2, 2),
            ),
        ];

        let seq = EvalContext::new().with_config(EvalConfig::new().with_parallel(false));
        let par = EvalContext::new();
        let seq_out = evaluate(&rows, &exprs, &seq).unwrap();
        let par_out = evaluate(&rows, &exprs, &par).unwrap();
        prop_assert_eq!(seq_out, par_out);
    }

    #[test]
    fn evaluation_is_deterministic(
        data in proptest::collection::vec((0u8..3, -20i64..20), 0..40),
    ) {
        let schema = Arc::new(Schema::new(vec!["g".to_string(), "v".to_string()]));
        let rows: Vec<Row> = data
            .iter()
            .map(|&(g, v)| {
                Row::new(
                    Arc::clone(&schema),
                    vec![Value::Int(i64::from(g)), Value::Int(v)],
                )
            })
            .collect();
        let expr = WindowExpr::new(
            WindowFunc::Rank,
            WindowSpec::new().partition_by(["g"]).order_by(["v"]),
        );
        let ctx = EvalContext::new();
        let first = evaluate(&rows, std::slice::from_ref(&expr), &ctx).unwrap();
        let second = evaluate(&rows, std::slice::from_ref(&expr), &ctx).unwrap();
        prop_assert_eq!(first, second);
    }
}
