//! Unit tests for the segment merge algebra.

use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::measure::{Distance, Duration, Load};
use hgs_vrptw::segment::{DistanceSegment, DurationSegment, LoadSegment};

/// A small duration matrix over four locations.
fn durations() -> Matrix<Duration> {
    let values = vec![
        0, 4, 7, 10, //
        4, 0, 3, 6, //
        7, 3, 0, 3, //
        10, 6, 3, 0,
    ];
    Matrix::from_vec(4, values.into_iter().map(Duration).collect())
}

fn visit(idx: usize, service: i64, tw_early: i64, tw_late: i64) -> DurationSegment {
    DurationSegment::new(
        idx,
        idx,
        Duration(service),
        Duration(0),
        Duration(tw_early),
        Duration(tw_late),
        Duration(0),
    )
}

#[test]
fn distance_segment_merge() {
    let first = DistanceSegment::new(Distance(10));
    let second = DistanceSegment::new(Distance(4));

    let merged = DistanceSegment::merge(Distance(3), first, second);
    assert_eq!(merged.distance(), Distance(17));
}

#[test]
fn load_segment_merge_and_excess() {
    let first = LoadSegment::new(Load(5), Load(2), Load(5));
    let second = LoadSegment::new(Load(3), Load(4), Load(4));

    let merged = LoadSegment::merge(first, second);
    assert_eq!(merged.demand(), Load(8));
    assert_eq!(merged.supply(), Load(6));
    // max(5 + 3, 4 + 2) = 8.
    assert_eq!(merged.max_load(), Load(8));

    assert_eq!(merged.excess_load(Load(10)), Load(0));
    assert_eq!(merged.excess_load(Load(6)), Load(2));
}

#[test]
fn load_segment_delivery_only_reduces_to_demand_sum() {
    let segments = [Load(5), Load(5), Load(3), Load(5)]
        .map(|demand| LoadSegment::new(demand, Load(0), demand));

    let total = segments
        .into_iter()
        .reduce(LoadSegment::merge)
        .unwrap();

    assert_eq!(total.demand(), Load(18));
    assert_eq!(total.max_load(), Load(18));
    assert_eq!(total.excess_load(Load(10)), Load(8));
}

#[test]
fn load_segment_merge_is_associative() {
    let a = LoadSegment::new(Load(5), Load(1), Load(5));
    let b = LoadSegment::new(Load(2), Load(6), Load(6));
    let c = LoadSegment::new(Load(4), Load(3), Load(4));

    let left = LoadSegment::merge(LoadSegment::merge(a, b), c);
    let right = LoadSegment::merge(a, LoadSegment::merge(b, c));

    assert_eq!(left, right);
}

#[test]
fn duration_segment_delays_start_instead_of_waiting() {
    let mat = durations();

    // Travel takes 4 and the second window opens at 20, but the first
    // visit may start as late as 100: the start shifts to 16 and no
    // waiting accrues.
    let first = visit(0, 0, 0, 100);
    let second = visit(1, 5, 20, 30);

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.duration(), Duration(9));
    assert_eq!(merged.time_warp(), Duration(0));
    assert_eq!(merged.tw_early(), Duration(16));
    assert_eq!(merged.tw_late(), Duration(26));
}

#[test]
fn duration_segment_waiting() {
    let mat = durations();

    // The first visit must start at 0, so arriving at 4 against a window
    // opening at 20 means 16 units of waiting.
    let first = visit(0, 0, 0, 0);
    let second = visit(1, 5, 20, 30);

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.duration(), Duration(4 + 5 + 16));
    assert_eq!(merged.time_warp(), Duration(0));
    assert_eq!(merged.tw_early(), Duration(0));
    assert_eq!(merged.tw_late(), Duration(0));
}

#[test]
fn duration_segment_time_warp() {
    let mat = durations();

    // The second window closes at 2; arriving no earlier than 4 means two
    // units of warp.
    let first = visit(0, 0, 0, 0);
    let second = visit(1, 5, 0, 2);

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.time_warp(), Duration(2));
    assert_eq!(merged.total_time_warp(), Duration(2));
}

#[test]
fn release_time_induces_warp() {
    let mat = durations();

    let first = visit(0, 0, 0, 100);
    let mut second = visit(1, 0, 0, 10);
    second = DurationSegment::new(
        second.first(),
        second.last(),
        second.duration(),
        Duration(0),
        Duration(0),
        Duration(10),
        Duration(50), // released only at 50, but must start by 6
    );

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.release_time(), Duration(50));
    assert_eq!(merged.time_warp(), Duration(0));
    // tw_late is 6 (window 10 shifted by travel 4); release 50 adds warp 44.
    assert_eq!(merged.total_time_warp(), Duration(44));
}

#[test]
fn max_duration_counts_as_warp() {
    let mat = durations();

    let first = visit(0, 10, 0, 100);
    let second = visit(1, 10, 0, 100);

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.duration(), Duration(24));
    assert_eq!(merged.total_time_warp_with(Duration(20)), Duration(4));
    assert_eq!(merged.total_time_warp_with(Duration(100)), Duration(0));
}

#[test]
fn duration_segment_merge_is_associative() {
    let mat = durations();

    let a = visit(0, 3, 5, 40);
    let b = visit(1, 6, 10, 25);
    let c = visit(2, 2, 0, 18);
    let d = visit(3, 4, 30, 60);

    for (x, y, z) in [(a, b, c), (b, c, d), (a, c, d), (a, b, d)] {
        let left = DurationSegment::merge(&mat, DurationSegment::merge(&mat, x, y), z);
        let right = DurationSegment::merge(&mat, x, DurationSegment::merge(&mat, y, z));

        assert_eq!(left.duration(), right.duration());
        assert_eq!(left.time_warp(), right.time_warp());
        assert_eq!(left.tw_early(), right.tw_early());
        assert_eq!(left.tw_late(), right.tw_late());
        assert_eq!(left.release_time(), right.release_time());
        assert_eq!(left.first(), right.first());
        assert_eq!(left.last(), right.last());
    }
}

#[test]
fn merge_all_folds_left_to_right() {
    let mat = durations();

    let a = visit(0, 3, 5, 40);
    let b = visit(1, 6, 10, 25);
    let c = visit(2, 2, 0, 18);

    let folded = DurationSegment::merge_all(&mat, a, [b, c]);
    let manual = DurationSegment::merge(&mat, DurationSegment::merge(&mat, a, b), c);

    assert_eq!(folded.duration(), manual.duration());
    assert_eq!(folded.time_warp(), manual.time_warp());
}

#[test]
fn unconstrained_windows_do_not_overflow() {
    let mat = durations();

    let first = visit(0, 0, 0, i64::MAX);
    let second = visit(1, 5, 0, i64::MAX);

    let merged = DurationSegment::merge(&mat, first, second);
    assert_eq!(merged.duration(), Duration(9));
    assert_eq!(merged.time_warp(), Duration(0));
}
