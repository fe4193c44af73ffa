//! Associative segment primitives for constant-time move evaluation.
//!
//! A segment summarises a contiguous sequence of visits. Two adjacent
//! segments merge in O(1), so the cost of any proposed route rearrangement
//! can be computed from a handful of cached segments instead of a full route
//! traversal. See Vidal et al. (2014) for the underlying recurrences.

use crate::matrix::Matrix;
use crate::measure::{Distance, Duration, Load};
use crate::problem::{Client, Depot};

/// Travel distance of a contiguous visit sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DistanceSegment {
    distance: Distance,
}

impl DistanceSegment {
    pub fn new(distance: Distance) -> Self {
        DistanceSegment { distance }
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Concatenates two segments joined by an edge of the given length.
    pub fn merge(edge: Distance, first: Self, second: Self) -> Self {
        DistanceSegment {
            distance: first.distance + second.distance + edge,
        }
    }
}

/// Load statistics of a contiguous visit sequence.
///
/// Tracks delivered demand, picked-up supply, and the maximum in-vehicle
/// load encountered anywhere on the segment. For delivery-only problems the
/// supply stays zero and the maximum load reduces to the running demand sum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    demand: Load,
    supply: Load,
    max_load: Load,
}

impl LoadSegment {
    pub fn new(demand: Load, supply: Load, max_load: Load) -> Self {
        LoadSegment {
            demand,
            supply,
            max_load,
        }
    }

    pub fn client(client: &Client) -> Self {
        LoadSegment {
            demand: client.demand,
            supply: Load(0),
            max_load: client.demand,
        }
    }

    pub fn demand(&self) -> Load {
        self.demand
    }

    pub fn supply(&self) -> Load {
        self.supply
    }

    pub fn max_load(&self) -> Load {
        self.max_load
    }

    /// Load in excess of the given vehicle capacity.
    pub fn excess_load(&self, capacity: Load) -> Load {
        (self.max_load - capacity).max(Load(0))
    }

    /// Concatenates two adjacent segments. Implements equations (9)--(11)
    /// of Vidal et al. (2014).
    pub fn merge(first: Self, second: Self) -> Self {
        LoadSegment {
            demand: first.demand + second.demand,
            supply: first.supply + second.supply,
            max_load: (first.max_load + second.demand).max(second.max_load + first.supply),
        }
    }
}

/// Duration and time-window statistics of a contiguous visit sequence.
///
/// `duration` includes waiting and service time. `[tw_early, tw_late]` is
/// the interval of start times that yield minimum segment duration, and
/// `time_warp` is the amount by which arrivals must be pulled back to
/// respect the time windows along the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSegment {
    idx_first: usize,
    idx_last: usize,
    duration: Duration,
    time_warp: Duration,
    tw_early: Duration,
    tw_late: Duration,
    release_time: Duration,
}

impl DurationSegment {
    pub fn new(
        idx_first: usize,
        idx_last: usize,
        duration: Duration,
        time_warp: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release_time: Duration,
    ) -> Self {
        DurationSegment {
            idx_first,
            idx_last,
            duration,
            time_warp,
            tw_early,
            tw_late,
            release_time,
        }
    }

    /// Singleton segment for a client visit.
    pub fn client(idx: usize, client: &Client) -> Self {
        DurationSegment {
            idx_first: idx,
            idx_last: idx,
            duration: client.service_duration,
            time_warp: Duration(0),
            tw_early: client.tw_early,
            tw_late: client.tw_late,
            release_time: client.release_time,
        }
    }

    /// Singleton segment for a depot visit, clipped to the shift window of
    /// the vehicle operating the route.
    pub fn depot(idx: usize, depot: &Depot, shift_early: Duration, shift_late: Duration) -> Self {
        DurationSegment {
            idx_first: idx,
            idx_last: idx,
            duration: Duration(0),
            time_warp: Duration(0),
            tw_early: depot.tw_early.max(shift_early),
            tw_late: depot.tw_late.min(shift_late),
            release_time: Duration(0),
        }
    }

    pub fn first(&self) -> usize {
        self.idx_first
    }

    pub fn last(&self) -> usize {
        self.idx_last
    }

    /// Total duration of the segment, including waiting and service.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Earliest start that yields minimum segment duration.
    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    /// Latest start that yields minimum segment duration.
    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    /// Time warp along the segment, ignoring release times.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Time warp along the segment plus warp induced by starting no earlier
    /// than the segment's release time.
    pub fn total_time_warp(&self) -> Duration {
        self.time_warp + (self.release_time - self.tw_late).max(Duration(0))
    }

    /// Like [`total_time_warp`](Self::total_time_warp), with any duration in
    /// excess of `max_duration` also counted as warp.
    pub fn total_time_warp_with(&self, max_duration: Duration) -> Duration {
        self.total_time_warp() + (self.duration - max_duration).max(Duration(0))
    }

    /// Concatenates two adjacent segments. The edge duration is looked up
    /// between the first segment's last visit and the second segment's
    /// first visit.
    pub fn merge(durations: &Matrix<Duration>, first: Self, second: Self) -> Self {
        let edge = durations.at(first.idx_last, second.idx_first);

        // Time, relative to our own start, at which we arrive at the other
        // segment's first visit.
        let at_other = first.duration - first.time_warp + edge;

        // Warp grows when we arrive after the other's window closes; waiting
        // grows when we arrive before it opens. Wide arithmetic: windows of
        // unconstrained visits sit at i64::MAX, and the subtractions would
        // wrap around it.
        let wide = |value: Duration| value.get() as i128;
        let diff_tw = (wide(first.tw_early) + wide(at_other) - wide(second.tw_late)).max(0);
        let diff_tw = Duration(diff_tw as i64);
        let diff_wait = (wide(second.tw_early) - wide(at_other) - wide(first.tw_late)).max(0);
        let diff_wait = Duration(diff_wait as i64);

        DurationSegment {
            idx_first: first.idx_first,
            idx_last: second.idx_last,
            duration: first.duration + second.duration + edge + diff_wait,
            time_warp: first.time_warp + second.time_warp + diff_tw,
            tw_early: (second.tw_early - at_other).max(first.tw_early) - diff_wait,
            tw_late: (second.tw_late - at_other).min(first.tw_late) + diff_tw,
            release_time: first.release_time.max(second.release_time),
        }
    }

    /// Folds a sequence of segments left to right.
    pub fn merge_all<I>(durations: &Matrix<Duration>, first: Self, rest: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        rest.into_iter()
            .fold(first, |acc, seg| Self::merge(durations, acc, seg))
    }
}
