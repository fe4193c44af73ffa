//! Mutable route representation used by the local search.
//!
//! Nodes are plain location indices; per-position caches (cumulative
//! distance and load, forward and backward duration segments) are stored as
//! parallel arrays on the route. Structural edits mark the route dirty;
//! cached statistics may only be read after [`SearchRoute::update`] has run
//! again, which debug assertions enforce.

use crate::cost::CostEvaluator;
use crate::measure::{Cost, Distance, Duration, Load};
use crate::problem::ProblemData;
use crate::segment::DurationSegment;

/// A node position inside a route: position `0` is the start depot and
/// position `len() - 1` the end depot; clients sit in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub route: usize,
    pub pos: usize,
    pub loc: usize,
}

#[derive(Debug, Clone)]
pub struct SearchRoute {
    idx: usize,
    vehicle_type: usize,
    start_depot: usize,
    end_depot: usize,
    capacity: Load,
    fixed_cost: Cost,
    shift_early: Duration,
    shift_late: Duration,
    max_duration: Duration,
    max_distance: Distance,
    unit_distance_cost: Cost,
    unit_duration_cost: Cost,

    /// Visited locations, including the start and end depot.
    visits: Vec<usize>,

    cum_dist: Vec<Distance>,
    /// Cumulative reversal-distance delta: the extra distance incurred when
    /// the prefix up to a position is traversed backwards. Zero everywhere
    /// on symmetric instances.
    cum_rev: Vec<Distance>,
    cum_load: Vec<Load>,
    dur_at: Vec<DurationSegment>,
    dur_before: Vec<DurationSegment>,
    dur_after: Vec<DurationSegment>,

    load: Load,
    centroid: (f64, f64),
    angle: f64,
    dirty: bool,
}

impl SearchRoute {
    pub fn new(data: &ProblemData, idx: usize, vehicle_type: usize) -> Self {
        let veh_type = data.vehicle_type(vehicle_type);

        let mut route = SearchRoute {
            idx,
            vehicle_type,
            start_depot: veh_type.start_depot,
            end_depot: veh_type.end_depot,
            capacity: veh_type.capacity,
            fixed_cost: veh_type.fixed_cost,
            shift_early: veh_type.tw_early,
            shift_late: veh_type.tw_late,
            max_duration: veh_type.max_duration,
            max_distance: veh_type.max_distance,
            unit_distance_cost: veh_type.unit_distance_cost,
            unit_duration_cost: veh_type.unit_duration_cost,
            visits: vec![veh_type.start_depot, veh_type.end_depot],
            cum_dist: Vec::new(),
            cum_rev: Vec::new(),
            cum_load: Vec::new(),
            dur_at: Vec::new(),
            dur_before: Vec::new(),
            dur_after: Vec::new(),
            load: Load(0),
            centroid: (0.0, 0.0),
            angle: 0.0,
            dirty: true,
        };

        route.update(data);
        route
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    pub fn start_depot(&self) -> usize {
        self.start_depot
    }

    pub fn end_depot(&self) -> usize {
        self.end_depot
    }

    pub fn capacity(&self) -> Load {
        self.capacity
    }

    pub fn fixed_cost(&self) -> Cost {
        self.fixed_cost
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn max_distance(&self) -> Distance {
        self.max_distance
    }

    /// Number of positions, including both depots.
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn num_clients(&self) -> usize {
        self.visits.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.num_clients() == 0
    }

    /// The location at the given position.
    #[inline]
    pub fn loc(&self, pos: usize) -> usize {
        self.visits[pos]
    }

    /// Positions of the client visits (excludes the depots).
    pub fn client_positions(&self) -> std::ops::Range<usize> {
        1..self.len() - 1
    }

    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    /// Client locations in visit order.
    pub fn clients(&self) -> &[usize] {
        &self.visits[1..self.visits.len() - 1]
    }

    /// Splices a client before the given position.
    pub fn insert(&mut self, pos: usize, loc: usize) {
        debug_assert!(pos >= 1 && pos < self.visits.len());
        self.visits.insert(pos, loc);
        self.dirty = true;
    }

    pub fn push(&mut self, loc: usize) {
        let end = self.visits.len() - 1;
        self.visits.insert(end, loc);
        self.dirty = true;
    }

    /// Detaches the client at the given position.
    pub fn remove(&mut self, pos: usize) -> usize {
        debug_assert!(pos >= 1 && pos < self.visits.len() - 1);
        self.dirty = true;
        self.visits.remove(pos)
    }

    /// Removes `len` consecutive clients starting at `start`.
    pub fn extract_span(&mut self, start: usize, len: usize) -> Vec<usize> {
        debug_assert!(start >= 1 && start + len <= self.visits.len() - 1);
        self.dirty = true;
        self.visits.drain(start..start + len).collect()
    }

    /// Replaces `len` positions starting at `start` with the given clients.
    pub fn replace_span(&mut self, start: usize, len: usize, new: &[usize]) {
        debug_assert!(start >= 1 && start + len <= self.visits.len() - 1);
        self.dirty = true;
        self.visits.splice(start..start + len, new.iter().copied());
    }

    /// Reverses the client span `[start, end]` in place.
    pub fn reverse_span(&mut self, start: usize, end: usize) {
        debug_assert!(start >= 1 && end < self.visits.len() - 1);
        self.visits[start..=end].reverse();
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.visits.clear();
        self.visits.push(self.start_depot);
        self.visits.push(self.end_depot);
        self.dirty = true;
    }

    /// Recomputes every cache in one linear pass over the visit list.
    pub fn update(&mut self, data: &ProblemData) {
        let size = self.visits.len();
        let durations = data.duration_matrix();

        self.cum_dist.clear();
        self.cum_rev.clear();
        self.cum_load.clear();
        self.dur_at.clear();

        self.cum_dist.push(Distance(0));
        self.cum_rev.push(Distance(0));
        self.cum_load.push(Load(0));

        for pos in 0..size {
            let loc = self.visits[pos];

            if pos > 0 {
                let prev = self.visits[pos - 1];
                self.cum_dist
                    .push(self.cum_dist[pos - 1] + data.dist(prev, loc));
                self.cum_rev
                    .push(self.cum_rev[pos - 1] + data.dist(loc, prev) - data.dist(prev, loc));

                let demand = if data.is_depot(loc) {
                    Load(0)
                } else {
                    data.client(loc).demand
                };
                self.cum_load.push(self.cum_load[pos - 1] + demand);
            }

            let segment = if data.is_depot(loc) {
                DurationSegment::depot(loc, data.depot(loc), self.shift_early, self.shift_late)
            } else {
                DurationSegment::client(loc, data.client(loc))
            };
            self.dur_at.push(segment);
        }

        self.dur_before.clear();
        self.dur_before.push(self.dur_at[0]);
        for pos in 1..size {
            let merged =
                DurationSegment::merge(durations, self.dur_before[pos - 1], self.dur_at[pos]);
            self.dur_before.push(merged);
        }

        self.dur_after = vec![self.dur_at[size - 1]; size];
        for pos in (0..size - 1).rev() {
            self.dur_after[pos] =
                DurationSegment::merge(durations, self.dur_at[pos], self.dur_after[pos + 1]);
        }

        self.load = self.cum_load[size - 1];

        self.centroid = (0.0, 0.0);
        let num_clients = self.num_clients();
        let locs: Vec<usize> = self.clients().to_vec();
        for loc in locs {
            let client = data.client(loc);
            self.centroid.0 += client.x as f64 / num_clients as f64;
            self.centroid.1 += client.y as f64 / num_clients as f64;
        }

        let (data_x, data_y) = data.centroid();
        self.angle = (self.centroid.1 - data_y).atan2(self.centroid.0 - data_x);

        self.dirty = false;
    }

    pub fn distance(&self) -> Distance {
        debug_assert!(!self.dirty);
        *self.cum_dist.last().unwrap()
    }

    pub fn excess_distance(&self) -> Distance {
        (self.distance() - self.max_distance).max(Distance(0))
    }

    /// Cumulative distance from the start depot up to the given position.
    pub fn dist_before(&self, pos: usize) -> Distance {
        debug_assert!(!self.dirty);
        self.cum_dist[pos]
    }

    /// Travel distance of the span `[start, end]`.
    pub fn dist_between(&self, start: usize, end: usize) -> Distance {
        debug_assert!(!self.dirty && start <= end);
        self.cum_dist[end] - self.cum_dist[start]
    }

    /// Extra distance incurred when `[start, end]` is traversed backwards.
    pub fn reversal_delta(&self, start: usize, end: usize) -> Distance {
        debug_assert!(!self.dirty && start <= end);
        self.cum_rev[end] - self.cum_rev[start]
    }

    pub fn load(&self) -> Load {
        debug_assert!(!self.dirty);
        self.load
    }

    pub fn excess_load(&self) -> Load {
        (self.load() - self.capacity).max(Load(0))
    }

    /// Total demand of the span `[start, end]`.
    pub fn demand_between(&self, start: usize, end: usize) -> Load {
        debug_assert!(!self.dirty && start <= end);
        let before = if start == 0 {
            Load(0)
        } else {
            self.cum_load[start - 1]
        };
        self.cum_load[end] - before
    }

    /// Duration segment for the single visit at `pos`.
    pub fn at(&self, pos: usize) -> DurationSegment {
        debug_assert!(!self.dirty);
        self.dur_at[pos]
    }

    /// Duration segment covering the start depot through `pos`, inclusive.
    pub fn before(&self, pos: usize) -> DurationSegment {
        debug_assert!(!self.dirty);
        self.dur_before[pos]
    }

    /// Duration segment covering `pos` through the end depot, inclusive.
    pub fn after(&self, pos: usize) -> DurationSegment {
        debug_assert!(!self.dirty);
        self.dur_after[pos]
    }

    /// Duration segment for the span `[start, end]`, built by folding the
    /// per-visit segments.
    pub fn between(&self, data: &ProblemData, start: usize, end: usize) -> DurationSegment {
        debug_assert!(!self.dirty && start <= end);
        let durations = data.duration_matrix();

        let mut segment = self.dur_at[start];
        for pos in start + 1..=end {
            segment = DurationSegment::merge(durations, segment, self.dur_at[pos]);
        }
        segment
    }

    /// Full-route duration segment.
    pub fn full(&self) -> DurationSegment {
        debug_assert!(!self.dirty);
        self.dur_after[0]
    }

    pub fn duration(&self) -> Duration {
        self.full().duration()
    }

    pub fn time_warp(&self) -> Duration {
        self.full().total_time_warp_with(self.max_duration)
    }

    pub fn has_excess_load(&self) -> bool {
        self.excess_load() > Load(0)
    }

    pub fn has_time_warp(&self) -> bool {
        self.time_warp() > Duration(0)
    }

    pub fn is_feasible(&self) -> bool {
        !self.has_excess_load() && !self.has_time_warp() && self.excess_distance() == Distance(0)
    }

    pub fn centroid(&self) -> (f64, f64) {
        debug_assert!(!self.dirty);
        self.centroid
    }

    /// Whether the centroid polar angles of the two routes, taken around the
    /// instance centroid, differ by less than `tolerance * 2 * PI`.
    pub fn overlaps_with(&self, other: &SearchRoute, tolerance: f64) -> bool {
        debug_assert!(!self.dirty && !other.dirty);

        let two_pi = 2.0 * std::f64::consts::PI;
        let diff = (self.angle - other.angle).rem_euclid(two_pi);
        diff.min(two_pi - diff) < tolerance * two_pi
    }

    /// Prices a proposed (distance, load, duration) triple against this
    /// route's vehicle.
    pub fn proposal_cost(
        &self,
        cost_evaluator: &CostEvaluator,
        distance: Distance,
        load: Load,
        tws: DurationSegment,
    ) -> Cost {
        self.unit_distance_cost * distance.get()
            + self.unit_duration_cost * tws.duration().get()
            + cost_evaluator.load_penalty(load, self.capacity)
            + cost_evaluator.tw_penalty(tws.total_time_warp_with(self.max_duration))
            + cost_evaluator.dist_penalty(distance, self.max_distance)
    }

    /// Penalised cost of the route as it currently stands, excluding the
    /// fixed vehicle cost.
    pub fn current_cost(&self, cost_evaluator: &CostEvaluator) -> Cost {
        self.proposal_cost(cost_evaluator, self.distance(), self.load(), self.full())
    }

    /// Penalised cost including the fixed vehicle cost of non-empty routes.
    pub fn penalised_cost(&self, cost_evaluator: &CostEvaluator) -> Cost {
        let fixed = if self.is_empty() {
            Cost(0)
        } else {
            self.fixed_cost
        };
        self.current_cost(cost_evaluator) + fixed
    }
}

/// A view onto a contiguous span of some route, possibly reversed. Proposals
/// are lists of these; see [`eval_proposal`].
#[derive(Debug, Clone, Copy)]
pub enum SegmentRef<'a> {
    /// Start depot through `end`, inclusive.
    Before(&'a SearchRoute, usize),
    /// `start` through the end depot, inclusive.
    After(&'a SearchRoute, usize),
    /// The span `[start, end]`.
    Between(&'a SearchRoute, usize, usize),
    /// The span `[start, end]`, traversed in reverse.
    BetweenRev(&'a SearchRoute, usize, usize),
    /// A single client location that is not currently in any route.
    Loose(usize),
}

impl<'a> SegmentRef<'a> {
    pub fn first_loc(&self) -> usize {
        match *self {
            SegmentRef::Before(route, _) => route.loc(0),
            SegmentRef::After(route, start) => route.loc(start),
            SegmentRef::Between(route, start, _) => route.loc(start),
            SegmentRef::BetweenRev(route, _, end) => route.loc(end),
            SegmentRef::Loose(loc) => loc,
        }
    }

    pub fn last_loc(&self) -> usize {
        match *self {
            SegmentRef::Before(route, end) => route.loc(end),
            SegmentRef::After(route, _) => route.loc(route.len() - 1),
            SegmentRef::Between(route, _, end) => route.loc(end),
            SegmentRef::BetweenRev(route, start, _) => route.loc(start),
            SegmentRef::Loose(loc) => loc,
        }
    }

    pub fn distance(&self) -> Distance {
        match *self {
            SegmentRef::Before(route, end) => route.dist_before(end),
            SegmentRef::After(route, start) => route.dist_between(start, route.len() - 1),
            SegmentRef::Between(route, start, end) => route.dist_between(start, end),
            SegmentRef::BetweenRev(route, start, end) => {
                route.dist_between(start, end) + route.reversal_delta(start, end)
            }
            SegmentRef::Loose(_) => Distance(0),
        }
    }

    pub fn demand(&self, data: &ProblemData) -> Load {
        match *self {
            SegmentRef::Before(route, end) => route.demand_between(0, end),
            SegmentRef::After(route, start) => route.demand_between(start, route.len() - 1),
            SegmentRef::Between(route, start, end)
            | SegmentRef::BetweenRev(route, start, end) => route.demand_between(start, end),
            SegmentRef::Loose(loc) => data.client(loc).demand,
        }
    }

    pub fn duration(&self, data: &ProblemData) -> DurationSegment {
        match *self {
            SegmentRef::Before(route, end) => route.before(end),
            SegmentRef::After(route, start) => route.after(start),
            SegmentRef::Between(route, start, end) => route.between(data, start, end),
            SegmentRef::BetweenRev(route, start, end) => {
                let durations = data.duration_matrix();
                let mut segment = route.at(end);
                for pos in (start..end).rev() {
                    segment = DurationSegment::merge(durations, segment, route.at(pos));
                }
                segment
            }
            SegmentRef::Loose(loc) => DurationSegment::client(loc, data.client(loc)),
        }
    }
}

/// Evaluates the penalised cost of the route that would result from
/// concatenating the given segments, priced against `target`'s vehicle.
/// Runs in time linear in the number of segments (plus the length of any
/// `Between` spans), not the route length.
pub fn eval_proposal(
    data: &ProblemData,
    cost_evaluator: &CostEvaluator,
    target: &SearchRoute,
    segments: &[SegmentRef],
) -> Cost {
    debug_assert!(!segments.is_empty());
    let durations = data.duration_matrix();

    let mut distance = segments[0].distance();
    let mut load = segments[0].demand(data);
    let mut tws = segments[0].duration(data);
    let mut last = segments[0].last_loc();

    for segment in &segments[1..] {
        distance += data.dist(last, segment.first_loc()) + segment.distance();
        load += segment.demand(data);
        tws = DurationSegment::merge(durations, tws, segment.duration(data));
        last = segment.last_loc();
    }

    target.proposal_cost(cost_evaluator, distance, load, tws)
}

/// Mutably borrows two distinct routes from the slice.
pub fn pair_mut(routes: &mut [SearchRoute], first: usize, second: usize) -> (&mut SearchRoute, &mut SearchRoute) {
    assert_ne!(first, second);
    if first < second {
        let (head, tail) = routes.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = routes.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}
