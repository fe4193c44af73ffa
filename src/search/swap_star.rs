//! SWAP*: exchanges two clients between routes with independent choices of
//! reinsertion position.

use super::route::{eval_proposal, pair_mut, SearchRoute, SegmentRef};
use super::{Ctx, RouteOperator};
use crate::measure::Cost;
use crate::problem::ProblemData;
use crate::segment::DurationSegment;

/// Best insertion positions of a client in a route, cheapest first.
#[derive(Debug, Clone)]
struct InsertPoints {
    costs: [Cost; 3],
    positions: [Option<usize>; 3],
    should_update: bool,
}

impl Default for InsertPoints {
    fn default() -> Self {
        InsertPoints {
            costs: [Cost::MAX; 3],
            positions: [None; 3],
            should_update: true,
        }
    }
}

impl InsertPoints {
    fn maybe_add(&mut self, cost: Cost, position: usize) {
        if cost >= self.costs[2] {
            return;
        }

        let mut entry = (cost, Some(position));
        for idx in 0..3 {
            if entry.0 < self.costs[idx] {
                std::mem::swap(&mut entry.0, &mut self.costs[idx]);
                std::mem::swap(&mut entry.1, &mut self.positions[idx]);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BestMove {
    cost: Cost,
    u_pos: usize,
    u_loc: usize,
    /// Insertion position for V in U's route (insert after this position).
    x_u: usize,
    v_pos: usize,
    v_loc: usize,
    /// Insertion position for U in V's route.
    x_v: usize,
}

/// The SWAP* route operator. Caches, per route, the removal cost of each of
/// its clients and the three best insertion positions of every client not
/// in the route; candidate swaps are screened with these cached estimates
/// and only the best candidate is evaluated exactly.
pub struct SwapStar {
    removal_costs: Vec<Vec<Cost>>,
    insert_cache: Vec<Vec<InsertPoints>>,
    updated: Vec<bool>,
    best: Option<BestMove>,
}

impl SwapStar {
    pub fn new() -> Self {
        SwapStar {
            removal_costs: Vec::new(),
            insert_cache: Vec::new(),
            updated: Vec::new(),
            best: None,
        }
    }

    fn update_removal_costs(&mut self, route: &SearchRoute, ctx: &Ctx) {
        let data = ctx.data;
        let durations = data.duration_matrix();
        let current_tw = ctx.cost.tw_penalty(route.time_warp());

        for pos in route.client_positions() {
            let loc = route.loc(pos);
            let prev = route.loc(pos - 1);
            let next = route.loc(pos + 1);

            let tws = DurationSegment::merge(durations, route.before(pos - 1), route.after(pos + 1));
            let delta_dist =
                data.dist(prev, next) - data.dist(prev, loc) - data.dist(loc, next);

            self.removal_costs[route.idx()][loc] = Cost::from(delta_dist)
                + ctx.cost.tw_penalty(tws.total_time_warp_with(route.max_duration()))
                - current_tw;
        }
    }

    fn update_insertion_costs(&mut self, route: &SearchRoute, u_loc: usize, ctx: &Ctx) {
        let data = ctx.data;
        let durations = data.duration_matrix();
        let current_tw = ctx.cost.tw_penalty(route.time_warp());
        let u_seg = DurationSegment::client(u_loc, data.client(u_loc));

        let entry = &mut self.insert_cache[route.idx()][u_loc];
        *entry = InsertPoints {
            should_update: false,
            ..InsertPoints::default()
        };

        for pos in 0..=route.num_clients() {
            let prev = route.loc(pos);
            let next = route.loc(pos + 1);

            let delta_dist =
                data.dist(prev, u_loc) + data.dist(u_loc, next) - data.dist(prev, next);

            let tws = DurationSegment::merge(
                durations,
                DurationSegment::merge(durations, route.before(pos), u_seg),
                route.after(pos + 1),
            );

            let cost = Cost::from(delta_dist)
                + ctx.cost.tw_penalty(tws.total_time_warp_with(route.max_duration()))
                - current_tw;

            entry.maybe_add(cost, pos);
        }
    }

    /// Cheapest position to insert `u_loc` into `route`, given that the
    /// client at `v_pos` is simultaneously removed from it.
    fn best_insert_point(
        &mut self,
        route: &SearchRoute,
        u_loc: usize,
        v_pos: usize,
        ctx: &Ctx,
    ) -> (Cost, usize) {
        if self.insert_cache[route.idx()][u_loc].should_update {
            self.update_insertion_costs(route, u_loc, ctx);
        }

        let entry = &self.insert_cache[route.idx()][u_loc];
        for idx in 0..3 {
            // Positions touching the removed client are invalid; they are
            // covered by the fallback below.
            if let Some(pos) = entry.positions[idx] {
                if pos != v_pos && pos + 1 != v_pos {
                    return (entry.costs[idx], pos);
                }
            }
        }

        // Fall back to inserting in place of the removed client.
        let data = ctx.data;
        let durations = data.duration_matrix();
        let prev = route.loc(v_pos - 1);
        let next = route.loc(v_pos + 1);

        let delta_dist = data.dist(prev, u_loc) + data.dist(u_loc, next) - data.dist(prev, next);
        let u_seg = DurationSegment::client(u_loc, data.client(u_loc));
        let tws = DurationSegment::merge(
            durations,
            DurationSegment::merge(durations, route.before(v_pos - 1), u_seg),
            route.after(v_pos + 1),
        );

        let cost = Cost::from(delta_dist)
            + ctx.cost.tw_penalty(tws.total_time_warp_with(route.max_duration()))
            - ctx.cost.tw_penalty(route.time_warp());

        (cost, v_pos - 1)
    }

    /// Segment list for "remove the client at `remove_pos`, insert the
    /// client of `other` at `other_pos` after position `x`".
    fn proposal<'a>(
        route: &'a SearchRoute,
        remove_pos: usize,
        other: &'a SearchRoute,
        other_pos: usize,
        x: usize,
    ) -> Vec<SegmentRef<'a>> {
        let incoming = SegmentRef::Between(other, other_pos, other_pos);

        if x + 1 == remove_pos {
            vec![
                SegmentRef::Before(route, x),
                incoming,
                SegmentRef::After(route, remove_pos + 1),
            ]
        } else if x < remove_pos {
            vec![
                SegmentRef::Before(route, x),
                incoming,
                SegmentRef::Between(route, x + 1, remove_pos - 1),
                SegmentRef::After(route, remove_pos + 1),
            ]
        } else {
            vec![
                SegmentRef::Before(route, remove_pos - 1),
                SegmentRef::Between(route, remove_pos + 1, x),
                incoming,
                SegmentRef::After(route, x + 1),
            ]
        }
    }
}

impl Default for SwapStar {
    fn default() -> Self {
        SwapStar::new()
    }
}

impl RouteOperator for SwapStar {
    fn prepare(&mut self, data: &ProblemData, routes: &[SearchRoute]) {
        let num_routes = routes.len();
        let num_locations = data.num_locations();

        self.removal_costs = vec![vec![Cost(0); num_locations]; num_routes];
        self.insert_cache = vec![vec![InsertPoints::default(); num_locations]; num_routes];
        self.updated = vec![true; num_routes];
        self.best = None;
    }

    fn evaluate(&mut self, u_route: usize, v_route: usize, ctx: &Ctx) -> Cost {
        self.best = None;

        for idx in [u_route, v_route] {
            if self.updated[idx] {
                self.update_removal_costs(&ctx.routes[idx], ctx);
                self.updated[idx] = false;

                for entry in &mut self.insert_cache[idx] {
                    entry.should_update = true;
                }
            }
        }

        let route_u = &ctx.routes[u_route];
        let route_v = &ctx.routes[v_route];

        for u_pos in route_u.client_positions() {
            let u_loc = route_u.loc(u_pos);
            let u_demand = ctx.data.client(u_loc).demand;

            for v_pos in route_v.client_positions() {
                let v_loc = route_v.loc(v_pos);
                let v_demand = ctx.data.client(v_loc).demand;
                let load_diff = u_demand - v_demand;

                // Screen with cached removal costs and load deltas before
                // computing insertion points.
                let mut delta = Cost(0);
                delta += ctx.cost.load_penalty(route_u.load() - load_diff, route_u.capacity());
                delta -= ctx.cost.load_penalty(route_u.load(), route_u.capacity());
                delta += ctx.cost.load_penalty(route_v.load() + load_diff, route_v.capacity());
                delta -= ctx.cost.load_penalty(route_v.load(), route_v.capacity());
                delta += self.removal_costs[u_route][u_loc];
                delta += self.removal_costs[v_route][v_loc];

                if delta >= Cost(0) {
                    continue;
                }

                let (extra_u, x_v) = self.best_insert_point(route_v, u_loc, v_pos, ctx);
                delta += extra_u;
                if delta >= Cost(0) {
                    continue;
                }

                let (extra_v, x_u) = self.best_insert_point(route_u, v_loc, u_pos, ctx);
                delta += extra_v;

                let is_better = self
                    .best
                    .map_or(delta < Cost(0), |best| delta < best.cost);
                if is_better {
                    self.best = Some(BestMove {
                        cost: delta,
                        u_pos,
                        u_loc,
                        x_u,
                        v_pos,
                        v_loc,
                        x_v,
                    });
                }
            }
        }

        let Some(best) = self.best else {
            return Cost(0);
        };

        if best.cost >= Cost(0) {
            return best.cost;
        }

        // Fully evaluate the best candidate; only this result is exact.
        let prop_u = Self::proposal(route_u, best.u_pos, route_v, best.v_pos, best.x_u);
        let prop_v = Self::proposal(route_v, best.v_pos, route_u, best.u_pos, best.x_v);

        let mut delta = Cost(0);
        delta += eval_proposal(ctx.data, ctx.cost, route_u, &prop_u);
        delta -= route_u.current_cost(ctx.cost);
        delta += eval_proposal(ctx.data, ctx.cost, route_v, &prop_v);
        delta -= route_v.current_cost(ctx.cost);

        delta
    }

    fn apply(&mut self, u_route: usize, v_route: usize, routes: &mut [SearchRoute]) {
        let best = self.best.expect("apply without prior evaluate");
        let (route_u, route_v) = pair_mut(routes, u_route, v_route);

        route_u.remove(best.u_pos);
        route_v.remove(best.v_pos);

        let x_u = if best.x_u > best.u_pos {
            best.x_u - 1
        } else {
            best.x_u
        };
        let x_v = if best.x_v > best.v_pos {
            best.x_v - 1
        } else {
            best.x_v
        };

        route_u.insert(x_u + 1, best.v_loc);
        route_v.insert(x_v + 1, best.u_loc);
    }

    fn route_modified(&mut self, route: usize) {
        self.updated[route] = true;
    }

    fn name(&self) -> &'static str {
        "swap-star"
    }
}
