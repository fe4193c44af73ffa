//! Granular local search over node and route operators.

pub mod exchange;
pub mod move_two_clients_reversed;
pub mod relocate_star;
pub mod route;
pub mod swap_routes;
pub mod swap_star;
pub mod two_opt;

pub use exchange::Exchange;
pub use move_two_clients_reversed::MoveTwoClientsReversed;
pub use relocate_star::RelocateStar;
pub use route::{eval_proposal, NodeRef, SearchRoute, SegmentRef};
pub use swap_routes::SwapRoutes;
pub use swap_star::SwapStar;
pub use two_opt::TwoOpt;

use crate::config::Config;
use crate::cost::CostEvaluator;
use crate::measure::Cost;
use crate::problem::ProblemData;
use crate::solution::{Route, Solution};
use rand::seq::SliceRandom;
use rand::Rng;

/// Default angular tolerance for the route-pair pruning in `intensify`.
pub const OVERLAP_TOLERANCE: f64 = 0.05;

/// Read-only view handed to operators during move evaluation.
pub struct Ctx<'a> {
    pub data: &'a ProblemData,
    pub cost: &'a CostEvaluator,
    pub routes: &'a [SearchRoute],
}

/// An operator working on pairs of nodes `(U, V)`. When `evaluate` returns
/// a negative delta the evaluation is exact; non-negative returns may be
/// early-exit lower bounds.
pub trait NodeOperator {
    fn evaluate(&mut self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost;
    fn apply(&mut self, u: NodeRef, v: NodeRef, routes: &mut [SearchRoute]);
    fn name(&self) -> &'static str;
}

/// An operator working on pairs of routes, with optional per-route caches.
pub trait RouteOperator {
    /// Called once before each intensification run, with all routes loaded.
    fn prepare(&mut self, data: &ProblemData, routes: &[SearchRoute]);
    fn evaluate(&mut self, u_route: usize, v_route: usize, ctx: &Ctx) -> Cost;
    fn apply(&mut self, u_route: usize, v_route: usize, routes: &mut [SearchRoute]);
    /// Invalidates any cache the operator keeps for the given route.
    fn route_modified(&mut self, route: usize);
    fn name(&self) -> &'static str;
}

/// Computes the granular neighbourhood: for each client, the `nbGranular`
/// closest other clients under the proximity measure of Vidal (2012),
/// which penalises expected waiting time and time warp in both directions
/// and keeps the cheaper direction.
pub fn compute_neighbours(data: &ProblemData, config: &Config) -> Vec<Vec<usize>> {
    let mut neighbours = vec![Vec::new(); data.num_locations()];
    let granularity = config.nb_granular.min(data.num_clients().saturating_sub(1));

    for i in data.client_locations() {
        let client_i = data.client(i);
        let mut proximities: Vec<(i128, usize)> = Vec::with_capacity(data.num_clients());

        for j in data.client_locations() {
            if i == j {
                continue;
            }

            let client_j = data.client(j);
            let max_release = client_i.release_time.max(client_j.release_time).get() as i128;

            // Wide arithmetic: unconstrained time windows sit at i64::MAX
            // and would overflow the subtractions below.
            let directed = |from: usize, to: usize| -> i128 {
                let from_client = data.client(from);
                let to_client = data.client(to);

                let travel = data.dur(from, to).get() as i128;
                let wait = to_client.tw_early.get() as i128
                    - travel
                    - from_client.service_duration.get() as i128
                    - from_client.tw_late.get() as i128;

                let earliest_arrival = (max_release + data.dur(0, from).get() as i128)
                    .max(from_client.tw_early.get() as i128);
                let warp = earliest_arrival + from_client.service_duration.get() as i128 + travel
                    - to_client.tw_late.get() as i128;

                data.dist(from, to).get() as i128
                    + config.weight_wait_time as i128 * wait.max(0)
                    + config.weight_time_warp as i128 * warp.max(0)
            };

            let proximity = directed(j, i).min(directed(i, j));
            proximities.push((proximity, j));
        }

        proximities.sort();
        let mut closest: Vec<usize> = proximities
            .into_iter()
            .take(granularity)
            .map(|(_, j)| j)
            .collect();
        closest.sort_unstable();

        neighbours[i] = closest;
    }

    neighbours
}

/// Coordinates node and route operators over a granular neighbourhood.
///
/// Search routes and node lookup tables are allocated once, sized by the
/// number of vehicles and locations, and reused across iterations via
/// `load_solution` / `export_solution`.
pub struct LocalSearch {
    neighbours: Vec<Vec<usize>>,
    routes: Vec<SearchRoute>,
    node_route: Vec<Option<usize>>,
    node_pos: Vec<usize>,
    order_nodes: Vec<usize>,
    order_routes: Vec<usize>,
    node_ops: Vec<Box<dyn NodeOperator>>,
    route_ops: Vec<Box<dyn RouteOperator>>,
    last_modified: Vec<i64>,
    num_moves: i64,
    search_completed: bool,
}

impl LocalSearch {
    pub fn new(data: &ProblemData, neighbours: Vec<Vec<usize>>) -> Self {
        assert_eq!(neighbours.len(), data.num_locations());
        for client in data.client_locations() {
            let valid = neighbours[client]
                .iter()
                .all(|&other| other != client && !data.is_depot(other));
            assert!(valid, "neighbourhood contains a depot or the client itself");
        }

        let mut routes = Vec::with_capacity(data.num_vehicles());
        for veh_type in 0..data.num_vehicle_types() {
            for _ in 0..data.vehicle_type(veh_type).num_available {
                routes.push(SearchRoute::new(data, routes.len(), veh_type));
            }
        }

        LocalSearch {
            neighbours,
            routes,
            node_route: vec![None; data.num_locations()],
            node_pos: vec![0; data.num_locations()],
            order_nodes: data.client_locations().collect(),
            order_routes: (0..data.num_vehicles()).collect(),
            node_ops: Vec::new(),
            route_ops: Vec::new(),
            last_modified: vec![-1; data.num_vehicles()],
            num_moves: 0,
            search_completed: false,
        }
    }

    /// A local search armed with the full default operator set.
    pub fn with_default_operators(data: &ProblemData, neighbours: Vec<Vec<usize>>) -> Self {
        let mut local_search = LocalSearch::new(data, neighbours);

        local_search.add_node_operator(Box::new(Exchange::<1, 0>));
        local_search.add_node_operator(Box::new(Exchange::<2, 0>));
        local_search.add_node_operator(Box::new(Exchange::<3, 0>));
        local_search.add_node_operator(Box::new(Exchange::<1, 1>));
        local_search.add_node_operator(Box::new(Exchange::<2, 1>));
        local_search.add_node_operator(Box::new(Exchange::<3, 1>));
        local_search.add_node_operator(Box::new(Exchange::<2, 2>));
        local_search.add_node_operator(Box::new(Exchange::<3, 2>));
        local_search.add_node_operator(Box::new(Exchange::<3, 3>));
        local_search.add_node_operator(Box::new(MoveTwoClientsReversed));
        local_search.add_node_operator(Box::new(TwoOpt));

        local_search.add_route_operator(Box::new(RelocateStar::new()));
        local_search.add_route_operator(Box::new(SwapStar::new()));
        local_search.add_route_operator(Box::new(SwapRoutes));

        local_search
    }

    pub fn add_node_operator(&mut self, op: Box<dyn NodeOperator>) {
        self.node_ops.push(op);
    }

    pub fn add_route_operator(&mut self, op: Box<dyn RouteOperator>) {
        self.route_ops.push(op);
    }

    pub fn neighbours(&self) -> &[Vec<usize>] {
        &self.neighbours
    }

    /// Shuffles the client, route, and operator evaluation orders. Called
    /// once per genetic-algorithm iteration.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.order_nodes.shuffle(rng);
        self.node_ops.shuffle(rng);
        self.order_routes.shuffle(rng);
        self.route_ops.shuffle(rng);
    }

    /// Runs node operators, then route operators, repeating until neither
    /// phase finds an improving move.
    pub fn run(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        solution: &Solution,
    ) -> Solution {
        self.load_solution(data, solution);

        loop {
            self.search_internal(data, cost_evaluator);
            self.intensify_internal(data, cost_evaluator, OVERLAP_TOLERANCE);

            if self.num_moves == 0 {
                break;
            }
        }

        self.export_solution(data)
    }

    /// Node-operator phase only.
    pub fn search(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        solution: &Solution,
    ) -> Solution {
        self.load_solution(data, solution);
        self.search_internal(data, cost_evaluator);
        self.export_solution(data)
    }

    /// Route-operator phase only.
    pub fn intensify(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        solution: &Solution,
        overlap_tolerance: f64,
    ) -> Solution {
        self.load_solution(data, solution);
        self.intensify_internal(data, cost_evaluator, overlap_tolerance);
        self.export_solution(data)
    }

    fn resolve(&self, loc: usize) -> Option<NodeRef> {
        self.node_route[loc].map(|route| NodeRef {
            route,
            pos: self.node_pos[loc],
            loc,
        })
    }

    fn sync_route(&mut self, route_idx: usize) {
        let route = &self.routes[route_idx];
        for pos in route.client_positions() {
            let loc = route.loc(pos);
            self.node_route[loc] = Some(route_idx);
            self.node_pos[loc] = pos;
        }
    }

    fn update_single(&mut self, data: &ProblemData, route_idx: usize) {
        self.num_moves += 1;
        self.search_completed = false;

        self.routes[route_idx].update(data);
        self.sync_route(route_idx);
        self.last_modified[route_idx] = self.num_moves;
    }

    fn update_pair(&mut self, data: &ProblemData, first: usize, second: usize) {
        self.num_moves += 1;
        self.search_completed = false;

        self.routes[first].update(data);
        self.sync_route(first);
        self.last_modified[first] = self.num_moves;

        if first != second {
            self.routes[second].update(data);
            self.sync_route(second);
            self.last_modified[second] = self.num_moves;
        }
    }

    fn apply_node_ops(
        &mut self,
        ops: &mut [Box<dyn NodeOperator>],
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodeRef,
        v: NodeRef,
    ) -> bool {
        for op in ops.iter_mut() {
            let delta = {
                let ctx = Ctx {
                    data,
                    cost: cost_evaluator,
                    routes: &self.routes,
                };
                op.evaluate(u, v, &ctx)
            };

            if delta < Cost(0) {
                #[cfg(debug_assertions)]
                let cost_before = {
                    let extra = if u.route != v.route {
                        self.routes[v.route].penalised_cost(cost_evaluator)
                    } else {
                        Cost(0)
                    };
                    self.routes[u.route].penalised_cost(cost_evaluator) + extra
                };

                op.apply(u, v, &mut self.routes);
                self.update_pair(data, u.route, v.route);

                // Improving deltas are exact: the move must change the
                // penalised cost by exactly the evaluated amount.
                #[cfg(debug_assertions)]
                {
                    let extra = if u.route != v.route {
                        self.routes[v.route].penalised_cost(cost_evaluator)
                    } else {
                        Cost(0)
                    };
                    let cost_after =
                        self.routes[u.route].penalised_cost(cost_evaluator) + extra;
                    debug_assert_eq!(cost_after, cost_before + delta, "{}", op.name());
                }

                return true;
            }
        }

        false
    }

    fn apply_route_ops(
        &mut self,
        ops: &mut [Box<dyn RouteOperator>],
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_route: usize,
        v_route: usize,
    ) -> bool {
        for i in 0..ops.len() {
            let delta = {
                let ctx = Ctx {
                    data,
                    cost: cost_evaluator,
                    routes: &self.routes,
                };
                ops[i].evaluate(u_route, v_route, &ctx)
            };

            if delta < Cost(0) {
                #[cfg(debug_assertions)]
                let cost_before = self.routes[u_route].penalised_cost(cost_evaluator)
                    + self.routes[v_route].penalised_cost(cost_evaluator);

                ops[i].apply(u_route, v_route, &mut self.routes);
                self.update_pair(data, u_route, v_route);

                for other in ops.iter_mut() {
                    other.route_modified(u_route);
                    other.route_modified(v_route);
                }

                #[cfg(debug_assertions)]
                {
                    let cost_after = self.routes[u_route].penalised_cost(cost_evaluator)
                        + self.routes[v_route].penalised_cost(cost_evaluator);
                    debug_assert_eq!(cost_after, cost_before + delta, "{}", ops[i].name());
                }

                return true;
            }
        }

        false
    }

    fn search_internal(&mut self, data: &ProblemData, cost_evaluator: &CostEvaluator) {
        if self.node_ops.is_empty() {
            return;
        }

        let mut node_ops = std::mem::take(&mut self.node_ops);

        let mut last_tested = vec![-1i64; data.num_locations()];
        self.last_modified = vec![0; self.routes.len()];
        self.search_completed = false;
        self.num_moves = 0;

        let mut step = 0;
        while !self.search_completed {
            self.search_completed = true;

            let order = self.order_nodes.clone();
            for &u_loc in &order {
                let last_tested_node = last_tested[u_loc];
                last_tested[u_loc] = self.num_moves;

                // Removing or inserting U comes first; this matters when
                // not every client is required.
                self.apply_optional_client_moves(data, cost_evaluator, u_loc);
                self.apply_group_moves(data, cost_evaluator, u_loc);

                if self.node_route[u_loc].is_none() {
                    continue;
                }

                let neighbours = self.neighbours[u_loc].clone();
                for &v_loc in &neighbours {
                    let Some(u) = self.resolve(u_loc) else { break };
                    let Some(v) = self.resolve(v_loc) else { continue };

                    if self.last_modified[u.route] > last_tested_node
                        || self.last_modified[v.route] > last_tested_node
                    {
                        if self.apply_node_ops(&mut node_ops, data, cost_evaluator, u, v) {
                            continue;
                        }

                        // Also try V's predecessor when it is the depot;
                        // that position is in nobody's neighbour list.
                        if v.pos == 1 {
                            let depot = NodeRef {
                                route: v.route,
                                pos: 0,
                                loc: self.routes[v.route].loc(0),
                            };
                            if self.apply_node_ops(&mut node_ops, data, cost_evaluator, u, depot)
                            {
                                continue;
                            }
                        }
                    }
                }

                // Moves into empty routes are skipped in the first pass to
                // avoid opening too many routes early.
                if step > 0 {
                    self.apply_empty_route_moves(&mut node_ops, data, cost_evaluator, u_loc);
                }
            }

            step += 1;
        }

        self.node_ops = node_ops;
    }

    fn intensify_internal(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        overlap_tolerance: f64,
    ) {
        assert!(
            (0.0..=1.0).contains(&overlap_tolerance),
            "overlap tolerance must be in [0, 1]"
        );

        if self.route_ops.is_empty() {
            return;
        }

        let mut route_ops = std::mem::take(&mut self.route_ops);
        for op in route_ops.iter_mut() {
            op.prepare(data, &self.routes);
        }

        let mut last_tested = vec![-1i64; self.routes.len()];
        self.last_modified = vec![0; self.routes.len()];
        self.search_completed = false;
        self.num_moves = 0;

        while !self.search_completed {
            self.search_completed = true;

            let order = self.order_routes.clone();
            for &u_route in &order {
                if self.routes[u_route].is_empty() {
                    continue;
                }

                let last_tested_route = last_tested[u_route];
                last_tested[u_route] = self.num_moves;

                for v_route in 0..u_route {
                    if self.routes[v_route].is_empty()
                        || !self.routes[u_route]
                            .overlaps_with(&self.routes[v_route], overlap_tolerance)
                    {
                        continue;
                    }

                    let modified = self.last_modified[u_route].max(self.last_modified[v_route]);
                    if modified > last_tested_route {
                        self.apply_route_ops(&mut route_ops, data, cost_evaluator, u_route, v_route);
                    }
                }
            }
        }

        self.route_ops = route_ops;
    }

    /// Delta cost of inserting the unplanned client `u_loc` directly after
    /// position `v`.
    fn insert_cost(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
        v: NodeRef,
    ) -> Cost {
        let route = &self.routes[v.route];
        let proposal = [
            SegmentRef::Before(route, v.pos),
            SegmentRef::Loose(u_loc),
            SegmentRef::After(route, v.pos + 1),
        ];

        let mut delta = eval_proposal(data, cost_evaluator, route, &proposal)
            - route.current_cost(cost_evaluator);
        delta -= data.client(u_loc).prize;

        if route.is_empty() {
            delta += route.fixed_cost();
        }

        delta
    }

    /// Delta cost of removing the client at `u` from its route.
    fn remove_cost(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodeRef,
    ) -> Cost {
        let route = &self.routes[u.route];
        let proposal = [
            SegmentRef::Before(route, u.pos - 1),
            SegmentRef::After(route, u.pos + 1),
        ];

        let mut delta = eval_proposal(data, cost_evaluator, route, &proposal)
            - route.current_cost(cost_evaluator);
        delta += data.client(u.loc).prize;

        if route.num_clients() == 1 {
            delta -= route.fixed_cost();
        }

        delta
    }

    /// Delta cost of replacing the client at `v` with the unplanned client
    /// `u_loc`.
    fn inplace_cost(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
        v: NodeRef,
    ) -> Cost {
        let route = &self.routes[v.route];
        let proposal = [
            SegmentRef::Before(route, v.pos - 1),
            SegmentRef::Loose(u_loc),
            SegmentRef::After(route, v.pos + 1),
        ];

        eval_proposal(data, cost_evaluator, route, &proposal)
            - route.current_cost(cost_evaluator)
            + data.client(v.loc).prize
            - data.client(u_loc).prize
    }

    fn remove_client(&mut self, data: &ProblemData, u: NodeRef) {
        self.routes[u.route].remove(u.pos);
        self.node_route[u.loc] = None;
        self.update_single(data, u.route);
    }

    /// Inserts `u_loc` at the best position among the neighbours' routes.
    /// Optional clients are only inserted when doing so pays off.
    fn insert_client(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
        required: bool,
    ) {
        let mut best = NodeRef {
            route: 0,
            pos: 0,
            loc: self.routes[0].loc(0),
        };
        let mut best_cost = self.insert_cost(data, cost_evaluator, u_loc, best);

        for &v_loc in &self.neighbours[u_loc] {
            if let Some(v) = self.resolve(v_loc) {
                let cost = self.insert_cost(data, cost_evaluator, u_loc, v);
                if cost < best_cost {
                    best_cost = cost;
                    best = v;
                }
            }
        }

        if required || best_cost < Cost(0) {
            self.routes[best.route].insert(best.pos + 1, u_loc);
            self.update_single(data, best.route);
        }
    }

    fn apply_optional_client_moves(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
    ) {
        let client = data.client(u_loc);

        if client.group.is_some() {
            return; // groups have their own operator below
        }

        if let Some(u) = self.resolve(u_loc) {
            if !client.required && self.remove_cost(data, cost_evaluator, u) < Cost(0) {
                self.remove_client(data, u);
            }
        }

        if self.node_route[u_loc].is_none() {
            self.insert_client(data, cost_evaluator, u_loc, client.required);
        }
    }

    fn apply_group_moves(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
    ) {
        let Some(group_idx) = data.client(u_loc).group else {
            return;
        };

        let group = data.group(group_idx);
        let in_solution: Vec<usize> = group
            .clients
            .iter()
            .copied()
            .filter(|&c| self.node_route[c].is_some())
            .collect();

        if in_solution.is_empty() {
            self.insert_client(data, cost_evaluator, u_loc, group.required);
            return;
        }

        // Remove members in order of decreasing removal benefit, keeping
        // only the one whose removal helps least.
        let mut costs: Vec<(Cost, usize)> = in_solution
            .iter()
            .map(|&c| {
                let node = self.resolve(c).expect("group member is in a route");
                (self.remove_cost(data, cost_evaluator, node), c)
            })
            .collect();
        costs.sort();

        for &(_, member) in &costs[..costs.len() - 1] {
            let node = self.resolve(member).expect("group member is in a route");
            self.remove_client(data, node);
        }

        let kept = costs[costs.len() - 1].1;
        if kept != u_loc {
            let v = self.resolve(kept).expect("kept group member is in a route");
            if self.inplace_cost(data, cost_evaluator, u_loc, v) < Cost(0) {
                self.routes[v.route].remove(v.pos);
                self.routes[v.route].insert(v.pos, u_loc);
                self.node_route[kept] = None;
                self.update_single(data, v.route);
            }
        }
    }

    fn apply_empty_route_moves(
        &mut self,
        ops: &mut [Box<dyn NodeOperator>],
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u_loc: usize,
    ) {
        let mut begin = 0;
        for veh_type in 0..data.num_vehicle_types() {
            let end = begin + data.vehicle_type(veh_type).num_available;
            let empty = (begin..end).find(|&r| self.routes[r].is_empty());
            begin = end;

            let Some(empty) = empty else { continue };
            let Some(u) = self.resolve(u_loc) else { return };

            let depot = NodeRef {
                route: empty,
                pos: 0,
                loc: self.routes[empty].loc(0),
            };
            self.apply_node_ops(ops, data, cost_evaluator, u, depot);
        }
    }

    /// Resets the search routes to the given solution's plan.
    pub fn load_solution(&mut self, data: &ProblemData, solution: &Solution) {
        for route in &mut self.routes {
            route.clear();
            route.update(data);
        }
        self.node_route.fill(None);

        // Routes are laid out per vehicle type; place each solution route
        // in the next unused slot of its type.
        let mut offsets = vec![0usize; data.num_vehicle_types()];
        for veh_type in 1..data.num_vehicle_types() {
            offsets[veh_type] =
                offsets[veh_type - 1] + data.vehicle_type(veh_type - 1).num_available;
        }

        for sol_route in solution.routes() {
            let slot = offsets[sol_route.vehicle_type()];
            offsets[sol_route.vehicle_type()] += 1;

            let route = &mut self.routes[slot];
            debug_assert!(route.is_empty());
            for &client in sol_route.visits() {
                route.push(client);
            }
            route.update(data);
            self.sync_route(slot);
        }
    }

    /// Reads the current route plan back into an immutable solution.
    pub fn export_solution(&self, data: &ProblemData) -> Solution {
        let mut routes = Vec::new();

        for route in &self.routes {
            if route.is_empty() {
                continue;
            }

            let visits = route.clients().to_vec();
            let built = Route::new(data, visits, route.vehicle_type())
                .expect("search routes are non-empty");
            routes.push(built);
        }

        Solution::new(data, routes).expect("search maintains structural invariants")
    }
}
