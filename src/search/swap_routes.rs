//! Exchanges the full visit plans of two routes.

use super::route::{eval_proposal, pair_mut, SearchRoute, SegmentRef};
use super::{Ctx, RouteOperator};
use crate::measure::Cost;
use crate::problem::ProblemData;

/// Swapping whole routes only matters when the vehicles differ, e.g. in
/// capacity, depot, or shift; for identical vehicles the move is a no-op.
pub struct SwapRoutes;

impl RouteOperator for SwapRoutes {
    fn prepare(&mut self, _data: &ProblemData, _routes: &[SearchRoute]) {}

    fn evaluate(&mut self, u_route: usize, v_route: usize, ctx: &Ctx) -> Cost {
        let route_u = &ctx.routes[u_route];
        let route_v = &ctx.routes[v_route];

        if route_u.vehicle_type() == route_v.vehicle_type()
            || route_u.is_empty()
            || route_v.is_empty()
        {
            return Cost(0);
        }

        let prop_u = [
            SegmentRef::Before(route_u, 0),
            SegmentRef::Between(route_v, 1, route_v.num_clients()),
            SegmentRef::After(route_u, route_u.len() - 1),
        ];
        let prop_v = [
            SegmentRef::Before(route_v, 0),
            SegmentRef::Between(route_u, 1, route_u.num_clients()),
            SegmentRef::After(route_v, route_v.len() - 1),
        ];

        let mut delta = Cost(0);
        delta += eval_proposal(ctx.data, ctx.cost, route_u, &prop_u);
        delta -= route_u.current_cost(ctx.cost);
        delta += eval_proposal(ctx.data, ctx.cost, route_v, &prop_v);
        delta -= route_v.current_cost(ctx.cost);

        delta
    }

    fn apply(&mut self, u_route: usize, v_route: usize, routes: &mut [SearchRoute]) {
        let (route_u, route_v) = pair_mut(routes, u_route, v_route);

        let clients_u = route_u.clients().to_vec();
        let clients_v = route_v.clients().to_vec();

        route_u.replace_span(1, clients_u.len(), &clients_v);
        route_v.replace_span(1, clients_v.len(), &clients_u);
    }

    fn route_modified(&mut self, _route: usize) {}

    fn name(&self) -> &'static str {
        "swap-routes"
    }
}
