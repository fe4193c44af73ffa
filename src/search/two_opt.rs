//! 2-opt: within-route segment reversal and between-route tail exchange.

use super::route::{eval_proposal, pair_mut, NodeRef, SearchRoute, SegmentRef};
use super::{Ctx, NodeOperator};
use crate::measure::Cost;

pub struct TwoOpt;

impl TwoOpt {
    fn eval_within(&self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        if u.pos + 1 >= v.pos {
            return Cost(0);
        }

        let route = &ctx.routes[u.route];
        let proposal = [
            SegmentRef::Before(route, u.pos),
            SegmentRef::BetweenRev(route, u.pos + 1, v.pos),
            SegmentRef::After(route, v.pos + 1),
        ];

        eval_proposal(ctx.data, ctx.cost, route, &proposal) - route.current_cost(ctx.cost)
    }

    fn eval_between(&self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        let route_u = &ctx.routes[u.route];
        let route_v = &ctx.routes[v.route];

        // Tail evaluation borrows the other route's end-depot segment,
        // which is only valid when both routes share a vehicle type.
        if route_u.vehicle_type() != route_v.vehicle_type() {
            return Cost(0);
        }

        let mut delta = Cost(0);

        // V's route empties when it hands over its whole tail and receives
        // nothing; it starts being used when it was empty before.
        let u_tail_empty = u.pos + 1 == route_u.len() - 1;
        let v_tail_empty = v.pos + 1 == route_v.len() - 1;

        if v.pos == 0 && u_tail_empty && !route_v.is_empty() {
            delta -= route_v.fixed_cost();
        }
        if route_v.is_empty() && !u_tail_empty {
            delta += route_v.fixed_cost();
        }
        if u.pos == 0 && v_tail_empty && !route_u.is_empty() {
            delta -= route_u.fixed_cost();
        }

        let prop_u = [
            SegmentRef::Before(route_u, u.pos),
            SegmentRef::After(route_v, v.pos + 1),
        ];
        let prop_v = [
            SegmentRef::Before(route_v, v.pos),
            SegmentRef::After(route_u, u.pos + 1),
        ];

        delta += eval_proposal(ctx.data, ctx.cost, route_u, &prop_u);
        delta -= route_u.current_cost(ctx.cost);
        delta += eval_proposal(ctx.data, ctx.cost, route_v, &prop_v);
        delta -= route_v.current_cost(ctx.cost);

        delta
    }
}

impl NodeOperator for TwoOpt {
    fn evaluate(&mut self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        // The symmetric pair is evaluated when the route order is reversed.
        if u.route > v.route {
            return Cost(0);
        }

        if u.route == v.route {
            self.eval_within(u, v, ctx)
        } else {
            self.eval_between(u, v, ctx)
        }
    }

    fn apply(&mut self, u: NodeRef, v: NodeRef, routes: &mut [SearchRoute]) {
        if u.route == v.route {
            routes[u.route].reverse_span(u.pos + 1, v.pos);
        } else {
            let (route_u, route_v) = pair_mut(routes, u.route, v.route);

            let tail_u = route_u.visits()[u.pos + 1..route_u.len() - 1].to_vec();
            let tail_v = route_v.visits()[v.pos + 1..route_v.len() - 1].to_vec();

            route_u.replace_span(u.pos + 1, tail_u.len(), &tail_v);
            route_v.replace_span(v.pos + 1, tail_v.len(), &tail_u);
        }
    }

    fn name(&self) -> &'static str {
        "two-opt"
    }
}
