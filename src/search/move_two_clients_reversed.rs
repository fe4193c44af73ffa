//! Relocates the pair (U, next(U)) after V in reversed order.

use super::route::{eval_proposal, pair_mut, NodeRef, SearchRoute, SegmentRef};
use super::{Ctx, NodeOperator};
use crate::measure::Cost;

pub struct MoveTwoClientsReversed;

impl NodeOperator for MoveTwoClientsReversed {
    fn evaluate(&mut self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        let route_u = &ctx.routes[u.route];
        let route_v = &ctx.routes[v.route];

        // The successor of U must be a client, and the move must actually
        // change something.
        let succ_is_depot = u.pos + 1 > route_u.num_clients();
        let u_after_v = u.route == v.route && u.pos == v.pos + 1;
        let v_after_u = u.route == v.route && v.pos == u.pos + 1;

        if succ_is_depot || u_after_v || v_after_u {
            return Cost(0);
        }

        let mut delta = Cost(0);

        if u.route != v.route {
            if route_u.num_clients() == 2 {
                delta -= route_u.fixed_cost();
            }
            if route_v.is_empty() {
                delta += route_v.fixed_cost();
            }

            let prop_u = [
                SegmentRef::Before(route_u, u.pos - 1),
                SegmentRef::After(route_u, u.pos + 2),
            ];
            let prop_v = [
                SegmentRef::Before(route_v, v.pos),
                SegmentRef::Between(route_u, u.pos + 1, u.pos + 1),
                SegmentRef::Between(route_u, u.pos, u.pos),
                SegmentRef::After(route_v, v.pos + 1),
            ];

            delta += eval_proposal(ctx.data, ctx.cost, route_u, &prop_u);
            delta -= route_u.current_cost(ctx.cost);
            delta += eval_proposal(ctx.data, ctx.cost, route_v, &prop_v);
            delta -= route_v.current_cost(ctx.cost);
        } else {
            let route = route_u;
            let proposal: Vec<SegmentRef> = if u.pos < v.pos {
                vec![
                    SegmentRef::Before(route, u.pos - 1),
                    SegmentRef::Between(route, u.pos + 2, v.pos),
                    SegmentRef::Between(route, u.pos + 1, u.pos + 1),
                    SegmentRef::Between(route, u.pos, u.pos),
                    SegmentRef::After(route, v.pos + 1),
                ]
            } else {
                vec![
                    SegmentRef::Before(route, v.pos),
                    SegmentRef::Between(route, u.pos + 1, u.pos + 1),
                    SegmentRef::Between(route, u.pos, u.pos),
                    SegmentRef::Between(route, v.pos + 1, u.pos - 1),
                    SegmentRef::After(route, u.pos + 2),
                ]
            };

            delta += eval_proposal(ctx.data, ctx.cost, route, &proposal);
            delta -= route.current_cost(ctx.cost);
        }

        delta
    }

    fn apply(&mut self, u: NodeRef, v: NodeRef, routes: &mut [SearchRoute]) {
        if u.route == v.route {
            let route = &mut routes[u.route];
            let pair = route.extract_span(u.pos, 2);
            let reversed = [pair[1], pair[0]];

            let insert_at = if v.pos > u.pos {
                v.pos - 2 + 1
            } else {
                v.pos + 1
            };
            route.replace_span(insert_at, 0, &reversed);
        } else {
            let (route_u, route_v) = pair_mut(routes, u.route, v.route);
            let pair = route_u.extract_span(u.pos, 2);
            route_v.replace_span(v.pos + 1, 0, &[pair[1], pair[0]]);
        }
    }

    fn name(&self) -> &'static str {
        "move-two-clients-reversed"
    }
}
