//! The (N, M)-exchange family of node operators.

use super::route::{eval_proposal, pair_mut, NodeRef, SearchRoute, SegmentRef};
use super::{Ctx, NodeOperator};
use crate::measure::Cost;

/// Moves `N` consecutive clients starting at `U` into `V`'s route, swapping
/// in `M` consecutive clients starting at `V` when `M > 0`. Covers the
/// classic relocate (`M == 0`) and swap operators as special cases.
pub struct Exchange<const N: usize, const M: usize>;

impl<const N: usize, const M: usize> Exchange<N, M> {
    /// The segment of `len` visits starting at `pos` runs off the client
    /// span of the route (or starts at a depot).
    fn contains_depot(route: &SearchRoute, pos: usize, len: usize) -> bool {
        pos == 0 || pos + len - 1 > route.num_clients()
    }

    fn overlap(u: NodeRef, v: NodeRef) -> bool {
        u.route == v.route && u.pos <= v.pos + M.max(1) - 1 && v.pos <= u.pos + N - 1
    }

    fn adjacent(u: NodeRef, v: NodeRef) -> bool {
        u.route == v.route && (u.pos + N == v.pos || v.pos + M == u.pos)
    }

    fn eval_relocate(&self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        let route_u = &ctx.routes[u.route];
        let route_v = &ctx.routes[v.route];

        let mut delta = Cost(0);

        if u.route != v.route {
            // Fixed costs shift when V's route starts being used or U's
            // route stops being used.
            if route_v.is_empty() {
                delta += route_v.fixed_cost();
            }
            if route_u.num_clients() == N {
                delta -= route_u.fixed_cost();
            }

            let prop_u = [
                SegmentRef::Before(route_u, u.pos - 1),
                SegmentRef::After(route_u, u.pos + N),
            ];
            let prop_v = [
                SegmentRef::Before(route_v, v.pos),
                SegmentRef::Between(route_u, u.pos, u.pos + N - 1),
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
                    SegmentRef::Between(route, u.pos + N, v.pos),
                    SegmentRef::Between(route, u.pos, u.pos + N - 1),
                    SegmentRef::After(route, v.pos + 1),
                ]
            } else {
                vec![
                    SegmentRef::Before(route, v.pos),
                    SegmentRef::Between(route, u.pos, u.pos + N - 1),
                    SegmentRef::Between(route, v.pos + 1, u.pos - 1),
                    SegmentRef::After(route, u.pos + N),
                ]
            };

            delta += eval_proposal(ctx.data, ctx.cost, route, &proposal);
            delta -= route.current_cost(ctx.cost);
        }

        delta
    }

    fn eval_swap(&self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        let route_u = &ctx.routes[u.route];
        let route_v = &ctx.routes[v.route];

        let mut delta = Cost(0);

        if u.route != v.route {
            let prop_u = [
                SegmentRef::Before(route_u, u.pos - 1),
                SegmentRef::Between(route_v, v.pos, v.pos + M - 1),
                SegmentRef::After(route_u, u.pos + N),
            ];
            let prop_v = [
                SegmentRef::Before(route_v, v.pos - 1),
                SegmentRef::Between(route_u, u.pos, u.pos + N - 1),
                SegmentRef::After(route_v, v.pos + M),
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
                    SegmentRef::Between(route, v.pos, v.pos + M - 1),
                    SegmentRef::Between(route, u.pos + N, v.pos - 1),
                    SegmentRef::Between(route, u.pos, u.pos + N - 1),
                    SegmentRef::After(route, v.pos + M),
                ]
            } else {
                vec![
                    SegmentRef::Before(route, v.pos - 1),
                    SegmentRef::Between(route, u.pos, u.pos + N - 1),
                    SegmentRef::Between(route, v.pos + M, u.pos - 1),
                    SegmentRef::Between(route, v.pos, v.pos + M - 1),
                    SegmentRef::After(route, u.pos + N),
                ]
            };

            delta += eval_proposal(ctx.data, ctx.cost, route, &proposal);
            delta -= route.current_cost(ctx.cost);
        }

        delta
    }
}

impl<const N: usize, const M: usize> NodeOperator for Exchange<N, M> {
    fn evaluate(&mut self, u: NodeRef, v: NodeRef, ctx: &Ctx) -> Cost {
        if Self::contains_depot(&ctx.routes[u.route], u.pos, N) || Self::overlap(u, v) {
            return Cost(0);
        }

        if M > 0 && Self::contains_depot(&ctx.routes[v.route], v.pos, M) {
            return Cost(0);
        }

        if M == 0 {
            // Relocating U directly after its own predecessor is a no-op.
            if u.route == v.route && u.pos == v.pos + 1 {
                return Cost(0);
            }

            self.eval_relocate(u, v, ctx)
        } else {
            // Symmetric moves need only be evaluated from one side.
            if N == M && u.loc >= v.loc {
                return Cost(0);
            }

            if Self::adjacent(u, v) {
                return Cost(0);
            }

            self.eval_swap(u, v, ctx)
        }
    }

    fn apply(&mut self, u: NodeRef, v: NodeRef, routes: &mut [SearchRoute]) {
        if u.route == v.route {
            let route = &mut routes[u.route];

            if M == 0 {
                let segment = route.extract_span(u.pos, N);
                let insert_at = if v.pos > u.pos {
                    v.pos - N + 1
                } else {
                    v.pos + 1
                };
                route.replace_span(insert_at, 0, &segment);
            } else if u.pos < v.pos {
                let u_seg = route.visits()[u.pos..u.pos + N].to_vec();
                let v_seg = route.visits()[v.pos..v.pos + M].to_vec();
                route.replace_span(v.pos, M, &u_seg);
                route.replace_span(u.pos, N, &v_seg);
            } else {
                let u_seg = route.visits()[u.pos..u.pos + N].to_vec();
                let v_seg = route.visits()[v.pos..v.pos + M].to_vec();
                route.replace_span(u.pos, N, &v_seg);
                route.replace_span(v.pos, M, &u_seg);
            }
        } else {
            let (route_u, route_v) = pair_mut(routes, u.route, v.route);

            if M == 0 {
                let segment = route_u.extract_span(u.pos, N);
                route_v.replace_span(v.pos + 1, 0, &segment);
            } else {
                let u_seg = route_u.visits()[u.pos..u.pos + N].to_vec();
                let v_seg = route_v.visits()[v.pos..v.pos + M].to_vec();
                route_u.replace_span(u.pos, N, &v_seg);
                route_v.replace_span(v.pos, M, &u_seg);
            }
        }
    }

    fn name(&self) -> &'static str {
        match (N, M) {
            (1, 0) => "relocate",
            (2, 0) => "relocate-pair",
            (3, 0) => "relocate-triple",
            (1, 1) => "swap",
            _ => "exchange",
        }
    }
}
