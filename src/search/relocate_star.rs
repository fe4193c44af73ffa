//! RELOCATE*: the best single-client relocation between two routes.

use super::exchange::Exchange;
use super::route::{NodeRef, SearchRoute};
use super::{Ctx, NodeOperator, RouteOperator};
use crate::measure::Cost;
use crate::problem::ProblemData;

pub struct RelocateStar {
    relocate: Exchange<1, 0>,
    best: Option<(Cost, NodeRef, NodeRef)>,
}

impl RelocateStar {
    pub fn new() -> Self {
        RelocateStar {
            relocate: Exchange::<1, 0>,
            best: None,
        }
    }

    fn consider(&mut self, u: NodeRef, v: NodeRef, ctx: &Ctx) {
        let delta = self.relocate.evaluate(u, v, ctx);
        let is_better = self.best.map_or(delta < Cost(0), |(best, _, _)| delta < best);

        if is_better {
            self.best = Some((delta, u, v));
        }
    }
}

impl Default for RelocateStar {
    fn default() -> Self {
        RelocateStar::new()
    }
}

impl RouteOperator for RelocateStar {
    fn prepare(&mut self, _data: &ProblemData, _routes: &[SearchRoute]) {
        self.best = None;
    }

    fn evaluate(&mut self, u_route: usize, v_route: usize, ctx: &Ctx) -> Cost {
        self.best = None;

        let route_u = &ctx.routes[u_route];
        let route_v = &ctx.routes[v_route];

        for u_pos in route_u.client_positions() {
            let u = NodeRef {
                route: u_route,
                pos: u_pos,
                loc: route_u.loc(u_pos),
            };

            // Insertion just after V's start depot.
            let depot = NodeRef {
                route: v_route,
                pos: 0,
                loc: route_v.loc(0),
            };
            self.consider(u, depot, ctx);

            for v_pos in route_v.client_positions() {
                let v = NodeRef {
                    route: v_route,
                    pos: v_pos,
                    loc: route_v.loc(v_pos),
                };

                self.consider(u, v, ctx);
                self.consider(v, u, ctx);
            }
        }

        self.best.map_or(Cost(0), |(delta, _, _)| delta)
    }

    fn apply(&mut self, _u_route: usize, _v_route: usize, routes: &mut [SearchRoute]) {
        let (_, u, v) = self.best.expect("apply without prior evaluate");
        self.relocate.apply(u, v, routes);
    }

    fn route_modified(&mut self, _route: usize) {}

    fn name(&self) -> &'static str {
        "relocate-star"
    }
}
