//! Penalised objective computation.

use crate::measure::{Cost, Distance, Duration, Load};

/// Implemented by anything the [`CostEvaluator`] can price: full solutions
/// and mutable search routes alike.
pub trait CostEvaluatable {
    fn distance_cost(&self) -> Cost;
    fn duration_cost(&self) -> Cost;
    fn fixed_vehicle_cost(&self) -> Cost;
    fn excess_load(&self) -> Load;
    fn excess_distance(&self) -> Distance;
    fn time_warp(&self) -> Duration;
    fn uncollected_prizes(&self) -> Cost;
    fn is_feasible(&self) -> bool;
}

/// Prices solutions and proposed moves under the current penalty
/// coefficients.
///
/// Carries three linear coefficients: one per unit of excess load, one per
/// unit of time warp, and one per unit of distance beyond the vehicle's
/// maximum distance. Transient infeasibilities are not errors; they are
/// priced and driven out by the adaptive penalty scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostEvaluator {
    load_penalty: Cost,
    tw_penalty: Cost,
    dist_penalty: Cost,
}

impl CostEvaluator {
    pub fn new(load_penalty: Cost, tw_penalty: Cost, dist_penalty: Cost) -> Self {
        CostEvaluator {
            load_penalty,
            tw_penalty,
            dist_penalty,
        }
    }

    /// Penalty for carrying `load` in a vehicle of the given capacity.
    #[inline]
    pub fn load_penalty(&self, load: Load, capacity: Load) -> Cost {
        let excess = (load - capacity).max(Load(0));
        self.load_penalty * excess.get()
    }

    /// Penalty for the given amount of time warp.
    #[inline]
    pub fn tw_penalty(&self, time_warp: Duration) -> Cost {
        debug_assert!(time_warp >= Duration(0));
        self.tw_penalty * time_warp.get()
    }

    /// Penalty for travelling `distance` against a maximum distance bound.
    #[inline]
    pub fn dist_penalty(&self, distance: Distance, max_distance: Distance) -> Cost {
        let excess = (distance - max_distance).max(Distance(0));
        self.dist_penalty * excess.get()
    }

    /// The smoothed objective: travel and duration costs, fixed vehicle
    /// costs, uncollected prizes, and linear penalties for any constraint
    /// violations.
    pub fn penalised_cost<T: CostEvaluatable>(&self, item: &T) -> Cost {
        item.distance_cost()
            + item.duration_cost()
            + item.fixed_vehicle_cost()
            + item.uncollected_prizes()
            + self.load_penalty * item.excess_load().get()
            + self.tw_penalty(item.time_warp())
            + self.dist_penalty * item.excess_distance().get()
    }

    /// Objective value for feasible items; `Cost::MAX` otherwise. Penalties
    /// vanish on feasible items, so this is the true objective there.
    pub fn cost<T: CostEvaluatable>(&self, item: &T) -> Cost {
        if item.is_feasible() {
            self.penalised_cost(item)
        } else {
            Cost::MAX
        }
    }
}
