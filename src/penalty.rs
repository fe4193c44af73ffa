//! Adaptive penalty management for capacity and time-window violations.

use crate::config::Config;
use crate::cost::CostEvaluator;
use crate::measure::{Cost, Load};
use crate::problem::ProblemData;

const MIN_PENALTY: i64 = 1;
const MAX_PENALTY: i64 = 1000;

/// Tracks the penalty coefficients for excess load and time warp, and
/// adapts them to steer the search toward a target share of feasible
/// offspring.
#[derive(Debug, Clone)]
pub struct PenaltyManager {
    capacity_penalty: i64,
    tw_penalty: i64,
    dist_penalty: i64,
    penalty_increase: f64,
    penalty_decrease: f64,
    feas_booster: f64,
    target_feasible: f64,
    repair_booster: i64,
}

impl PenaltyManager {
    pub fn new(
        init_capacity_penalty: i64,
        init_tw_penalty: i64,
        penalty_increase: f64,
        penalty_decrease: f64,
        feas_booster: f64,
        target_feasible: f64,
        repair_booster: i64,
    ) -> Self {
        PenaltyManager {
            capacity_penalty: init_capacity_penalty.clamp(MIN_PENALTY, MAX_PENALTY),
            tw_penalty: init_tw_penalty.clamp(MIN_PENALTY, MAX_PENALTY),
            dist_penalty: init_capacity_penalty.clamp(MIN_PENALTY, MAX_PENALTY),
            penalty_increase,
            penalty_decrease,
            feas_booster,
            target_feasible,
            repair_booster,
        }
    }

    /// Seeds the manager from instance data: the initial capacity penalty
    /// scales with the ratio of the largest travel distance to the largest
    /// client demand, so a unit of excess load is initially comparable to a
    /// long detour.
    pub fn from_data(data: &ProblemData, config: &Config) -> Self {
        let max_dist = data.distance_matrix().max();
        let max_demand = data
            .client_locations()
            .map(|c| data.client(c).demand)
            .max()
            .unwrap_or(Load(0));

        let init_cap = max_dist.get() / max_demand.get().max(1);

        PenaltyManager::new(
            init_cap,
            config.initial_time_warp_penalty as i64,
            config.penalty_increase,
            config.penalty_decrease,
            config.feas_booster,
            config.target_feasible,
            config.repair_booster as i64,
        )
    }

    pub fn capacity_penalty(&self) -> i64 {
        self.capacity_penalty
    }

    pub fn tw_penalty(&self) -> i64 {
        self.tw_penalty
    }

    /// A cost evaluator priced with the current coefficients.
    pub fn cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(
            Cost(self.capacity_penalty),
            Cost(self.tw_penalty),
            Cost(self.dist_penalty),
        )
    }

    fn scaled(&self, penalty: i64, feas_pct: f64) -> i64 {
        let factor = if feas_pct < self.target_feasible - 0.05 {
            // No feasible offspring at all warrants a much stronger push.
            if feas_pct == 0.0 {
                self.feas_booster
            } else {
                self.penalty_increase
            }
        } else if feas_pct > self.target_feasible + 0.05 {
            self.penalty_decrease
        } else {
            return penalty;
        };

        let scaled = (penalty as f64 * factor).round() as i64;

        // Nudge by one so repeated updates cannot get stuck on small values.
        let moved = if factor > 1.0 {
            scaled.max(penalty + 1)
        } else {
            scaled.min(penalty - 1)
        };

        moved.clamp(MIN_PENALTY, MAX_PENALTY)
    }

    /// Adjusts the capacity penalty given the recent share of load-feasible
    /// offspring.
    pub fn update_capacity_penalty(&mut self, feas_pct: f64) {
        self.capacity_penalty = self.scaled(self.capacity_penalty, feas_pct);
    }

    /// Adjusts the time-warp penalty given the recent share of time-feasible
    /// offspring.
    pub fn update_tw_penalty(&mut self, feas_pct: f64) {
        self.tw_penalty = self.scaled(self.tw_penalty, feas_pct);
    }

    /// Temporarily multiplies both penalties by the repair booster. The
    /// previous coefficients are restored when the returned guard drops.
    pub fn booster(&mut self) -> PenaltyBooster<'_> {
        let old_capacity = self.capacity_penalty;
        let old_tw = self.tw_penalty;

        self.capacity_penalty = (self.capacity_penalty * self.repair_booster).min(i32::MAX as i64);
        self.tw_penalty = (self.tw_penalty * self.repair_booster).min(i32::MAX as i64);

        PenaltyBooster {
            manager: self,
            old_capacity,
            old_tw,
        }
    }
}

/// Scoped handle that keeps boosted penalties alive while repairing an
/// infeasible offspring. Restores the previous coefficients on drop.
pub struct PenaltyBooster<'a> {
    manager: &'a mut PenaltyManager,
    old_capacity: i64,
    old_tw: i64,
}

impl PenaltyBooster<'_> {
    pub fn cost_evaluator(&self) -> CostEvaluator {
        self.manager.cost_evaluator()
    }
}

impl Drop for PenaltyBooster<'_> {
    fn drop(&mut self) {
        self.manager.capacity_penalty = self.old_capacity;
        self.manager.tw_penalty = self.old_tw;
    }
}
