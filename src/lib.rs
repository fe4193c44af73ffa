//! # HGS-VRPTW
//!
//! A Rust implementation of Hybrid Genetic Search for rich vehicle routing
//! problems with capacities, time windows, release times, service
//! durations, and optional prize-collecting clients.
//!
//! Based on the hybrid genetic search framework of Vidal et al., combining
//! a steady-state genetic algorithm with a granular local search whose
//! move evaluations run in constant time through associative segment
//! concatenation, selective route exchange crossover, and adaptive
//! penalty management steering the population toward feasibility.

pub mod config;
pub mod cost;
pub mod crossover;
pub mod instance;
pub mod matrix;
pub mod measure;
pub mod penalty;
pub mod population;
pub mod problem;
pub mod search;
pub mod segment;
pub mod solution;
pub mod statistics;
pub mod stop;

pub use config::Config;
pub use cost::{CostEvaluatable, CostEvaluator};
pub use measure::{Cost, Distance, Duration, Load};
pub use penalty::PenaltyManager;
pub use population::Population;
pub use problem::ProblemData;
pub use solution::Solution;
pub use statistics::Statistics;

use crate::config::ConfigError;
use crate::crossover::selective_route_exchange;
use crate::population::broken_pairs_distance;
use crate::search::{compute_neighbours, LocalSearch, OVERLAP_TOLERANCE};
use crate::stop::StoppingCriterion;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Outcome of a [`GeneticAlgorithm`] run.
pub struct SearchResult {
    /// Best feasible solution found, if any.
    pub best: Option<Solution>,
    /// Objective of the best solution; `Cost::MAX` when none was found.
    pub cost: Cost,
    pub statistics: Statistics,
    pub iterations: usize,
    pub runtime_seconds: f64,
}

/// The main loop: select parents, recombine, educate the offspring with
/// local search, and adapt the penalty coefficients.
pub struct GeneticAlgorithm {
    data: ProblemData,
    config: Config,
    rng: ChaCha8Rng,
    penalty_manager: PenaltyManager,
    population: Population,
    local_search: LocalSearch,
    load_feasible: Vec<bool>,
    time_feasible: Vec<bool>,
}

impl GeneticAlgorithm {
    pub fn new(data: ProblemData, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let penalty_manager = PenaltyManager::from_data(&data, &config);
        let neighbours = compute_neighbours(&data, &config);
        let local_search = LocalSearch::with_default_operators(&data, neighbours);

        let cost_evaluator = penalty_manager.cost_evaluator();
        let population = Population::new(&data, &cost_evaluator, &config, &mut rng);

        Ok(GeneticAlgorithm {
            data,
            config,
            rng,
            penalty_manager,
            population,
            local_search,
            load_feasible: Vec::new(),
            time_feasible: Vec::new(),
        })
    }

    pub fn data(&self) -> &ProblemData {
        &self.data
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    fn best_cost(&self) -> Cost {
        let cost_evaluator = self.penalty_manager.cost_evaluator();
        self.population
            .best_found()
            .map_or(Cost::MAX, |best| cost_evaluator.cost(best))
    }

    /// Runs the search until the stopping criterion fires. With a fixed
    /// seed and configuration the produced solutions are reproducible.
    pub fn run(&mut self, stop: &mut dyn StoppingCriterion) -> SearchResult {
        let start = Instant::now();
        let mut statistics = Statistics::new();
        let mut iterations = 0usize;
        let mut idle_iterations = 0usize;

        while self.data.num_clients() > 1 && !stop.should_stop(self.best_cost()) {
            iterations += 1;
            let previous_best = self.best_cost();

            self.local_search.shuffle(&mut self.rng);

            let cost_evaluator = self.penalty_manager.cost_evaluator();
            let (first, second) = {
                let (first, second) = self.population.select(&self.data, &mut self.rng);
                debug!(
                    "selected parents at diversity {:.3}",
                    broken_pairs_distance(&self.data, first, second)
                );
                (first.clone(), second.clone())
            };

            let offspring = selective_route_exchange(
                &self.data,
                &cost_evaluator,
                (&first, &second),
                self.config.select_probability,
                &mut self.rng,
            );

            self.educate(offspring);

            if iterations % self.config.nb_penalty_management == 0 {
                self.update_penalties();
            }

            if self.config.collect_statistics {
                let cost_evaluator = self.penalty_manager.cost_evaluator();
                statistics.collect_from(&self.population, &cost_evaluator);
            }

            if self.best_cost() < previous_best {
                info!(
                    "iteration {iterations}: new best solution with cost {}",
                    self.best_cost()
                );
                idle_iterations = 0;
            } else {
                idle_iterations += 1;
            }

            // Prolonged stagnation: throw the population away and start
            // over from the best solutions found so far.
            if idle_iterations >= self.config.nb_iter {
                let cost_evaluator = self.penalty_manager.cost_evaluator();
                self.population
                    .restart(&self.data, &cost_evaluator, &mut self.rng);
                idle_iterations = 0;
            }
        }

        SearchResult {
            best: self.population.best_found().cloned(),
            cost: self.best_cost(),
            statistics,
            iterations,
            runtime_seconds: start.elapsed().as_secs_f64(),
        }
    }

    /// Improves a freshly generated offspring with local search, adds it to
    /// the population, and possibly repairs it under boosted penalties.
    fn educate(&mut self, offspring: Solution) {
        let cost_evaluator = self.penalty_manager.cost_evaluator();
        let mut improved = self
            .local_search
            .search(&self.data, &cost_evaluator, &offspring);

        if self.should_intensify(&cost_evaluator, &improved) {
            improved =
                self.local_search
                    .intensify(&self.data, &cost_evaluator, &improved, OVERLAP_TOLERANCE);
        }

        self.population
            .add(&self.data, &cost_evaluator, improved.clone());
        self.load_feasible.push(!improved.has_excess_load());
        self.time_feasible.push(!improved.has_time_warp());

        if improved.is_feasible() || self.rng.gen_range(0..100) >= self.config.repair_probability {
            return;
        }

        // Repair attempt: re-run the search with temporarily boosted
        // penalties to push the offspring into feasibility.
        let repaired = {
            let booster = self.penalty_manager.booster();
            let boosted = booster.cost_evaluator();
            self.local_search.search(&self.data, &boosted, &improved)
        };

        if repaired.is_feasible() {
            let cost_evaluator = self.penalty_manager.cost_evaluator();
            let repaired = if self.should_intensify(&cost_evaluator, &repaired) {
                self.local_search
                    .intensify(&self.data, &cost_evaluator, &repaired, OVERLAP_TOLERANCE)
            } else {
                repaired
            };

            self.population
                .add(&self.data, &cost_evaluator, repaired.clone());
            self.load_feasible.push(!repaired.has_excess_load());
            self.time_feasible.push(!repaired.has_time_warp());
        }
    }

    /// Route operators only run on feasible solutions that beat the best
    /// found so far.
    fn should_intensify(&self, cost_evaluator: &CostEvaluator, solution: &Solution) -> bool {
        self.config.should_intensify
            && solution.is_feasible()
            && cost_evaluator.cost(solution) < self.best_cost()
    }

    /// Adjusts the penalty coefficients from the recent feasibility rates.
    fn update_penalties(&mut self) {
        if self.load_feasible.is_empty() {
            return;
        }

        let share = |window: &[bool]| {
            window.iter().filter(|&&feasible| feasible).count() as f64 / window.len() as f64
        };

        let load_pct = share(&self.load_feasible);
        self.penalty_manager.update_capacity_penalty(load_pct);
        self.load_feasible.clear();

        let time_pct = share(&self.time_feasible);
        self.penalty_manager.update_tw_penalty(time_pct);
        self.time_feasible.clear();

        debug!(
            "penalties adjusted: capacity {} (load-feasible {:.2}), time warp {} (time-feasible {:.2})",
            self.penalty_manager.capacity_penalty(),
            load_pct,
            self.penalty_manager.tw_penalty(),
            time_pct,
        );
    }
}
