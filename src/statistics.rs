//! Per-iteration search statistics and CSV export.

use crate::cost::CostEvaluator;
use crate::measure::Cost;
use crate::population::{Population, SubPopulation};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Default, Clone)]
struct SubPopStats {
    pop_size: Vec<usize>,
    best_cost: Vec<Cost>,
    avg_cost: Vec<Cost>,
    avg_num_routes: Vec<f64>,
}

impl SubPopStats {
    fn collect(&mut self, sub_pop: &SubPopulation, cost_evaluator: &CostEvaluator) {
        self.pop_size.push(sub_pop.len());

        if sub_pop.is_empty() {
            // No data; the maximum representable value stands in for
            // "missing" in the exported table.
            self.best_cost.push(Cost::MAX);
            self.avg_cost.push(Cost::MAX);
            self.avg_num_routes.push(0.0);
            return;
        }

        let costs: Vec<Cost> = sub_pop
            .solutions()
            .map(|sol| cost_evaluator.penalised_cost(sol))
            .collect();

        let best = costs.iter().copied().min().unwrap();
        let total: i64 = costs.iter().map(|c| c.get()).sum();
        self.best_cost.push(best);
        self.avg_cost.push(Cost(total / sub_pop.len() as i64));

        let num_routes: usize = sub_pop.solutions().map(|sol| sol.num_routes()).sum();
        self.avg_num_routes
            .push(num_routes as f64 / sub_pop.len() as f64);
    }
}

/// Collects population and objective statistics, one sample per iteration.
pub struct Statistics {
    start: Instant,
    last_iteration: Instant,
    num_iterations: usize,
    run_times: Vec<f64>,
    iteration_times: Vec<f64>,
    feasible: SubPopStats,
    infeasible: SubPopStats,
    /// `(runtime, objective)` samples for each new feasible best.
    incumbents: Vec<(f64, Cost)>,
}

impl Statistics {
    pub fn new() -> Self {
        let now = Instant::now();
        Statistics {
            start: now,
            last_iteration: now,
            num_iterations: 0,
            run_times: Vec::new(),
            iteration_times: Vec::new(),
            feasible: SubPopStats::default(),
            infeasible: SubPopStats::default(),
            incumbents: Vec::new(),
        }
    }

    /// Takes one sample from the population. Call once per iteration.
    pub fn collect_from(&mut self, population: &Population, cost_evaluator: &CostEvaluator) {
        self.num_iterations += 1;

        let now = Instant::now();
        self.run_times.push((now - self.start).as_secs_f64());
        self.iteration_times
            .push((now - self.last_iteration).as_secs_f64());
        self.last_iteration = now;

        self.feasible
            .collect(population.feasible(), cost_evaluator);
        self.infeasible
            .collect(population.infeasible(), cost_evaluator);

        if let Some(best) = population.best_found() {
            let cost = cost_evaluator.cost(best);
            let improved = self
                .incumbents
                .last()
                .map_or(true, |&(_, last)| cost < last);

            if improved {
                self.incumbents
                    .push(((now - self.start).as_secs_f64(), cost));
            }
        }
    }

    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    pub fn run_times(&self) -> &[f64] {
        &self.run_times
    }

    pub fn iteration_times(&self) -> &[f64] {
        &self.iteration_times
    }

    pub fn incumbents(&self) -> &[(f64, Cost)] {
        &self.incumbents
    }

    /// Writes the per-iteration samples as CSV.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> csv::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            "total_runtime_s",
            "iter_runtime_s",
            "feas_pop_size",
            "feas_best",
            "feas_avg",
            "feas_avg_routes",
            "infeas_pop_size",
            "infeas_best",
            "infeas_avg",
            "infeas_avg_routes",
        ])?;

        for it in 0..self.num_iterations {
            writer.write_record([
                self.run_times[it].to_string(),
                self.iteration_times[it].to_string(),
                self.feasible.pop_size[it].to_string(),
                self.feasible.best_cost[it].to_string(),
                self.feasible.avg_cost[it].to_string(),
                self.feasible.avg_num_routes[it].to_string(),
                self.infeasible.pop_size[it].to_string(),
                self.infeasible.best_cost[it].to_string(),
                self.infeasible.avg_cost[it].to_string(),
                self.infeasible.avg_num_routes[it].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics::new()
    }
}
