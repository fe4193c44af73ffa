//! Population management: sub-populations, diversity, and parent selection.

use crate::config::Config;
use crate::cost::CostEvaluator;
use crate::problem::ProblemData;
use crate::solution::Solution;
use log::info;
use rand::Rng;

/// Diversity measure between two solutions: the share of clients whose
/// predecessor or successor differs between the two, normalised to [0, 1].
pub fn broken_pairs_distance(data: &ProblemData, first: &Solution, second: &Solution) -> f64 {
    let mut num_broken = 0usize;

    for client in data.client_locations() {
        let (first_pred, first_succ) = first.neighbours(client);
        let (second_pred, second_succ) = second.neighbours(client);

        num_broken += usize::from(first_succ != second_succ);
        num_broken += usize::from(first_pred != second_pred);
    }

    num_broken as f64 / (2 * data.num_clients().max(1)) as f64
}

struct Item {
    solution: Solution,
    fitness: f64,
    /// Broken-pairs distance to every other member, ascending, keyed by the
    /// other member's stable id.
    proximity: Vec<(f64, u64)>,
    id: u64,
}

/// A cost-sorted collection of solutions with a proximity structure used
/// for diversity-aware culling and biased-fitness selection.
pub struct SubPopulation {
    items: Vec<Item>,
    next_id: u64,
    min_pop_size: usize,
    max_pop_size: usize,
    nb_elite: usize,
    nb_close: usize,
}

impl SubPopulation {
    pub fn new(config: &Config) -> Self {
        SubPopulation {
            items: Vec::with_capacity(config.min_pop_size + config.generation_size + 1),
            next_id: 0,
            min_pop_size: config.min_pop_size,
            max_pop_size: config.min_pop_size + config.generation_size,
            nb_elite: config.nb_elite,
            nb_close: config.nb_close,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.items.iter().map(|item| &item.solution)
    }

    pub fn fitness_of(&self, idx: usize) -> f64 {
        self.items[idx].fitness
    }

    pub fn solution(&self, idx: usize) -> &Solution {
        &self.items[idx].solution
    }

    /// Adds the solution, updating the proximity structure, and culls the
    /// sub-population once it exceeds `minPopSize + generationSize`.
    pub fn add(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        solution: Solution,
    ) {
        let id = self.next_id;
        self.next_id += 1;

        let mut proximity = Vec::with_capacity(self.items.len());
        for other in &mut self.items {
            let distance = broken_pairs_distance(data, &solution, &other.solution);

            let pos = other
                .proximity
                .partition_point(|&(d, _)| d < distance);
            other.proximity.insert(pos, (distance, id));

            let pos = proximity.partition_point(|&(d, _): &(f64, u64)| d < distance);
            proximity.insert(pos, (distance, other.id));
        }

        self.items.push(Item {
            solution,
            fitness: 0.0,
            proximity,
            id,
        });

        if self.items.len() > self.max_pop_size {
            self.purge(cost_evaluator);
        }

        self.update_fitness(cost_evaluator);
    }

    fn remove(&mut self, idx: usize) {
        let removed = self.items.remove(idx);
        for item in &mut self.items {
            item.proximity.retain(|&(_, id)| id != removed.id);
        }
    }

    /// Culls down to `minPopSize`: duplicates go first, then the solutions
    /// with the worst biased fitness.
    fn purge(&mut self, cost_evaluator: &CostEvaluator) {
        while self.items.len() > self.min_pop_size {
            // A zero proximity entry means an identical visit structure.
            let duplicate = self
                .items
                .iter()
                .position(|item| matches!(item.proximity.first(), Some(&(d, _)) if d == 0.0));

            if let Some(idx) = duplicate {
                self.remove(idx);
                continue;
            }

            self.update_fitness(cost_evaluator);
            let worst = self
                .items
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.fitness.total_cmp(&b.fitness))
                .map(|(idx, _)| idx)
                .expect("purge on non-empty population");

            self.remove(worst);
        }
    }

    /// Mean broken-pairs distance to the `nbClose` closest members.
    fn avg_distance_closest(&self, idx: usize) -> f64 {
        let proximity = &self.items[idx].proximity;
        let count = self.nb_close.min(proximity.len());

        if count == 0 {
            return 0.0;
        }

        let sum: f64 = proximity.iter().take(count).map(|&(d, _)| d).sum();
        sum / count as f64
    }

    /// Recomputes the biased fitness of every member from its cost rank and
    /// diversity rank.
    pub fn update_fitness(&mut self, cost_evaluator: &CostEvaluator) {
        let size = self.items.len();
        if size == 0 {
            return;
        }

        let mut by_cost: Vec<usize> = (0..size).collect();
        by_cost.sort_by_key(|&idx| cost_evaluator.penalised_cost(&self.items[idx].solution));

        // Diversity rank: larger average distance to the closest members
        // ranks first.
        let mut diversity: Vec<(f64, usize)> = (0..size)
            .map(|rank| (-self.avg_distance_closest(by_cost[rank]), rank))
            .collect();
        diversity.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let nb_elite = self.nb_elite.min(size);
        let div_weight = 1.0 - nb_elite as f64 / size as f64;

        for (div_rank, &(_, cost_rank)) in diversity.iter().enumerate() {
            let fitness = (cost_rank as f64 + div_weight * div_rank as f64) / size as f64;
            self.items[by_cost[cost_rank]].fitness = fitness;
        }
    }
}

/// The full population: one feasible and one infeasible sub-population,
/// plus the best feasible solution found across all generations.
pub struct Population {
    feasible: SubPopulation,
    infeasible: SubPopulation,
    best: Option<Solution>,
    lb_diversity: f64,
    ub_diversity: f64,
    min_pop_size: usize,
    nb_keep_on_restart: usize,
}

impl Population {
    /// Creates a population seeded with `minPopSize` random solutions.
    pub fn new<R: Rng>(
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let mut population = Population {
            feasible: SubPopulation::new(config),
            infeasible: SubPopulation::new(config),
            best: None,
            lb_diversity: config.lb_diversity,
            ub_diversity: config.ub_diversity,
            min_pop_size: config.min_pop_size,
            nb_keep_on_restart: config.nb_keep_on_restart,
        };

        for _ in 0..config.min_pop_size {
            population.add(data, cost_evaluator, Solution::random(data, rng));
        }

        population
    }

    pub fn size(&self) -> usize {
        self.feasible.len() + self.infeasible.len()
    }

    pub fn num_feasible(&self) -> usize {
        self.feasible.len()
    }

    pub fn num_infeasible(&self) -> usize {
        self.infeasible.len()
    }

    pub fn feasible(&self) -> &SubPopulation {
        &self.feasible
    }

    pub fn infeasible(&self) -> &SubPopulation {
        &self.infeasible
    }

    /// The best feasible solution observed over all generations, if any.
    pub fn best_found(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// Adds a solution to the matching sub-population and tracks the best
    /// feasible solution.
    pub fn add(&mut self, data: &ProblemData, cost_evaluator: &CostEvaluator, solution: Solution) {
        if solution.is_feasible() {
            let is_better = match &self.best {
                Some(best) => cost_evaluator.cost(&solution) < cost_evaluator.cost(best),
                None => true,
            };

            if is_better {
                self.best = Some(solution.clone());
            }

            self.feasible.add(data, cost_evaluator, solution);
        } else {
            self.infeasible.add(data, cost_evaluator, solution);
        }
    }

    /// Samples one solution by binary tournament over the union of both
    /// sub-populations.
    fn binary_tournament<'a, R: Rng>(&'a self, rng: &mut R) -> &'a Solution {
        debug_assert!(self.size() >= 1);

        let pick = |idx: usize| -> (&'a Solution, f64) {
            if idx < self.feasible.len() {
                (self.feasible.solution(idx), self.feasible.fitness_of(idx))
            } else {
                let idx = idx - self.feasible.len();
                (
                    self.infeasible.solution(idx),
                    self.infeasible.fitness_of(idx),
                )
            }
        };

        let first = rng.gen_range(0..self.size());
        let mut second = rng.gen_range(0..self.size());
        while first == second && self.size() > 1 {
            second = rng.gen_range(0..self.size());
        }

        let (first_sol, first_fitness) = pick(first);
        let (second_sol, second_fitness) = pick(second);

        if first_fitness <= second_fitness {
            first_sol
        } else {
            second_sol
        }
    }

    /// Selects two parents by binary tournament. The second draw is redone a
    /// bounded number of times until the parents' broken-pairs distance
    /// falls inside the configured diversity window.
    pub fn select<'a, R: Rng>(
        &'a self,
        data: &ProblemData,
        rng: &mut R,
    ) -> (&'a Solution, &'a Solution) {
        let first = self.binary_tournament(rng);
        let mut second = self.binary_tournament(rng);

        let mut tries = 0;
        loop {
            let diversity = broken_pairs_distance(data, first, second);
            if (self.lb_diversity..=self.ub_diversity).contains(&diversity) || tries >= 10 {
                break;
            }

            second = self.binary_tournament(rng);
            tries += 1;
        }

        (first, second)
    }

    /// Clears both sub-populations, keeps the configured number of best
    /// feasible solutions, and refills with random solutions.
    pub fn restart<R: Rng>(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        rng: &mut R,
    ) {
        info!("restarting population after stagnation");

        let mut kept: Vec<Solution> = self.feasible.solutions().cloned().collect();
        kept.sort_by_key(|sol| cost_evaluator.penalised_cost(sol));
        kept.truncate(self.nb_keep_on_restart);

        self.feasible = SubPopulation {
            items: Vec::new(),
            next_id: 0,
            min_pop_size: self.feasible.min_pop_size,
            max_pop_size: self.feasible.max_pop_size,
            nb_elite: self.feasible.nb_elite,
            nb_close: self.feasible.nb_close,
        };
        self.infeasible = SubPopulation {
            items: Vec::new(),
            next_id: 0,
            min_pop_size: self.infeasible.min_pop_size,
            max_pop_size: self.infeasible.max_pop_size,
            nb_elite: self.infeasible.nb_elite,
            nb_close: self.infeasible.nb_close,
        };

        for solution in kept {
            self.add(data, cost_evaluator, solution);
        }

        while self.size() < self.min_pop_size {
            self.add(data, cost_evaluator, Solution::random(data, rng));
        }
    }
}
