//! Stopping criteria for the genetic algorithm.

use crate::measure::Cost;
use std::time::{Duration as StdDuration, Instant};

/// Decides when the search should halt. Queried once per iteration with
/// the best objective found so far; iterations always run to completion, so
/// cancellation happens only on iteration boundaries.
pub trait StoppingCriterion {
    fn should_stop(&mut self, best_cost: Cost) -> bool;
}

/// Stops after a fixed number of iterations.
pub struct MaxIterations {
    max_iterations: usize,
    current: usize,
}

impl MaxIterations {
    pub fn new(max_iterations: usize) -> Self {
        assert!(max_iterations > 0, "zero iterations is not understood");
        MaxIterations {
            max_iterations,
            current: 0,
        }
    }
}

impl StoppingCriterion for MaxIterations {
    fn should_stop(&mut self, _best_cost: Cost) -> bool {
        self.current += 1;
        self.current > self.max_iterations
    }
}

/// Stops once a wall-clock budget is exhausted. The clock starts when the
/// criterion is constructed.
pub struct MaxRuntime {
    max_runtime: StdDuration,
    start: Instant,
}

impl MaxRuntime {
    pub fn new(max_runtime: StdDuration) -> Self {
        assert!(
            max_runtime > StdDuration::ZERO,
            "a zero run-time budget is not understood"
        );
        MaxRuntime {
            max_runtime,
            start: Instant::now(),
        }
    }
}

impl StoppingCriterion for MaxRuntime {
    fn should_stop(&mut self, _best_cost: Cost) -> bool {
        self.start.elapsed() >= self.max_runtime
    }
}

/// Stops after a number of consecutive iterations without improvement of
/// the best objective.
pub struct NoImprovement {
    max_iterations: usize,
    target: Cost,
    current: usize,
}

impl NoImprovement {
    pub fn new(max_iterations: usize) -> Self {
        assert!(max_iterations > 0, "zero iterations is not understood");
        NoImprovement {
            max_iterations,
            target: Cost::MAX,
            current: 0,
        }
    }
}

impl StoppingCriterion for NoImprovement {
    fn should_stop(&mut self, best_cost: Cost) -> bool {
        if best_cost < self.target {
            self.target = best_cost;
            self.current = 0;
        } else {
            self.current += 1;
        }

        self.current >= self.max_iterations
    }
}

/// Stops as soon as any of the wrapped criteria fires.
pub struct MultipleCriteria {
    criteria: Vec<Box<dyn StoppingCriterion>>,
}

impl MultipleCriteria {
    pub fn new(criteria: Vec<Box<dyn StoppingCriterion>>) -> Self {
        MultipleCriteria { criteria }
    }
}

impl StoppingCriterion for MultipleCriteria {
    fn should_stop(&mut self, best_cost: Cost) -> bool {
        // Every criterion is polled so stateful ones keep counting.
        self.criteria
            .iter_mut()
            .fold(false, |stop, criterion| criterion.should_stop(best_cost) || stop)
    }
}
