//! Configuration parameters for the hybrid genetic search.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// Raised when a parameter value is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// All tunable parameters of the solver, with the defaults of the reference
/// parameterisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed for the random number generator.
    pub seed: u64,
    /// Restart the population after this many iterations without
    /// improvement; also the bound used by the idle-iteration stopping
    /// criterion.
    pub nb_iter: usize,
    /// Optional wall-clock limit.
    pub time_limit: Option<StdDuration>,
    /// Collect per-iteration statistics?
    pub collect_statistics: bool,
    /// Initial time-warp penalty coefficient.
    pub initial_time_warp_penalty: u64,
    /// Penalty coefficients are adjusted every this many iterations.
    pub nb_penalty_management: usize,
    /// Penalty multiplier applied when no recent offspring was feasible.
    pub feas_booster: f64,
    /// Penalty multiplier when feasibility is below target.
    pub penalty_increase: f64,
    /// Penalty multiplier when feasibility is above target.
    pub penalty_decrease: f64,
    /// Minimum sub-population size (mu).
    pub min_pop_size: usize,
    /// Generation size before survivor selection (lambda).
    pub generation_size: usize,
    /// Number of elite solutions shielded from diversity-based culling.
    pub nb_elite: usize,
    /// Lower bound on parent diversity (broken-pairs distance).
    pub lb_diversity: f64,
    /// Upper bound on parent diversity (broken-pairs distance).
    pub ub_diversity: f64,
    /// Number of closest solutions considered in the diversity measure.
    pub nb_close: usize,
    /// Target share of feasible offspring.
    pub target_feasible: f64,
    /// Best solutions carried over on a population restart.
    pub nb_keep_on_restart: usize,
    /// Chance (in %) of attempting to repair an infeasible offspring.
    pub repair_probability: u32,
    /// Penalty multiplier while repairing.
    pub repair_booster: u32,
    /// Chance (in %) of keeping the cheaper of the two crossover offspring.
    pub select_probability: u32,
    /// Number of granular neighbours per client.
    pub nb_granular: usize,
    /// Wait-time weight in the proximity measure.
    pub weight_wait_time: i64,
    /// Time-warp weight in the proximity measure.
    pub weight_time_warp: i64,
    /// Run route operators after finding a new best solution?
    pub should_intensify: bool,
    /// Sub-path enumeration window; recognised for parameter-file
    /// compatibility.
    pub post_process_path_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: 0,
            nb_iter: 10_000,
            time_limit: None,
            collect_statistics: false,
            initial_time_warp_penalty: 6,
            nb_penalty_management: 47,
            feas_booster: 2.5,
            penalty_increase: 1.34,
            penalty_decrease: 0.32,
            min_pop_size: 25,
            generation_size: 40,
            nb_elite: 4,
            lb_diversity: 0.1,
            ub_diversity: 0.5,
            nb_close: 5,
            target_feasible: 0.43,
            nb_keep_on_restart: 0,
            repair_probability: 79,
            repair_booster: 12,
            select_probability: 90,
            nb_granular: 34,
            weight_wait_time: 18,
            weight_time_warp: 20,
            should_intensify: true,
            post_process_path_length: 7,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Loads a configuration from a JSON parameter file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks all parameters for internal consistency. Called by the
    /// algorithm constructors; a failed validation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.min_pop_size == 0 {
            return invalid("min_pop_size must be positive");
        }

        if self.generation_size == 0 {
            return invalid("generation_size must be positive");
        }

        if self.nb_granular == 0 {
            return invalid("nb_granular must be positive");
        }

        if !(0.0..=1.0).contains(&self.lb_diversity)
            || !(0.0..=1.0).contains(&self.ub_diversity)
            || self.ub_diversity <= self.lb_diversity
        {
            return invalid("diversity bounds must satisfy 0 <= lb < ub <= 1");
        }

        if !(0.0..=1.0).contains(&self.target_feasible) {
            return invalid("target_feasible must be in [0, 1]");
        }

        if self.penalty_increase < 1.0 {
            return invalid("penalty_increase must be at least 1");
        }

        if !(0.0..1.0).contains(&self.penalty_decrease) {
            return invalid("penalty_decrease must be in [0, 1)");
        }

        if self.feas_booster < 1.0 {
            return invalid("feas_booster must be at least 1");
        }

        if self.repair_probability > 100 || self.select_probability > 100 {
            return invalid("probabilities are percentages in [0, 100]");
        }

        if self.repair_booster == 0 {
            return invalid("repair_booster must be positive");
        }

        if self.nb_penalty_management == 0 {
            return invalid("nb_penalty_management must be positive");
        }

        if self.weight_wait_time < 0 || self.weight_time_warp < 0 {
            return invalid("proximity weights must be non-negative");
        }

        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_nb_iter(mut self, nb_iter: usize) -> Self {
        self.nb_iter = nb_iter;
        self
    }

    pub fn with_time_limit(mut self, limit: StdDuration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_statistics(mut self) -> Self {
        self.collect_statistics = true;
        self
    }

    pub fn with_min_pop_size(mut self, size: usize) -> Self {
        self.min_pop_size = size;
        self
    }

    pub fn with_generation_size(mut self, size: usize) -> Self {
        self.generation_size = size;
        self
    }

    pub fn with_nb_elite(mut self, n: usize) -> Self {
        self.nb_elite = n;
        self
    }

    pub fn with_nb_close(mut self, n: usize) -> Self {
        self.nb_close = n;
        self
    }

    pub fn with_diversity_bounds(mut self, lb: f64, ub: f64) -> Self {
        self.lb_diversity = lb;
        self.ub_diversity = ub;
        self
    }

    pub fn with_target_feasible(mut self, target: f64) -> Self {
        self.target_feasible = target;
        self
    }

    pub fn with_nb_granular(mut self, granularity: usize) -> Self {
        self.nb_granular = granularity;
        self
    }

    pub fn with_should_intensify(mut self, intensify: bool) -> Self {
        self.should_intensify = intensify;
        self
    }
}
