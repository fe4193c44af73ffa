//! Command-line entry point for the HGS-VRPTW solver.

use clap::Parser;
use hgs_vrptw::config::Config;
use hgs_vrptw::instance::{read_instance, write_solution};
use hgs_vrptw::stop::{MaxIterations, MaxRuntime, MultipleCriteria, NoImprovement, StoppingCriterion};
use hgs_vrptw::GeneticAlgorithm;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration as StdDuration;

/// Hybrid genetic search solver for rich vehicle routing problems.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to a VRPLIB-format instance file.
    instance: PathBuf,

    /// Seed for the random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Wall-clock limit in seconds.
    #[arg(long)]
    time_limit: Option<f64>,

    /// Hard iteration limit.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// JSON parameter file overriding the default configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write per-iteration statistics to this CSV file.
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Write the best solution to this file.
    #[arg(long)]
    solution: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let data = read_instance(&args.instance)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.seed = args.seed;
    if let Some(seconds) = args.time_limit {
        config.time_limit = Some(StdDuration::from_secs_f64(seconds));
    }
    if args.stats.is_some() {
        config.collect_statistics = true;
    }

    let mut criteria: Vec<Box<dyn StoppingCriterion>> =
        vec![Box::new(NoImprovement::new(config.nb_iter))];
    if let Some(limit) = config.time_limit {
        criteria.push(Box::new(MaxRuntime::new(limit)));
    }
    if let Some(max_iterations) = args.max_iterations {
        criteria.push(Box::new(MaxIterations::new(max_iterations)));
    }
    let mut stop = MultipleCriteria::new(criteria);

    let mut algorithm = GeneticAlgorithm::new(data, config)?;
    let result = algorithm.run(&mut stop);

    let best = result
        .best
        .as_ref()
        .ok_or("no feasible solution found within the search budget")?;

    print!("{best}");
    println!("Cost: {}", result.cost);
    println!("Time: {}", result.runtime_seconds);

    if let Some(path) = &args.solution {
        write_solution(path, best, result.cost, result.runtime_seconds)?;
    }

    if let Some(path) = &args.stats {
        result.statistics.to_csv(path)?;
    }

    Ok(())
}
