//! Benchmarks for the HGS-VRPTW solver.

#[cfg(feature = "bench")]
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
#[cfg(feature = "bench")]
use hgs_vrptw::config::Config;
#[cfg(feature = "bench")]
use hgs_vrptw::matrix::Matrix;
#[cfg(feature = "bench")]
use hgs_vrptw::measure::{Distance, Duration, Load};
#[cfg(feature = "bench")]
use hgs_vrptw::problem::{Client, Depot, ProblemData, VehicleType};
#[cfg(feature = "bench")]
use hgs_vrptw::stop::MaxIterations;
#[cfg(feature = "bench")]
use hgs_vrptw::GeneticAlgorithm;

/// Clients on a grid with loose time windows and unit demands.
#[cfg(feature = "bench")]
fn create_benchmark_data(size: usize) -> ProblemData {
    let grid = (size as f64).sqrt().ceil() as i64;

    let mut coords = vec![(0i64, 0i64)];
    for idx in 0..size as i64 {
        coords.push(((idx % grid) * 10, (idx / grid) * 10));
    }

    let num_locations = coords.len();
    let mut weights = Vec::with_capacity(num_locations * num_locations);
    for &(x1, y1) in &coords {
        for &(x2, y2) in &coords {
            let dist = (((x1 - x2).pow(2) + (y1 - y2).pow(2)) as f64).sqrt();
            weights.push((10.0 * dist) as i64);
        }
    }

    let clients = coords[1..]
        .iter()
        .map(|&(x, y)| {
            Client::new(x, y)
                .with_demand(Load(1))
                .with_time_window(Duration(0), Duration(1_000_000))
        })
        .collect();

    let dist = Matrix::from_vec(num_locations, weights.iter().map(|&w| Distance(w)).collect());
    let dur = Matrix::from_vec(num_locations, weights.iter().map(|&w| Duration(w)).collect());

    ProblemData::new(
        vec![Depot::new(0, 0)],
        clients,
        vec![VehicleType::new(Load(10), (size / 5).max(1))],
        dist,
        dur,
    )
    .unwrap()
}

#[cfg(feature = "bench")]
fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for size in [20, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let data = create_benchmark_data(size);
                let config = Config::default().with_min_pop_size(10).with_generation_size(10);
                let mut algorithm = GeneticAlgorithm::new(data, config).unwrap();
                let mut stop = MaxIterations::new(50);
                algorithm.run(&mut stop)
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
criterion_group!(benches, benchmark_search);
#[cfg(feature = "bench")]
criterion_main!(benches);

#[cfg(not(feature = "bench"))]
fn main() {}
