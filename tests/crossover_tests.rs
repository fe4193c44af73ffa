//! Tests for the selective route exchange crossover.

use hgs_vrptw::crossover::selective_route_exchange;
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::measure::{Cost, Distance, Duration, Load};
use hgs_vrptw::problem::{Client, Depot, ProblemData, VehicleType};
use hgs_vrptw::solution::Solution;
use hgs_vrptw::CostEvaluator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn create_test_data() -> ProblemData {
    let weights: Vec<i64> = vec![
        0, 1000, 1200, 800, 900, 1100, //
        1000, 0, 500, 2000, 1500, 700, //
        1200, 500, 0, 700, 1100, 900, //
        800, 2000, 700, 0, 600, 1300, //
        900, 1500, 1100, 600, 0, 400, //
        1100, 700, 900, 1300, 400, 0,
    ];

    let dist = Matrix::from_vec(6, weights.iter().map(|&w| Distance(w)).collect());
    let dur = Matrix::from_vec(6, weights.iter().map(|&w| Duration(w)).collect());

    let clients = vec![
        Client::new(0, 1000).with_demand(Load(5)),
        Client::new(500, 1000).with_demand(Load(5)),
        Client::new(0, -800).with_demand(Load(3)),
        Client::new(-900, 0).with_demand(Load(5)),
        Client::new(-400, 500).with_demand(Load(2)),
    ];

    ProblemData::new(
        vec![Depot::new(0, 0)],
        clients,
        vec![VehicleType::new(Load(10), 4)],
        dist,
        dur,
    )
    .unwrap()
}

fn evaluator() -> CostEvaluator {
    CostEvaluator::new(Cost(20), Cost(6), Cost(20))
}

fn assert_valid_offspring(data: &ProblemData, offspring: &Solution) {
    // Exactly the full client set, with no duplicates, within the fleet.
    assert!(offspring.num_routes() <= data.num_vehicles());
    assert_eq!(offspring.num_clients(), data.num_clients());

    let mut seen = vec![false; data.num_locations()];
    for route in offspring.routes() {
        assert!(!route.is_empty());
        for &client in route.visits() {
            assert!(!seen[client], "client {client} appears twice");
            seen[client] = true;
        }
    }

    for client in data.client_locations() {
        assert!(seen[client], "client {client} is unplanned");
    }
}

#[test]
fn offspring_visit_the_same_client_set_as_the_parents() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let mut rng = ChaCha8Rng::seed_from_u64(17);

    let first = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4, 5]]).unwrap();
    let second = Solution::from_visits(&data, vec![vec![1, 5], vec![2, 3], vec![4]]).unwrap();

    for _ in 0..50 {
        let offspring =
            selective_route_exchange(&data, &cost_evaluator, (&first, &second), 90, &mut rng);
        assert_valid_offspring(&data, &offspring);
    }
}

#[test]
fn crossover_of_identical_parents_reproduces_the_parent() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let parent = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4, 5]]).unwrap();

    let offspring =
        selective_route_exchange(&data, &cost_evaluator, (&parent, &parent), 100, &mut rng);

    assert_valid_offspring(&data, &offspring);
    assert_eq!(offspring.distance(), parent.distance());
}

#[test]
fn crossover_with_single_route_parents() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let mut rng = ChaCha8Rng::seed_from_u64(23);

    let first = Solution::from_visits(&data, vec![vec![1, 2, 3, 4, 5]]).unwrap();
    let second = Solution::from_visits(&data, vec![vec![5, 4, 3, 2, 1]]).unwrap();

    for _ in 0..20 {
        let offspring =
            selective_route_exchange(&data, &cost_evaluator, (&first, &second), 90, &mut rng);
        assert_valid_offspring(&data, &offspring);
    }
}

#[test]
fn crossover_is_deterministic_under_a_fixed_seed() {
    let data = create_test_data();
    let cost_evaluator = evaluator();

    let first = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4, 5]]).unwrap();
    let second = Solution::from_visits(&data, vec![vec![2, 5], vec![1, 3], vec![4]]).unwrap();

    let run = || {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        selective_route_exchange(&data, &cost_evaluator, (&first, &second), 90, &mut rng)
    };

    assert_eq!(run(), run());
}
