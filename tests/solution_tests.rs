//! Tests for the immutable solution representation.

use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::measure::{Distance, Duration, Load};
use hgs_vrptw::problem::{Client, Depot, ProblemData, VehicleType};
use hgs_vrptw::solution::{Route, Solution, SolutionError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A depot and four clients with explicit, symmetric travel times.
fn create_test_data() -> ProblemData {
    let weights: Vec<i64> = vec![
        0, 1000, 1200, 800, 900, //
        1000, 0, 500, 2000, 1500, //
        1200, 500, 0, 700, 1100, //
        800, 2000, 700, 0, 600, //
        900, 1500, 1100, 600, 0,
    ];

    let dist = Matrix::from_vec(5, weights.iter().map(|&w| Distance(w)).collect());
    let dur = Matrix::from_vec(5, weights.iter().map(|&w| Duration(w)).collect());

    let clients = vec![
        Client::new(0, 1000)
            .with_demand(Load(5))
            .with_service_duration(Duration(360))
            .with_time_window(Duration(15_600), Duration(22_500)),
        Client::new(500, 1000)
            .with_demand(Load(5))
            .with_service_duration(Duration(360))
            .with_time_window(Duration(12_000), Duration(19_500)),
        Client::new(0, -800)
            .with_demand(Load(3))
            .with_service_duration(Duration(420))
            .with_time_window(Duration(8_400), Duration(15_300)),
        Client::new(-900, 0)
            .with_demand(Load(5))
            .with_service_duration(Duration(360))
            .with_time_window(Duration(12_000), Duration(19_500)),
    ];

    ProblemData::new(
        vec![Depot::new(0, 0)],
        clients,
        vec![VehicleType::new(Load(10), 3)],
        dist,
        dur,
    )
    .unwrap()
}

#[test]
fn three_route_plan_is_feasible() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();

    assert!(solution.is_complete());
    assert!(!solution.has_excess_load());
    assert!(!solution.has_time_warp());
    assert!(solution.is_feasible());

    assert_eq!(solution.num_routes(), 3);
    assert_eq!(solution.distance(), Distance(6_100));
    assert_eq!(solution.time_warp(), Duration(0));
    assert_eq!(solution.excess_load(), Load(0));
}

#[test]
fn route_aggregates_follow_the_segment_algebra() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();

    let route = &solution.routes()[0];
    assert_eq!(route.visits(), &[1, 2]);
    assert_eq!(route.distance(), Distance(2_700));
    assert_eq!(route.load(), Load(10));
    assert_eq!(route.excess_load(), Load(0));

    // Departing at 14600 reaches client 1 exactly at its window opening;
    // the route then runs without waiting.
    assert_eq!(route.start_time(), Duration(14_600));
    assert_eq!(route.slack(), Duration(3_040));
    assert_eq!(route.duration(), Duration(3_420));
    assert_eq!(route.wait_duration(), Duration(0));
    assert_eq!(route.time_warp(), Duration(0));
}

#[test]
fn single_route_plan_is_infeasible() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2, 3, 4]]).unwrap();

    assert!(solution.is_complete());
    assert_eq!(solution.distance(), Distance(3_700));

    // Total demand 18 against capacity 10.
    assert!(solution.has_excess_load());
    assert_eq!(solution.excess_load(), Load(8));

    // Client 3's window has long closed by the time service at client 2
    // completes.
    assert!(solution.has_time_warp());
    assert_eq!(solution.time_warp(), Duration(2_220));

    assert!(!solution.is_feasible());
}

#[test]
fn solution_distance_matches_matrix_sums() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();

    let mut expected = Distance(0);
    for route in solution.routes() {
        let visits = route.visits();
        expected += data.dist(route.start_depot(), visits[0]);
        for pair in visits.windows(2) {
            expected += data.dist(pair[0], pair[1]);
        }
        expected += data.dist(visits[visits.len() - 1], route.end_depot());
    }

    assert_eq!(solution.distance(), expected);
}

#[test]
fn solution_time_warp_is_the_route_sum() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 3], vec![2, 4]]).unwrap();

    let total: Duration = solution.routes().iter().map(|r| r.time_warp()).sum();
    assert_eq!(solution.time_warp(), total);
    assert!(solution.routes().iter().all(|r| r.time_warp() >= Duration(0)));
}

#[test]
fn neighbours_report_predecessor_and_successor() {
    let data = create_test_data();

    // The empty visit list is skipped.
    let solution = Solution::from_visits(&data, vec![vec![3, 4], vec![], vec![1, 2]]).unwrap();

    assert_eq!(solution.neighbours(0), (0, 0));
    assert_eq!(solution.neighbours(1), (0, 2));
    assert_eq!(solution.neighbours(2), (1, 0));
    assert_eq!(solution.neighbours(3), (0, 4));
    assert_eq!(solution.neighbours(4), (3, 0));
}

#[test]
fn incomplete_solutions_are_infeasible() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3]]).unwrap();

    assert!(!solution.is_complete());
    assert!(!solution.is_feasible());
    assert!(!solution.has_excess_load());
    assert!(!solution.has_time_warp());
}

#[test]
fn duplicate_visits_are_rejected() {
    let data = create_test_data();
    let result = Solution::from_visits(&data, vec![vec![1, 2], vec![2, 3]]);

    assert!(matches!(result, Err(SolutionError::DuplicateClient(2))));
}

#[test]
fn empty_routes_are_rejected() {
    let data = create_test_data();
    assert!(matches!(
        Route::new(&data, vec![], 0),
        Err(SolutionError::EmptyRoute)
    ));
}

#[test]
fn too_many_routes_are_rejected() {
    let data = create_test_data();
    let result = Solution::from_visits(&data, vec![vec![1], vec![2], vec![3], vec![4]]);

    assert!(matches!(result, Err(SolutionError::TooManyRoutes)));
}

#[test]
fn equality_ignores_route_order() {
    let data = create_test_data();

    let first = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();
    let second = Solution::from_visits(&data, vec![vec![3], vec![1, 2], vec![4]]).unwrap();
    let third = Solution::from_visits(&data, vec![vec![2, 1], vec![3], vec![4]]).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, third);

    let hash = |solution: &Solution| {
        let mut hasher = DefaultHasher::new();
        solution.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(&first), hash(&second));
}

#[test]
fn random_solutions_visit_every_client_once() {
    let data = create_test_data();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..25 {
        let solution = Solution::random(&data, &mut rng);

        assert!(solution.is_complete());
        assert!(solution.num_routes() <= data.num_vehicles());
        assert_eq!(solution.num_clients(), data.num_clients());

        let mut seen = vec![false; data.num_locations()];
        for route in solution.routes() {
            for &client in route.visits() {
                assert!(!seen[client], "client visited twice");
                seen[client] = true;
            }
        }
    }
}

#[test]
fn display_lists_routes_in_vrplib_format() {
    let data = create_test_data();
    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();

    let printed = solution.to_string();
    assert_eq!(printed, "Route #1: 1 2\nRoute #2: 3\nRoute #3: 4\n");
}
