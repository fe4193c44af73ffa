//! Tests for the local search, its route representation, and operators.

use hgs_vrptw::config::Config;
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::measure::{Cost, Distance, Duration, Load};
use hgs_vrptw::problem::{Client, Depot, ProblemData, VehicleType};
use hgs_vrptw::search::{compute_neighbours, LocalSearch, SearchRoute};
use hgs_vrptw::solution::Solution;
use hgs_vrptw::CostEvaluator;

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

fn evaluator() -> CostEvaluator {
    CostEvaluator::new(Cost(20), Cost(6), Cost(20))
}

#[test]
fn neighbourhoods_exclude_self_and_depot() {
    let data = create_test_data();
    let config = Config::default().with_nb_granular(2);

    let neighbours = compute_neighbours(&data, &config);

    assert!(neighbours[0].is_empty());
    for client in data.client_locations() {
        assert_eq!(neighbours[client].len(), 2);
        for &other in &neighbours[client] {
            assert_ne!(other, client);
            assert!(!data.is_depot(other));
        }
    }
}

#[test]
fn search_route_caches_match_the_solution_route() {
    let data = create_test_data();

    let mut route = SearchRoute::new(&data, 0, 0);
    route.push(1);
    route.push(2);
    route.update(&data);

    let reference = Solution::from_visits(&data, vec![vec![1, 2]]).unwrap();
    let reference = &reference.routes()[0];

    assert_eq!(route.distance(), reference.distance());
    assert_eq!(route.load(), reference.load());
    assert_eq!(route.excess_load(), reference.excess_load());
    assert_eq!(route.time_warp(), reference.time_warp());
    assert_eq!(route.duration(), reference.duration());
}

#[test]
fn search_route_edits_and_update_stay_consistent() {
    let data = create_test_data();

    let mut route = SearchRoute::new(&data, 0, 0);
    route.push(1);
    route.push(3);
    route.push(2);
    route.update(&data);

    // Removing and reinserting at another position must reproduce the
    // statistics of a route built directly in the final order.
    let removed = route.remove(2);
    assert_eq!(removed, 3);
    route.insert(1, 3);
    route.update(&data);

    let mut direct = SearchRoute::new(&data, 1, 0);
    direct.push(3);
    direct.push(1);
    direct.push(2);
    direct.update(&data);

    assert_eq!(route.visits(), direct.visits());
    assert_eq!(route.distance(), direct.distance());
    assert_eq!(route.time_warp(), direct.time_warp());
    assert_eq!(route.load(), direct.load());
}

#[test]
fn route_segments_compose_to_the_full_route() {
    let data = create_test_data();

    let mut route = SearchRoute::new(&data, 0, 0);
    route.push(1);
    route.push(2);
    route.push(3);
    route.update(&data);

    let durations = data.duration_matrix();
    for split in 0..route.len() - 1 {
        let merged = hgs_vrptw::segment::DurationSegment::merge(
            durations,
            route.before(split),
            route.after(split + 1),
        );

        let full = route.full();
        assert_eq!(merged.duration(), full.duration());
        assert_eq!(merged.time_warp(), full.time_warp());
    }

    assert_eq!(
        route.dist_between(0, route.len() - 1),
        route.distance()
    );
    assert_eq!(route.demand_between(0, route.len() - 1), route.load());
}

#[test]
fn search_merges_singleton_routes_when_cheaper() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let config = Config::default();

    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    // Clients 1 and 2 are close together and far from the depot; serving
    // them separately is clearly wasteful.
    let start = Solution::from_visits(&data, vec![vec![1], vec![2], vec![3, 4]]).unwrap();
    let improved = local_search.search(&data, &cost_evaluator, &start);

    assert!(
        cost_evaluator.penalised_cost(&improved) < cost_evaluator.penalised_cost(&start),
        "local search failed to improve an obviously bad plan"
    );
}

#[test]
fn search_does_not_worsen_a_solution() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let config = Config::default();

    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    let start = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();
    let improved = local_search.search(&data, &cost_evaluator, &start);

    assert!(improved.is_complete());
    assert!(
        cost_evaluator.penalised_cost(&improved) <= cost_evaluator.penalised_cost(&start)
    );
}

#[test]
fn run_reaches_a_local_optimum_and_keeps_feasibility() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let config = Config::default();

    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    let start = Solution::from_visits(&data, vec![vec![4, 1], vec![2, 3]]).unwrap();
    let improved = local_search.run(&data, &cost_evaluator, &start);

    assert!(improved.is_complete());
    assert!(
        cost_evaluator.penalised_cost(&improved) <= cost_evaluator.penalised_cost(&start)
    );

    // Running again from the result must change nothing.
    let again = local_search.run(&data, &cost_evaluator, &improved);
    assert_eq!(
        cost_evaluator.penalised_cost(&again),
        cost_evaluator.penalised_cost(&improved)
    );
}

#[test]
fn load_and_export_round_trip_preserves_the_solution() {
    let data = create_test_data();
    let config = Config::default();

    let mut local_search = LocalSearch::new(&data, compute_neighbours(&data, &config));

    let solution = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();
    local_search.load_solution(&data, &solution);
    let exported = local_search.export_solution(&data);

    assert_eq!(exported, solution);
    assert_eq!(exported.distance(), solution.distance());
}

#[test]
fn search_plans_missing_required_clients() {
    let data = create_test_data();
    let cost_evaluator = evaluator();
    let config = Config::default();

    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    // Client 4 is not planned; the search must insert it somewhere.
    let start = Solution::from_visits(&data, vec![vec![1, 2], vec![3]]).unwrap();
    assert!(!start.is_complete());

    let improved = local_search.search(&data, &cost_evaluator, &start);
    assert!(improved.is_complete());
}

#[test]
fn optional_clients_without_prize_are_dropped() {
    let data = create_test_data();

    // Make client 4 optional with no prize; visiting it can only cost.
    let mut clients: Vec<Client> = data
        .client_locations()
        .map(|c| data.client(c).clone())
        .collect();
    clients[3] = clients[3].clone().with_required(false);

    let data = data
        .replace(None, Some(clients), None, None, None)
        .unwrap();

    let cost_evaluator = evaluator();
    let config = Config::default();
    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    let start = Solution::from_visits(&data, vec![vec![1, 2], vec![3], vec![4]]).unwrap();
    let improved = local_search.search(&data, &cost_evaluator, &start);

    let visits_four = improved
        .routes()
        .iter()
        .any(|route| route.visits().contains(&4));
    assert!(!visits_four, "a prizeless optional client should be dropped");
    assert!(improved.is_complete());
}

#[test]
fn prized_optional_clients_are_inserted() {
    let data = create_test_data();

    // Client 4 is optional but carries a prize that dwarfs any detour.
    let mut clients: Vec<Client> = data
        .client_locations()
        .map(|c| data.client(c).clone())
        .collect();
    clients[3] = clients[3]
        .clone()
        .with_required(false)
        .with_prize(hgs_vrptw::Cost(100_000));

    let data = data.replace(None, Some(clients), None, None, None).unwrap();

    let cost_evaluator = evaluator();
    let config = Config::default();
    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    let start = Solution::from_visits(&data, vec![vec![1, 2], vec![3]]).unwrap();
    let improved = local_search.search(&data, &cost_evaluator, &start);

    let visits_four = improved
        .routes()
        .iter()
        .any(|route| route.visits().contains(&4));
    assert!(visits_four, "a valuable optional client should be planned");
}

#[test]
fn group_moves_keep_exactly_one_member() {
    use hgs_vrptw::problem::ClientGroup;

    let data = create_test_data();

    // Clients 3 and 4 form a required, mutually exclusive group. Client 3
    // is the cheaper one to serve.
    let mut clients: Vec<Client> = data
        .client_locations()
        .map(|c| data.client(c).clone())
        .collect();
    clients[2] = clients[2].clone().with_required(false).with_group(0);
    clients[3] = clients[3].clone().with_required(false).with_group(0);

    let data = ProblemData::with_groups(
        vec![Depot::new(0, 0)],
        clients,
        vec![ClientGroup::new(vec![3, 4], true)],
        vec![VehicleType::new(Load(10), 3)],
        data.distance_matrix().clone(),
        data.duration_matrix().clone(),
    )
    .unwrap();

    let cost_evaluator = evaluator();
    let config = Config::default();
    let mut local_search =
        LocalSearch::with_default_operators(&data, compute_neighbours(&data, &config));

    let start = Solution::from_visits(&data, vec![vec![1, 2], vec![4]]).unwrap();
    let improved = local_search.search(&data, &cost_evaluator, &start);

    let visits = |loc: usize| {
        improved
            .routes()
            .iter()
            .any(|route| route.visits().contains(&loc))
    };

    // Exactly one group member survives, and it is the cheaper one.
    assert!(visits(3), "the cheaper group member should be chosen");
    assert!(!visits(4));
    assert!(improved.is_complete());
}
