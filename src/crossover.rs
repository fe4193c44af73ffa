//! Selective route exchange crossover with greedy repair.

use crate::cost::CostEvaluator;
use crate::measure::{Cost, Load};
use crate::problem::ProblemData;
use crate::segment::DurationSegment;
use crate::solution::{Route, Solution};
use itertools::Itertools;
use rand::Rng;

/// Polar angle of a route's centroid around the instance centroid.
fn route_angle(data: &ProblemData, route: &Route) -> f64 {
    let (data_x, data_y) = data.centroid();
    let (route_x, route_y) = route.centroid();
    (route_y - data_y).atan2(route_x - data_x)
}

fn sort_by_asc_angle<'a>(data: &ProblemData, solution: &'a Solution) -> Vec<&'a Route> {
    solution
        .routes()
        .iter()
        .sorted_by(|a, b| {
            route_angle(data, a)
                .partial_cmp(&route_angle(data, b))
                .unwrap()
        })
        .collect()
}

/// Selective route exchange: replaces a contiguous (by polar angle) window
/// of routes in parent A with the corresponding window of parent B, after
/// shifting both windows to minimise the number of clients that need
/// replanning. Produces two candidate offspring; both are repaired and the
/// cheaper one is returned with probability `select_probability`%.
pub fn selective_route_exchange<R: Rng>(
    data: &ProblemData,
    cost_evaluator: &CostEvaluator,
    parents: (&Solution, &Solution),
    select_probability: u32,
    rng: &mut R,
) -> Solution {
    let (parent_a, parent_b) = parents;

    let num_routes_a = parent_a.num_routes();
    let num_routes_b = parent_b.num_routes();

    if num_routes_a == 0 || num_routes_b == 0 {
        let donor = if num_routes_a == 0 { parent_b } else { parent_a };
        return donor.clone();
    }

    let mut start_a = rng.gen_range(0..num_routes_a);
    let mut start_b = rng.gen_range(0..num_routes_b);
    let num_moved = rng.gen_range(1..=num_routes_a.min(num_routes_b));

    let routes_a = sort_by_asc_angle(data, parent_a);
    let routes_b = sort_by_asc_angle(data, parent_b);

    let mut selected_a = vec![false; data.num_locations()];
    let mut selected_b = vec![false; data.num_locations()];

    // Adjacent routes in angular order overlap most when the two windows
    // start close to each other.
    for offset in 0..num_moved {
        for &client in routes_a[(start_a + offset) % num_routes_a].visits() {
            selected_a[client] = true;
        }
        for &client in routes_b[(start_b + offset) % num_routes_b].visits() {
            selected_b[client] = true;
        }
    }

    // Shift the windows while doing so shrinks |A \ B|, the set of clients
    // that will need replanning.
    loop {
        let count =
            |route: &Route, selected: &[bool], invert: bool| -> i64 {
                route
                    .visits()
                    .iter()
                    .filter(|&&c| selected[c] != invert)
                    .count() as i64
            };

        let a_left = count(
            routes_a[(start_a + num_routes_a - 1) % num_routes_a],
            &selected_b,
            true,
        ) - count(
            routes_a[(start_a + num_moved - 1) % num_routes_a],
            &selected_b,
            true,
        );

        let a_right = count(routes_a[(start_a + num_moved) % num_routes_a], &selected_b, true)
            - count(routes_a[start_a], &selected_b, true);

        let b_left = count(
            routes_b[(start_b + num_moved - 1) % num_routes_b],
            &selected_a,
            false,
        ) - count(
            routes_b[(start_b + num_routes_b - 1) % num_routes_b],
            &selected_a,
            false,
        );

        let b_right = count(routes_b[start_b], &selected_a, false)
            - count(routes_b[(start_b + num_moved) % num_routes_b], &selected_a, false);

        let best = a_left.min(a_right).min(b_left).min(b_right);
        if best >= 0 {
            break;
        }

        if best == a_left {
            for &c in routes_a[(start_a + num_moved - 1) % num_routes_a].visits() {
                selected_a[c] = false;
            }
            start_a = (start_a + num_routes_a - 1) % num_routes_a;
            for &c in routes_a[start_a].visits() {
                selected_a[c] = true;
            }
        } else if best == a_right {
            for &c in routes_a[start_a].visits() {
                selected_a[c] = false;
            }
            start_a = (start_a + 1) % num_routes_a;
            for &c in routes_a[(start_a + num_moved - 1) % num_routes_a].visits() {
                selected_a[c] = true;
            }
        } else if best == b_left {
            for &c in routes_b[(start_b + num_moved - 1) % num_routes_b].visits() {
                selected_b[c] = false;
            }
            start_b = (start_b + num_routes_b - 1) % num_routes_b;
            for &c in routes_b[start_b].visits() {
                selected_b[c] = true;
            }
        } else {
            for &c in routes_b[start_b].visits() {
                selected_b[c] = false;
            }
            start_b = (start_b + 1) % num_routes_b;
            for &c in routes_b[(start_b + num_moved - 1) % num_routes_b].visits() {
                selected_b[c] = true;
            }
        }
    }

    // Clients in B's window but not in A's never appeared in parent A's
    // plan, so they may not displace A's remaining visits in offspring two.
    let b_not_a: Vec<bool> = (0..data.num_locations())
        .map(|c| selected_b[c] && !selected_a[c])
        .collect();

    let mut visits1: Vec<Vec<usize>> = vec![Vec::new(); num_routes_a];
    let mut visits2: Vec<Vec<usize>> = vec![Vec::new(); num_routes_a];

    // Offspring one takes B's window wholesale; offspring two only the
    // clients that window shares with A's.
    for offset in 0..num_moved {
        let index_a = (start_a + offset) % num_routes_a;
        let index_b = (start_b + offset) % num_routes_b;

        for &client in routes_b[index_b].visits() {
            visits1[index_a].push(client);
            if !b_not_a[client] {
                visits2[index_a].push(client);
            }
        }
    }

    // Routes of parent A outside the window are kept, minus the clients the
    // B window already plans.
    for offset in num_moved..num_routes_a {
        let index_a = (start_a + offset) % num_routes_a;

        for &client in routes_a[index_a].visits() {
            if !b_not_a[client] {
                visits1[index_a].push(client);
            }
            visits2[index_a].push(client);
        }
    }

    let vehicle_types: Vec<usize> = routes_a.iter().map(|r| r.vehicle_type()).collect();

    let offspring1 = repair_and_build(data, cost_evaluator, visits1, &vehicle_types, parent_a);
    let offspring2 = repair_and_build(data, cost_evaluator, visits2, &vehicle_types, parent_a);

    let (better, worse) = match (offspring1, offspring2) {
        (Some(first), Some(second)) => {
            if cost_evaluator.penalised_cost(&first) <= cost_evaluator.penalised_cost(&second) {
                (first, second)
            } else {
                (second, first)
            }
        }
        (Some(first), None) => return first,
        (None, Some(second)) => return second,
        (None, None) => return parent_a.clone(),
    };

    if rng.gen_range(0..100) < select_probability {
        better
    } else {
        worse
    }
}

/// Plans all clients of the donor parent that the offspring's visit lists
/// miss, then builds the solution. Each unplanned client goes to the
/// insertion spot with the smallest penalised-cost delta; ties break on the
/// lowest route index, then the lowest position.
fn repair_and_build(
    data: &ProblemData,
    cost_evaluator: &CostEvaluator,
    mut visits: Vec<Vec<usize>>,
    vehicle_types: &[usize],
    donor: &Solution,
) -> Option<Solution> {
    let mut planned = vec![false; data.num_locations()];
    for route in &visits {
        for &client in route {
            planned[client] = true;
        }
    }

    let unplanned: Vec<usize> = donor
        .routes()
        .iter()
        .flat_map(|route| route.visits().iter().copied())
        .filter(|&client| !planned[client])
        .collect();

    for client in unplanned {
        greedy_insert(data, cost_evaluator, &mut visits, vehicle_types, client);
    }

    let mut routes = Vec::new();
    for (route_visits, &veh_type) in visits.into_iter().zip(vehicle_types) {
        if !route_visits.is_empty() {
            routes.push(Route::new(data, route_visits, veh_type).ok()?);
        }
    }

    Solution::new(data, routes).ok()
}

fn greedy_insert(
    data: &ProblemData,
    cost_evaluator: &CostEvaluator,
    visits: &mut [Vec<usize>],
    vehicle_types: &[usize],
    client: usize,
) {
    let durations = data.duration_matrix();
    let client_data = data.client(client);
    let client_seg = DurationSegment::client(client, client_data);

    let mut best: Option<(Cost, usize, usize)> = None;

    for (route_idx, route) in visits.iter().enumerate() {
        let veh_type = data.vehicle_type(vehicle_types[route_idx]);
        let start = veh_type.start_depot;
        let end = veh_type.end_depot;

        let depot_start = DurationSegment::depot(
            start,
            data.depot(start),
            veh_type.tw_early,
            veh_type.tw_late,
        );
        let depot_end =
            DurationSegment::depot(end, data.depot(end), veh_type.tw_early, veh_type.tw_late);

        // Prefix and suffix segments make each insertion position O(1).
        let mut prefix = Vec::with_capacity(route.len() + 1);
        prefix.push(depot_start);
        for &c in route.iter() {
            let seg = DurationSegment::client(c, data.client(c));
            prefix.push(DurationSegment::merge(durations, *prefix.last().unwrap(), seg));
        }

        let mut suffix = vec![depot_end; route.len() + 1];
        for (pos, &c) in route.iter().enumerate().rev() {
            let seg = DurationSegment::client(c, data.client(c));
            suffix[pos] = DurationSegment::merge(durations, seg, suffix[pos + 1]);
        }

        let route_load: Load = route.iter().map(|&c| data.client(c).demand).sum();
        let old_tws = DurationSegment::merge(durations, prefix[route.len()], depot_end);
        let old_tw_penalty =
            cost_evaluator.tw_penalty(old_tws.total_time_warp_with(veh_type.max_duration));
        let old_load_penalty = cost_evaluator.load_penalty(route_load, veh_type.capacity);

        let new_load_penalty =
            cost_evaluator.load_penalty(route_load + client_data.demand, veh_type.capacity);

        for pos in 0..=route.len() {
            let prev = if pos == 0 { start } else { route[pos - 1] };
            let next = if pos == route.len() { end } else { route[pos] };

            let delta_dist =
                data.dist(prev, client) + data.dist(client, next) - data.dist(prev, next);

            let with_client = DurationSegment::merge(durations, prefix[pos], client_seg);
            let new_tws = DurationSegment::merge(durations, with_client, suffix[pos]);
            let new_tw_penalty =
                cost_evaluator.tw_penalty(new_tws.total_time_warp_with(veh_type.max_duration));

            let delta = veh_type.unit_distance_cost * delta_dist.get()
                + new_tw_penalty
                - old_tw_penalty
                + new_load_penalty
                - old_load_penalty;

            let candidate = (delta, route_idx, pos);
            if best.map_or(true, |b| candidate.0 < b.0) {
                best = Some(candidate);
            }
        }
    }

    match best {
        Some((_, route_idx, pos)) => visits[route_idx].insert(pos, client),
        None => {
            // No open route to insert into; start a fresh one if the visit
            // lists are all unused.
            if let Some(first) = visits.first_mut() {
                first.push(client);
            }
        }
    }
}
