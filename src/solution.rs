//! Immutable solution representation.

use crate::cost::CostEvaluatable;
use crate::measure::{Cost, Distance, Duration, Load};
use crate::problem::ProblemData;
use crate::segment::{DurationSegment, LoadSegment};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Raised when route data cannot form a valid solution.
#[derive(Debug, Error)]
pub enum SolutionError {
    #[error("number of routes exceeds the number of available vehicles")]
    TooManyRoutes,
    #[error("used more than {available} vehicles of type {vehicle_type}")]
    TooManyVehiclesOfType {
        vehicle_type: usize,
        available: usize,
    },
    #[error("solutions must not contain empty routes")]
    EmptyRoute,
    #[error("client {0} is visited more than once")]
    DuplicateClient(usize),
    #[error("multiple clients of mutually exclusive group {0} are visited")]
    GroupViolation(usize),
}

/// A single route of a solution: an ordered visit sequence plus aggregates
/// precomputed at construction. Depots are implicit; the visit list holds
/// client locations only.
#[derive(Debug, Clone)]
pub struct Route {
    visits: Vec<usize>,
    vehicle_type: usize,
    start_depot: usize,
    end_depot: usize,
    distance: Distance,
    distance_cost: Cost,
    excess_distance: Distance,
    load: Load,
    excess_load: Load,
    duration: Duration,
    duration_cost: Cost,
    travel: Duration,
    service: Duration,
    time_warp: Duration,
    start_time: Duration,
    slack: Duration,
    release_time: Duration,
    prizes: Cost,
    centroid: (f64, f64),
}

impl Route {
    pub fn new(
        data: &ProblemData,
        visits: Vec<usize>,
        vehicle_type: usize,
    ) -> Result<Self, SolutionError> {
        if visits.is_empty() {
            return Err(SolutionError::EmptyRoute);
        }

        let veh_type = data.vehicle_type(vehicle_type);
        let durations = data.duration_matrix();
        let start = veh_type.start_depot;
        let end = veh_type.end_depot;

        let mut distance = Distance(0);
        let mut travel = Duration(0);
        let mut service = Duration(0);
        let mut prizes = Cost(0);
        let mut centroid = (0.0, 0.0);
        let mut load_seg = LoadSegment::default();

        let mut tws = DurationSegment::depot(
            start,
            data.depot(start),
            veh_type.tw_early,
            veh_type.tw_late,
        );

        let mut prev = start;
        for &client in &visits {
            let client_data = data.client(client);

            distance += data.dist(prev, client);
            travel += data.dur(prev, client);
            service += client_data.service_duration;
            prizes += client_data.prize;

            centroid.0 += client_data.x as f64 / visits.len() as f64;
            centroid.1 += client_data.y as f64 / visits.len() as f64;

            load_seg = LoadSegment::merge(load_seg, LoadSegment::client(client_data));
            tws = DurationSegment::merge(durations, tws, DurationSegment::client(client, client_data));

            prev = client;
        }

        distance += data.dist(prev, end);
        travel += data.dur(prev, end);

        let depot_tws =
            DurationSegment::depot(end, data.depot(end), veh_type.tw_early, veh_type.tw_late);
        tws = DurationSegment::merge(durations, tws, depot_tws);

        Ok(Route {
            vehicle_type,
            start_depot: start,
            end_depot: end,
            distance,
            distance_cost: veh_type.unit_distance_cost * distance.get(),
            excess_distance: (distance - veh_type.max_distance).max(Distance(0)),
            load: load_seg.demand(),
            excess_load: load_seg.excess_load(veh_type.capacity),
            duration: tws.duration(),
            duration_cost: veh_type.unit_duration_cost * tws.duration().get(),
            travel,
            service,
            time_warp: tws.total_time_warp_with(veh_type.max_duration),
            start_time: tws.tw_early(),
            slack: tws.tw_late() - tws.tw_early(),
            release_time: tws.release_time(),
            prizes,
            centroid,
            visits,
        })
    }

    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    pub fn start_depot(&self) -> usize {
        self.start_depot
    }

    pub fn end_depot(&self) -> usize {
        self.end_depot
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn distance_cost(&self) -> Cost {
        self.distance_cost
    }

    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    pub fn load(&self) -> Load {
        self.load
    }

    pub fn excess_load(&self) -> Load {
        self.excess_load
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_cost(&self) -> Cost {
        self.duration_cost
    }

    pub fn travel_duration(&self) -> Duration {
        self.travel
    }

    pub fn service_duration(&self) -> Duration {
        self.service
    }

    pub fn wait_duration(&self) -> Duration {
        self.duration - self.travel - self.service
    }

    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Earliest route start that yields minimum duration.
    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    /// Amount by which the start may shift without increasing duration.
    pub fn slack(&self) -> Duration {
        self.slack
    }

    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    pub fn has_excess_load(&self) -> bool {
        self.excess_load > Load(0)
    }

    pub fn has_time_warp(&self) -> bool {
        self.time_warp > Duration(0)
    }

    pub fn is_feasible(&self) -> bool {
        !self.has_excess_load() && !self.has_time_warp() && self.excess_distance == Distance(0)
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
            && self.load == other.load
            && self.time_warp == other.time_warp
            && self.vehicle_type == other.vehicle_type
            && self.visits == other.visits
    }
}

impl Eq for Route {}

/// An immutable solution: a set of non-empty routes. Aggregate statistics
/// are computed once at construction; equality and hashing follow the visit
/// structure and vehicle assignment rather than route order.
#[derive(Debug, Clone)]
pub struct Solution {
    routes: Vec<Route>,
    /// Predecessor/successor location per location; depots neighbour
    /// themselves, unvisited clients carry `(0, 0)`.
    neighbours: Vec<(usize, usize)>,
    num_clients: usize,
    num_missing: usize,
    distance: Distance,
    distance_cost: Cost,
    duration: Duration,
    duration_cost: Cost,
    excess_load: Load,
    excess_distance: Distance,
    time_warp: Duration,
    fixed_vehicle_cost: Cost,
    prizes: Cost,
    uncollected_prizes: Cost,
}

impl Solution {
    /// Builds a solution from fully constructed routes, validating the
    /// structural invariants: no empty or duplicate visits, and no more
    /// vehicles used than available.
    pub fn new(data: &ProblemData, routes: Vec<Route>) -> Result<Self, SolutionError> {
        if routes.len() > data.num_vehicles() {
            return Err(SolutionError::TooManyRoutes);
        }

        let mut visits = vec![0usize; data.num_locations()];
        let mut used_vehicles = vec![0usize; data.num_vehicle_types()];

        for route in &routes {
            if route.is_empty() {
                return Err(SolutionError::EmptyRoute);
            }

            used_vehicles[route.vehicle_type()] += 1;
            for &client in route.visits() {
                visits[client] += 1;
                if visits[client] > 1 {
                    return Err(SolutionError::DuplicateClient(client));
                }
            }
        }

        for (veh_type, &used) in used_vehicles.iter().enumerate() {
            let available = data.vehicle_type(veh_type).num_available;
            if used > available {
                return Err(SolutionError::TooManyVehiclesOfType {
                    vehicle_type: veh_type,
                    available,
                });
            }
        }

        let mut num_missing = 0;
        for client in data.client_locations() {
            let in_group = data.client(client).group.is_some();
            if data.client(client).required && !in_group && visits[client] == 0 {
                num_missing += 1;
            }
        }

        for idx in 0..data.num_groups() {
            let group = data.group(idx);
            let visited = group.clients.iter().filter(|&&c| visits[c] > 0).count();

            if visited > 1 {
                return Err(SolutionError::GroupViolation(idx));
            }
            if group.required && visited == 0 {
                num_missing += 1;
            }
        }

        let mut neighbours = vec![(0, 0); data.num_locations()];
        for route in &routes {
            for (idx, &client) in route.visits().iter().enumerate() {
                let pred = if idx == 0 {
                    route.start_depot()
                } else {
                    route.visits()[idx - 1]
                };
                let succ = if idx == route.len() - 1 {
                    route.end_depot()
                } else {
                    route.visits()[idx + 1]
                };
                neighbours[client] = (pred, succ);
            }
        }

        let all_prizes: Cost = data
            .client_locations()
            .map(|c| data.client(c).prize)
            .sum();

        let mut solution = Solution {
            neighbours,
            num_clients: 0,
            num_missing,
            distance: Distance(0),
            distance_cost: Cost(0),
            duration: Duration(0),
            duration_cost: Cost(0),
            excess_load: Load(0),
            excess_distance: Distance(0),
            time_warp: Duration(0),
            fixed_vehicle_cost: Cost(0),
            prizes: Cost(0),
            uncollected_prizes: Cost(0),
            routes,
        };

        for route in &solution.routes {
            solution.num_clients += route.len();
            solution.distance += route.distance();
            solution.distance_cost += route.distance_cost();
            solution.duration += route.duration();
            solution.duration_cost += route.duration_cost();
            solution.excess_load += route.excess_load();
            solution.excess_distance += route.excess_distance();
            solution.time_warp += route.time_warp();
            solution.prizes += route.prizes();

            let veh_type = route.vehicle_type();
            solution.fixed_vehicle_cost += data.vehicle_type(veh_type).fixed_cost;
        }

        solution.uncollected_prizes = all_prizes - solution.prizes;
        Ok(solution)
    }

    /// Builds a solution from raw visit lists. Routes are assigned vehicles
    /// greedily in vehicle-type order; empty lists are skipped.
    pub fn from_visits(
        data: &ProblemData,
        visit_lists: Vec<Vec<usize>>,
    ) -> Result<Self, SolutionError> {
        let visit_lists: Vec<_> = visit_lists.into_iter().filter(|v| !v.is_empty()).collect();

        let mut routes = Vec::with_capacity(visit_lists.len());
        let mut veh_type = 0;
        let mut used_of_type = 0;

        for visits in visit_lists {
            while veh_type < data.num_vehicle_types()
                && used_of_type == data.vehicle_type(veh_type).num_available
            {
                veh_type += 1;
                used_of_type = 0;
            }

            if veh_type == data.num_vehicle_types() {
                return Err(SolutionError::TooManyRoutes);
            }

            routes.push(Route::new(data, visits, veh_type)?);
            used_of_type += 1;
        }

        Solution::new(data, routes)
    }

    /// Constructs a random solution: clients are shuffled and spread evenly
    /// over the available vehicles.
    pub fn random<R: Rng>(data: &ProblemData, rng: &mut R) -> Self {
        let mut clients: Vec<usize> = data.client_locations().collect();
        clients.shuffle(rng);

        let num_clients = clients.len();
        let num_vehicles = data.num_vehicles();
        let per_vehicle = (num_clients / num_vehicles).max(1);
        let per_route = per_vehicle + usize::from(num_clients % num_vehicles != 0);

        let visit_lists: Vec<Vec<usize>> = clients
            .chunks(per_route)
            .map(|chunk| chunk.to_vec())
            .collect();

        // Cannot fail: the chunking never exceeds the vehicle count, and
        // chunks are non-empty.
        Solution::from_visits(data, visit_lists).expect("random solution is structurally valid")
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// The `(predecessor, successor)` pair of the given location.
    pub fn neighbours(&self, location: usize) -> (usize, usize) {
        self.neighbours[location]
    }

    pub fn get_neighbours(&self) -> &[(usize, usize)] {
        &self.neighbours
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn excess_load(&self) -> Load {
        self.excess_load
    }

    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    pub fn has_excess_load(&self) -> bool {
        self.excess_load > Load(0)
    }

    pub fn has_excess_distance(&self) -> bool {
        self.excess_distance > Distance(0)
    }

    pub fn has_time_warp(&self) -> bool {
        self.time_warp > Duration(0)
    }

    /// True when every required client (and group) is visited.
    pub fn is_complete(&self) -> bool {
        self.num_missing == 0
    }

    pub fn is_feasible(&self) -> bool {
        !self.has_excess_load()
            && !self.has_time_warp()
            && !self.has_excess_distance()
            && self.is_complete()
    }
}

impl CostEvaluatable for Solution {
    fn distance_cost(&self) -> Cost {
        self.distance_cost
    }

    fn duration_cost(&self) -> Cost {
        self.duration_cost
    }

    fn fixed_vehicle_cost(&self) -> Cost {
        self.fixed_vehicle_cost
    }

    fn excess_load(&self) -> Load {
        self.excess_load
    }

    fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    fn time_warp(&self) -> Duration {
        self.time_warp
    }

    fn uncollected_prizes(&self) -> Cost {
        self.uncollected_prizes
    }

    fn is_feasible(&self) -> bool {
        Solution::is_feasible(self)
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        // Cheap aggregate checks first, then the visit structure, then the
        // vehicle assignment (routes need not be in the same order).
        let quick = self.distance == other.distance
            && self.excess_load == other.excess_load
            && self.time_warp == other.time_warp
            && self.routes.len() == other.routes.len();

        if !quick || self.neighbours != other.neighbours {
            return false;
        }

        let mut assignment: HashMap<usize, usize> = HashMap::new();
        for route in &self.routes {
            assignment.insert(route.visits()[0], route.vehicle_type());
        }

        other
            .routes
            .iter()
            .all(|route| assignment.get(&route.visits()[0]) == Some(&route.vehicle_type()))
    }
}

impl Eq for Solution {}

impl Hash for Solution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.routes.len().hash(state);
        self.distance.hash(state);
        self.excess_load.hash(state);
        self.time_warp.hash(state);
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, route) in self.routes.iter().enumerate() {
            write!(f, "Route #{}:", idx + 1)?;
            for &client in route.visits() {
                write!(f, " {client}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
