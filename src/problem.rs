//! Problem instance data: clients, depots, vehicle types, and travel
//! matrices.

use crate::matrix::Matrix;
use crate::measure::{Coordinate, Cost, Distance, Duration, Load};
use thiserror::Error;

/// Raised when instance data fails validation at construction.
#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("instance must have at least one depot")]
    NoDepots,
    #[error("matrix must be {expected}x{expected}, got {rows}x{cols}")]
    MatrixSize {
        expected: usize,
        rows: usize,
        cols: usize,
    },
    #[error("matrix diagonal must be zero at location {0}")]
    NonZeroDiagonal(usize),
    #[error("client {0} has negative demand")]
    NegativeDemand(usize),
    #[error("client {0} has an ill-formed time window")]
    BadTimeWindow(usize),
    #[error("vehicle type {0} must have at least one vehicle")]
    NoVehicles(usize),
    #[error("vehicle type {0} references an unknown depot")]
    BadDepot(usize),
    #[error("client group {0} is empty or references an unknown client")]
    BadGroup(usize),
}

/// A client location to visit, with its demand, service requirements, time
/// window, release time, and prize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub x: Coordinate,
    pub y: Coordinate,
    pub demand: Load,
    pub service_duration: Duration,
    /// Earliest possible start of service.
    pub tw_early: Duration,
    /// Latest possible start of service.
    pub tw_late: Duration,
    /// Earliest moment a vehicle may leave the depot to visit this client.
    pub release_time: Duration,
    /// Prize collected by visiting this client.
    pub prize: Cost,
    /// Whether the client must be part of a feasible solution.
    pub required: bool,
    /// Index of the mutually exclusive client group, if any.
    pub group: Option<usize>,
}

impl Client {
    pub fn new(x: Coordinate, y: Coordinate) -> Self {
        Client {
            x,
            y,
            demand: Load(0),
            service_duration: Duration(0),
            tw_early: Duration(0),
            tw_late: Duration::MAX,
            release_time: Duration(0),
            prize: Cost(0),
            required: true,
            group: None,
        }
    }

    pub fn with_demand(mut self, demand: Load) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_service_duration(mut self, duration: Duration) -> Self {
        self.service_duration = duration;
        self
    }

    pub fn with_time_window(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    pub fn with_release_time(mut self, release: Duration) -> Self {
        self.release_time = release;
        self
    }

    pub fn with_prize(mut self, prize: Cost) -> Self {
        self.prize = prize;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }
}

/// A depot location. Depots carry no demand, service, or release time; they
/// constrain routes only through their opening window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depot {
    pub x: Coordinate,
    pub y: Coordinate,
    pub tw_early: Duration,
    pub tw_late: Duration,
}

impl Depot {
    pub fn new(x: Coordinate, y: Coordinate) -> Self {
        Depot {
            x,
            y,
            tw_early: Duration(0),
            tw_late: Duration::MAX,
        }
    }

    pub fn with_time_window(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }
}

/// A group of mutually exclusive clients: at most one member may be
/// visited, and exactly one when the group is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientGroup {
    /// Location indices of the member clients.
    pub clients: Vec<usize>,
    pub required: bool,
}

impl ClientGroup {
    pub fn new(clients: Vec<usize>, required: bool) -> Self {
        ClientGroup { clients, required }
    }
}

/// Describes a class of identical vehicles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleType {
    pub capacity: Load,
    pub num_available: usize,
    /// Location index of the depot this type departs from.
    pub start_depot: usize,
    /// Location index of the depot this type returns to.
    pub end_depot: usize,
    /// Fixed cost incurred for each vehicle of this type that is used.
    pub fixed_cost: Cost,
    /// Start of the vehicle shift.
    pub tw_early: Duration,
    /// End of the vehicle shift.
    pub tw_late: Duration,
    pub max_duration: Duration,
    pub max_distance: Distance,
    pub unit_distance_cost: Cost,
    pub unit_duration_cost: Cost,
}

impl VehicleType {
    pub fn new(capacity: Load, num_available: usize) -> Self {
        VehicleType {
            capacity,
            num_available,
            start_depot: 0,
            end_depot: 0,
            fixed_cost: Cost(0),
            tw_early: Duration(0),
            tw_late: Duration::MAX,
            max_duration: Duration::MAX,
            max_distance: Distance::MAX,
            unit_distance_cost: Cost(1),
            unit_duration_cost: Cost(0),
        }
    }

    pub fn with_depot(mut self, depot: usize) -> Self {
        self.start_depot = depot;
        self.end_depot = depot;
        self
    }

    pub fn with_fixed_cost(mut self, cost: Cost) -> Self {
        self.fixed_cost = cost;
        self
    }

    pub fn with_shift(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = max;
        self
    }

    pub fn with_max_distance(mut self, max: Distance) -> Self {
        self.max_distance = max;
        self
    }

    pub fn with_unit_costs(mut self, distance: Cost, duration: Cost) -> Self {
        self.unit_distance_cost = distance;
        self.unit_duration_cost = duration;
        self
    }
}

/// Immutable problem instance shared by every component of the solver.
///
/// Locations are indexed with depots first: indices `0..num_depots()` are
/// depots, `num_depots()..num_locations()` are clients. The distance and
/// duration matrices are indexed by location.
#[derive(Debug, Clone)]
pub struct ProblemData {
    depots: Vec<Depot>,
    clients: Vec<Client>,
    groups: Vec<ClientGroup>,
    vehicle_types: Vec<VehicleType>,
    dist: Matrix<Distance>,
    dur: Matrix<Duration>,
    num_vehicles: usize,
    centroid: (f64, f64),
}

impl ProblemData {
    pub fn new(
        depots: Vec<Depot>,
        clients: Vec<Client>,
        vehicle_types: Vec<VehicleType>,
        dist: Matrix<Distance>,
        dur: Matrix<Duration>,
    ) -> Result<Self, ProblemError> {
        Self::with_groups(depots, clients, Vec::new(), vehicle_types, dist, dur)
    }

    pub fn with_groups(
        depots: Vec<Depot>,
        clients: Vec<Client>,
        groups: Vec<ClientGroup>,
        vehicle_types: Vec<VehicleType>,
        dist: Matrix<Distance>,
        dur: Matrix<Duration>,
    ) -> Result<Self, ProblemError> {
        if depots.is_empty() {
            return Err(ProblemError::NoDepots);
        }

        let num_locations = depots.len() + clients.len();

        if dist.num_rows() != num_locations || dist.num_cols() != num_locations {
            return Err(ProblemError::MatrixSize {
                expected: num_locations,
                rows: dist.num_rows(),
                cols: dist.num_cols(),
            });
        }

        if dur.num_rows() != num_locations || dur.num_cols() != num_locations {
            return Err(ProblemError::MatrixSize {
                expected: num_locations,
                rows: dur.num_rows(),
                cols: dur.num_cols(),
            });
        }

        for loc in 0..num_locations {
            if dist.at(loc, loc) != Distance(0) || dur.at(loc, loc) != Duration(0) {
                return Err(ProblemError::NonZeroDiagonal(loc));
            }
        }

        for (idx, client) in clients.iter().enumerate() {
            let loc = depots.len() + idx;
            if client.demand < Load(0) {
                return Err(ProblemError::NegativeDemand(loc));
            }
            if client.tw_early > client.tw_late || client.tw_early < Duration(0) {
                return Err(ProblemError::BadTimeWindow(loc));
            }
        }

        for (idx, veh_type) in vehicle_types.iter().enumerate() {
            if veh_type.num_available == 0 {
                return Err(ProblemError::NoVehicles(idx));
            }
            if veh_type.start_depot >= depots.len() || veh_type.end_depot >= depots.len() {
                return Err(ProblemError::BadDepot(idx));
            }
        }

        for (idx, group) in groups.iter().enumerate() {
            let in_range = group
                .clients
                .iter()
                .all(|&c| c >= depots.len() && c < num_locations);
            if group.clients.is_empty() || !in_range {
                return Err(ProblemError::BadGroup(idx));
            }
        }

        let num_vehicles = vehicle_types.iter().map(|vt| vt.num_available).sum();
        let centroid = Self::compute_centroid(&clients);

        Ok(ProblemData {
            depots,
            clients,
            groups,
            vehicle_types,
            dist,
            dur,
            num_vehicles,
            centroid,
        })
    }

    fn compute_centroid(clients: &[Client]) -> (f64, f64) {
        if clients.is_empty() {
            return (0.0, 0.0);
        }

        let count = clients.len() as f64;
        let sum_x: f64 = clients.iter().map(|c| c.x as f64).sum();
        let sum_y: f64 = clients.iter().map(|c| c.y as f64).sum();
        (sum_x / count, sum_y / count)
    }

    /// Derives a modified copy of this instance. Arguments left `None` keep
    /// the current data.
    pub fn replace(
        &self,
        depots: Option<Vec<Depot>>,
        clients: Option<Vec<Client>>,
        vehicle_types: Option<Vec<VehicleType>>,
        dist: Option<Matrix<Distance>>,
        dur: Option<Matrix<Duration>>,
    ) -> Result<Self, ProblemError> {
        Self::with_groups(
            depots.unwrap_or_else(|| self.depots.clone()),
            clients.unwrap_or_else(|| self.clients.clone()),
            self.groups.clone(),
            vehicle_types.unwrap_or_else(|| self.vehicle_types.clone()),
            dist.unwrap_or_else(|| self.dist.clone()),
            dur.unwrap_or_else(|| self.dur.clone()),
        )
    }

    /// Travel distance from location `from` to location `to`.
    #[inline]
    pub fn dist(&self, from: usize, to: usize) -> Distance {
        self.dist.at(from, to)
    }

    /// Travel duration from location `from` to location `to`.
    #[inline]
    pub fn dur(&self, from: usize, to: usize) -> Duration {
        self.dur.at(from, to)
    }

    pub fn distance_matrix(&self) -> &Matrix<Distance> {
        &self.dist
    }

    pub fn duration_matrix(&self) -> &Matrix<Duration> {
        &self.dur
    }

    /// The client at the given location index. The index must be at least
    /// [`num_depots`](Self::num_depots).
    #[inline]
    pub fn client(&self, location: usize) -> &Client {
        debug_assert!(location >= self.depots.len());
        &self.clients[location - self.depots.len()]
    }

    #[inline]
    pub fn depot(&self, location: usize) -> &Depot {
        &self.depots[location]
    }

    pub fn group(&self, idx: usize) -> &ClientGroup {
        &self.groups[idx]
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn vehicle_type(&self, idx: usize) -> &VehicleType {
        &self.vehicle_types[idx]
    }

    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn num_depots(&self) -> usize {
        self.depots.len()
    }

    pub fn num_locations(&self) -> usize {
        self.depots.len() + self.clients.len()
    }

    pub fn num_vehicle_types(&self) -> usize {
        self.vehicle_types.len()
    }

    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// True if the location index refers to a depot.
    #[inline]
    pub fn is_depot(&self, location: usize) -> bool {
        location < self.depots.len()
    }

    /// Arithmetic mean of the client coordinates.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// Location indices of all clients.
    pub fn client_locations(&self) -> std::ops::Range<usize> {
        self.num_depots()..self.num_locations()
    }
}
