//! VRPLIB instance reader and solution writer.

use crate::matrix::Matrix;
use crate::measure::{Cost, Distance, Duration, Load};
use crate::problem::{Client, Depot, ProblemData, ProblemError, VehicleType};
use crate::solution::Solution;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Raised on malformed instance files. Carries the file path and the
/// section where parsing failed.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("{path}: cannot read instance: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{path}: section {section}: {message}")]
    Malformed {
        path: String,
        section: String,
        message: String,
    },
    #[error("{path}: section {section} is not understood")]
    UnknownSection { path: String, section: String },
    #[error("{path}: invalid instance data: {source}")]
    Invalid {
        path: String,
        source: ProblemError,
    },
}

struct Tokens {
    values: Vec<String>,
    next: usize,
}

impl Tokens {
    fn new(contents: &str) -> Self {
        Tokens {
            values: contents.split_whitespace().map(str::to_string).collect(),
            next: 0,
        }
    }

    fn take(&mut self) -> Option<String> {
        let value = self.values.get(self.next).cloned();
        self.next += value.is_some() as usize;
        value
    }
}

fn malformed(path: &Path, section: &str, message: impl Into<String>) -> InstanceError {
    InstanceError::Malformed {
        path: path.display().to_string(),
        section: section.to_string(),
        message: message.into(),
    }
}

/// Reads a VRPLIB instance. Euclidean instances get integer distances with
/// one decimal of precision (`floor(10 * hypot)`); the duration matrix
/// equals the distance matrix. Sections with 1-based client indices must
/// list every location in order.
pub fn read_instance<P: AsRef<Path>>(path: P) -> Result<ProblemData, InstanceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InstanceError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut contents = String::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| InstanceError::Io {
            path: path.display().to_string(),
            source,
        })?;

        // NAME, COMMENT, and TYPE carry free-form values; drop those lines
        // wholesale. Everything else is normalised into plain tokens.
        let key = line.trim_start();
        if key.starts_with("NAME") || key.starts_with("COMMENT") || key.starts_with("TYPE") {
            continue;
        }

        contents.push_str(&line.replace(':', " "));
        contents.push('\n');
    }

    let mut tokens = Tokens::new(&contents);

    let mut num_clients: Option<usize> = None;
    let mut capacity = Load(i64::MAX);
    let mut num_vehicles: Option<usize> = None;
    let mut edge_weight_type = String::new();
    let mut edge_weight_format = String::new();
    let mut coords: Vec<(i64, i64)> = Vec::new();
    let mut demands: Vec<i64> = Vec::new();
    let mut time_windows: Vec<(i64, i64)> = Vec::new();
    let mut service_durations: Vec<i64> = Vec::new();
    let mut release_times: Vec<i64> = Vec::new();
    let mut dist_rows: Vec<i64> = Vec::new();

    let parse_int = |path: &Path, section: &str, token: Option<String>| -> Result<i64, InstanceError> {
        token
            .as_deref()
            .and_then(|t| t.parse::<i64>().ok())
            .ok_or_else(|| malformed(path, section, "expected an integer"))
    };

    // Reads an indexed section: `index value...` per location, indices
    // 1-based and in strict order.
    let read_section = |tokens: &mut Tokens,
                        section: &str,
                        num_locations: usize,
                        values_per_row: usize|
     -> Result<Vec<Vec<i64>>, InstanceError> {
        let mut rows = Vec::with_capacity(num_locations);
        for expected in 1..=num_locations {
            let index = parse_int(path, section, tokens.take())?;
            if index != expected as i64 {
                return Err(malformed(path, section, "rows are not in client order"));
            }

            let mut row = Vec::with_capacity(values_per_row);
            for _ in 0..values_per_row {
                row.push(parse_int(path, section, tokens.take())?);
            }
            rows.push(row);
        }
        Ok(rows)
    };

    loop {
        let Some(section) = tokens.take() else {
            return Err(malformed(path, "EOF", "missing EOF marker"));
        };

        match section.as_str() {
            "EOF" => break,
            "DIMENSION" => {
                let dimension = parse_int(path, "DIMENSION", tokens.take())?;
                if dimension < 2 {
                    return Err(malformed(path, "DIMENSION", "need at least one client"));
                }
                num_clients = Some(dimension as usize - 1);
            }
            "EDGE_WEIGHT_TYPE" => {
                edge_weight_type = tokens
                    .take()
                    .ok_or_else(|| malformed(path, "EDGE_WEIGHT_TYPE", "missing value"))?;
                if edge_weight_type != "EXPLICIT" && edge_weight_type != "EUC_2D" {
                    return Err(malformed(
                        path,
                        "EDGE_WEIGHT_TYPE",
                        "only EXPLICIT and EUC_2D are understood",
                    ));
                }
            }
            "EDGE_WEIGHT_FORMAT" => {
                edge_weight_format = tokens
                    .take()
                    .ok_or_else(|| malformed(path, "EDGE_WEIGHT_FORMAT", "missing value"))?;
            }
            "CAPACITY" => {
                capacity = Load(parse_int(path, "CAPACITY", tokens.take())?);
            }
            "VEHICLES" | "SALESMAN" => {
                num_vehicles = Some(parse_int(path, &section, tokens.take())? as usize);
            }
            "EDGE_WEIGHT_SECTION" => {
                if edge_weight_type != "EXPLICIT" || edge_weight_format != "FULL_MATRIX" {
                    return Err(malformed(
                        path,
                        "EDGE_WEIGHT_SECTION",
                        "only EDGE_WEIGHT_FORMAT = FULL_MATRIX is understood with EXPLICIT weights",
                    ));
                }

                let size = num_clients
                    .ok_or_else(|| malformed(path, "EDGE_WEIGHT_SECTION", "DIMENSION not set"))?
                    + 1;
                for _ in 0..size * size {
                    dist_rows.push(parse_int(path, "EDGE_WEIGHT_SECTION", tokens.take())?);
                }
            }
            "NODE_COORD_SECTION" => {
                let size = num_clients
                    .ok_or_else(|| malformed(path, "NODE_COORD_SECTION", "DIMENSION not set"))?
                    + 1;
                for row in read_section(&mut tokens, "NODE_COORD_SECTION", size, 2)? {
                    coords.push((row[0], row[1]));
                }
            }
            "DEMAND_SECTION" => {
                let size = num_clients
                    .ok_or_else(|| malformed(path, "DEMAND_SECTION", "DIMENSION not set"))?
                    + 1;
                for row in read_section(&mut tokens, "DEMAND_SECTION", size, 1)? {
                    demands.push(row[0]);
                }
                if demands[0] != 0 {
                    return Err(malformed(path, "DEMAND_SECTION", "nonzero depot demand"));
                }
            }
            "DEPOT_SECTION" => {
                let depot = parse_int(path, "DEPOT_SECTION", tokens.take())?;
                let terminator = parse_int(path, "DEPOT_SECTION", tokens.take())?;
                if depot != 1 || terminator != -1 {
                    return Err(malformed(path, "DEPOT_SECTION", "expected one depot at #1"));
                }
            }
            "SERVICE_TIME_SECTION" => {
                let size = num_clients
                    .ok_or_else(|| malformed(path, "SERVICE_TIME_SECTION", "DIMENSION not set"))?
                    + 1;
                for row in read_section(&mut tokens, "SERVICE_TIME_SECTION", size, 1)? {
                    service_durations.push(row[0]);
                }
                if service_durations[0] != 0 {
                    return Err(malformed(
                        path,
                        "SERVICE_TIME_SECTION",
                        "nonzero depot service duration",
                    ));
                }
            }
            "TIME_WINDOW_SECTION" => {
                let size = num_clients
                    .ok_or_else(|| malformed(path, "TIME_WINDOW_SECTION", "DIMENSION not set"))?
                    + 1;
                for row in read_section(&mut tokens, "TIME_WINDOW_SECTION", size, 2)? {
                    time_windows.push((row[0], row[1]));
                }
                if time_windows[0].0 != 0 {
                    return Err(malformed(
                        path,
                        "TIME_WINDOW_SECTION",
                        "nonzero depot window start",
                    ));
                }
            }
            "RELEASE_TIME_SECTION" => {
                let size = num_clients
                    .ok_or_else(|| malformed(path, "RELEASE_TIME_SECTION", "DIMENSION not set"))?
                    + 1;
                for row in read_section(&mut tokens, "RELEASE_TIME_SECTION", size, 1)? {
                    release_times.push(row[0]);
                }
                if release_times[0] != 0 {
                    return Err(malformed(
                        path,
                        "RELEASE_TIME_SECTION",
                        "nonzero depot release time",
                    ));
                }
            }
            other => {
                return Err(InstanceError::UnknownSection {
                    path: path.display().to_string(),
                    section: other.to_string(),
                });
            }
        }
    }

    let num_clients =
        num_clients.ok_or_else(|| malformed(path, "DIMENSION", "DIMENSION not set"))?;
    let num_locations = num_clients + 1;

    if edge_weight_type == "EUC_2D" {
        if coords.len() != num_locations {
            return Err(malformed(
                path,
                "NODE_COORD_SECTION",
                "coordinate count does not match problem size",
            ));
        }

        for i in 0..num_locations {
            for j in 0..num_locations {
                let dx = (coords[i].0 - coords[j].0) as f64;
                let dy = (coords[i].1 - coords[j].1) as f64;
                // One decimal of precision, per convention.
                dist_rows.push((10.0 * dx.hypot(dy)) as i64);
            }
        }
    }

    if dist_rows.len() != num_locations * num_locations {
        return Err(malformed(
            path,
            "EDGE_WEIGHT_SECTION",
            "distance matrix does not match problem size",
        ));
    }

    if coords.is_empty() {
        coords = vec![(0, 0); num_locations];
    } else if coords.len() != num_locations {
        return Err(malformed(
            path,
            "NODE_COORD_SECTION",
            "coordinate count does not match problem size",
        ));
    }

    let check_len = |section: &str, actual: usize| -> Result<(), InstanceError> {
        if actual != 0 && actual != num_locations {
            Err(malformed(path, section, "section does not match problem size"))
        } else {
            Ok(())
        }
    };
    check_len("DEMAND_SECTION", demands.len())?;
    check_len("TIME_WINDOW_SECTION", time_windows.len())?;
    check_len("SERVICE_TIME_SECTION", service_durations.len())?;
    check_len("RELEASE_TIME_SECTION", release_times.len())?;

    // Missing sections default to unconstrained values.
    if demands.is_empty() {
        demands = vec![0; num_locations];
    }
    if time_windows.is_empty() {
        time_windows = vec![(0, i64::MAX); num_locations];
    }
    if service_durations.is_empty() {
        service_durations = vec![0; num_locations];
    }
    if release_times.is_empty() {
        release_times = vec![0; num_locations];
    }

    // Unset vehicle count means unbounded: one vehicle per client.
    let num_vehicles = match num_vehicles {
        Some(n) if n > 0 => n,
        _ => num_clients.max(1),
    };

    let depot = Depot::new(coords[0].0, coords[0].1)
        .with_time_window(Duration(time_windows[0].0), Duration(time_windows[0].1));

    let clients: Vec<Client> = (1..num_locations)
        .map(|idx| {
            Client::new(coords[idx].0, coords[idx].1)
                .with_demand(Load(demands[idx]))
                .with_service_duration(Duration(service_durations[idx]))
                .with_time_window(Duration(time_windows[idx].0), Duration(time_windows[idx].1))
                .with_release_time(Duration(release_times[idx]))
        })
        .collect();

    let vehicle_type = VehicleType::new(capacity, num_vehicles);

    let distances = Matrix::from_vec(
        num_locations,
        dist_rows.iter().map(|&d| Distance(d)).collect(),
    );
    let durations = Matrix::from_vec(
        num_locations,
        dist_rows.iter().map(|&d| Duration(d)).collect(),
    );

    ProblemData::new(vec![depot], clients, vec![vehicle_type], distances, durations).map_err(
        |source| InstanceError::Invalid {
            path: path.display().to_string(),
            source,
        },
    )
}

/// Writes a solution in VRPLIB-compatible format: one line per route, then
/// the objective and the compute time in seconds.
pub fn write_solution<P: AsRef<Path>>(
    path: P,
    solution: &Solution,
    cost: Cost,
    runtime_seconds: f64,
) -> std::io::Result<()> {
    let mut file = File::create(path)?;

    for (idx, route) in solution.routes().iter().enumerate() {
        write!(file, "Route #{}:", idx + 1)?;
        for &client in route.visits() {
            write!(file, " {client}")?;
        }
        writeln!(file)?;
    }

    writeln!(file, "Cost: {cost}")?;
    writeln!(file, "Time: {runtime_seconds}")?;

    Ok(())
}
