//! Tests for the VRPLIB instance reader.

use hgs_vrptw::instance::{read_instance, InstanceError};
use hgs_vrptw::measure::{Distance, Duration, Load};
use std::fs;
use std::path::PathBuf;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("hgs_vrptw_test_{}_{name}", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

const EXPLICIT_INSTANCE: &str = "\
NAME : tiny
COMMENT : hand-made test instance
TYPE : CVRP
DIMENSION : 3
EDGE_WEIGHT_TYPE : EXPLICIT
EDGE_WEIGHT_FORMAT : FULL_MATRIX
CAPACITY : 10
VEHICLES : 2
EDGE_WEIGHT_SECTION
0 10 20
10 0 15
20 15 0
DEMAND_SECTION
1 0
2 4
3 6
TIME_WINDOW_SECTION
1 0 1000
2 100 300
3 50 400
SERVICE_TIME_SECTION
1 0
2 10
3 20
DEPOT_SECTION
1
-1
EOF
";

#[test]
fn reads_an_explicit_instance() {
    let path = write_temp("explicit.vrp", EXPLICIT_INSTANCE);
    let data = read_instance(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(data.num_depots(), 1);
    assert_eq!(data.num_clients(), 2);
    assert_eq!(data.num_vehicles(), 2);

    assert_eq!(data.dist(0, 1), Distance(10));
    assert_eq!(data.dist(1, 2), Distance(15));
    assert_eq!(data.dur(2, 0), Duration(20));

    let client = data.client(1);
    assert_eq!(client.demand, Load(4));
    assert_eq!(client.service_duration, Duration(10));
    assert_eq!(client.tw_early, Duration(100));
    assert_eq!(client.tw_late, Duration(300));

    assert_eq!(data.vehicle_type(0).capacity, Load(10));
    assert_eq!(data.vehicle_type(0).num_available, 2);
}

#[test]
fn euclidean_distances_keep_one_decimal_of_precision() {
    let contents = "\
NAME : euc
TYPE : CVRP
DIMENSION : 3
EDGE_WEIGHT_TYPE : EUC_2D
CAPACITY : 100
NODE_COORD_SECTION
1 0 0
2 3 4
3 0 5
DEMAND_SECTION
1 0
2 1
3 1
DEPOT_SECTION
1
-1
EOF
";

    let path = write_temp("euclidean.vrp", contents);
    let data = read_instance(&path).unwrap();
    fs::remove_file(&path).ok();

    // hypot(3, 4) = 5, stored as 50; hypot(3, 1) = 3.162..., stored as 31.
    assert_eq!(data.dist(0, 1), Distance(50));
    assert_eq!(data.dist(0, 2), Distance(50));
    assert_eq!(data.dist(1, 2), Distance(31));
    assert_eq!(data.dist(1, 1), Distance(0));

    // No vehicle count given: one vehicle per client.
    assert_eq!(data.num_vehicles(), 2);

    // Missing sections default to unconstrained values.
    assert_eq!(data.client(1).service_duration, Duration(0));
    assert_eq!(data.client(1).tw_late, Duration(i64::MAX));
}

#[test]
fn unknown_sections_are_fatal() {
    let contents = "\
DIMENSION : 2
EDGE_WEIGHT_TYPE : EUC_2D
FREQUENCY_SECTION
1 2
EOF
";

    let path = write_temp("unknown.vrp", contents);
    let result = read_instance(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(
        result,
        Err(InstanceError::UnknownSection { section, .. }) if section == "FREQUENCY_SECTION"
    ));
}

#[test]
fn out_of_order_rows_are_fatal() {
    let contents = "\
DIMENSION : 3
EDGE_WEIGHT_TYPE : EUC_2D
CAPACITY : 10
NODE_COORD_SECTION
1 0 0
3 1 1
2 2 2
DEMAND_SECTION
1 0
2 1
3 1
DEPOT_SECTION
1
-1
EOF
";

    let path = write_temp("order.vrp", contents);
    let result = read_instance(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(InstanceError::Malformed { .. })));
}

#[test]
fn multiple_depots_in_the_depot_section_are_fatal() {
    let contents = "\
DIMENSION : 2
EDGE_WEIGHT_TYPE : EUC_2D
CAPACITY : 10
NODE_COORD_SECTION
1 0 0
2 1 1
DEMAND_SECTION
1 0
2 1
DEPOT_SECTION
2
-1
EOF
";

    let path = write_temp("depot.vrp", contents);
    let result = read_instance(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(InstanceError::Malformed { .. })));
}

#[test]
fn missing_file_reports_the_path() {
    let result = read_instance("/nonexistent/instance.vrp");
    let message = result.unwrap_err().to_string();
    assert!(message.contains("/nonexistent/instance.vrp"));
}
