//! Loading network snapshots from JSON files.

use std::fs;

use opfkit_core::{index_network, BranchId, BusType, GenId, Network, OpfkitError};
use tempfile::tempdir;

const THREE_BUS: &str = r#"{
    "base_mva": 100.0,
    "buses": [
        {"id": "1", "bus_type": 3},
        {"id": "2", "bus_type": "pv"},
        {"id": "3", "bus_type": 1}
    ],
    "generators": [
        {"id": "1", "bus": "1", "pmin": 0.0, "pmax": 2.0, "cost": [0.0, 1400.0, 0.0]},
        {"id": "2", "bus": "2", "pmin": 0.0, "pmax": 1.5, "cost": [0.0, 3000.0, 0.0], "in_service": false}
    ],
    "branches": [
        {"id": "1", "from_bus": "1", "to_bus": "2", "x": 0.1, "rate_a": 1.0},
        {"id": "2", "from_bus": "2", "to_bus": "3", "x": 0.1, "rate_a": 1.0},
        {"id": "3", "from_bus": "1", "to_bus": "3", "x": 0.1, "rate_a": 1.0}
    ],
    "loads": [
        {"id": "1", "bus": "3", "pd": 0.9}
    ]
}"#;

#[test]
fn loads_snapshot_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case3.json");
    fs::write(&path, THREE_BUS).unwrap();

    let network = Network::from_json_file(&path).unwrap();
    assert_eq!(network.buses.len(), 3);
    assert_eq!(network.buses.values().next().unwrap().bus_type, BusType::Reference);
    assert!(!network.generators[&GenId::new("2")].in_service);
    assert!(network.branches[&BranchId::new("1")].in_service);

    let indexed = index_network(&network).unwrap();
    assert_eq!(indexed.num_generators(), 1);
    assert_eq!(indexed.num_branches(), 3);
    assert!((indexed.total_demand() - 0.9).abs() < 1e-12);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = Network::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, OpfkitError::Io(_)));
}

#[test]
fn malformed_snapshot_is_parse_error() {
    let err = Network::from_json_str(r#"{"buses": [{"id": "1", "bus_type": 9}]}"#).unwrap_err();
    assert!(matches!(err, OpfkitError::Parse(_)));
}
