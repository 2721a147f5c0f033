use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Triangle with a radial spur: branch "34" is a bridge.
fn write_case(dir: &Path) -> PathBuf {
    let case = json!({
        "base_mva": 100.0,
        "buses": [
            {"id": "1", "bus_type": 3},
            {"id": "2", "bus_type": 2},
            {"id": "3", "bus_type": 2},
            {"id": "4", "bus_type": 1}
        ],
        "generators": [
            {"id": "a", "bus": "1", "pmin": 0.0, "pmax": 1.0, "cost": [0.0, 10.0, 0.0]},
            {"id": "b", "bus": "2", "pmin": 0.0, "pmax": 1.0, "cost": [0.0, 20.0, 0.0]},
            {"id": "c", "bus": "3", "pmin": 0.0, "pmax": 1.0, "cost": [0.0, 30.0, 0.0]}
        ],
        "branches": [
            {"id": "12", "from_bus": "1", "to_bus": "2", "x": 0.1, "rate_a": 5.0, "rate_c": 5.0},
            {"id": "13", "from_bus": "1", "to_bus": "3", "x": 0.1, "rate_a": 1.0, "rate_c": 1.1},
            {"id": "23", "from_bus": "2", "to_bus": "3", "x": 0.1, "rate_a": 5.0, "rate_c": 5.0},
            {"id": "34", "from_bus": "3", "to_bus": "4", "x": 0.05, "rate_a": 5.0, "rate_c": 5.0}
        ],
        "loads": [
            {"id": "1", "bus": "3", "pd": 1.0},
            {"id": "2", "bus": "4", "pd": 0.2}
        ]
    });
    let path = dir.join("triangle.json");
    fs::write(&path, serde_json::to_string_pretty(&case).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn opfkit() -> Command {
    Command::cargo_bin("opfkit").unwrap()
}

#[test]
fn opfkit_index_prints_assignment() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    opfkit()
        .args(["index", case.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference bus : 1"))
        .stdout(predicate::str::contains("3->4"));
}

#[test]
fn opfkit_islands_reports_bridges() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    opfkit()
        .args(["islands", case.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Island 0: 4 bus(es) (reference)"))
        .stdout(predicate::str::contains("Bridge branches: 34"));
}

#[test]
fn opfkit_ptdf_writes_labelled_matrices() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    let out = tmp.path().join("ptdf.json");
    opfkit()
        .args(["ptdf", case.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();

    let table = read_json(&out);
    assert_eq!(table["branches"], json!(["12", "13", "23", "34"]));
    assert_eq!(table["generators"], json!(["a", "b", "c"]));
    // Generator "a" sits on the reference bus.
    for row in table["ptdf_g"].as_array().unwrap() {
        assert_eq!(row[0], json!(0.0));
    }
    // The spur carries the bus-4 load and nothing else.
    let spur = table["ptdf_l"][3].as_array().unwrap();
    assert!(spur[0].as_f64().unwrap().abs() < 1e-12);
    assert!((spur[1].as_f64().unwrap() + 1.0).abs() < 1e-9);
}

#[test]
fn opfkit_lodf_excludes_bridge_outage() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    let out = tmp.path().join("lodf.json");
    opfkit()
        .args([
            "lodf",
            case.to_str().unwrap(),
            "--outages",
            "23,34",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("disconnects the network"));

    let table = read_json(&out);
    assert_eq!(table["outages"], json!(["23"]));
    assert_eq!(table["excluded"][0]["branch"], json!("34"));
    assert_eq!(table["lodf"][2][0], json!(-1.0));
}

#[test]
fn opfkit_screen_defaults_to_every_branch() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    opfkit()
        .args(["screen", case.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"accepted\""))
        .stdout(predicate::str::contains("\"self_sensitivity\""));
}

#[test]
fn opfkit_opf_solves_dc_model() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    let out = tmp.path().join("solution.json");
    opfkit()
        .args([
            "opf",
            case.to_str().unwrap(),
            "--model",
            "dcopf",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("dcopf solved with clarabel"));

    let output = read_json(&out);
    assert_eq!(output["case_name"], json!("triangle"));
    assert_eq!(output["network"]["buses"], json!(4));
    let objective = output["solution"]["objective_value"].as_f64().unwrap();
    assert!((objective - 14.0).abs() < 1e-5, "objective {objective}");
}

#[test]
fn opfkit_opf_runs_ccga_with_config() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    let config = tmp.path().join("scopf.toml");
    fs::write(&config, "gamma = 1.0\n\n[ccga]\nmax_rounds = 5\n").unwrap();
    let out = tmp.path().join("report.json");

    opfkit()
        .args([
            "opf",
            case.to_str().unwrap(),
            "--model",
            "scdcopf-ccga",
            "--config",
            config.to_str().unwrap(),
            "--gen-contingencies",
            "all",
            "--line-contingencies",
            "all",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("CCGA converged after 2 round(s)"));

    let report = read_json(&out);
    assert_eq!(report["converged"], json!(true));
    assert_eq!(report["lazy"]["e_k_e"], json!([["13", "23"]]));
    assert_eq!(report["generator_contingencies"].as_array().unwrap().len(), 3);
    // The bridge outage is screened out and reported.
    assert_eq!(report["diagnostics"]["issues"].as_array().unwrap().len(), 1);
    let objective = report["solution"]["objective_value"].as_f64().unwrap();
    assert!((objective - 15.0).abs() < 1e-5, "objective {objective}");
}

#[test]
fn opfkit_emit_model_writes_problem() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    let dump = tmp.path().join("model.json");
    opfkit()
        .args([
            "opf",
            case.to_str().unwrap(),
            "--model",
            "scdcopf",
            "--gen-contingencies",
            "a",
            "--emit-model",
            dump.to_str().unwrap(),
        ])
        .assert()
        .success();

    let model = read_json(&dump);
    assert_eq!(model["model"], json!("scdcopf"));
    assert_eq!(model["problem_class"], json!("nonconvex-qcqp"));
    assert!(model["coefficients"]["ptdf_g"].is_object());
}

#[test]
fn opfkit_rejects_acopf() {
    let tmp = tempdir().unwrap();
    let case = write_case(tmp.path());
    opfkit()
        .args(["opf", case.to_str().unwrap(), "--model", "acopf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AC-OPF is not available"));
}

#[test]
fn opfkit_missing_network_fails() {
    let tmp = tempdir().unwrap();
    opfkit()
        .args(["ptdf", tmp.path().join("absent.json").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading network snapshot"));
}
