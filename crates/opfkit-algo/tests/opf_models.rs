//! Base-case DC-OPF models solved with Clarabel.

mod common;

use common::{assert_close, case5_indexed};
use opfkit_algo::opf::{
    build_model, ClarabelBackend, ContingencySet, ModelInputs, OpfModelKind, ProblemClass,
    SolverConfig,
};
use opfkit_algo::OpfError;
use opfkit_core::{
    index_network, Branch, BranchId, Bus, BusId, BusType, GenId, Generator, IndexedNetwork, Load,
    Network,
};

/// Triangle with a cheap unit at the slack and an expensive one at the load bus.
/// Branch "13" (rate 0.6) is the only binding limit.
fn congested_triangle() -> IndexedNetwork {
    let mut network = Network::new();
    network.add_bus(Bus::new("1", BusType::Reference));
    network.add_bus(Bus::new("2", BusType::Pq));
    network.add_bus(Bus::new("3", BusType::Pv));
    network.add_branch(Branch::new("12", "1", "2", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_branch(Branch::new("13", "1", "3", 0.0, 0.1).with_ratings(0.6, 0.6));
    network.add_branch(Branch::new("23", "2", "3", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_generator(Generator::new("a", "1").with_p_limits(0.0, 2.0).with_cost(0.0, 10.0, 0.0));
    network.add_generator(Generator::new("c", "3").with_p_limits(0.0, 2.0).with_cost(0.0, 30.0, 0.0));
    network.add_load(Load::new("1", "3", 1.2));
    index_network(&network).unwrap()
}

fn solve(kind: OpfModelKind, indexed: &IndexedNetwork) -> opfkit_algo::OpfSolution {
    let model = build_model(kind, indexed, &ModelInputs::default()).unwrap();
    model.solve(&ClarabelBackend, &SolverConfig::default()).unwrap()
}

#[test]
fn test_angle_and_ptdf_forms_agree_on_case5() {
    let indexed = case5_indexed();
    let angle = solve(OpfModelKind::DcOpf, &indexed);
    let ptdf = solve(OpfModelKind::DcOpfPtdf, &indexed);

    assert_eq!(angle.model, OpfModelKind::DcOpf);
    assert_eq!(ptdf.backend, "clarabel");
    let scale = angle.objective_value.abs().max(1.0);
    assert!((angle.objective_value - ptdf.objective_value).abs() / scale < 1e-5);

    for solution in [&angle, &ptdf] {
        let total: f64 = solution.generator_p.values().sum();
        assert_close(total, 10.0, 1e-6);
        assert!(solution.max_violation < 1e-6);
    }
    assert_close(angle.bus_voltage_ang[&BusId::new("4")], 0.0, 1e-9);
    assert!(ptdf.bus_voltage_ang.is_empty());
}

#[test]
fn test_congestion_separates_nodal_prices() {
    let indexed = congested_triangle();

    for kind in [OpfModelKind::DcOpf, OpfModelKind::DcOpfPtdf] {
        let solution = solve(kind, &indexed);
        assert_close(solution.objective_value, 18.0, 1e-5);
        assert_close(solution.generator_p[&GenId::new("a")], 0.9, 1e-5);
        assert_close(solution.generator_p[&GenId::new("c")], 0.3, 1e-5);
        assert_close(solution.branch_p_flow[&BranchId::new("13")], 0.6, 1e-5);

        assert_close(solution.bus_lmp[&BusId::new("1")], 10.0, 1e-3);
        assert_close(solution.bus_lmp[&BusId::new("3")], 30.0, 1e-3);
        assert_close(solution.branch_shadow_price[&BranchId::new("13")], 30.0, 1e-3);
        assert_close(solution.branch_shadow_price[&BranchId::new("12")], 0.0, 1e-4);
    }

    // Bus 2 has no equipment: priced by its balance row in angle form only.
    let angle = solve(OpfModelKind::DcOpf, &indexed);
    assert_close(angle.bus_lmp[&BusId::new("2")], 20.0, 1e-3);
    let ptdf = solve(OpfModelKind::DcOpfPtdf, &indexed);
    assert!(!ptdf.bus_lmp.contains_key(&BusId::new("2")));
    assert_close(ptdf.system_lambda.unwrap(), 10.0, 1e-3);
}

#[test]
fn test_quadratic_cost_is_solved_as_qp() {
    let mut network = Network::new();
    network.add_bus(Bus::new("1", BusType::Reference));
    network.add_bus(Bus::new("2", BusType::Pq));
    network.add_branch(Branch::new("1", "1", "2", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_generator(Generator::new("a", "1").with_p_limits(0.0, 2.0).with_cost(1.0, 10.0, 0.0));
    network.add_generator(Generator::new("b", "2").with_p_limits(0.0, 2.0).with_cost(1.0, 10.0, 0.0));
    network.add_load(Load::new("1", "2", 1.0));
    let indexed = index_network(&network).unwrap();

    let model = build_model(OpfModelKind::DcOpfPtdf, &indexed, &ModelInputs::default()).unwrap();
    assert_eq!(model.problem().problem_class(), ProblemClass::QuadraticProgram);
    let solution = model.solve(&ClarabelBackend, &SolverConfig::default()).unwrap();
    // Identical units split the load evenly: 2·(0.5² + 10·0.5).
    assert_close(solution.objective_value, 10.5, 1e-5);
    assert_close(solution.system_lambda.unwrap(), 11.0, 1e-3);
}

#[test]
fn test_infeasible_demand_is_reported() {
    let mut network = Network::new();
    network.add_bus(Bus::new("1", BusType::Reference));
    network.add_bus(Bus::new("2", BusType::Pq));
    network.add_branch(Branch::new("1", "1", "2", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_generator(Generator::new("a", "1").with_p_limits(0.0, 1.0).with_cost(0.0, 1.0, 0.0));
    network.add_load(Load::new("1", "2", 2.0));
    let indexed = index_network(&network).unwrap();

    let model = build_model(OpfModelKind::DcOpf, &indexed, &ModelInputs::default()).unwrap();
    let err = model.solve(&ClarabelBackend, &SolverConfig::default()).unwrap_err();
    assert!(matches!(err, OpfError::Infeasible(_)));
}

#[test]
fn test_extensive_generator_security_needs_nonconvex_backend() {
    let indexed = case5_indexed();
    let inputs = ModelInputs::default().with_gen_contingencies(ContingencySet::All);
    let model = build_model(OpfModelKind::ScDcOpf, &indexed, &inputs).unwrap();
    assert_eq!(model.problem().problem_class(), ProblemClass::NonconvexQcqp);

    let err = model.solve(&ClarabelBackend, &SolverConfig::default()).unwrap_err();
    match err {
        OpfError::UnsupportedProblemClass { backend, class } => {
            assert_eq!(backend, "clarabel");
            assert_eq!(class, ProblemClass::NonconvexQcqp);
        }
        other => panic!("unexpected error: {other}"),
    }
}
