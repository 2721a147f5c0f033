//! DC-OPF in voltage-angle form.
//!
//! ```text
//! min  Σ c2·pg² + c1·pg + c0
//! s.t. pf = S_br·va
//!      Σ pg(b) - Σ pf(out of b) + Σ pf(into b) = Σ pd(b)     ∀ b
//!      va[slack] = 0
//!      -rate_a ≤ pf ≤ rate_a
//!      pmin ≤ pg ≤ pmax
//! ```

use opfkit_core::IndexedNetwork;
use tracing::debug;

use crate::opf::coefficients::preprocess_ratings;
use crate::opf::model::OpfModel;
use crate::opf::problem::ConstraintKind;
use crate::opf::types::{ModelInputs, OpfModelKind};
use crate::sparse::branch_susceptance_matrix;
use crate::tolerance::is_finite_bound;
use crate::OpfResult;

pub(crate) fn build_dc_opf(indexed: &IndexedNetwork, inputs: &ModelInputs) -> OpfResult<OpfModel> {
    inputs.config.validate()?;
    let mut model = OpfModel::new(OpfModelKind::DcOpf, indexed);
    let problem = &mut model.problem;
    let layout = &mut model.layout;

    for g in 0..indexed.num_generators() {
        let gen = indexed.generator(g);
        let var = problem.add_variable(format!("pg[{}]", gen.id), gen.pmin, gen.pmax);
        let [c2, c1, c0] = gen.cost;
        problem.add_cost(var, c2, c1, c0);
        layout.pg.push(var);
    }
    for id in indexed.bus_ids() {
        let var = problem.add_variable(format!("va[{id}]"), f64::NEG_INFINITY, f64::INFINITY);
        layout.va.push(var);
    }
    for id in indexed.branch_ids() {
        let var = problem.add_variable(format!("pf[{id}]"), f64::NEG_INFINITY, f64::INFINITY);
        layout.pf.push(var);
    }

    let slack = indexed.slack();
    problem.add_equality(
        format!("va_ref[{}]", indexed.slack_id()),
        ConstraintKind::ReferenceAngle,
        vec![(layout.va[slack], 1.0)],
        0.0,
        0.0,
    );

    let s_br = branch_susceptance_matrix(indexed);
    for (e, row) in s_br.outer_iterator().enumerate() {
        let id = &indexed.branch_ids()[e];
        let mut terms = vec![(layout.pf[e], 1.0)];
        terms.extend(row.iter().map(|(b, &s)| (layout.va[b], -s)));
        problem.add_equality(
            format!("pf_def[{id}]"),
            ConstraintKind::FlowDefinition,
            terms,
            0.0,
            0.0,
        );

        let branch = indexed.branch(e);
        let (rate_a, _) = preprocess_ratings(branch.rate_a, branch.rate_c, &inputs.config);
        if is_finite_bound(rate_a) {
            let row = problem.add_constraint(
                format!("pf_limit[{id}]"),
                ConstraintKind::FlowLimit,
                vec![(layout.pf[e], 1.0)],
                0.0,
                -rate_a,
                rate_a,
            );
            layout.flow_limits.push((row, e));
        }
    }

    let mut terms = vec![Vec::new(); indexed.num_buses()];
    for g in 0..indexed.num_generators() {
        terms[indexed.gen_bus(g)].push((layout.pg[g], 1.0));
    }
    for e in 0..indexed.num_branches() {
        let (from, to) = indexed.branch_ends(e);
        terms[from].push((layout.pf[e], -1.0));
        terms[to].push((layout.pf[e], 1.0));
    }
    let mut demand = vec![0.0; indexed.num_buses()];
    for l in 0..indexed.num_loads() {
        demand[indexed.load_bus(l)] += indexed.load(l).pd;
    }
    for (b, (bus_terms, pd)) in terms.into_iter().zip(demand).enumerate() {
        let row = problem.add_equality(
            format!("balance[{}]", indexed.bus_ids()[b]),
            ConstraintKind::BusBalance(b),
            bus_terms,
            0.0,
            pd,
        );
        layout.bus_balance.push(row);
    }

    debug!(
        buses = indexed.num_buses(),
        branches = indexed.num_branches(),
        limits = layout.flow_limits.len(),
        "built angle-form DC-OPF"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfkit_core::{index_network, Branch, Bus, BusType, Generator, Load, Network};

    #[test]
    fn test_angle_form_structure() {
        let mut network = Network::new();
        network.add_bus(Bus::new("1", BusType::Reference));
        network.add_bus(Bus::new("2", BusType::Pq));
        network.add_branch(Branch::new("1", "1", "2", 0.0, 0.1).with_ratings(0.0, 0.0));
        network.add_generator(Generator::new("a", "1").with_p_limits(0.0, 2.0));
        network.add_load(Load::new("1", "2", 1.0));
        let indexed = index_network(&network).unwrap();

        let model = build_dc_opf(&indexed, &ModelInputs::default()).unwrap();
        let problem = model.problem();
        // pg, va[1], va[2], pf
        assert_eq!(problem.num_variables(), 4);
        assert_eq!(problem.constraints_of(ConstraintKind::BusBalance(1)).count(), 1);
        assert_eq!(problem.constraints_of(ConstraintKind::ReferenceAngle).count(), 1);
        // Unset rate A means no thermal limit row.
        assert_eq!(problem.constraints_of(ConstraintKind::FlowLimit).count(), 0);

        // b = -10: pf = -10·(va1 - va2) carries 1.0 from bus 1 to bus 2 at va2 = 0.1.
        let x = [1.0, 0.0, 0.1, 1.0];
        assert!(problem.max_violation(&x) < 1e-12);
    }
}
