//! DC-OPF with branch flows written through PTDF factors.
//!
//! ```text
//! min  Σ c2·pg² + c1·pg + c0
//! s.t. pf[e] = Σ_g ptdf_g[e,g]·pg[g] - load_injection[e]
//!      Σ pg = Σ pd
//!      -rate_a ≤ pf ≤ rate_a
//!      pmin ≤ pg ≤ pmax
//! ```
//!
//! The security-constrained models reuse [`add_base_case`] unchanged.

use opfkit_core::IndexedNetwork;

use crate::opf::coefficients::ModelData;
use crate::opf::model::OpfModel;
use crate::opf::problem::ConstraintKind;
use crate::opf::types::{ModelInputs, OpfModelKind};
use crate::tolerance::is_finite_bound;
use crate::OpfResult;

pub(crate) fn build_dc_opf_ptdf(indexed: &IndexedNetwork, inputs: &ModelInputs) -> OpfResult<OpfModel> {
    let data = ModelData::prepare(indexed, &inputs.config)?;
    let mut model = OpfModel::new(OpfModelKind::DcOpfPtdf, indexed);
    add_base_case(&mut model, &data);
    model.data = Some(data);
    Ok(model)
}

/// Base-case dispatch, PTDF flow definitions, thermal limits and system balance.
pub(crate) fn add_base_case(model: &mut OpfModel, data: &ModelData) {
    let indexed = &model.indexed;
    let problem = &mut model.problem;
    let layout = &mut model.layout;

    for (g, gen) in data.generators.iter().enumerate() {
        let var = problem.add_variable(format!("pg[{}]", gen.id), gen.pmin, gen.pmax);
        let [c2, c1, c0] = gen.cost;
        problem.add_cost(var, c2, c1, c0);
        debug_assert_eq!(layout.pg.len(), g);
        layout.pg.push(var);
    }

    let branch_ids = indexed.branch_ids();
    for id in branch_ids {
        let var = problem.add_variable(format!("pf[{id}]"), f64::NEG_INFINITY, f64::INFINITY);
        layout.pf.push(var);
    }

    for (e, id) in branch_ids.iter().enumerate() {
        let mut terms = vec![(layout.pf[e], 1.0)];
        terms.extend(
            (0..data.num_generators())
                .map(|g| (layout.pg[g], -data.ptdf.gen_factor(e, g)))
                .filter(|&(_, a)| a != 0.0),
        );
        problem.add_equality(
            format!("pf_def[{id}]"),
            ConstraintKind::FlowDefinition,
            terms,
            data.load_injection[e],
            0.0,
        );

        let rate = data.rate_a[e];
        if is_finite_bound(rate) {
            let row = problem.add_constraint(
                format!("pf_limit[{id}]"),
                ConstraintKind::FlowLimit,
                vec![(layout.pf[e], 1.0)],
                0.0,
                -rate,
                rate,
            );
            layout.flow_limits.push((row, e));
        }
    }

    let terms = layout.pg.iter().map(|&var| (var, 1.0)).collect();
    layout.system_balance = Some(problem.add_equality(
        "balance",
        ConstraintKind::SystemBalance,
        terms,
        0.0,
        data.total_demand,
    ));
}
