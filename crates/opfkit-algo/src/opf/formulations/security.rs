//! Security-constrained DC-OPF, extensive and decomposed (CCGA master) forms.
//!
//! On top of the PTDF base case, each generator contingency `k` gets its own
//! post-contingency dispatch `pg_kg[·,k]` with `pg_kg[k,k] = 0` and a balance
//! row. Emergency limits use rate C:
//!
//! ```text
//! generator k:  -rate_c ≤ Σ_g ptdf_g[e,g]·pg_kg[g,k] - load_injection[e] ≤ rate_c
//! line k:       -rate_c ≤ pf[e] + lodf[e,k]·pf[k] ≤ rate_c
//! ```
//!
//! Primary response is the complementarity relaxation of Petra & Aravena (2021):
//!
//! ```text
//! pg_kg[g,k] + rho[g,k] = pg[g] + n_k·γ_g·capacity_g
//! rho[g,k]·(pmax[g] - pg_kg[g,k]) ≤ eps·capacity_g²
//! rho ≥ 0,  0 ≤ n_k ≤ 1
//! ```
//!
//! The extensive form carries every limit and the response of every generator
//! contingency, which makes it a nonconvex QCQP. The CCGA master replaces the
//! response by the provisional limit `pg_kg - pg ≤ γ·capacity` and only carries
//! the limits and responses named in its [`LazySets`].

use std::collections::HashSet;

use opfkit_core::{BranchId, GenId, IndexedNetwork, OpfkitError, OpfkitResult};
use tracing::{debug, info};

use super::dc_ptdf::add_base_case;
use crate::contingency::{check_line_contingency, compute_lodf, LineScreening, LodfMatrix};
use crate::opf::coefficients::ModelData;
use crate::opf::model::OpfModel;
use crate::opf::problem::ConstraintKind;
use crate::opf::types::{ContingencySet, LazySets, ModelInputs, OpfModelKind};
use crate::tolerance::is_finite_bound;
use crate::OpfResult;

pub(crate) fn build_scdcopf(indexed: &IndexedNetwork, inputs: &ModelInputs) -> OpfResult<OpfModel> {
    let data = ModelData::prepare(indexed, &inputs.config)?;
    let contingencies = resolve_contingencies(indexed, &data, inputs)?;
    let mut model = OpfModel::new(OpfModelKind::ScDcOpf, indexed);
    add_base_case(&mut model, &data);

    for &k in &contingencies.generators {
        add_generator_contingency(&mut model, &data, k);
        for e in 0..data.num_branches() {
            add_generator_contingency_flow(&mut model, &data, e, k);
        }
        add_primary_response(&mut model, &data, k);
    }
    if let Some(lodf) = &contingencies.lodf {
        for (j, &o) in contingencies.lines.iter().enumerate() {
            for e in 0..data.num_branches() {
                add_line_contingency_flow(&mut model, &data, lodf, e, j, o);
            }
        }
    }

    info!(
        generator_contingencies = contingencies.generators.len(),
        line_contingencies = contingencies.lines.len(),
        variables = model.problem.num_variables(),
        constraints = model.problem.num_constraints(),
        "built extensive SC-DC-OPF"
    );
    Ok(contingencies.install(model, data, LazySets::default()))
}

pub(crate) fn build_scdcopf_ccga(
    indexed: &IndexedNetwork,
    inputs: &ModelInputs,
) -> OpfResult<OpfModel> {
    let data = ModelData::prepare(indexed, &inputs.config)?;
    let contingencies = resolve_contingencies(indexed, &data, inputs)?;
    let lazy = &inputs.lazy;
    let lazy_k_g = contingencies.lazy_generators(indexed, lazy)?;

    let mut model = OpfModel::new(OpfModelKind::ScDcOpfCcga, indexed);
    add_base_case(&mut model, &data);

    for &k in &contingencies.generators {
        add_generator_contingency(&mut model, &data, k);
        add_provisional_response(&mut model, &data, k);
    }
    for &k in &lazy_k_g {
        add_primary_response(&mut model, &data, k);
    }
    for (branch, contingency) in &lazy.e_k_g {
        let e = indexed.require_branch(branch)?;
        let k = contingencies.generator_position(indexed, contingency)?;
        add_generator_contingency_flow(&mut model, &data, e, k);
    }
    for (branch, outage) in &lazy.e_k_e {
        let e = indexed.require_branch(branch)?;
        let (j, o) = contingencies.line_position(indexed, outage)?;
        if let Some(lodf) = &contingencies.lodf {
            add_line_contingency_flow(&mut model, &data, lodf, e, j, o);
        }
    }

    info!(
        generator_contingencies = contingencies.generators.len(),
        line_contingencies = contingencies.lines.len(),
        lazy = lazy.len(),
        class = %model.problem.problem_class(),
        "built SC-DC-OPF CCGA master"
    );
    Ok(contingencies.install(model, data, lazy.clone()))
}

/// Contingency lists after eligibility filtering and bridge screening.
struct Contingencies {
    /// Dense generator indices with nonzero capacity
    generators: Vec<usize>,
    /// Dense branch indices in LODF column order
    lines: Vec<usize>,
    screening: LineScreening,
    lodf: Option<LodfMatrix>,
}

impl Contingencies {
    fn install(self, mut model: OpfModel, data: ModelData, lazy: LazySets) -> OpfModel {
        model.data = Some(data);
        model.lodf = self.lodf;
        model.screening = self.screening;
        model.gen_contingencies = self.generators;
        model.line_contingencies = self.lines;
        model.lazy = lazy;
        model
    }

    fn generator_position(&self, indexed: &IndexedNetwork, id: &GenId) -> OpfkitResult<usize> {
        let k = indexed.require_generator(id)?;
        if self.generators.contains(&k) {
            Ok(k)
        } else {
            Err(OpfkitError::Configuration(format!(
                "generator {id} is not a modelled generator contingency"
            )))
        }
    }

    /// `(LODF column, dense branch index)` of line contingency `id`.
    fn line_position(&self, indexed: &IndexedNetwork, id: &BranchId) -> OpfkitResult<(usize, usize)> {
        let o = indexed.require_branch(id)?;
        self.lines
            .iter()
            .position(|&k| k == o)
            .map(|j| (j, o))
            .ok_or_else(|| {
                OpfkitError::Configuration(format!(
                    "branch {id} is not a modelled line contingency"
                ))
            })
    }

    fn lazy_generators(&self, indexed: &IndexedNetwork, lazy: &LazySets) -> OpfkitResult<Vec<usize>> {
        lazy.k_g
            .iter()
            .map(|id| self.generator_position(indexed, id))
            .collect()
    }
}

fn resolve_contingencies(
    indexed: &IndexedNetwork,
    data: &ModelData,
    inputs: &ModelInputs,
) -> OpfkitResult<Contingencies> {
    let candidates = match &inputs.gen_contingencies {
        ContingencySet::None => Vec::new(),
        ContingencySet::All => (0..indexed.num_generators()).collect(),
        ContingencySet::Only(ids) => {
            let mut seen = HashSet::new();
            let mut indices = Vec::new();
            for id in ids {
                let g = indexed.require_generator(id)?;
                if seen.insert(g) {
                    indices.push(g);
                }
            }
            indices
        }
    };
    let generators = data.eligible_generator_contingencies(&candidates);
    if generators.len() < candidates.len() {
        debug!(
            dropped = candidates.len() - generators.len(),
            "skipping generator contingencies without capacity"
        );
    }

    let line_ids: Vec<BranchId> = match &inputs.line_contingencies {
        ContingencySet::None => Vec::new(),
        ContingencySet::All => indexed.branch_ids().to_vec(),
        ContingencySet::Only(ids) => ids.clone(),
    };
    let screening = check_line_contingency(indexed, &line_ids)?;
    let lines = screening
        .accepted
        .iter()
        .map(|id| indexed.require_branch(id))
        .collect::<OpfkitResult<Vec<_>>>()?;
    let lodf = if lines.is_empty() {
        None
    } else {
        Some(compute_lodf(indexed, &lines)?)
    };

    Ok(Contingencies {
        generators,
        lines,
        screening,
        lodf,
    })
}

/// `pg_kg[·,k]` variables and the balance of contingency `k`.
fn add_generator_contingency(model: &mut OpfModel, data: &ModelData, k: usize) {
    let problem = &mut model.problem;
    let layout = &mut model.layout;
    let outaged = &data.generators[k].id;
    let mut terms = Vec::with_capacity(data.num_generators());
    for (g, gen) in data.generators.iter().enumerate() {
        let (lower, upper) = if g == k { (0.0, 0.0) } else { (gen.pmin, gen.pmax) };
        let var = problem.add_variable(format!("pg_kg[{},{}]", gen.id, outaged), lower, upper);
        layout.pg_kg.insert((g, k), var);
        terms.push((var, 1.0));
    }
    problem.add_equality(
        format!("balance_kg[{outaged}]"),
        ConstraintKind::ContingencyBalance(k),
        terms,
        0.0,
        data.total_demand,
    );
}

/// Emergency limit of branch `e` under generator contingency `k`.
fn add_generator_contingency_flow(model: &mut OpfModel, data: &ModelData, e: usize, k: usize) {
    let rate = data.rate_c[e];
    if !is_finite_bound(rate) {
        return;
    }
    let terms = (0..data.num_generators())
        .map(|g| (model.layout.pg_kg[&(g, k)], data.ptdf.gen_factor(e, g)))
        .filter(|&(_, a)| a != 0.0)
        .collect();
    model.problem.add_constraint(
        format!(
            "pf_kg[{},{}]",
            model.indexed.branch_ids()[e],
            data.generators[k].id
        ),
        ConstraintKind::ContingencyFlowLimit,
        terms,
        -data.load_injection[e],
        -rate,
        rate,
    );
}

/// Emergency limit of branch `e` after outage of branch `o` (LODF column `j`).
fn add_line_contingency_flow(
    model: &mut OpfModel,
    data: &ModelData,
    lodf: &LodfMatrix,
    e: usize,
    j: usize,
    o: usize,
) {
    let rate = data.rate_c[e];
    if e == o || !is_finite_bound(rate) {
        return;
    }
    let branch_ids = model.indexed.branch_ids();
    let mut terms = vec![(model.layout.pf[e], 1.0)];
    let factor = lodf.get(e, j);
    if factor != 0.0 {
        terms.push((model.layout.pf[o], factor));
    }
    let name = format!("pf_ke[{},{}]", branch_ids[e], branch_ids[o]);
    model.problem.add_constraint(
        name,
        ConstraintKind::ContingencyFlowLimit,
        terms,
        0.0,
        -rate,
        rate,
    );
}

/// `pg_kg[g,k] - pg[g] ≤ γ_g·capacity_g` for every surviving unit.
fn add_provisional_response(model: &mut OpfModel, data: &ModelData, k: usize) {
    let outaged = &data.generators[k].id;
    for (g, gen) in data.generators.iter().enumerate() {
        if g == k {
            continue;
        }
        let terms = vec![(model.layout.pg_kg[&(g, k)], 1.0), (model.layout.pg[g], -1.0)];
        model.problem.add_constraint(
            format!("provisional[{},{}]", gen.id, outaged),
            ConstraintKind::ProvisionalResponse,
            terms,
            0.0,
            f64::NEG_INFINITY,
            gen.response_limit(),
        );
    }
}

/// Primary-response variables and the relaxed complementarity of contingency `k`.
fn add_primary_response(model: &mut OpfModel, data: &ModelData, k: usize) {
    let outaged = &data.generators[k].id;
    let n = model
        .problem
        .add_variable(format!("n_kg[{outaged}]"), 0.0, 1.0);
    model.layout.n_kg.insert(k, n);

    for (g, gen) in data.generators.iter().enumerate() {
        if g == k {
            continue;
        }
        let pg = model.layout.pg[g];
        let pg_kg = model.layout.pg_kg[&(g, k)];
        let rho = model
            .problem
            .add_variable(format!("rho_kg[{},{}]", gen.id, outaged), 0.0, f64::INFINITY);
        model.layout.rho_kg.insert((g, k), rho);

        let mut terms = vec![(pg_kg, 1.0), (rho, 1.0), (pg, -1.0)];
        let slope = gen.gamma * gen.capacity;
        if slope != 0.0 {
            terms.push((n, -slope));
        }
        model.problem.add_equality(
            format!("pr1[{},{}]", gen.id, outaged),
            ConstraintKind::PrimaryResponse,
            terms,
            0.0,
            0.0,
        );
        model.problem.add_bilinear(
            format!("pr2[{},{}]", gen.id, outaged),
            vec![(rho, gen.pmax)],
            vec![(rho, pg_kg, -1.0)],
            data.eps * gen.capacity * gen.capacity,
        );
    }
}
