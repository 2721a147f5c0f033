//! Power Transfer Distribution Factors.
//!
//! PTDF entry `(e, k)` is the change in flow on branch `e` for one unit of power
//! injected at the bus of element `k` and withdrawn at the slack bus:
//!
//! ```text
//! S_b · X = I          (S_b grounded at the slack, I = I_g, I_l or Φ)
//! X[slack, :] = 0
//! PTDF = S_br · X
//! ```
//!
//! Generators and loads at the slack bus therefore have an all-zero column.
//! Entries with magnitude at or below [`PTDF_ZERO_TOL`] are snapped to zero so that
//! downstream solvers do not see spurious structural nonzeros.
//!
//! ## References
//!
//! - Wood & Wollenberg, "Power Generation, Operation and Control", Ch. 7
//! - Guo et al., "Direct Calculation of Line Outage Distribution Factors",
//!   IEEE Trans. Power Systems 24(3), 2009

use faer::Mat;
use opfkit_core::{
    ensure_connected, BranchId, GenId, IndexedNetwork, LoadId, OpfkitError, OpfkitResult,
};
use serde::Serialize;
use tracing::debug;

use super::linalg::{mat_vec, snap_small, sparse_dense_product, to_rows, GroundedSystem};
use super::susceptance::{
    branch_susceptance_matrix, generator_incidence_matrix, grounded_bus_susceptance_matrix,
    line_incidence_columns, load_incidence_matrix,
};
use crate::tolerance::PTDF_ZERO_TOL;

/// Generator and load PTDF matrices for one network snapshot.
#[derive(Debug, Clone)]
pub struct PtdfFactors {
    /// `E×G` generator-to-flow sensitivities
    pub gen: Mat<f64>,
    /// `E×L` load-to-flow sensitivities
    pub load: Mat<f64>,
    branches: Vec<BranchId>,
    generators: Vec<GenId>,
    loads: Vec<LoadId>,
}

/// Serializable view of [`PtdfFactors`] with row/column labels.
#[derive(Debug, Clone, Serialize)]
pub struct PtdfTable {
    pub branches: Vec<BranchId>,
    pub generators: Vec<GenId>,
    pub loads: Vec<LoadId>,
    pub ptdf_g: Vec<Vec<f64>>,
    pub ptdf_l: Vec<Vec<f64>>,
}

impl PtdfFactors {
    pub fn num_branches(&self) -> usize {
        self.gen.nrows()
    }

    pub fn branches(&self) -> &[BranchId] {
        &self.branches
    }

    pub fn generators(&self) -> &[GenId] {
        &self.generators
    }

    pub fn loads(&self) -> &[LoadId] {
        &self.loads
    }

    /// Sensitivity of branch `e` to generator `g` (dense indices).
    pub fn gen_factor(&self, e: usize, g: usize) -> f64 {
        self.gen.read(e, g)
    }

    pub fn load_factor(&self, e: usize, l: usize) -> f64 {
        self.load.read(e, l)
    }

    /// `PTDF_g · pg` per branch.
    pub fn gen_injection(&self, pg: &[f64]) -> Vec<f64> {
        mat_vec(&self.gen, pg)
    }

    /// `PTDF_l · pd` per branch: the constant load contribution to every flow.
    pub fn load_injection(&self, pd: &[f64]) -> Vec<f64> {
        mat_vec(&self.load, pd)
    }

    /// Base-case flows `PTDF_g · pg - PTDF_l · pd`.
    pub fn branch_flows(&self, pg: &[f64], pd: &[f64]) -> Vec<f64> {
        self.gen_injection(pg)
            .into_iter()
            .zip(self.load_injection(pd))
            .map(|(g, l)| g - l)
            .collect()
    }

    pub fn to_table(&self) -> PtdfTable {
        PtdfTable {
            branches: self.branches.clone(),
            generators: self.generators.clone(),
            loads: self.loads.clone(),
            ptdf_g: to_rows(&self.gen),
            ptdf_l: to_rows(&self.load),
        }
    }
}

/// Factor the grounded susceptance matrix after checking that the network is one island.
pub(crate) fn grounded_system(indexed: &IndexedNetwork) -> OpfkitResult<GroundedSystem> {
    ensure_connected(indexed.network())?;
    GroundedSystem::factor(&grounded_bus_susceptance_matrix(indexed), indexed.slack())
}

/// Compute `ptdf_g` (E×G) and `ptdf_l` (E×L).
///
/// Fails with `SingularSystem` when the in-service network is split into islands.
pub fn compute_ptdf(indexed: &IndexedNetwork) -> OpfkitResult<PtdfFactors> {
    let system = grounded_system(indexed)?;
    let s_br = branch_susceptance_matrix(indexed);

    let x_g = system.solve(&generator_incidence_matrix(indexed))?;
    let x_l = system.solve(&load_incidence_matrix(indexed))?;

    let mut gen = sparse_dense_product(&s_br, &x_g);
    let mut load = sparse_dense_product(&s_br, &x_l);
    snap_small(&mut gen, PTDF_ZERO_TOL);
    snap_small(&mut load, PTDF_ZERO_TOL);

    debug!(
        branches = gen.nrows(),
        generators = gen.ncols(),
        loads = load.ncols(),
        "computed PTDF"
    );

    Ok(PtdfFactors {
        gen,
        load,
        branches: indexed.branch_ids().to_vec(),
        generators: indexed.generator_ids().to_vec(),
        loads: indexed.load_ids().to_vec(),
    })
}

/// Branch-to-branch PTDF `S_br · S_b⁻¹ · Φ` (E×E).
///
/// Column `k` is the flow on every branch for a unit transfer from the from-bus
/// to the to-bus of branch `k`. No small-value snapping is applied here because
/// the diagonal feeds the `1 - PTDF_OO` denominator of the LODF.
pub fn compute_branch_ptdf(indexed: &IndexedNetwork) -> OpfkitResult<Mat<f64>> {
    let all: Vec<usize> = (0..indexed.num_branches()).collect();
    compute_branch_ptdf_columns(indexed, &all)
}

/// Columns `branches` of the branch-to-branch PTDF (E×K), one solve per column.
pub fn compute_branch_ptdf_columns(
    indexed: &IndexedNetwork,
    branches: &[usize],
) -> OpfkitResult<Mat<f64>> {
    if let Some(&bad) = branches.iter().find(|&&e| e >= indexed.num_branches()) {
        return Err(OpfkitError::InvalidData(format!(
            "branch index {bad} out of range for {} in-service branches",
            indexed.num_branches()
        )));
    }
    let system = grounded_system(indexed)?;
    let s_br = branch_susceptance_matrix(indexed);
    let x = system.solve(&line_incidence_columns(indexed, branches))?;
    debug!(monitored = s_br.rows(), outages = branches.len(), "computed branch PTDF");
    Ok(sparse_dense_product(&s_br, &x))
}
