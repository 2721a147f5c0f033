//! Optimal power flow models
//!
//! Every model is a tagged [`OpfModelKind`] mapped by [`build_model`] to a plain
//! builder function:
//! - `dcopf`: DC-OPF in voltage-angle form
//! - `dcopf-ptdf`: DC-OPF with PTDF flow definitions
//! - `scdcopf`: security-constrained DC-OPF, extensive form
//! - `scdcopf-ccga`: master problem of the CCGA decomposition
//!
//! Builders lower to a solver-agnostic [`OptimizationProblem`]; an
//! [`OpfBackend`] solves it and [`OpfModel::solve`] maps the result back to
//! element ids.

pub mod backends;
mod coefficients;
mod config;
mod formulations;
mod model;
mod problem;
mod traits;
mod types;

pub use backends::{available_backends, backend_by_id, ClarabelBackend};
pub use coefficients::{preprocess_ratings, GeneratorData, ModelData, SecurityCoefficients};
pub use config::{BisectionConfig, CcgaConfig, ScopfConfig};
pub use model::{ModelLayout, OpfModel};
pub use problem::{
    BilinearConstraint, ConstraintKind, LinearConstraint, Objective, OptimizationProblem,
    ProblemClass, Variable,
};
pub use traits::{OpfBackend, PrimalDual, SolverConfig};
pub use types::{ContingencySet, LazySets, ModelInputs, OpfModelKind, OpfSolution};

use opfkit_core::IndexedNetwork;
use tracing::debug;

use crate::OpfResult;

/// Build the model of `kind` for `indexed`.
pub fn build_model(
    kind: OpfModelKind,
    indexed: &IndexedNetwork,
    inputs: &ModelInputs,
) -> OpfResult<OpfModel> {
    debug!(model = %kind, "building OPF model");
    let builder: fn(&IndexedNetwork, &ModelInputs) -> OpfResult<OpfModel> = match kind {
        OpfModelKind::DcOpf => formulations::build_dc_opf,
        OpfModelKind::DcOpfPtdf => formulations::build_dc_opf_ptdf,
        OpfModelKind::ScDcOpf => formulations::build_scdcopf,
        OpfModelKind::ScDcOpfCcga => formulations::build_scdcopf_ccga,
    };
    builder(indexed, inputs)
}
