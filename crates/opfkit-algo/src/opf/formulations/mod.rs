//! Builders for each [`OpfModelKind`](super::OpfModelKind).
//!
//! A builder reads an [`IndexedNetwork`](opfkit_core::IndexedNetwork) and the
//! [`ModelInputs`](super::ModelInputs) and lowers the model to an
//! [`OptimizationProblem`](super::OptimizationProblem).

mod dc;
mod dc_ptdf;
mod security;

pub(crate) use dc::build_dc_opf;
pub(crate) use dc_ptdf::build_dc_opf_ptdf;
pub(crate) use security::{build_scdcopf, build_scdcopf_ccga};
