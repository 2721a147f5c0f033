//! # opfkit-algo: linear sensitivities and security-constrained DC-OPF
//!
//! This crate turns an [`IndexedNetwork`](opfkit_core::IndexedNetwork) into the
//! linear sensitivity factors of the DC power flow and builds and solves the
//! DC optimal power flow family on top of them.
//!
//! ## Sensitivities
//!
//! | Entry point | Result |
//! |-------------|--------|
//! | [`compute_ptdf`] | Generator and load PTDF (`E×G`, `E×L`) |
//! | [`compute_lodf`] | LODF columns for a set of outaged branches (`E×K`) |
//! | [`check_line_contingency`] | Candidates with bridge lines removed, plus warnings |
//!
//! PTDF entries at or below `1e-13` in magnitude are stored as exact zeros.
//! Islanded networks fail with `SingularSystem` before any linear solve.
//!
//! ## OPF models
//!
//! | Model | Form | Problem Class |
//! |-------|------|---------------|
//! | [`OpfModelKind::DcOpf`] | Angles, nodal balance | LP/QP |
//! | [`OpfModelKind::DcOpfPtdf`] | PTDF flows, system balance | LP/QP |
//! | [`OpfModelKind::ScDcOpf`] | Extensive security-constrained form | Nonconvex QCQP |
//! | [`OpfModelKind::ScDcOpfCcga`] | CCGA master problem | LP/QP |
//!
//! Models are built by [`opf::build_model`] and solved through an
//! [`opf::OpfBackend`]; [`opf::ClarabelBackend`] handles LP and QP instances.
//! [`solve_scdcopf_ccga`] runs the full decomposition, checking each master
//! solution with the post-contingency bisection of [`contingency::bisection`].
//!
//! ## Example
//!
//! ```ignore
//! use opfkit_algo::opf::{build_model, ClarabelBackend, ModelInputs, OpfModelKind, SolverConfig};
//! use opfkit_core::{index_network, Network};
//!
//! let network = Network::from_json_file("case5.json")?;
//! let indexed = index_network(&network)?;
//!
//! let model = build_model(OpfModelKind::DcOpfPtdf, &indexed, &ModelInputs::default())?;
//! let solution = model.solve(&ClarabelBackend, &SolverConfig::default())?;
//! println!("Cost: {:.2}", solution.objective_value);
//! ```

pub mod contingency;
pub mod error;
pub mod opf;
pub mod sparse;
pub mod tolerance;

pub use contingency::{
    bisect_generator_contingency, check_line_contingency, compute_lodf, compute_lodf_for,
    evaluate_generator_contingencies, solve_scdcopf_ccga, CcgaReport, ContingencyEvaluation,
    ContingencyInfeasibleWarning, LineScreening, LodfMatrix,
};
pub use error::{OpfError, OpfResult};
pub use opf::{OpfModel, OpfModelKind, OpfSolution, ScopfConfig};
pub use sparse::{compute_ptdf, PtdfFactors};
