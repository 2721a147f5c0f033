//! Contingency analysis
//!
//! - [`lodf`]: line outage distribution factors and bridge screening of line
//!   contingency candidates
//! - [`bisection`]: post-contingency generation recovery for generator outages
//! - [`ccga`]: column-and-constraint generation driver for the
//!   security-constrained DC-OPF

pub mod bisection;
pub mod ccga;
pub mod lodf;

pub use bisection::{
    bisect_generator_contingency, evaluate_generator_contingencies, response_dispatch,
    thermal_violations, ContingencyEvaluation,
};
pub use ccga::{line_contingency_violations, solve_scdcopf_ccga, CcgaReport, LineViolation};
pub use lodf::{
    check_line_contingency, compute_lodf, compute_lodf_for, ContingencyInfeasibleWarning,
    LineScreening, LodfMatrix, LodfTable,
};
