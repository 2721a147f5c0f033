//! Backend seam between model construction and numerical solvers.
//!
//! Models lower themselves to an [`OptimizationProblem`]; an [`OpfBackend`]
//! turns that into primal and dual values. Backends are matched to problems by
//! [`ProblemClass`].

use serde::{Deserialize, Serialize};

use super::problem::{OptimizationProblem, ProblemClass};
use crate::OpfResult;

/// Configuration passed to backend solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Feasibility and optimality-gap tolerance
    pub tolerance: f64,
    /// Let the backend print its own iteration log
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            verbose: false,
        }
    }
}

/// Raw backend result, indexed like the problem it came from.
#[derive(Debug, Clone, Serialize)]
pub struct PrimalDual {
    pub status: String,
    pub iterations: usize,
    /// Objective including the constant term
    pub objective: f64,
    /// One value per problem variable
    pub primal: Vec<f64>,
    /// One multiplier per linear constraint, in the sign convention of
    /// `∇f + Σ λ·∇g = 0` (upper side minus lower side for ranged rows)
    pub duals: Vec<f64>,
}

/// Solves [`OptimizationProblem`]s of the classes it supports.
pub trait OpfBackend: Send + Sync {
    /// Unique identifier (e.g. "clarabel")
    fn id(&self) -> &str;

    fn supported_classes(&self) -> &[ProblemClass];

    fn supports(&self, class: ProblemClass) -> bool {
        self.supported_classes().contains(&class)
    }

    fn solve(&self, problem: &OptimizationProblem, config: &SolverConfig) -> OpfResult<PrimalDual>;
}
