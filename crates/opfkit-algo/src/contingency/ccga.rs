//! Column-and-constraint generation for the security-constrained DC-OPF.
//!
//! Each round solves the CCGA master (base case, provisional post-contingency
//! dispatch, lazily added limits), then checks the master's dispatch exactly:
//!
//! 1. every generator contingency is rebalanced by bisection on the primary
//!    response extent, and branches over rate C are recorded;
//! 2. every line contingency is evaluated from the base flows through LODF.
//!
//! Violated `(branch, contingency)` pairs join the lazy sets and the master is
//! rebuilt. A violated generator contingency also joins `K_g`, which brings its
//! primary-response constraints into the master and makes it a nonconvex QCQP;
//! a backend without QCQP support then fails the run with
//! `UnsupportedProblemClass`. The loop stops when a round finds no violation, when it adds
//! nothing new, or after `ccga.max_rounds` rounds.
//!
//! Reference: Velloso, Van Hentenryck & Johnson, "An exact and scalable problem
//! decomposition for security-constrained optimal power flow", EPSR 195 (2021).

use opfkit_core::{BranchId, Diagnostics, IndexedNetwork, OpfkitError};
use serde::Serialize;
use tracing::{info, warn};

use super::bisection::{evaluate_generator_contingencies, ContingencyEvaluation};
use super::lodf::LodfMatrix;
use crate::opf::{
    build_model, LazySets, ModelData, ModelInputs, OpfBackend, OpfModelKind, OpfSolution,
    SolverConfig,
};
use crate::OpfResult;

/// Emergency-limit violation after a line outage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineViolation {
    pub branch: BranchId,
    pub contingency: BranchId,
    /// `pf[e] + lodf[e,k]·pf[k]`
    pub flow: f64,
    pub rate_c: f64,
    pub violation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CcgaReport {
    /// Master solution of the last round
    pub solution: OpfSolution,
    /// Bisection outcome per generator contingency, last round
    pub generator_contingencies: Vec<ContingencyEvaluation>,
    /// Line contingency violations, last round
    pub line_violations: Vec<LineViolation>,
    pub lazy: LazySets,
    pub rounds: usize,
    /// The last round found no violation
    pub converged: bool,
    pub diagnostics: Diagnostics,
}

impl CcgaReport {
    /// Largest post-contingency violation of the last round.
    pub fn max_violation(&self) -> f64 {
        let generator = self
            .generator_contingencies
            .iter()
            .map(|e| e.max_violation);
        let line = self.line_violations.iter().map(|v| v.violation);
        generator.chain(line).fold(0.0, f64::max)
    }
}

/// Violations above `tolerance` of every line contingency in `lodf`.
pub fn line_contingency_violations(
    indexed: &IndexedNetwork,
    data: &ModelData,
    lodf: &LodfMatrix,
    pf: &[f64],
    tolerance: f64,
) -> Vec<LineViolation> {
    let branch_ids = indexed.branch_ids();
    let mut violations = Vec::new();
    for k in 0..lodf.num_outages() {
        let o = lodf.outage_index(k);
        for (e, flow) in lodf.post_outage_flows(pf, k).into_iter().enumerate() {
            if e == o {
                continue;
            }
            let violation = (flow.abs() - data.rate_c[e]).max(0.0);
            if violation > tolerance {
                violations.push(LineViolation {
                    branch: branch_ids[e].clone(),
                    contingency: branch_ids[o].clone(),
                    flow,
                    rate_c: data.rate_c[e],
                    violation,
                });
            }
        }
    }
    violations
}

/// Run the CCGA loop for the contingencies named in `inputs`.
///
/// `inputs.lazy` seeds the lazy sets. A generator contingency whose bisection
/// does not converge aborts the run with `BisectionConvergence`, and a master
/// the backend cannot solve aborts it with `UnsupportedProblemClass`.
pub fn solve_scdcopf_ccga(
    indexed: &IndexedNetwork,
    inputs: &ModelInputs,
    backend: &dyn OpfBackend,
    solver: &SolverConfig,
) -> OpfResult<CcgaReport> {
    let config = &inputs.config;
    let tolerance = config.ccga.violation_tolerance;
    let mut lazy = inputs.lazy.clone();
    let mut round = 0;

    loop {
        round += 1;
        let round_inputs = inputs.clone().with_lazy(lazy.clone());
        let model = build_model(OpfModelKind::ScDcOpfCcga, indexed, &round_inputs)?;
        let data = model.data().ok_or_else(|| {
            OpfkitError::InvalidData("CCGA master was built without PTDF data".into())
        })?;
        let (solution, x) = model.solve_with_primal(backend, solver)?;
        let pg = model.base_dispatch(&x);
        let pf = model.base_flows(&x);

        let starts: Vec<(usize, f64)> = model
            .gen_contingencies
            .iter()
            .map(|&k| (k, model.response_extent(&x, k).unwrap_or(0.5)))
            .collect();
        let evaluations = evaluate_generator_contingencies(data, &pg, &starts, &config.bisection)?;
        let line_violations = match model.lodf() {
            Some(lodf) => line_contingency_violations(indexed, data, lodf, &pf, tolerance),
            None => Vec::new(),
        };

        let before = lazy.len();
        let mut violated = line_violations.len();
        for evaluation in &evaluations {
            let mut hit = false;
            for e in evaluation.violated_branches(tolerance) {
                hit = true;
                violated += 1;
                lazy.e_k_g.insert((
                    indexed.branch_ids()[e].clone(),
                    evaluation.contingency.clone(),
                ));
            }
            // The limits only bind the response dispatch once it is modelled.
            if hit {
                lazy.k_g.insert(evaluation.contingency.clone());
            }
        }
        for violation in &line_violations {
            lazy.e_k_e
                .insert((violation.branch.clone(), violation.contingency.clone()));
        }
        let added = lazy.len() - before;

        info!(
            round,
            objective = solution.objective_value,
            violated,
            added,
            "CCGA round"
        );

        let converged = violated == 0;
        let stalled = !converged && added == 0;
        let exhausted = round >= config.ccga.max_rounds;
        if converged || stalled || exhausted {
            let mut diagnostics = model.screening().diagnostics();
            if stalled {
                warn!(round, violated, "CCGA stopped: violations remain but no new constraints");
                diagnostics.add_warning(
                    "ccga",
                    &format!("{violated} violations remain after round {round} with no new constraints"),
                );
            } else if !converged {
                warn!(round, violated, "CCGA stopped at the round limit");
                diagnostics.add_warning(
                    "ccga",
                    &format!("{violated} violations remain after {round} rounds"),
                );
            }
            // Pairs added in a round that ends the loop were never solved.
            if !converged {
                lazy = model.lazy().clone();
            }
            return Ok(CcgaReport {
                solution,
                generator_contingencies: evaluations,
                line_violations,
                lazy,
                rounds: round,
                converged,
                diagnostics,
            });
        }
    }
}
