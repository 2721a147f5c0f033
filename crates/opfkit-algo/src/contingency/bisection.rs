//! Post-contingency generation recovery by bisection.
//!
//! After a generator outage every remaining unit moves along its linear primary
//! response, capped at its maximum output:
//!
//! ```text
//! pg_k[g] = min(pg[g] + n·γ_g·capacity_g, pmax[g])     (g ≠ k)
//! pg_k[k] = 0
//! ```
//!
//! The global response extent `n ∈ [0, 1]` is found by bisection on the
//! imbalance `e(n) = Σ pg_k - Σ pd`, which is non-decreasing in `n`. A scenario
//! whose imbalance cannot be brought within tolerance is an error for that
//! contingency; the caller gets [`OpfkitError::BisectionConvergence`].
//!
//! Reference: Velloso, Van Hentenryck & Johnson, "An exact and scalable problem
//! decomposition for security-constrained optimal power flow", EPSR 195 (2021),
//! Algorithm 1.

use opfkit_core::{GenId, OpfkitError, OpfkitResult};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::opf::{BisectionConfig, ModelData};

/// Recovered post-contingency state for one generator outage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyEvaluation {
    pub contingency: GenId,
    /// Global response extent
    pub n: f64,
    pub iterations: usize,
    /// `Σ pg_k - Σ pd` at the accepted `n`
    pub residual: f64,
    /// Post-contingency dispatch in generator index order
    pub dispatch: Vec<f64>,
    /// `max(0, |pf_k| - rate_c)` per branch
    pub violations: Vec<f64>,
    pub max_violation: f64,
}

impl ContingencyEvaluation {
    /// Branch indices whose violation exceeds `tolerance`.
    pub fn violated_branches(&self, tolerance: f64) -> impl Iterator<Item = usize> + '_ {
        self.violations
            .iter()
            .enumerate()
            .filter(move |&(_, &v)| v > tolerance)
            .map(|(e, _)| e)
    }
}

/// Response dispatch for extent `n` with generator `k` out.
pub fn response_dispatch(data: &ModelData, pg: &[f64], k: usize, n: f64) -> Vec<f64> {
    data.generators
        .iter()
        .zip(pg)
        .enumerate()
        .map(|(g, (gen, &p))| {
            if g == k {
                0.0
            } else {
                (p + n * gen.gamma * gen.capacity).min(gen.pmax)
            }
        })
        .collect()
}

/// `max(0, |ptdf_g·pg_k - load_injection| - rate_c)` per branch.
pub fn thermal_violations(data: &ModelData, dispatch: &[f64]) -> Vec<f64> {
    data.flows(dispatch)
        .into_iter()
        .zip(&data.rate_c)
        .map(|(flow, &rate)| (flow.abs() - rate).max(0.0))
        .collect()
}

/// Bisect the response extent for the outage of generator `k` (dense index).
///
/// `initial_n` seeds the first trial point, typically the extent found by the
/// master problem or 0.5.
pub fn bisect_generator_contingency(
    data: &ModelData,
    pg: &[f64],
    k: usize,
    initial_n: f64,
    config: &BisectionConfig,
) -> OpfkitResult<ContingencyEvaluation> {
    if pg.len() != data.num_generators() || k >= data.num_generators() {
        return Err(OpfkitError::InvalidData(format!(
            "dispatch of length {} and contingency {k} do not match {} generators",
            pg.len(),
            data.num_generators()
        )));
    }
    let contingency = data.generators[k].id.clone();

    let (mut low, mut high) = (0.0_f64, 1.0_f64);
    let mut n = initial_n.clamp(0.0, 1.0);
    let mut residual = f64::NAN;

    for iteration in 0..config.max_iterations {
        let dispatch = response_dispatch(data, pg, k, n);
        residual = dispatch.iter().sum::<f64>() - data.total_demand;

        if residual.abs() < config.tolerance {
            let violations = thermal_violations(data, &dispatch);
            let max_violation = violations.iter().copied().fold(0.0, f64::max);
            debug!(
                contingency = %contingency,
                n,
                iterations = iteration + 1,
                max_violation,
                "bisection converged"
            );
            return Ok(ContingencyEvaluation {
                contingency,
                n,
                iterations: iteration + 1,
                residual,
                dispatch,
                violations,
                max_violation,
            });
        }

        if residual > 0.0 {
            high = n;
        } else {
            low = n;
        }
        n = 0.5 * (low + high);
    }

    warn!(
        contingency = %contingency,
        residual,
        "post-contingency bisection did not converge"
    );
    Err(OpfkitError::BisectionConvergence {
        contingency,
        iterations: config.max_iterations,
        residual,
    })
}

/// Evaluate several generator contingencies against the same base dispatch.
///
/// `contingencies` holds `(generator index, initial n)` pairs; results come back
/// in the same order. The first failing contingency aborts the batch.
pub fn evaluate_generator_contingencies(
    data: &ModelData,
    pg: &[f64],
    contingencies: &[(usize, f64)],
    config: &BisectionConfig,
) -> OpfkitResult<Vec<ContingencyEvaluation>> {
    let evaluate = |&(k, n0): &(usize, f64)| bisect_generator_contingency(data, pg, k, n0, config);

    #[cfg(feature = "parallel")]
    let results = contingencies.par_iter().map(evaluate).collect();
    #[cfg(not(feature = "parallel"))]
    let results = contingencies.iter().map(evaluate).collect();

    results
}
