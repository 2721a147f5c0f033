//! Line Outage Distribution Factors and line-contingency screening.
//!
//! For an outage set `O = [o_1, ..., o_K]`:
//!
//! ```text
//! PTDF_MO = (S_br · S_b⁻¹ · Φ)[:, O]          (E×K)
//! PTDF_OO[k] = PTDF_MO[o_k, k]
//! LODF[:, k] = PTDF_MO[:, k] / (1 - PTDF_OO[k])
//! LODF[o_k, k] = -1
//! ```
//!
//! Post-outage flows follow without another solve: `pf' = pf + LODF[:, k] · pf[o_k]`.
//!
//! A branch whose removal splits the network (a bridge) has `PTDF_OO = 1` and no
//! LODF. [`check_line_contingency`] removes such branches from a candidate set and
//! reports them as [`ContingencyInfeasibleWarning`]s.

use std::collections::HashSet;

use faer::Mat;
use opfkit_core::{BranchId, Diagnostics, IndexedNetwork, OpfkitError, OpfkitResult};
use serde::Serialize;
use tracing::{debug, warn};

use crate::sparse::compute_branch_ptdf_columns;
use crate::sparse::linalg::to_rows;
use crate::tolerance::is_close;

/// LODF columns for one outage set.
#[derive(Debug, Clone)]
pub struct LodfMatrix {
    /// `E×K` factors, rows in branch index order, columns in outage order
    pub values: Mat<f64>,
    monitored: Vec<BranchId>,
    outages: Vec<BranchId>,
    outage_indices: Vec<usize>,
}

/// Serializable view of a [`LodfMatrix`].
#[derive(Debug, Clone, Serialize)]
pub struct LodfTable {
    pub monitored: Vec<BranchId>,
    pub outages: Vec<BranchId>,
    pub lodf: Vec<Vec<f64>>,
}

impl LodfMatrix {
    /// Factor for monitored branch `e` under outage column `k`.
    pub fn get(&self, e: usize, k: usize) -> f64 {
        self.values.read(e, k)
    }

    pub fn num_outages(&self) -> usize {
        self.outages.len()
    }

    pub fn monitored(&self) -> &[BranchId] {
        &self.monitored
    }

    pub fn outages(&self) -> &[BranchId] {
        &self.outages
    }

    /// Dense branch index of the outage in column `k`.
    pub fn outage_index(&self, k: usize) -> usize {
        self.outage_indices[k]
    }

    /// Column holding the outage of `branch`, if it is part of the set.
    pub fn column_of(&self, branch: &BranchId) -> Option<usize> {
        self.outages.iter().position(|b| b == branch)
    }

    /// Flows on every branch after outage column `k`, given pre-outage flows.
    pub fn post_outage_flows(&self, pf: &[f64], k: usize) -> Vec<f64> {
        let outaged_flow = pf[self.outage_indices[k]];
        pf.iter()
            .enumerate()
            .map(|(e, &flow)| flow + self.get(e, k) * outaged_flow)
            .collect()
    }

    pub fn to_table(&self) -> LodfTable {
        LodfTable {
            monitored: self.monitored.clone(),
            outages: self.outages.clone(),
            lodf: to_rows(&self.values),
        }
    }
}

/// Compute LODF columns for the outage of each branch in `outages` (dense indices).
///
/// Fails with `SingularSystem` if any outage is a bridge; screen candidates with
/// [`check_line_contingency`] first.
pub fn compute_lodf(indexed: &IndexedNetwork, outages: &[usize]) -> OpfkitResult<LodfMatrix> {
    let ptdf_mo = compute_branch_ptdf_columns(indexed, outages)?;
    let mut values = Mat::zeros(ptdf_mo.nrows(), outages.len());

    for (k, &o) in outages.iter().enumerate() {
        let ptdf_oo = ptdf_mo.read(o, k);
        if is_close(ptdf_oo, 1.0) {
            return Err(OpfkitError::SingularSystem {
                islands: 2,
                detail: format!(
                    "outage of bridge branch {} splits the network (PTDF_OO = {ptdf_oo:.6})",
                    indexed.branch_ids()[o]
                ),
            });
        }
        let scale = 1.0 / (1.0 - ptdf_oo);
        for e in 0..ptdf_mo.nrows() {
            values.write(e, k, ptdf_mo.read(e, k) * scale);
        }
        values.write(o, k, -1.0);
    }

    debug!(monitored = values.nrows(), outages = outages.len(), "computed LODF");

    Ok(LodfMatrix {
        values,
        monitored: indexed.branch_ids().to_vec(),
        outages: outages
            .iter()
            .map(|&o| indexed.branch_ids()[o].clone())
            .collect(),
        outage_indices: outages.to_vec(),
    })
}

/// [`compute_lodf`] keyed by branch id.
pub fn compute_lodf_for(indexed: &IndexedNetwork, outages: &[BranchId]) -> OpfkitResult<LodfMatrix> {
    let indices = outages
        .iter()
        .map(|id| indexed.require_branch(id))
        .collect::<OpfkitResult<Vec<_>>>()?;
    compute_lodf(indexed, &indices)
}

/// A candidate line contingency excluded because its outage islands the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyInfeasibleWarning {
    pub branch: BranchId,
    /// Branch PTDF of the branch onto itself; within tolerance of 1 for a bridge
    pub self_sensitivity: f64,
}

impl std::fmt::Display for ContingencyInfeasibleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line contingency {} disconnects the network (self sensitivity {:.6}); excluded",
            self.branch, self.self_sensitivity
        )
    }
}

/// Outcome of [`check_line_contingency`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineScreening {
    /// Candidates that keep the network connected, in candidate order
    pub accepted: Vec<BranchId>,
    pub warnings: Vec<ContingencyInfeasibleWarning>,
}

impl LineScreening {
    pub fn excluded(&self) -> impl Iterator<Item = &BranchId> {
        self.warnings.iter().map(|w| &w.branch)
    }

    /// Warnings as a diagnostics collection (category `contingency`).
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        for warning in &self.warnings {
            diag.add_warning_with_entity(
                "contingency",
                &warning.to_string(),
                &format!("branch {}", warning.branch),
            );
        }
        diag
    }
}

/// Drop bridge branches from a set of candidate line contingencies.
///
/// Unknown or out-of-service candidates are an error. Repeated candidates are
/// kept once.
pub fn check_line_contingency(
    indexed: &IndexedNetwork,
    candidates: &[BranchId],
) -> OpfkitResult<LineScreening> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in candidates {
        if seen.insert(id) {
            unique.push((id.clone(), indexed.require_branch(id)?));
        }
    }
    if unique.is_empty() {
        return Ok(LineScreening::default());
    }

    let indices: Vec<usize> = unique.iter().map(|(_, e)| *e).collect();
    let ptdf_mo = compute_branch_ptdf_columns(indexed, &indices)?;

    let mut screening = LineScreening::default();
    for (k, (id, e)) in unique.into_iter().enumerate() {
        let self_sensitivity = ptdf_mo.read(e, k);
        if is_close(self_sensitivity, 1.0) {
            let warning = ContingencyInfeasibleWarning {
                branch: id,
                self_sensitivity,
            };
            warn!("{warning}");
            screening.warnings.push(warning);
        } else {
            screening.accepted.push(id);
        }
    }
    debug!(
        accepted = screening.accepted.len(),
        excluded = screening.warnings.len(),
        "screened line contingencies"
    );
    Ok(screening)
}
