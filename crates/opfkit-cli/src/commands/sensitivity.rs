use std::path::Path;

use anyhow::{bail, Context, Result};
use opfkit_algo::contingency::{ContingencyInfeasibleWarning, LodfTable};
use opfkit_algo::{check_line_contingency, compute_lodf_for, compute_ptdf};
use opfkit_core::BranchId;
use serde::Serialize;
use tracing::info;

use crate::commands::util::{emit_json, load_network, parse_ids};

/// JSON output of `opfkit lodf`.
#[derive(Debug, Serialize)]
struct LodfOutput {
    #[serde(flatten)]
    table: LodfTable,
    excluded: Vec<ContingencyInfeasibleWarning>,
}

pub fn handle_ptdf(path: &Path, out: Option<&Path>) -> Result<()> {
    let (_, indexed) = load_network(path)?;
    let ptdf = compute_ptdf(&indexed).context("computing PTDF")?;
    info!(
        "PTDF: {} branches x {} generators, {} loads",
        ptdf.num_branches(),
        indexed.num_generators(),
        indexed.num_loads()
    );
    emit_json(&ptdf.to_table(), out)
}

pub fn handle_lodf(path: &Path, outages: &str, out: Option<&Path>) -> Result<()> {
    let (_, indexed) = load_network(path)?;
    let candidates: Vec<BranchId> = parse_ids(outages)
        .iter()
        .map(|id| BranchId::new(id.as_str()))
        .collect();
    if candidates.is_empty() {
        bail!("--outages needs at least one branch id");
    }

    let screening = check_line_contingency(&indexed, &candidates)?;
    if screening.accepted.is_empty() {
        bail!("every requested outage disconnects the network");
    }
    let lodf = compute_lodf_for(&indexed, &screening.accepted).context("computing LODF")?;
    info!(
        "LODF: {} monitored branches x {} outages ({} excluded)",
        indexed.num_branches(),
        lodf.num_outages(),
        screening.warnings.len()
    );
    emit_json(
        &LodfOutput {
            table: lodf.to_table(),
            excluded: screening.warnings,
        },
        out,
    )
}

pub fn handle_screen(path: &Path, lines: Option<&str>, out: Option<&Path>) -> Result<()> {
    let (_, indexed) = load_network(path)?;
    let candidates: Vec<BranchId> = match lines {
        Some(spec) => parse_ids(spec).iter().map(|id| BranchId::new(id.as_str())).collect(),
        None => indexed.branch_ids().to_vec(),
    };
    let screening = check_line_contingency(&indexed, &candidates)?;
    info!(
        "{} of {} line contingencies accepted",
        screening.accepted.len(),
        candidates.len()
    );
    emit_json(&screening, out)
}
