use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use opfkit_algo::opf::ContingencySet;
use opfkit_core::{index_network, IndexedNetwork, Network};
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::info;

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

pub fn parse_ids(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `all`, `none`/empty, or a comma separated id list.
pub fn parse_contingencies<T: for<'a> From<&'a str>>(spec: &str) -> ContingencySet<T> {
    match spec.trim().to_ascii_lowercase().as_str() {
        "all" => ContingencySet::All,
        "" | "none" => ContingencySet::None,
        _ => ContingencySet::Only(parse_ids(spec).iter().map(|id| T::from(id.as_str())).collect()),
    }
}

pub fn load_network(path: &Path) -> Result<(Network, IndexedNetwork)> {
    info!("Loading network snapshot from {}", path.display());
    let network = Network::from_json_file(path)
        .with_context(|| format!("loading network snapshot {}", path.display()))?;
    let indexed = index_network(&network).context("indexing network")?;
    Ok((network, indexed))
}

/// Pretty JSON to `out`, or to stdout when no path is given.
pub fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output to JSON")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfkit_core::{BranchId, GenId};

    #[test]
    fn test_parse_contingencies() {
        assert_eq!(parse_contingencies::<GenId>("ALL"), ContingencySet::All);
        assert_eq!(parse_contingencies::<GenId>("none"), ContingencySet::None);
        assert_eq!(
            parse_contingencies::<BranchId>(" 1, 7 ,"),
            ContingencySet::Only(vec![BranchId::new("1"), BranchId::new("7")])
        );
    }
}
