use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use opfkit_core::graph_utils::{bridge_branches, find_islands};
use opfkit_core::Diagnostics;
use tabwriter::TabWriter;
use tracing::warn;

use crate::commands::util::load_network;

pub fn handle_index(path: &Path) -> Result<()> {
    let (network, indexed) = load_network(path)?;

    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);
    for issue in &diag.issues {
        warn!("{}: {}", issue.category, issue.message);
    }

    let stats = network.stats();
    println!("Network statistics for {}:", path.display());
    println!("  Buses         : {}", stats.num_buses);
    println!(
        "  Generators    : {} ({} in service)",
        stats.num_generators, stats.num_in_service_generators
    );
    println!(
        "  Branches      : {} ({} in service)",
        stats.num_branches, stats.num_in_service_branches
    );
    println!("  Loads         : {}", stats.num_loads);
    println!("  Demand [p.u.] : {:.4}", stats.total_demand);
    println!("  Pmax [p.u.]   : {:.4}", stats.total_pmax);
    println!("  Reference bus : {}", indexed.slack_id());
    println!();

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "KIND\tINDEX\tID\tBUS")?;
    for (i, id) in indexed.bus_ids().iter().enumerate() {
        writeln!(writer, "bus\t{i}\t{id}\t")?;
    }
    for (g, id) in indexed.generator_ids().iter().enumerate() {
        writeln!(writer, "generator\t{g}\t{id}\t{}", indexed.bus_ids()[indexed.gen_bus(g)])?;
    }
    for (e, id) in indexed.branch_ids().iter().enumerate() {
        let (from, to) = indexed.branch_ends(e);
        writeln!(
            writer,
            "branch\t{e}\t{id}\t{}->{}",
            indexed.bus_ids()[from],
            indexed.bus_ids()[to]
        )?;
    }
    for (l, id) in indexed.load_ids().iter().enumerate() {
        writeln!(writer, "load\t{l}\t{id}\t{}", indexed.bus_ids()[indexed.load_bus(l)])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn handle_islands(path: &Path) -> Result<()> {
    let (network, _) = load_network(path)?;
    let analysis = find_islands(&network);
    for island in &analysis.islands {
        let reference = if island.contains_reference {
            " (reference)"
        } else {
            ""
        };
        println!(
            "Island {}: {} bus(es){reference}",
            island.island_id,
            island.buses.len()
        );
    }
    if !analysis.is_connected() {
        warn!(
            "{} bus(es) cannot reach the reference bus",
            analysis.unreachable_buses().len()
        );
    }

    let bridges = bridge_branches(&network);
    if bridges.is_empty() {
        println!("No bridge branches");
    } else {
        let ids: Vec<String> = bridges.iter().map(|id| id.to_string()).collect();
        println!("Bridge branches: {}", ids.join(", "));
    }
    Ok(())
}
