use std::process::ExitCode;

use clap::Parser;
use opfkit_cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use crate::commands::opf::OpfArgs;
use crate::commands::util::configure_threads;
use crate::commands::{network, opf, sensitivity};

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Results go to stdout; logs stay on stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a global tracing subscriber is already installed");
    }

    configure_threads(&cli.threads);

    let (name, result) = match &cli.command {
        Commands::Index { network } => ("index", network::handle_index(network)),
        Commands::Islands { network } => ("islands", network::handle_islands(network)),
        Commands::Ptdf { network, out } => {
            ("ptdf", sensitivity::handle_ptdf(network, out.as_deref()))
        }
        Commands::Lodf {
            network,
            outages,
            out,
        } => (
            "lodf",
            sensitivity::handle_lodf(network, outages, out.as_deref()),
        ),
        Commands::Screen {
            network,
            lines,
            out,
        } => (
            "screen",
            sensitivity::handle_screen(network, lines.as_deref(), out.as_deref()),
        ),
        Commands::Opf {
            network,
            model,
            config,
            gen_contingencies,
            line_contingencies,
            backend,
            max_iter,
            tol,
            out,
            emit_model,
        } => (
            "opf",
            opf::handle(&OpfArgs {
                network,
                model,
                config: config.as_deref(),
                gen_contingencies,
                line_contingencies,
                backend,
                max_iter: *max_iter,
                tol: *tol,
                out: out.as_deref(),
                emit_model: emit_model.as_deref(),
            }),
        ),
    };

    match result {
        Ok(()) => {
            info!("{name} command successful!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{name} command failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}
