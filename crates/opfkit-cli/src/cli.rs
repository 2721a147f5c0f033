use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opfkit", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Threading hint for contingency evaluation (`auto` or integer)
    #[arg(long, default_value = "auto", global = true)]
    pub threads: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the dense index assignment and network statistics
    Index {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
    },
    /// Island analysis and bridge branches
    Islands {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
    },
    /// Generator and load PTDF matrices
    Ptdf {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// LODF columns for a set of branch outages
    Lodf {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Outaged branch ids (comma separated)
        #[arg(long)]
        outages: String,
        /// Write JSON here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Screen line contingencies for islanding outages
    Screen {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Candidate branch ids (comma separated; default: every in-service branch)
        #[arg(long)]
        lines: Option<String>,
        /// Write JSON here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Build and solve a DC optimal power flow model
    Opf {
        /// Network snapshot (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Model (dcopf, dcopf-ptdf, scdcopf, scdcopf-ccga)
        #[arg(long, default_value = "dcopf-ptdf")]
        model: String,
        /// Security-constrained tunables (TOML)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Generator contingencies (`all`, `none` or comma separated ids)
        #[arg(long, default_value = "none")]
        gen_contingencies: String,
        /// Line contingencies (`all`, `none` or comma separated ids)
        #[arg(long, default_value = "none")]
        line_contingencies: String,
        /// Solver backend
        #[arg(long, default_value = "clarabel")]
        backend: String,
        /// Maximum solver iterations
        #[arg(long, default_value = "200")]
        max_iter: usize,
        /// Solver feasibility and gap tolerance
        #[arg(long, default_value = "1e-8")]
        tol: f64,
        /// Write the solution (or CCGA report) JSON here
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Write the built optimization problem and coefficient tables instead of solving
        #[arg(long, value_hint = ValueHint::FilePath)]
        emit_model: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
