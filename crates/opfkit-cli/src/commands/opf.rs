use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opfkit_algo::contingency::{CcgaReport, LineScreening};
use opfkit_algo::opf::{
    available_backends, backend_by_id, build_model, ModelInputs, OpfModelKind, OpfSolution,
    OptimizationProblem, ProblemClass, ScopfConfig, SecurityCoefficients, SolverConfig,
};
use opfkit_algo::solve_scdcopf_ccga;
use opfkit_core::{Diagnostics, IndexedNetwork};
use serde::Serialize;
use tracing::{info, warn};

use crate::commands::util::{emit_json, load_network, parse_contingencies};

/// Network summary for JSON output
#[derive(Debug, Clone, Serialize)]
struct NetworkSummary {
    buses: usize,
    branches: usize,
    generators: usize,
    loads: usize,
}

impl NetworkSummary {
    fn of(indexed: &IndexedNetwork) -> Self {
        Self {
            buses: indexed.num_buses(),
            branches: indexed.num_branches(),
            generators: indexed.num_generators(),
            loads: indexed.num_loads(),
        }
    }
}

/// Full JSON output for `opfkit opf`
#[derive(Debug, Serialize)]
struct OpfRunOutput {
    case_name: String,
    network: NetworkSummary,
    solution: OpfSolution,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    diagnostics: Diagnostics,
}

/// JSON output for `opfkit opf --model scdcopf-ccga`
#[derive(Debug, Serialize)]
struct CcgaRunOutput {
    case_name: String,
    network: NetworkSummary,
    #[serde(flatten)]
    report: CcgaReport,
}

/// Built model written by `--emit-model`
#[derive(Serialize)]
struct ModelDump<'a> {
    model: OpfModelKind,
    problem_class: ProblemClass,
    problem: &'a OptimizationProblem,
    #[serde(skip_serializing_if = "Option::is_none")]
    coefficients: Option<SecurityCoefficients>,
    screening: &'a LineScreening,
}

/// Arguments of `opfkit opf`.
pub struct OpfArgs<'a> {
    pub network: &'a Path,
    pub model: &'a str,
    pub config: Option<&'a Path>,
    pub gen_contingencies: &'a str,
    pub line_contingencies: &'a str,
    pub backend: &'a str,
    pub max_iter: usize,
    pub tol: f64,
    pub out: Option<&'a Path>,
    pub emit_model: Option<&'a Path>,
}

pub fn load_config(path: Option<&Path>) -> Result<ScopfConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str::<ScopfConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ScopfConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

pub fn handle(args: &OpfArgs<'_>) -> Result<()> {
    let kind: OpfModelKind = args.model.parse()?;
    let (_, indexed) = load_network(args.network)?;
    let inputs = ModelInputs::new(load_config(args.config)?)
        .with_gen_contingencies(parse_contingencies(args.gen_contingencies))
        .with_line_contingencies(parse_contingencies(args.line_contingencies));
    let case_name = args
        .network
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(path) = args.emit_model {
        let model = build_model(kind, &indexed, &inputs)?;
        let dump = ModelDump {
            model: kind,
            problem_class: model.problem().problem_class(),
            problem: model.problem(),
            coefficients: model.coefficients(),
            screening: model.screening(),
        };
        info!(
            "{kind}: {} variables, {} constraints ({})",
            model.problem().num_variables(),
            model.problem().num_constraints(),
            dump.problem_class
        );
        return emit_json(&dump, Some(path));
    }

    let backend = backend_by_id(args.backend).ok_or_else(|| {
        anyhow!(
            "Unknown backend '{}'. Available: {}",
            args.backend,
            available_backends().join(", ")
        )
    })?;
    let solver = SolverConfig {
        max_iterations: args.max_iter,
        tolerance: args.tol,
        verbose: false,
    };

    if kind == OpfModelKind::ScDcOpfCcga {
        let report = solve_scdcopf_ccga(&indexed, &inputs, backend.as_ref(), &solver)
            .context("running CCGA")?;
        print_ccga_report(&report, &indexed);
        let output = CcgaRunOutput {
            case_name,
            network: NetworkSummary::of(&indexed),
            report,
        };
        return match args.out {
            Some(path) => emit_json(&output, Some(path)),
            None => Ok(()),
        };
    }

    let model = build_model(kind, &indexed, &inputs)?;
    let solution = model
        .solve(backend.as_ref(), &solver)
        .with_context(|| format!("solving {kind}"))?;
    print_solution(&solution);
    let output = OpfRunOutput {
        case_name,
        network: NetworkSummary::of(&indexed),
        solution,
        diagnostics: model.screening().diagnostics(),
    };
    match args.out {
        Some(path) => emit_json(&output, Some(path)),
        None => Ok(()),
    }
}

fn print_solution(solution: &OpfSolution) {
    println!(
        "{} solved with {} in {} ms ({} iterations, status {})",
        solution.model,
        solution.backend,
        solution.solve_time_ms,
        solution.iterations,
        solution.status
    );
    println!("Objective: {:.4}", solution.objective_value);

    println!("\nGenerator Dispatch:");
    for (gen, p) in &solution.generator_p {
        println!("  {gen}: {p:.4} p.u.");
    }
    let binding: Vec<_> = solution
        .branch_shadow_price
        .iter()
        .filter(|(_, price)| price.abs() > 1e-6)
        .collect();
    if !binding.is_empty() {
        println!("\nBinding branch limits:");
        for (branch, price) in binding {
            println!(
                "  {branch}: flow {:.4} p.u., shadow price {price:.4}",
                solution.branch_p_flow.get(branch).copied().unwrap_or(0.0)
            );
        }
    }
    if let Some(lambda) = solution.system_lambda {
        println!("\nSystem lambda: {lambda:.4}");
    }
}

fn print_ccga_report(report: &CcgaReport, indexed: &IndexedNetwork) {
    let state = if report.converged {
        "converged"
    } else {
        "stopped with violations"
    };
    println!("CCGA {state} after {} round(s)", report.rounds);
    println!("Objective: {:.4}", report.solution.objective_value);
    println!(
        "Lazy constraints: {} response, {} generator-outage flow, {} line-outage flow",
        report.lazy.k_g.len(),
        report.lazy.e_k_g.len(),
        report.lazy.e_k_e.len()
    );

    if !report.generator_contingencies.is_empty() {
        println!("\nGenerator contingencies:");
        for eval in &report.generator_contingencies {
            println!(
                "  {}: n = {:.6}, {} iterations, max violation {:.3e}",
                eval.contingency, eval.n, eval.iterations, eval.max_violation
            );
            for e in eval.violated_branches(0.0) {
                println!(
                    "    branch {} over rate C by {:.4}",
                    indexed.branch_ids()[e],
                    eval.violations[e]
                );
            }
        }
    }
    if !report.line_violations.is_empty() {
        println!("\nLine contingency violations:");
        for v in &report.line_violations {
            println!(
                "  branch {} after outage of {}: flow {:.4} (rate C {:.4})",
                v.branch, v.contingency, v.flow, v.rate_c
            );
        }
    }
    if !report.converged {
        warn!("maximum post-contingency violation {:.3e}", report.max_violation());
    }
}
