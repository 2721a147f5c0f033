//! Built OPF model: the lowered problem plus everything needed to read a
//! backend result back in terms of network elements.

use std::collections::BTreeMap;
use std::time::Instant;

use opfkit_core::{BranchId, BusId, GenId, IndexedNetwork};
use tracing::info;

use super::coefficients::{ModelData, SecurityCoefficients};
use super::problem::OptimizationProblem;
use super::traits::{OpfBackend, PrimalDual, SolverConfig};
use super::types::{LazySets, OpfModelKind, OpfSolution};
use crate::contingency::{LineScreening, LodfMatrix};
use crate::{OpfError, OpfResult};

/// Variable and constraint positions inside the [`OptimizationProblem`].
///
/// Generator and branch positions use the dense index of the
/// [`IndexedNetwork`]; contingency `k` is the dense index of the outaged element.
#[derive(Debug, Clone, Default)]
pub struct ModelLayout {
    pub pg: Vec<usize>,
    /// Angle-form models only
    pub va: Vec<usize>,
    pub pf: Vec<usize>,
    /// `(g, k) -> pg_kg`
    pub pg_kg: BTreeMap<(usize, usize), usize>,
    /// `k -> n_kg`
    pub n_kg: BTreeMap<usize, usize>,
    /// `(g, k) -> rho_kg`
    pub rho_kg: BTreeMap<(usize, usize), usize>,
    /// Base-case system balance row (PTDF models)
    pub system_balance: Option<usize>,
    /// Nodal balance row per bus (angle form)
    pub bus_balance: Vec<usize>,
    /// `(row, branch)` of every base-case thermal limit
    pub flow_limits: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct OpfModel {
    pub(crate) kind: OpfModelKind,
    pub(crate) indexed: IndexedNetwork,
    pub(crate) problem: OptimizationProblem,
    pub(crate) layout: ModelLayout,
    /// PTDF and rating data; absent for the angle form
    pub(crate) data: Option<ModelData>,
    pub(crate) lodf: Option<LodfMatrix>,
    pub(crate) screening: LineScreening,
    /// Dense generator indices of the modelled generator contingencies
    pub(crate) gen_contingencies: Vec<usize>,
    /// Dense branch indices of the accepted line contingencies, in LODF column order
    pub(crate) line_contingencies: Vec<usize>,
    pub(crate) lazy: LazySets,
}

impl OpfModel {
    pub(crate) fn new(kind: OpfModelKind, indexed: &IndexedNetwork) -> Self {
        Self {
            kind,
            indexed: indexed.clone(),
            problem: OptimizationProblem::new(),
            layout: ModelLayout::default(),
            data: None,
            lodf: None,
            screening: LineScreening::default(),
            gen_contingencies: Vec::new(),
            line_contingencies: Vec::new(),
            lazy: LazySets::default(),
        }
    }

    pub fn kind(&self) -> OpfModelKind {
        self.kind
    }

    pub fn problem(&self) -> &OptimizationProblem {
        &self.problem
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    pub fn indexed(&self) -> &IndexedNetwork {
        &self.indexed
    }

    pub fn data(&self) -> Option<&ModelData> {
        self.data.as_ref()
    }

    pub fn lodf(&self) -> Option<&LodfMatrix> {
        self.lodf.as_ref()
    }

    /// Bridge screening of the requested line contingencies.
    pub fn screening(&self) -> &LineScreening {
        &self.screening
    }

    pub fn lazy(&self) -> &LazySets {
        &self.lazy
    }

    pub fn generator_contingencies(&self) -> Vec<GenId> {
        self.gen_contingencies
            .iter()
            .map(|&k| self.indexed.generator_ids()[k].clone())
            .collect()
    }

    pub fn line_contingencies(&self) -> Vec<BranchId> {
        self.line_contingencies
            .iter()
            .map(|&k| self.indexed.branch_ids()[k].clone())
            .collect()
    }

    /// Coefficient tables keyed by ids; `None` for the angle form.
    pub fn coefficients(&self) -> Option<SecurityCoefficients> {
        self.data.as_ref().map(|d| d.coefficients(self.lodf.as_ref()))
    }

    /// Base-case dispatch in generator index order.
    pub fn base_dispatch(&self, x: &[f64]) -> Vec<f64> {
        self.layout.pg.iter().map(|&i| x[i]).collect()
    }

    /// Base-case flows in branch index order.
    pub fn base_flows(&self, x: &[f64]) -> Vec<f64> {
        self.layout.pf.iter().map(|&i| x[i]).collect()
    }

    /// Extent `n_kg` of contingency `k` at `x`, when modelled.
    pub fn response_extent(&self, x: &[f64], k: usize) -> Option<f64> {
        self.layout.n_kg.get(&k).map(|&i| x[i])
    }

    pub fn solve(&self, backend: &dyn OpfBackend, config: &SolverConfig) -> OpfResult<OpfSolution> {
        self.solve_with_primal(backend, config)
            .map(|(solution, _)| solution)
    }

    /// Like [`OpfModel::solve`], also returning the raw primal vector.
    pub fn solve_with_primal(
        &self,
        backend: &dyn OpfBackend,
        config: &SolverConfig,
    ) -> OpfResult<(OpfSolution, Vec<f64>)> {
        let class = self.problem.problem_class();
        if !backend.supports(class) {
            return Err(OpfError::UnsupportedProblemClass {
                backend: backend.id().to_string(),
                class,
            });
        }
        info!(
            model = %self.kind,
            backend = backend.id(),
            variables = self.problem.num_variables(),
            constraints = self.problem.num_constraints(),
            "solving OPF model"
        );

        let start = Instant::now();
        let result = backend.solve(&self.problem, config)?;
        let solve_time_ms = start.elapsed().as_millis();

        let solution = self.extract(&result, backend.id(), solve_time_ms);
        info!(
            model = %self.kind,
            objective = solution.objective_value,
            iterations = solution.iterations,
            max_violation = solution.max_violation,
            "OPF solved"
        );
        Ok((solution, result.primal))
    }

    fn extract(&self, result: &PrimalDual, backend: &str, solve_time_ms: u128) -> OpfSolution {
        let x = &result.primal;
        let gen_ids = self.indexed.generator_ids();
        let branch_ids = self.indexed.branch_ids();
        let bus_ids = self.indexed.bus_ids();

        let generator_p = gen_ids
            .iter()
            .zip(&self.layout.pg)
            .map(|(id, &i)| (id.clone(), x[i]))
            .collect();
        let branch_p_flow = branch_ids
            .iter()
            .zip(&self.layout.pf)
            .map(|(id, &i)| (id.clone(), x[i]))
            .collect();
        let bus_voltage_ang = bus_ids
            .iter()
            .zip(&self.layout.va)
            .map(|(id, &i)| (id.clone(), x[i]))
            .collect();
        let contingency_p = self
            .layout
            .pg_kg
            .iter()
            .map(|(&(g, k), &i)| ((gen_ids[g].clone(), gen_ids[k].clone()), x[i]))
            .collect();
        let response_extent = self
            .layout
            .n_kg
            .iter()
            .map(|(&k, &i)| (gen_ids[k].clone(), x[i]))
            .collect();

        let system_lambda = self.layout.system_balance.map(|row| -result.duals[row]);
        let branch_shadow_price = self
            .layout
            .flow_limits
            .iter()
            .map(|&(row, e)| (branch_ids[e].clone(), result.duals[row]))
            .collect();

        OpfSolution {
            model: self.kind,
            backend: backend.to_string(),
            status: result.status.clone(),
            iterations: result.iterations,
            solve_time_ms,
            objective_value: result.objective,
            generator_p,
            branch_p_flow,
            bus_voltage_ang,
            contingency_p,
            response_extent,
            bus_lmp: self.bus_prices(result),
            system_lambda,
            branch_shadow_price,
            max_violation: self.problem.max_violation(x),
        }
    }

    /// Nodal prices of the base-case models.
    ///
    /// Balance rows carry the generation with coefficient +1, so the price is the
    /// negated balance dual. In PTDF form the price of bus `b` is
    /// `λ - Σ_e μ_e·ptdf[e, b]`, available at buses with a generator or load.
    fn bus_prices(&self, result: &PrimalDual) -> BTreeMap<BusId, f64> {
        let bus_ids = self.indexed.bus_ids();
        match self.kind {
            OpfModelKind::DcOpf => bus_ids
                .iter()
                .zip(&self.layout.bus_balance)
                .map(|(id, &row)| (id.clone(), -result.duals[row]))
                .collect(),
            OpfModelKind::DcOpfPtdf => {
                let (Some(data), Some(row)) = (self.data.as_ref(), self.layout.system_balance)
                else {
                    return BTreeMap::new();
                };
                let lambda = -result.duals[row];
                let mut columns: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
                for g in 0..self.indexed.num_generators() {
                    columns.entry(self.indexed.gen_bus(g)).or_insert_with(|| {
                        (0..data.num_branches()).map(|e| data.ptdf.gen_factor(e, g)).collect()
                    });
                }
                for l in 0..self.indexed.num_loads() {
                    columns.entry(self.indexed.load_bus(l)).or_insert_with(|| {
                        (0..data.num_branches()).map(|e| data.ptdf.load_factor(e, l)).collect()
                    });
                }
                columns
                    .into_iter()
                    .map(|(b, column)| {
                        let congestion: f64 = self
                            .layout
                            .flow_limits
                            .iter()
                            .map(|&(row, e)| result.duals[row] * column[e])
                            .sum();
                        (bus_ids[b].clone(), lambda - congestion)
                    })
                    .collect()
            }
            OpfModelKind::ScDcOpf | OpfModelKind::ScDcOpfCcga => BTreeMap::new(),
        }
    }
}
