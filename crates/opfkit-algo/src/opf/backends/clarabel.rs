//! Clarabel interior-point backend for LP and convex QP problems.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    ½·xᵀPx + qᵀx
//! subject to  Ax + s = b,   s ∈ K
//! ```
//!
//! with `K` a product of cones. Equalities (including fixed variables) go into
//! one zero cone placed first, every one-sided inequality into a single
//! nonnegative cone after it. Bounds beyond `INFINITE_BOUND` are dropped.

use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, IPSolver, SolverStatus, SupportedConeT},
};
use tracing::debug;

use crate::opf::problem::{OptimizationProblem, ProblemClass};
use crate::opf::traits::{OpfBackend, PrimalDual, SolverConfig};
use crate::tolerance::is_finite_bound;
use crate::{OpfError, OpfResult};

/// Clarabel backend.
///
/// Clarabel is a pure-Rust solver and always available.
pub struct ClarabelBackend;

/// Where the rows of one linear constraint ended up.
#[derive(Clone, Copy, Default)]
struct RowMap {
    equality: Option<usize>,
    upper: Option<usize>,
    lower: Option<usize>,
}

/// Column-wise accumulator for `A`, `b` and the cone layout.
struct ConicRows {
    columns: Vec<Vec<(usize, f64)>>,
    rhs: Vec<f64>,
}

impl ConicRows {
    fn new(num_variables: usize) -> Self {
        Self {
            columns: vec![Vec::new(); num_variables],
            rhs: Vec::new(),
        }
    }

    /// Push `sign·Σ a·x + s = rhs` and return the row index.
    fn push(&mut self, terms: &[(usize, f64)], sign: f64, rhs: f64) -> usize {
        let row = self.rhs.len();
        for &(col, a) in terms {
            if a != 0.0 {
                self.columns[col].push((row, sign * a));
            }
        }
        self.rhs.push(rhs);
        row
    }

    fn into_csc(self) -> (CscMatrix<f64>, Vec<f64>) {
        let n = self.columns.len();
        let m = self.rhs.len();
        let mut col_ptr = Vec::with_capacity(n + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for mut column in self.columns {
            let start = row_idx.len();
            col_ptr.push(start);
            column.sort_by_key(|&(r, _)| r);
            // Merge repeated terms of one row.
            for (r, v) in column {
                if row_idx.len() > start && row_idx.last() == Some(&r) {
                    if let Some(last) = values.last_mut() {
                        *last += v;
                    }
                } else {
                    row_idx.push(r);
                    values.push(v);
                }
            }
        }
        col_ptr.push(row_idx.len());
        (CscMatrix::new(m, n, col_ptr, row_idx, values), self.rhs)
    }
}

/// Upper-triangular (diagonal) `P` with `P_ii = 2·Σ q_i`.
fn quadratic_matrix(problem: &OptimizationProblem) -> CscMatrix<f64> {
    let n = problem.num_variables();
    let mut diagonal = vec![0.0; n];
    for &(i, q) in &problem.objective.quadratic {
        diagonal[i] += 2.0 * q;
    }
    let mut col_ptr = Vec::with_capacity(n + 1);
    let mut row_idx = Vec::new();
    let mut values = Vec::new();
    for (i, &d) in diagonal.iter().enumerate() {
        col_ptr.push(row_idx.len());
        if d != 0.0 {
            row_idx.push(i);
            values.push(d);
        }
    }
    col_ptr.push(row_idx.len());
    CscMatrix::new(n, n, col_ptr, row_idx, values)
}

impl OpfBackend for ClarabelBackend {
    fn id(&self) -> &str {
        "clarabel"
    }

    fn supported_classes(&self) -> &[ProblemClass] {
        &[ProblemClass::LinearProgram, ProblemClass::QuadraticProgram]
    }

    fn solve(&self, problem: &OptimizationProblem, config: &SolverConfig) -> OpfResult<PrimalDual> {
        let class = problem.problem_class();
        if !self.supports(class) {
            return Err(OpfError::UnsupportedProblemClass {
                backend: self.id().to_string(),
                class,
            });
        }

        let n = problem.num_variables();
        let mut rows = ConicRows::new(n);
        let mut maps = vec![RowMap::default(); problem.num_constraints()];

        // Zero cone: equality constraints and fixed variables.
        for (c, constraint) in problem.constraints.iter().enumerate() {
            if constraint.is_equality() {
                maps[c].equality =
                    Some(rows.push(&constraint.terms, 1.0, constraint.upper - constraint.constant));
            }
        }
        for (i, var) in problem.variables.iter().enumerate() {
            if var.is_fixed() {
                rows.push(&[(i, 1.0)], 1.0, var.upper);
            }
        }
        let num_equalities = rows.rhs.len();

        // Nonnegative cone: a·x + s = upper - constant, -a·x + s = constant - lower.
        for (c, constraint) in problem.constraints.iter().enumerate() {
            if constraint.is_equality() {
                continue;
            }
            if is_finite_bound(constraint.upper) {
                maps[c].upper =
                    Some(rows.push(&constraint.terms, 1.0, constraint.upper - constraint.constant));
            }
            if is_finite_bound(constraint.lower) {
                maps[c].lower =
                    Some(rows.push(&constraint.terms, -1.0, constraint.constant - constraint.lower));
            }
        }
        for (i, var) in problem.variables.iter().enumerate() {
            if var.is_fixed() {
                continue;
            }
            if is_finite_bound(var.upper) {
                rows.push(&[(i, 1.0)], 1.0, var.upper);
            }
            if is_finite_bound(var.lower) {
                rows.push(&[(i, 1.0)], -1.0, -var.lower);
            }
        }
        let num_inequalities = rows.rhs.len() - num_equalities;

        let mut cones = Vec::new();
        if num_equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equalities));
        }
        if num_inequalities > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(num_inequalities));
        }

        let mut q = vec![0.0; n];
        for &(i, c) in &problem.objective.linear {
            q[i] += c;
        }
        let p_mat = quadratic_matrix(problem);
        let (a_mat, b) = rows.into_csc();

        debug!(
            variables = n,
            equalities = num_equalities,
            inequalities = num_inequalities,
            class = %class,
            "solving with clarabel"
        );

        let settings = DefaultSettingsBuilder::default()
            .verbose(config.verbose)
            .max_iter(config.max_iterations as u32)
            .tol_feas(config.tolerance)
            .tol_gap_abs(config.tolerance)
            .tol_gap_rel(config.tolerance)
            .build()
            .map_err(|e| OpfError::NumericalIssue(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver = clarabel::solver::DefaultSolver::new(&p_mat, &q, &a_mat, &b, &cones, settings)
            .map_err(|e| OpfError::NumericalIssue(format!("Clarabel initialization failed: {:?}", e)))?;

        solver.solve();

        let sol = solver.solution;
        let iterations = sol.iterations as usize;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                return Err(OpfError::Infeasible(format!(
                    "Clarabel returned status {:?}",
                    sol.status
                )));
            }
            status => {
                return Err(OpfError::ConvergenceFailure {
                    iterations,
                    status: format!("{:?}", status),
                });
            }
        }

        let z = &sol.z;
        let dual = |row: Option<usize>| row.map_or(0.0, |r| z[r]);
        let duals = maps
            .iter()
            .map(|m| match m.equality {
                Some(r) => z[r],
                None => dual(m.upper) - dual(m.lower),
            })
            .collect();

        Ok(PrimalDual {
            status: format!("{:?}", sol.status),
            iterations,
            objective: problem.objective.evaluate(&sol.x),
            primal: sol.x,
            duals,
        })
    }
}
