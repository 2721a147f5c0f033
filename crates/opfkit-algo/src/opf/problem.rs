//! Solver-agnostic optimization problem.
//!
//! Every OPF model is lowered to the same representation:
//!
//! ```text
//! minimize    Σ q_i·x_i² + Σ c_i·x_i + c_0
//! subject to  lower_j ≤ Σ a_jk·x_k + const_j ≤ upper_j     (linear)
//!             Σ a_jk·x_k + Σ h_jkl·x_k·x_l ≤ upper_j        (bilinear)
//!             lb_i ≤ x_i ≤ ub_i
//! ```
//!
//! Backends decide from [`ProblemClass`] whether they can handle an instance.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Mathematical class of an [`OptimizationProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemClass {
    /// Linear objective and constraints
    LinearProgram,
    /// Convex quadratic objective, linear constraints
    QuadraticProgram,
    /// Bilinear constraints (primary-response complementarity relaxation)
    NonconvexQcqp,
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemClass::LinearProgram => write!(f, "lp"),
            ProblemClass::QuadraticProgram => write!(f, "qp"),
            ProblemClass::NonconvexQcqp => write!(f, "nonconvex-qcqp"),
        }
    }
}

/// Role of a constraint, used to map duals back to prices and to report limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// System-wide balance `Σ pg = Σ pd` (base case)
    SystemBalance,
    /// Nodal balance at one bus (angle form)
    BusBalance(usize),
    /// Balance under generator contingency `k`
    ContingencyBalance(usize),
    /// Flow definition `pf = f(pg)` or `pf = S_br·va`
    FlowDefinition,
    /// Reference angle fixed to zero
    ReferenceAngle,
    /// Thermal limit on a base-case flow
    FlowLimit,
    /// Thermal limit on a generator- or line-contingency flow
    ContingencyFlowLimit,
    /// `pg_kg - pg ≤ r̄`
    ProvisionalResponse,
    /// `pg_kg + rho = pg + n·γ·capacity`
    PrimaryResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

impl Variable {
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }
}

/// `lower ≤ Σ a·x + constant ≤ upper`; equality when `lower == upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub terms: Vec<(usize, f64)>,
    pub constant: f64,
    pub lower: f64,
    pub upper: f64,
}

impl LinearConstraint {
    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }

    /// `Σ a·x + constant` at `x`.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.constant + self.terms.iter().map(|&(i, a)| a * x[i]).sum::<f64>()
    }

    /// Distance outside `[lower, upper]`, zero when satisfied.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let v = self.activity(x);
        (self.lower - v).max(v - self.upper).max(0.0)
    }
}

/// `Σ a·x + Σ h·x·y ≤ upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BilinearConstraint {
    pub name: String,
    pub linear: Vec<(usize, f64)>,
    pub bilinear: Vec<(usize, usize, f64)>,
    pub upper: f64,
}

impl BilinearConstraint {
    pub fn activity(&self, x: &[f64]) -> f64 {
        let linear: f64 = self.linear.iter().map(|&(i, a)| a * x[i]).sum();
        let bilinear: f64 = self.bilinear.iter().map(|&(i, j, h)| h * x[i] * x[j]).sum();
        linear + bilinear
    }

    pub fn violation(&self, x: &[f64]) -> f64 {
        (self.activity(x) - self.upper).max(0.0)
    }
}

/// Separable quadratic objective.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Objective {
    /// `(i, q)` contributes `q·x_i²`
    pub quadratic: Vec<(usize, f64)>,
    pub linear: Vec<(usize, f64)>,
    pub constant: f64,
}

impl Objective {
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        let quad: f64 = self.quadratic.iter().map(|&(i, q)| q * x[i] * x[i]).sum();
        let lin: f64 = self.linear.iter().map(|&(i, c)| c * x[i]).sum();
        quad + lin + self.constant
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationProblem {
    pub variables: Vec<Variable>,
    pub constraints: Vec<LinearConstraint>,
    pub bilinear: Vec<BilinearConstraint>,
    pub objective: Objective,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl OptimizationProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable and return its column index.
    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> usize {
        let name = name.into();
        let index = self.variables.len();
        self.lookup.insert(name.clone(), index);
        self.variables.push(Variable { name, lower, upper });
        index
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        kind: ConstraintKind,
        terms: Vec<(usize, f64)>,
        constant: f64,
        lower: f64,
        upper: f64,
    ) -> usize {
        let index = self.constraints.len();
        self.constraints.push(LinearConstraint {
            name: name.into(),
            kind,
            terms,
            constant,
            lower,
            upper,
        });
        index
    }

    /// `Σ a·x + constant = rhs`
    pub fn add_equality(
        &mut self,
        name: impl Into<String>,
        kind: ConstraintKind,
        terms: Vec<(usize, f64)>,
        constant: f64,
        rhs: f64,
    ) -> usize {
        self.add_constraint(name, kind, terms, constant, rhs, rhs)
    }

    pub fn add_bilinear(
        &mut self,
        name: impl Into<String>,
        linear: Vec<(usize, f64)>,
        bilinear: Vec<(usize, usize, f64)>,
        upper: f64,
    ) {
        self.bilinear.push(BilinearConstraint {
            name: name.into(),
            linear,
            bilinear,
            upper,
        });
    }

    /// Add `c2·x² + c1·x + c0` for variable `var` to the objective.
    pub fn add_cost(&mut self, var: usize, c2: f64, c1: f64, c0: f64) {
        if c2 != 0.0 {
            self.objective.quadratic.push((var, c2));
        }
        if c1 != 0.0 {
            self.objective.linear.push((var, c1));
        }
        self.objective.constant += c0;
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn problem_class(&self) -> ProblemClass {
        if !self.bilinear.is_empty() {
            ProblemClass::NonconvexQcqp
        } else if self.objective.quadratic.iter().any(|&(_, q)| q != 0.0) {
            ProblemClass::QuadraticProgram
        } else {
            ProblemClass::LinearProgram
        }
    }

    pub fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = (usize, &LinearConstraint)> {
        self.constraints
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.kind == kind)
    }

    /// Largest violation of any bound or constraint at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let bounds = self
            .variables
            .iter()
            .zip(x)
            .map(|(v, &xi)| (v.lower - xi).max(xi - v.upper).max(0.0));
        let linear = self.constraints.iter().map(|c| c.violation(x));
        let bilinear = self.bilinear.iter().map(|c| c.violation(x));
        bounds.chain(linear).chain(bilinear).fold(0.0, f64::max)
    }
}
