use opfkit_core::OpfkitError;
use thiserror::Error;

use crate::opf::ProblemClass;

/// Errors from model construction and the solver layer.
#[derive(Debug, Error)]
pub enum OpfError {
    /// Index, sensitivity or bisection failure from the network layer
    #[error(transparent)]
    Network(#[from] OpfkitError),

    /// The solver proved the problem primal infeasible
    #[error("OPF infeasible: {0}")]
    Infeasible(String),

    /// Solver setup or result was numerically unusable
    #[error("OPF numerical issue: {0}")]
    NumericalIssue(String),

    #[error("Backend '{backend}' cannot solve {class} problems")]
    UnsupportedProblemClass {
        backend: String,
        class: ProblemClass,
    },

    #[error("OPF failed to converge after {iterations} iterations (status: {status})")]
    ConvergenceFailure { iterations: usize, status: String },
}

pub type OpfResult<T> = Result<T, OpfError>;

impl OpfError {
    /// The underlying network error, if any.
    pub fn network_error(&self) -> Option<&OpfkitError> {
        match self {
            OpfError::Network(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfkit_core::GenId;

    #[test]
    fn test_network_errors_pass_through() {
        let err: OpfError = OpfkitError::BisectionConvergence {
            contingency: GenId::new("3"),
            iterations: 100,
            residual: 0.2,
        }
        .into();
        assert!(err.to_string().contains("generator contingency 3"));
        assert!(matches!(
            err.network_error(),
            Some(OpfkitError::BisectionConvergence { .. })
        ));
    }

    #[test]
    fn test_unsupported_class_message() {
        let err = OpfError::UnsupportedProblemClass {
            backend: "clarabel".into(),
            class: ProblemClass::NonconvexQcqp,
        };
        assert_eq!(
            err.to_string(),
            "Backend 'clarabel' cannot solve nonconvex-qcqp problems"
        );
        assert!(err.network_error().is_none());
    }
}
