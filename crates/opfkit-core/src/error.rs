//! Error taxonomy shared by every opfkit crate.
//!
//! [`OpfkitError`] covers the fatal conditions of the sensitivity engine and the
//! security-constrained formulation:
//!
//! - [`OpfkitError::Configuration`] for malformed input detected before any linear
//!   algebra (slack count, dangling references, zero-impedance branches, bad tunables)
//! - [`OpfkitError::SingularSystem`] when the grounded susceptance system cannot be
//!   solved because the network is split into islands
//! - [`OpfkitError::BisectionConvergence`] when post-contingency rebalancing fails
//!
//! Recoverable screening results (bridge-line contingencies) are not errors. They are
//! reported as warnings through [`crate::diagnostics::Diagnostics`].

use thiserror::Error;

use crate::GenId;

/// Unified error type for network preparation and sensitivity computations.
#[derive(Error, Debug)]
pub enum OpfkitError {
    /// Misconfigured network or tunables (zero/multiple slack buses, bad references).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Grounded bus susceptance matrix is singular beyond the slack grounding.
    #[error("Singular system: {detail} ({islands} islands)")]
    SingularSystem { islands: usize, detail: String },

    /// Post-contingency bisection did not reach power balance.
    #[error(
        "Bisection for generator contingency {contingency} did not converge after \
         {iterations} iterations (residual {residual:.3e})"
    )]
    BisectionConvergence {
        contingency: GenId,
        iterations: usize,
        residual: f64,
    },

    /// Lookup of an element id that is not part of the network.
    #[error("Unknown {kind} '{id}'")]
    UnknownEntity { kind: &'static str, id: String },

    /// Structurally valid input with invalid values (dimension mismatch, NaN, ...)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Deserialization errors for network snapshots and configuration files
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for results using [`OpfkitError`].
pub type OpfkitResult<T> = Result<T, OpfkitError>;

impl OpfkitError {
    pub fn unknown(kind: &'static str, id: impl std::fmt::Display) -> Self {
        OpfkitError::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }

    /// True for errors that indicate the network cannot be solved as given.
    pub fn is_topological(&self) -> bool {
        matches!(self, OpfkitError::SingularSystem { .. })
    }
}

impl From<serde_json::Error> for OpfkitError {
    fn from(err: serde_json::Error) -> Self {
        OpfkitError::Parse(err.to_string())
    }
}
