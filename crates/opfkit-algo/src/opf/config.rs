//! Tunables of the security-constrained models.
//!
//! The primary-response constants `gamma = 0.05` and `eps = 1e-4` are empirical
//! values from the SCOPF decomposition literature (Velloso et al. 2021; Petra &
//! Aravena 2021). The emergency-rating uplift of 33% is a convention for cases
//! that do not carry a separate rate C.

use std::collections::BTreeMap;

use opfkit_core::{GenId, OpfkitError, OpfkitResult};
use serde::{Deserialize, Serialize};

/// Post-contingency bisection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionConfig {
    /// Accepted `|Σ pg_k - Σ pd|`
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 100,
        }
    }
}

/// Lazy constraint generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcgaConfig {
    pub max_rounds: usize,
    /// Flow excess above rate C that counts as a violation
    pub violation_tolerance: f64,
}

impl Default for CcgaConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            violation_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopfConfig {
    /// Primary-response participation factor shared by every generator
    pub gamma: f64,
    /// Per-generator replacements for `gamma`
    pub gamma_overrides: BTreeMap<GenId, f64>,
    /// Complementarity relaxation of the primary response
    pub eps: f64,
    /// Emergency rating uplift when rate C is unset or equals rate A
    pub rate_c_increase_rate: f64,
    /// Rating used for branches without a limit
    pub unbounded_rating: f64,
    pub bisection: BisectionConfig,
    pub ccga: CcgaConfig,
}

impl Default for ScopfConfig {
    fn default() -> Self {
        Self {
            gamma: 0.05,
            gamma_overrides: BTreeMap::new(),
            eps: 1e-4,
            rate_c_increase_rate: 0.33,
            unbounded_rating: 1e12,
            bisection: BisectionConfig::default(),
            ccga: CcgaConfig::default(),
        }
    }
}

impl ScopfConfig {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Participation factor of generator `id`.
    pub fn gamma_for(&self, id: &GenId) -> f64 {
        self.gamma_overrides.get(id).copied().unwrap_or(self.gamma)
    }

    pub fn validate(&self) -> OpfkitResult<()> {
        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(OpfkitError::Configuration(format!(
                    "{name} must be finite and non-negative, got {value}"
                )))
            }
        };
        non_negative("gamma", self.gamma)?;
        for (id, gamma) in &self.gamma_overrides {
            non_negative(&format!("gamma for generator {id}"), *gamma)?;
        }
        non_negative("eps", self.eps)?;
        non_negative("rate_c_increase_rate", self.rate_c_increase_rate)?;
        non_negative("bisection.tolerance", self.bisection.tolerance)?;
        non_negative("ccga.violation_tolerance", self.ccga.violation_tolerance)?;
        if self.unbounded_rating.is_nan() || self.unbounded_rating <= 0.0 {
            return Err(OpfkitError::Configuration(format!(
                "unbounded_rating must be positive, got {}",
                self.unbounded_rating
            )));
        }
        if self.bisection.max_iterations == 0 {
            return Err(OpfkitError::Configuration(
                "bisection.max_iterations must be at least 1".into(),
            ));
        }
        if self.ccga.max_rounds == 0 {
            return Err(OpfkitError::Configuration(
                "ccga.max_rounds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScopfConfig::default();
        assert_eq!(config.gamma, 0.05);
        assert_eq!(config.eps, 1e-4);
        assert_eq!(config.rate_c_increase_rate, 0.33);
        assert_eq!(config.bisection.max_iterations, 100);
        assert_eq!(config.bisection.tolerance, 1e-5);
        assert_eq!(config.ccga.max_rounds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gamma_overrides() {
        let mut config = ScopfConfig::default().with_gamma(0.2);
        config.gamma_overrides.insert(GenId::new("3"), 0.5);
        assert_eq!(config.gamma_for(&GenId::new("3")), 0.5);
        assert_eq!(config.gamma_for(&GenId::new("1")), 0.2);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ScopfConfig::default().with_eps(-1.0).validate().is_err());
        assert!(ScopfConfig::default().with_gamma(f64::NAN).validate().is_err());

        let mut config = ScopfConfig::default();
        config.bisection.max_iterations = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, OpfkitError::Configuration(_)));

        let mut config = ScopfConfig::default();
        config.gamma_overrides.insert(GenId::new("1"), -0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScopfConfig =
            serde_json::from_str(r#"{"gamma": 0.2, "bisection": {"tolerance": 1e-6}}"#).unwrap();
        assert_eq!(config.gamma, 0.2);
        assert_eq!(config.eps, 1e-4);
        assert_eq!(config.bisection.tolerance, 1e-6);
        assert_eq!(config.bisection.max_iterations, 100);
    }
}
