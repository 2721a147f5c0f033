use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use opfkit_core::{BranchId, BusId, GenId, OpfkitError};
use serde::Serialize;

use super::coefficients::serialize_pair_keys;
use super::config::ScopfConfig;

/// OPF model variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum OpfModelKind {
    /// DC-OPF in voltage-angle form with nodal balance
    #[default]
    #[serde(rename = "dcopf")]
    DcOpf,
    /// DC-OPF with flows expressed through PTDF factors
    #[serde(rename = "dcopf-ptdf")]
    DcOpfPtdf,
    /// Security-constrained DC-OPF, extensive form
    #[serde(rename = "scdcopf")]
    ScDcOpf,
    /// Security-constrained DC-OPF master problem of the CCGA decomposition
    #[serde(rename = "scdcopf-ccga")]
    ScDcOpfCcga,
}

impl OpfModelKind {
    pub const ALL: [OpfModelKind; 4] = [
        OpfModelKind::DcOpf,
        OpfModelKind::DcOpfPtdf,
        OpfModelKind::ScDcOpf,
        OpfModelKind::ScDcOpfCcga,
    ];

    pub fn is_security_constrained(&self) -> bool {
        matches!(self, OpfModelKind::ScDcOpf | OpfModelKind::ScDcOpfCcga)
    }
}

impl fmt::Display for OpfModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpfModelKind::DcOpf => write!(f, "dcopf"),
            OpfModelKind::DcOpfPtdf => write!(f, "dcopf-ptdf"),
            OpfModelKind::ScDcOpf => write!(f, "scdcopf"),
            OpfModelKind::ScDcOpfCcga => write!(f, "scdcopf-ccga"),
        }
    }
}

impl FromStr for OpfModelKind {
    type Err = OpfkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "dcopf" | "dc" => Ok(OpfModelKind::DcOpf),
            "dcopf-ptdf" | "ptdf" => Ok(OpfModelKind::DcOpfPtdf),
            "scdcopf" => Ok(OpfModelKind::ScDcOpf),
            "scdcopf-ccga" | "ccga" => Ok(OpfModelKind::ScDcOpfCcga),
            "acopf" | "ac" => Err(OpfkitError::Configuration(
                "AC-OPF is not available; use one of the DC models".into(),
            )),
            other => Err(OpfkitError::Configuration(format!(
                "Unknown OPF model '{other}' (expected dcopf, dcopf-ptdf, scdcopf or scdcopf-ccga)"
            ))),
        }
    }
}

/// Which elements to treat as outage candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContingencySet<T> {
    #[default]
    None,
    /// Every in-service element
    All,
    Only(Vec<T>),
}

impl<T> ContingencySet<T> {
    pub fn is_none(&self) -> bool {
        match self {
            ContingencySet::None => true,
            ContingencySet::All => false,
            ContingencySet::Only(ids) => ids.is_empty(),
        }
    }
}

/// Lazily added parts of the CCGA master problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LazySets {
    /// Generator contingencies that carry primary-response constraints
    pub k_g: BTreeSet<GenId>,
    /// `(branch, generator contingency)` pairs with an emergency flow limit
    pub e_k_g: BTreeSet<(BranchId, GenId)>,
    /// `(branch, line contingency)` pairs with an emergency flow limit
    pub e_k_e: BTreeSet<(BranchId, BranchId)>,
}

impl LazySets {
    pub fn is_empty(&self) -> bool {
        self.k_g.is_empty() && self.e_k_g.is_empty() && self.e_k_e.is_empty()
    }

    pub fn len(&self) -> usize {
        self.k_g.len() + self.e_k_g.len() + self.e_k_e.len()
    }
}

/// Inputs shared by every model builder.
#[derive(Debug, Clone, Default)]
pub struct ModelInputs {
    pub config: ScopfConfig,
    pub gen_contingencies: ContingencySet<GenId>,
    pub line_contingencies: ContingencySet<BranchId>,
    /// Only read by [`OpfModelKind::ScDcOpfCcga`]
    pub lazy: LazySets,
}

impl ModelInputs {
    pub fn new(config: ScopfConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_gen_contingencies(mut self, set: ContingencySet<GenId>) -> Self {
        self.gen_contingencies = set;
        self
    }

    pub fn with_line_contingencies(mut self, set: ContingencySet<BranchId>) -> Self {
        self.line_contingencies = set;
        self
    }

    pub fn with_lazy(mut self, lazy: LazySets) -> Self {
        self.lazy = lazy;
        self
    }
}

/// OPF solution keyed by element identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct OpfSolution {
    // === Status ===
    pub model: OpfModelKind,
    pub backend: String,
    pub status: String,
    pub iterations: usize,
    pub solve_time_ms: u128,

    // === Objective ===
    pub objective_value: f64,

    // === Primal Variables ===
    pub generator_p: BTreeMap<GenId, f64>,
    pub branch_p_flow: BTreeMap<BranchId, f64>,
    /// Angle-form models only
    pub bus_voltage_ang: BTreeMap<BusId, f64>,
    /// Post-contingency output `pg_kg`, keyed `(generator, contingency)`
    #[serde(serialize_with = "serialize_pair_keys")]
    pub contingency_p: BTreeMap<(GenId, GenId), f64>,
    /// Primary-response extent `n_kg` of the contingencies that model it
    pub response_extent: BTreeMap<GenId, f64>,

    // === Dual Variables ===
    /// Nodal prices; base-case models only
    pub bus_lmp: BTreeMap<BusId, f64>,
    /// Price of the base-case system balance
    pub system_lambda: Option<f64>,
    /// Shadow price of the normal thermal limit, nonzero only where binding
    pub branch_shadow_price: BTreeMap<BranchId, f64>,

    /// Largest bound or constraint violation at the returned point
    pub max_violation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_round_trip() {
        for kind in OpfModelKind::ALL {
            assert_eq!(kind.to_string().parse::<OpfModelKind>().unwrap(), kind);
        }
        assert_eq!("SCDCOPF_CCGA".parse::<OpfModelKind>().unwrap(), OpfModelKind::ScDcOpfCcga);
    }

    #[test]
    fn test_acopf_is_a_configuration_error() {
        let err = "acopf".parse::<OpfModelKind>().unwrap_err();
        assert!(matches!(err, OpfkitError::Configuration(_)));
        assert!("nlp".parse::<OpfModelKind>().is_err());
    }

    #[test]
    fn test_contingency_set_defaults_to_none() {
        let set: ContingencySet<GenId> = ContingencySet::default();
        assert!(set.is_none());
        assert!(ContingencySet::<GenId>::Only(vec![]).is_none());
        assert!(!ContingencySet::<GenId>::All.is_none());
    }

    #[test]
    fn test_lazy_sets_serialize_as_pairs() {
        let mut lazy = LazySets::default();
        lazy.e_k_e.insert((BranchId::new("1"), BranchId::new("2")));
        assert_eq!(lazy.len(), 1);
        let json = serde_json::to_value(&lazy).unwrap();
        assert_eq!(json["e_k_e"][0][0], "1");
        assert_eq!(json["e_k_e"][0][1], "2");
    }
}
