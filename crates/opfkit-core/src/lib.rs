//! # opfkit-core: transmission network model
//!
//! Typed data structures for a single operating snapshot of a transmission grid,
//! plus the pieces every sensitivity computation needs before touching a matrix:
//!
//! - [`Network`]: buses, generators, branches, loads and shunts keyed by stable
//!   string identifiers (per-unit quantities on `base_mva`)
//! - [`index::index_network`]: dense zero-based indices in identifier order and the
//!   unique slack bus, frozen into an immutable [`IndexedNetwork`]
//! - [`graph_utils`]: island and bridge detection on the branch graph
//! - [`error`] and [`diagnostics`]: fatal errors and collected warnings
//!
//! ## Quick Start
//!
//! ```
//! use opfkit_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus::new("1", BusType::Reference));
//! network.add_bus(Bus::new("2", BusType::Pq));
//! network.add_branch(Branch::new("1", "1", "2", 0.01, 0.1).with_ratings(1.0, 1.2));
//! network.add_generator(Generator::new("1", "1").with_p_limits(0.0, 2.0).with_cost(0.0, 10.0, 0.0));
//! network.add_load(Load::new("1", "2", 0.5));
//!
//! let indexed = index_network(&network).unwrap();
//! assert_eq!(indexed.slack(), 0);
//! assert_eq!(indexed.num_branches(), 1);
//! ```
//!
//! ## Identifier ordering
//!
//! Every collection is a `BTreeMap` keyed by a string newtype, so iteration order
//! is lexicographic (`"10"` sorts before `"2"`). Dense indices follow this order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod index;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{OpfkitError, OpfkitResult};
pub use graph_utils::{bridge_branches, ensure_connected, find_islands, Island, IslandAnalysis};
pub use index::{index_network, IndexedNetwork};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShuntId(String);

macro_rules! impl_id {
    ($($name:ident),*) => {
        $(
            impl $name {
                #[inline]
                pub fn new(value: impl Into<String>) -> Self {
                    $name(value.into())
                }
                #[inline]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    $name(value.to_string())
                }
            }
        )*
    };
}

impl_id!(BusId, GenId, BranchId, LoadId, ShuntId);

/// Bus classification (MATPOWER codes 1..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Pq,
    Pv,
    /// Slack bus: angle reference for the whole network
    Reference,
    Isolated,
}

impl BusType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(BusType::Pq),
            2 => Some(BusType::Pv),
            3 => Some(BusType::Reference),
            4 => Some(BusType::Isolated),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            BusType::Pq => 1,
            BusType::Pv => 2,
            BusType::Reference => 3,
            BusType::Isolated => 4,
        }
    }
}

impl std::str::FromStr for BusType {
    type Err = OpfkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pq" => Ok(BusType::Pq),
            "pv" => Ok(BusType::Pv),
            "reference" | "ref" | "slack" => Ok(BusType::Reference),
            "isolated" => Ok(BusType::Isolated),
            other => Err(OpfkitError::Parse(format!("unknown bus type '{other}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for BusType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => BusType::from_code(code)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid bus type code {code}"))),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bus {
    pub id: BusId,
    pub bus_type: BusType,
    /// Minimum voltage magnitude (p.u.)
    pub vmin: f64,
    /// Maximum voltage magnitude (p.u.)
    pub vmax: f64,
    pub base_kv: f64,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId::default(),
            bus_type: BusType::Pq,
            vmin: 0.9,
            vmax: 1.1,
            base_kv: 0.0,
        }
    }
}

impl Bus {
    pub fn new(id: impl Into<String>, bus_type: BusType) -> Self {
        Self {
            id: BusId::new(id),
            bus_type,
            ..Self::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.bus_type == BusType::Reference
    }
}

/// Generator with a quadratic cost curve `c2·pg² + c1·pg + c0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generator {
    pub id: GenId,
    pub bus: BusId,
    /// Active power set point (p.u.)
    pub pg: f64,
    pub qg: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub qmin: f64,
    pub qmax: f64,
    pub in_service: bool,
    /// Cost coefficients in PGLib order `[c2, c1, c0]`
    pub cost: [f64; 3],
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            id: GenId::default(),
            bus: BusId::default(),
            pg: 0.0,
            qg: 0.0,
            pmin: 0.0,
            pmax: 0.0,
            qmin: 0.0,
            qmax: 0.0,
            in_service: true,
            cost: [0.0; 3],
        }
    }
}

impl Generator {
    pub fn new(id: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            id: GenId::new(id),
            bus: BusId::new(bus),
            ..Self::default()
        }
    }

    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = pmin;
        self.pmax = pmax;
        self
    }

    pub fn with_q_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = qmin;
        self.qmax = qmax;
        self
    }

    pub fn with_dispatch(mut self, pg: f64) -> Self {
        self.pg = pg;
        self
    }

    pub fn with_cost(mut self, c2: f64, c1: f64, c0: f64) -> Self {
        self.cost = [c2, c1, c0];
        self
    }

    pub fn out_of_service(mut self) -> Self {
        self.in_service = false;
        self
    }

    /// Dispatchable range `max(0, pmax - pmin)`.
    pub fn capacity(&self) -> f64 {
        (self.pmax - self.pmin).max(0.0)
    }

    pub fn cost_at(&self, pg: f64) -> f64 {
        let [c2, c1, c0] = self.cost;
        c2 * pg * pg + c1 * pg + c0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub id: BranchId,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series resistance (p.u.)
    pub r: f64,
    /// Series reactance (p.u.)
    pub x: f64,
    /// Total line charging susceptance (p.u.)
    pub charging_b: f64,
    /// Normal thermal rating; 0 means unbounded
    pub rate_a: f64,
    pub rate_b: f64,
    /// Emergency thermal rating; 0 means unbounded
    pub rate_c: f64,
    /// Angle difference limits (radians)
    pub angmin: f64,
    pub angmax: f64,
    pub in_service: bool,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            id: BranchId::default(),
            from_bus: BusId::default(),
            to_bus: BusId::default(),
            r: 0.0,
            x: 0.0,
            charging_b: 0.0,
            rate_a: 0.0,
            rate_b: 0.0,
            rate_c: 0.0,
            angmin: -std::f64::consts::FRAC_PI_3,
            angmax: std::f64::consts::FRAC_PI_3,
            in_service: true,
        }
    }
}

impl Branch {
    pub fn new(
        id: impl Into<String>,
        from_bus: impl Into<String>,
        to_bus: impl Into<String>,
        r: f64,
        x: f64,
    ) -> Self {
        Self {
            id: BranchId::new(id),
            from_bus: BusId::new(from_bus),
            to_bus: BusId::new(to_bus),
            r,
            x,
            ..Self::default()
        }
    }

    /// Set normal (A) and emergency (C) ratings; rate B follows rate A.
    pub fn with_ratings(mut self, rate_a: f64, rate_c: f64) -> Self {
        self.rate_a = rate_a;
        self.rate_b = rate_a;
        self.rate_c = rate_c;
        self
    }

    pub fn with_charging(mut self, charging_b: f64) -> Self {
        self.charging_b = charging_b;
        self
    }

    pub fn out_of_service(mut self) -> Self {
        self.in_service = false;
        self
    }

    /// Series susceptance `b = -x / (r² + x²)`.
    ///
    /// Tap ratio and phase shift are ignored at this layer.
    pub fn susceptance(&self) -> f64 {
        -self.x / (self.r * self.r + self.x * self.x)
    }

    pub fn has_zero_impedance(&self) -> bool {
        self.r == 0.0 && self.x == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Load {
    pub id: LoadId,
    pub bus: BusId,
    /// Active demand (p.u.)
    pub pd: f64,
    pub qd: f64,
}

impl Load {
    pub fn new(id: impl Into<String>, bus: impl Into<String>, pd: f64) -> Self {
        Self {
            id: LoadId::new(id),
            bus: BusId::new(bus),
            pd,
            qd: 0.0,
        }
    }

    pub fn with_reactive(mut self, qd: f64) -> Self {
        self.qd = qd;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shunt {
    pub id: ShuntId,
    pub bus: BusId,
    pub gs: f64,
    pub bs: f64,
}

impl Shunt {
    pub fn new(id: impl Into<String>, bus: impl Into<String>, gs: f64, bs: f64) -> Self {
        Self {
            id: ShuntId::new(id),
            bus: BusId::new(bus),
            gs,
            bs,
        }
    }
}

/// Elements stored in a [`Network`] collection, keyed by their own id.
pub trait Keyed {
    type Key: Ord + Clone + fmt::Display;
    fn key(&self) -> &Self::Key;
}

impl Keyed for Bus {
    type Key = BusId;
    fn key(&self) -> &BusId {
        &self.id
    }
}

impl Keyed for Generator {
    type Key = GenId;
    fn key(&self) -> &GenId {
        &self.id
    }
}

impl Keyed for Branch {
    type Key = BranchId;
    fn key(&self) -> &BranchId {
        &self.id
    }
}

impl Keyed for Load {
    type Key = LoadId;
    fn key(&self) -> &LoadId {
        &self.id
    }
}

impl Keyed for Shunt {
    type Key = ShuntId;
    fn key(&self) -> &ShuntId {
        &self.id
    }
}

/// Serializes keyed maps as plain arrays of elements and rejects duplicate ids on input.
mod element_list {
    use super::Keyed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, T>(map: &BTreeMap<T::Key, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<T::Key, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Keyed + Deserialize<'de>,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for item in items {
            let key = item.key().clone();
            if map.insert(key.clone(), item).is_some() {
                return Err(D::Error::custom(format!("duplicate id '{key}'")));
            }
        }
        Ok(map)
    }
}

/// One operating snapshot of a transmission network.
///
/// All power quantities are per-unit on `base_mva`; angles are radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
    #[serde(default, with = "element_list")]
    pub buses: BTreeMap<BusId, Bus>,
    #[serde(default, with = "element_list")]
    pub generators: BTreeMap<GenId, Generator>,
    #[serde(default, with = "element_list")]
    pub branches: BTreeMap<BranchId, Branch>,
    #[serde(default, with = "element_list")]
    pub loads: BTreeMap<LoadId, Load>,
    #[serde(default, with = "element_list")]
    pub shunts: BTreeMap<ShuntId, Shunt>,
}

fn default_base_mva() -> f64 {
    100.0
}

impl Default for Network {
    fn default() -> Self {
        Self {
            base_mva: default_base_mva(),
            buses: BTreeMap::new(),
            generators: BTreeMap::new(),
            branches: BTreeMap::new(),
            loads: BTreeMap::new(),
            shunts: BTreeMap::new(),
        }
    }
}

/// Summary counts reported by `Network::stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_generators: usize,
    pub num_in_service_generators: usize,
    pub num_branches: usize,
    pub num_in_service_branches: usize,
    pub num_loads: usize,
    pub num_shunts: usize,
    /// Sum of active demand (p.u.)
    pub total_demand: f64,
    /// Sum of in-service `pmax` (p.u.)
    pub total_pmax: f64,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_mva(mut self, base_mva: f64) -> Self {
        self.base_mva = base_mva;
        self
    }

    pub fn add_bus(&mut self, bus: Bus) -> Option<Bus> {
        self.buses.insert(bus.id.clone(), bus)
    }

    pub fn add_generator(&mut self, generator: Generator) -> Option<Generator> {
        self.generators.insert(generator.id.clone(), generator)
    }

    pub fn add_branch(&mut self, branch: Branch) -> Option<Branch> {
        self.branches.insert(branch.id.clone(), branch)
    }

    pub fn add_load(&mut self, load: Load) -> Option<Load> {
        self.loads.insert(load.id.clone(), load)
    }

    pub fn add_shunt(&mut self, shunt: Shunt) -> Option<Shunt> {
        self.shunts.insert(shunt.id.clone(), shunt)
    }

    /// Buses typed as reference, in id order.
    pub fn reference_buses(&self) -> Vec<&BusId> {
        self.buses
            .values()
            .filter(|bus| bus.is_reference())
            .map(|bus| &bus.id)
            .collect()
    }

    pub fn in_service_generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values().filter(|g| g.in_service)
    }

    pub fn in_service_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values().filter(|b| b.in_service)
    }

    pub fn total_demand(&self) -> f64 {
        self.loads.values().map(|l| l.pd).sum()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_buses: self.buses.len(),
            num_generators: self.generators.len(),
            num_in_service_generators: self.in_service_generators().count(),
            num_branches: self.branches.len(),
            num_in_service_branches: self.in_service_branches().count(),
            num_loads: self.loads.len(),
            num_shunts: self.shunts.len(),
            total_demand: self.total_demand(),
            total_pmax: self.in_service_generators().map(|g| g.pmax).sum(),
        }
    }

    /// Copy of the network with one branch taken out of service.
    ///
    /// Sensitivities are never updated incrementally; callers rebuild them from
    /// the returned snapshot.
    pub fn with_branch_outage(&self, branch: &BranchId) -> OpfkitResult<Network> {
        let mut next = self.clone();
        match next.branches.get_mut(branch) {
            Some(b) => b.in_service = false,
            None => return Err(OpfkitError::unknown("branch", branch)),
        }
        Ok(next)
    }

    /// Record structural problems without failing on the first one.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.buses.is_empty() {
            diag.add_error("validation", "network has no buses");
        }

        match self.reference_buses().len() {
            0 => diag.add_error("validation", "network has no reference bus"),
            1 => {}
            n => diag.add_error(
                "validation",
                &format!("network has {n} reference buses, expected exactly one"),
            ),
        }

        for gen in self.generators.values() {
            let entity = format!("generator {}", gen.id);
            if !self.buses.contains_key(&gen.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("unknown bus '{}'", gen.bus),
                    &entity,
                );
            }
            if !(gen.pmin.is_finite() && gen.pmax.is_finite() && gen.pg.is_finite()) {
                diag.add_error_with_entity("validation", "non-finite active power data", &entity);
            } else if gen.pmin > gen.pmax {
                diag.add_error_with_entity(
                    "validation",
                    &format!("pmin {} exceeds pmax {}", gen.pmin, gen.pmax),
                    &entity,
                );
            }
            if gen.cost.iter().any(|c| !c.is_finite()) {
                diag.add_error_with_entity("validation", "non-finite cost coefficient", &entity);
            }
        }

        for branch in self.branches.values() {
            let entity = format!("branch {}", branch.id);
            for end in [&branch.from_bus, &branch.to_bus] {
                if !self.buses.contains_key(end) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("unknown bus '{end}'"),
                        &entity,
                    );
                }
            }
            if branch.from_bus == branch.to_bus {
                diag.add_warning_with_entity("validation", "branch is a self-loop", &entity);
            }
            if branch.in_service && branch.has_zero_impedance() {
                diag.add_error_with_entity("validation", "zero series impedance", &entity);
            }
            if !(branch.r.is_finite() && branch.x.is_finite()) {
                diag.add_error_with_entity("validation", "non-finite impedance", &entity);
            }
            if branch.rate_a < 0.0 || branch.rate_c < 0.0 {
                diag.add_error_with_entity("validation", "negative thermal rating", &entity);
            }
        }

        for load in self.loads.values() {
            if !self.buses.contains_key(&load.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("unknown bus '{}'", load.bus),
                    &format!("load {}", load.id),
                );
            }
        }

        for shunt in self.shunts.values() {
            if !self.buses.contains_key(&shunt.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("unknown bus '{}'", shunt.bus),
                    &format!("shunt {}", shunt.id),
                );
            }
        }

        if self.loads.is_empty() {
            diag.add_warning("validation", "network has no loads");
        }
    }

    pub fn from_json_str(json: &str) -> OpfkitResult<Network> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> OpfkitResult<Network> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> OpfkitResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus::new("1", BusType::Reference));
        network.add_bus(Bus::new("2", BusType::Pq));
        network.add_branch(Branch::new("1", "1", "2", 0.01, 0.1).with_ratings(1.0, 0.0));
        network.add_generator(
            Generator::new("1", "1")
                .with_p_limits(0.0, 2.0)
                .with_cost(0.0, 10.0, 0.0),
        );
        network.add_load(Load::new("1", "2", 0.5));
        network
    }

    #[test]
    fn test_susceptance_formula() {
        let branch = Branch::new("1", "1", "2", 0.00281, 0.0281);
        let expected = -0.0281 / (0.00281f64.powi(2) + 0.0281f64.powi(2));
        assert!((branch.susceptance() - expected).abs() < 1e-12);
        assert!(branch.susceptance() < 0.0);
    }

    #[test]
    fn test_generator_capacity_and_cost() {
        let gen = Generator::new("g", "1")
            .with_p_limits(0.2, 1.0)
            .with_cost(2.0, 3.0, 4.0);
        assert!((gen.capacity() - 0.8).abs() < 1e-12);
        assert!((gen.cost_at(0.5) - (0.5 + 1.5 + 4.0)).abs() < 1e-12);

        let inverted = Generator::new("h", "1").with_p_limits(1.0, 0.5);
        assert_eq!(inverted.capacity(), 0.0);
    }

    #[test]
    fn test_ids_sort_lexicographically() {
        let mut ids = vec![BusId::new("2"), BusId::new("10"), BusId::new("1")];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ordered, vec!["1", "10", "2"]);
    }

    #[test]
    fn test_bus_type_accepts_codes_and_names() {
        let from_code: BusType = serde_json::from_str("3").unwrap();
        assert_eq!(from_code, BusType::Reference);
        let from_name: BusType = serde_json::from_str("\"pv\"").unwrap();
        assert_eq!(from_name, BusType::Pv);
        assert!(serde_json::from_str::<BusType>("7").is_err());
    }

    #[test]
    fn test_json_roundtrip_uses_element_arrays() {
        let network = two_bus();
        let json = network.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["buses"].is_array());
        assert_eq!(value["buses"].as_array().unwrap().len(), 2);

        let parsed = Network::from_json_str(&json).unwrap();
        assert_eq!(parsed, network);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{
            "buses": [
                {"id": "1", "bus_type": 3},
                {"id": "1", "bus_type": 1}
            ]
        }"#;
        let err = Network::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("duplicate id"));
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let mut network = two_bus();
        network.add_load(Load::new("2", "99", 0.1));
        network.add_branch(Branch::new("2", "1", "2", 0.0, 0.0));

        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert_eq!(diag.error_count(), 2);
        assert!(diag.issues.iter().any(|i| i.message.contains("unknown bus '99'")));
        assert!(diag.issues.iter().any(|i| i.message.contains("zero series impedance")));
    }

    #[test]
    fn test_validate_flags_slack_count() {
        let mut network = two_bus();
        network.add_bus(Bus::new("3", BusType::Reference));
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag
            .issues
            .iter()
            .any(|i| i.message.contains("2 reference buses")));
    }

    #[test]
    fn test_stats_and_branch_outage() {
        let network = two_bus();
        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_in_service_branches, 1);
        assert!((stats.total_demand - 0.5).abs() < 1e-12);

        let outaged = network.with_branch_outage(&BranchId::new("1")).unwrap();
        assert_eq!(outaged.stats().num_in_service_branches, 0);
        assert!(network.with_branch_outage(&BranchId::new("9")).is_err());
    }
}
