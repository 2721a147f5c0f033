//! Coefficient data shared by the PTDF-based and security-constrained models.
//!
//! [`ModelData`] is computed once per indexed network: PTDF factors, the constant
//! load contribution to every branch flow, preprocessed normal/emergency ratings
//! and per-generator response data. [`SecurityCoefficients`] is the same data keyed
//! by typed identifiers, for consumers outside this crate.

use std::collections::BTreeMap;

use opfkit_core::{BranchId, GenId, IndexedNetwork, OpfkitResult};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::config::ScopfConfig;
use crate::contingency::LodfMatrix;
use crate::sparse::{compute_ptdf, PtdfFactors};
use crate::tolerance::is_close;

/// Per-generator limits, response data and cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorData {
    pub id: GenId,
    pub pmin: f64,
    pub pmax: f64,
    /// `max(0, pmax - pmin)`
    pub capacity: f64,
    pub gamma: f64,
    /// `[c2, c1, c0]`
    pub cost: [f64; 3],
}

impl GeneratorData {
    /// Provisional post-contingency ramp limit `r̄ = γ·capacity`.
    pub fn response_limit(&self) -> f64 {
        self.gamma * self.capacity
    }
}

/// Normal and emergency ratings after substitution of unset values.
///
/// - `rate_a ≈ 0` becomes `unbounded`
/// - `rate_c ≈ 0` becomes `unbounded`
/// - `rate_c ≈ rate_a` becomes `(1 + increase)·rate_a`
///
/// The comparisons run in that order, on the substituted values.
pub fn preprocess_ratings(rate_a: f64, rate_c: f64, config: &ScopfConfig) -> (f64, f64) {
    let rate_a = if is_close(rate_a, 0.0) {
        config.unbounded_rating
    } else {
        rate_a
    };
    let mut rate_c = if is_close(rate_c, 0.0) {
        config.unbounded_rating
    } else {
        rate_c
    };
    if is_close(rate_c, rate_a) {
        rate_c = (1.0 + config.rate_c_increase_rate) * rate_a;
    }
    (rate_a, rate_c)
}

#[derive(Debug, Clone)]
pub struct ModelData {
    pub ptdf: PtdfFactors,
    /// `ptdf_l · pd` per branch
    pub load_injection: Vec<f64>,
    pub rate_a: Vec<f64>,
    pub rate_c: Vec<f64>,
    pub generators: Vec<GeneratorData>,
    pub demand: Vec<f64>,
    pub total_demand: f64,
    pub eps: f64,
}

impl ModelData {
    pub fn prepare(indexed: &IndexedNetwork, config: &ScopfConfig) -> OpfkitResult<Self> {
        config.validate()?;
        let ptdf = compute_ptdf(indexed)?;
        let demand = indexed.load_vector();
        let load_injection = ptdf.load_injection(&demand);

        let (rate_a, rate_c): (Vec<f64>, Vec<f64>) = (0..indexed.num_branches())
            .map(|e| {
                let branch = indexed.branch(e);
                preprocess_ratings(branch.rate_a, branch.rate_c, config)
            })
            .unzip();

        let generators = (0..indexed.num_generators())
            .map(|g| {
                let gen = indexed.generator(g);
                GeneratorData {
                    id: gen.id.clone(),
                    pmin: gen.pmin,
                    pmax: gen.pmax,
                    capacity: gen.capacity(),
                    gamma: config.gamma_for(&gen.id),
                    cost: gen.cost,
                }
            })
            .collect();

        Ok(Self {
            ptdf,
            load_injection,
            rate_a,
            rate_c,
            generators,
            total_demand: demand.iter().sum(),
            demand,
            eps: config.eps,
        })
    }

    pub fn num_branches(&self) -> usize {
        self.load_injection.len()
    }

    pub fn num_generators(&self) -> usize {
        self.generators.len()
    }

    /// `ptdf_g · pg - load_injection` per branch.
    pub fn flows(&self, pg: &[f64]) -> Vec<f64> {
        self.ptdf
            .gen_injection(pg)
            .into_iter()
            .zip(&self.load_injection)
            .map(|(g, l)| g - l)
            .collect()
    }

    /// Generator contingencies worth modelling: candidates with nonzero capacity.
    pub fn eligible_generator_contingencies(&self, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&k| !is_close(self.generators[k].capacity, 0.0))
            .collect()
    }

    pub fn coefficients(&self, lodf: Option<&LodfMatrix>) -> SecurityCoefficients {
        let branches = self.ptdf.branches();
        let mut ptdf_g = BTreeMap::new();
        for (e, branch) in branches.iter().enumerate() {
            for (g, gen) in self.generators.iter().enumerate() {
                ptdf_g.insert((branch.clone(), gen.id.clone()), self.ptdf.gen_factor(e, g));
            }
        }

        let mut lodf_map = BTreeMap::new();
        if let Some(lodf) = lodf {
            for (e, branch) in branches.iter().enumerate() {
                for (k, outage) in lodf.outages().iter().enumerate() {
                    lodf_map.insert((branch.clone(), outage.clone()), lodf.get(e, k));
                }
            }
        }

        let by_branch = |values: &[f64]| -> BTreeMap<BranchId, f64> {
            branches.iter().cloned().zip(values.iter().copied()).collect()
        };

        SecurityCoefficients {
            ptdf_g,
            lodf: lodf_map,
            load_injection: by_branch(&self.load_injection),
            rate_a: by_branch(&self.rate_a),
            rate_c: by_branch(&self.rate_c),
            generators: self
                .generators
                .iter()
                .map(|g| (g.id.clone(), g.clone()))
                .collect(),
        }
    }
}

/// Coefficient tables of the security-constrained models keyed by element ids.
///
/// Pair-keyed tables serialize with `"branch,other"` string keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityCoefficients {
    #[serde(serialize_with = "serialize_pair_keys")]
    pub ptdf_g: BTreeMap<(BranchId, GenId), f64>,
    /// `(monitored, outaged)` line outage factors
    #[serde(serialize_with = "serialize_pair_keys")]
    pub lodf: BTreeMap<(BranchId, BranchId), f64>,
    pub load_injection: BTreeMap<BranchId, f64>,
    pub rate_a: BTreeMap<BranchId, f64>,
    pub rate_c: BTreeMap<BranchId, f64>,
    pub generators: BTreeMap<GenId, GeneratorData>,
}

pub(crate) fn serialize_pair_keys<S, A, B>(map: &BTreeMap<(A, B), f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    A: std::fmt::Display,
    B: std::fmt::Display,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for ((a, b), value) in map {
        out.serialize_entry(&format!("{a},{b}"), value)?;
    }
    out.end()
}
