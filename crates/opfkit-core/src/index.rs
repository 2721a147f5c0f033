//! Dense indexing of a network snapshot.
//!
//! [`index_network`] assigns contiguous zero-based indices to buses, in-service
//! generators, in-service branches, loads and shunts in identifier order and
//! locates the unique reference bus. The result is an immutable
//! [`IndexedNetwork`]; matrix builders only ever see this type.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    Branch, BranchId, BusId, GenId, Generator, Load, LoadId, Network, OpfkitError, OpfkitResult,
    ShuntId,
};

/// Immutable network snapshot with dense index assignments.
#[derive(Debug, Clone)]
pub struct IndexedNetwork {
    network: Network,
    buses: Vec<BusId>,
    generators: Vec<GenId>,
    branches: Vec<BranchId>,
    loads: Vec<LoadId>,
    shunts: Vec<ShuntId>,
    bus_index: HashMap<BusId, usize>,
    gen_index: HashMap<GenId, usize>,
    branch_index: HashMap<BranchId, usize>,
    load_index: HashMap<LoadId, usize>,
    slack: usize,
    gen_bus: Vec<usize>,
    load_bus: Vec<usize>,
    branch_ends: Vec<(usize, usize)>,
}

/// Build the dense index for `network`.
///
/// Out-of-service generators and branches receive no index. Fails with
/// `Configuration` when the network does not have exactly one reference bus,
/// when an element refers to an unknown bus, or when an in-service branch has
/// `r = x = 0` (its susceptance would be infinite).
pub fn index_network(network: &Network) -> OpfkitResult<IndexedNetwork> {
    let buses: Vec<BusId> = network.buses.keys().cloned().collect();
    let bus_index: HashMap<BusId, usize> = buses
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect();

    let slacks: Vec<usize> = network
        .buses
        .values()
        .filter(|bus| bus.is_reference())
        .map(|bus| bus_index[&bus.id])
        .collect();
    let slack = match slacks.as_slice() {
        [only] => *only,
        _ => {
            return Err(OpfkitError::Configuration(format!(
                "the number of reference buses should be 1, found {}",
                slacks.len()
            )))
        }
    };

    let lookup_bus = |bus: &BusId, owner: String| -> OpfkitResult<usize> {
        bus_index.get(bus).copied().ok_or_else(|| {
            OpfkitError::Configuration(format!("{owner} refers to unknown bus '{bus}'"))
        })
    };

    let mut generators = Vec::new();
    let mut gen_bus = Vec::new();
    for gen in network.in_service_generators() {
        gen_bus.push(lookup_bus(&gen.bus, format!("generator {}", gen.id))?);
        generators.push(gen.id.clone());
    }

    let mut branches = Vec::new();
    let mut branch_ends = Vec::new();
    for branch in network.in_service_branches() {
        if branch.has_zero_impedance() {
            return Err(OpfkitError::Configuration(format!(
                "branch {} has zero series impedance (r = x = 0)",
                branch.id
            )));
        }
        let from = lookup_bus(&branch.from_bus, format!("branch {}", branch.id))?;
        let to = lookup_bus(&branch.to_bus, format!("branch {}", branch.id))?;
        branch_ends.push((from, to));
        branches.push(branch.id.clone());
    }

    let mut loads = Vec::new();
    let mut load_bus = Vec::new();
    for load in network.loads.values() {
        load_bus.push(lookup_bus(&load.bus, format!("load {}", load.id))?);
        loads.push(load.id.clone());
    }

    let mut shunts = Vec::new();
    for shunt in network.shunts.values() {
        lookup_bus(&shunt.bus, format!("shunt {}", shunt.id))?;
        shunts.push(shunt.id.clone());
    }

    debug!(
        buses = buses.len(),
        generators = generators.len(),
        branches = branches.len(),
        loads = loads.len(),
        slack = %buses[slack],
        "indexed network"
    );

    Ok(IndexedNetwork {
        network: network.clone(),
        gen_index: positions(&generators),
        branch_index: positions(&branches),
        load_index: positions(&loads),
        buses,
        generators,
        branches,
        loads,
        shunts,
        bus_index,
        slack,
        gen_bus,
        load_bus,
        branch_ends,
    })
}

fn positions<K: Clone + Eq + std::hash::Hash>(ids: &[K]) -> HashMap<K, usize> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect()
}

impl IndexedNetwork {
    /// The snapshot this index was built from.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Re-run indexing on the owned snapshot. Produces the same assignment.
    pub fn reindex(&self) -> OpfkitResult<IndexedNetwork> {
        index_network(&self.network)
    }

    pub fn num_buses(&self) -> usize {
        self.buses.len()
    }

    pub fn num_generators(&self) -> usize {
        self.generators.len()
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn num_loads(&self) -> usize {
        self.loads.len()
    }

    pub fn num_shunts(&self) -> usize {
        self.shunts.len()
    }

    /// Dense index of the reference bus.
    pub fn slack(&self) -> usize {
        self.slack
    }

    pub fn slack_id(&self) -> &BusId {
        &self.buses[self.slack]
    }

    pub fn bus_ids(&self) -> &[BusId] {
        &self.buses
    }

    pub fn generator_ids(&self) -> &[GenId] {
        &self.generators
    }

    pub fn branch_ids(&self) -> &[BranchId] {
        &self.branches
    }

    pub fn load_ids(&self) -> &[LoadId] {
        &self.loads
    }

    pub fn shunt_ids(&self) -> &[ShuntId] {
        &self.shunts
    }

    pub fn bus_index(&self, id: &BusId) -> Option<usize> {
        self.bus_index.get(id).copied()
    }

    pub fn gen_index(&self, id: &GenId) -> Option<usize> {
        self.gen_index.get(id).copied()
    }

    pub fn branch_index(&self, id: &BranchId) -> Option<usize> {
        self.branch_index.get(id).copied()
    }

    pub fn load_index(&self, id: &LoadId) -> Option<usize> {
        self.load_index.get(id).copied()
    }

    /// Like [`Self::branch_index`] but reports an unknown or out-of-service branch.
    pub fn require_branch(&self, id: &BranchId) -> OpfkitResult<usize> {
        self.branch_index(id)
            .ok_or_else(|| OpfkitError::unknown("in-service branch", id))
    }

    pub fn require_generator(&self, id: &GenId) -> OpfkitResult<usize> {
        self.gen_index(id)
            .ok_or_else(|| OpfkitError::unknown("in-service generator", id))
    }

    pub fn generator(&self, index: usize) -> &Generator {
        &self.network.generators[&self.generators[index]]
    }

    pub fn branch(&self, index: usize) -> &Branch {
        &self.network.branches[&self.branches[index]]
    }

    pub fn load(&self, index: usize) -> &Load {
        &self.network.loads[&self.loads[index]]
    }

    /// Bus index of generator `index`.
    pub fn gen_bus(&self, index: usize) -> usize {
        self.gen_bus[index]
    }

    pub fn load_bus(&self, index: usize) -> usize {
        self.load_bus[index]
    }

    /// `(from, to)` bus indices of branch `index`.
    pub fn branch_ends(&self, index: usize) -> (usize, usize) {
        self.branch_ends[index]
    }

    /// Active demand per load, in load index order.
    pub fn load_vector(&self) -> Vec<f64> {
        self.loads.iter().map(|id| self.network.loads[id].pd).collect()
    }

    /// Base-case dispatch per generator, in generator index order.
    pub fn dispatch_vector(&self) -> Vec<f64> {
        self.generators
            .iter()
            .map(|id| self.network.generators[id].pg)
            .collect()
    }

    pub fn total_demand(&self) -> f64 {
        self.load_vector().iter().sum()
    }
}

impl PartialEq for IndexedNetwork {
    /// Two indexes are equal when they assign the same ids to the same positions.
    fn eq(&self, other: &Self) -> bool {
        self.buses == other.buses
            && self.generators == other.generators
            && self.branches == other.branches
            && self.loads == other.loads
            && self.shunts == other.shunts
            && self.slack == other.slack
            && self.gen_bus == other.gen_bus
            && self.load_bus == other.load_bus
            && self.branch_ends == other.branch_ends
    }
}
