//! Topology checks on the in-service branch graph.
//!
//! The grounded susceptance system is only non-singular when every bus can reach
//! the reference bus. These helpers find islands and bridge branches on an
//! undirected `petgraph` view of the network so that problems surface as
//! [`OpfkitError::SingularSystem`] before any factorization runs.

use std::collections::{BTreeMap, HashSet, VecDeque};

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

use crate::{BranchId, BusId, Network, OpfkitError, OpfkitResult};

/// Undirected bus graph with one edge per in-service branch.
#[derive(Debug, Clone)]
pub struct Topology {
    pub graph: UnGraph<BusId, BranchId>,
    pub nodes: BTreeMap<BusId, NodeIndex>,
}

impl Topology {
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }
}

/// Build the branch graph. Branches with unknown endpoints are skipped here;
/// `Network::validate_into` and indexing report them.
pub fn build_topology(network: &Network) -> Topology {
    let mut graph = UnGraph::with_capacity(network.buses.len(), network.branches.len());
    let mut nodes = BTreeMap::new();
    for id in network.buses.keys() {
        nodes.insert(id.clone(), graph.add_node(id.clone()));
    }
    for branch in network.in_service_branches() {
        if let (Some(&a), Some(&b)) = (nodes.get(&branch.from_bus), nodes.get(&branch.to_bus)) {
            graph.add_edge(a, b, branch.id.clone());
        }
    }
    Topology { graph, nodes }
}

/// One connected component of the bus graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Island {
    pub island_id: usize,
    pub buses: Vec<BusId>,
    pub contains_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IslandAnalysis {
    pub islands: Vec<Island>,
}

impl IslandAnalysis {
    pub fn count(&self) -> usize {
        self.islands.len()
    }

    pub fn is_connected(&self) -> bool {
        self.islands.len() <= 1
    }

    /// Buses that cannot reach a reference bus.
    pub fn unreachable_buses(&self) -> Vec<&BusId> {
        self.islands
            .iter()
            .filter(|island| !island.contains_reference)
            .flat_map(|island| island.buses.iter())
            .collect()
    }
}

/// Label connected components by breadth-first search, starting from buses in id order.
pub fn find_islands(network: &Network) -> IslandAnalysis {
    let topology = build_topology(network);
    let graph = &topology.graph;
    let mut visited = HashSet::new();
    let mut islands = Vec::new();

    for &start in topology.nodes.values() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(graph[node].clone());
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();
        let contains_reference = members
            .iter()
            .any(|id| network.buses.get(id).is_some_and(|bus| bus.is_reference()));
        islands.push(Island {
            island_id: islands.len(),
            buses: members,
            contains_reference,
        });
    }

    IslandAnalysis { islands }
}

/// Fail with `SingularSystem` unless all buses form a single island.
pub fn ensure_connected(network: &Network) -> OpfkitResult<()> {
    let analysis = find_islands(network);
    if analysis.is_connected() {
        return Ok(());
    }
    let stranded: Vec<String> = analysis
        .unreachable_buses()
        .iter()
        .take(8)
        .map(|id| id.to_string())
        .collect();
    Err(OpfkitError::SingularSystem {
        islands: analysis.count(),
        detail: format!(
            "buses unreachable from the reference bus: {}",
            stranded.join(", ")
        ),
    })
}

/// In-service branches whose removal increases the number of connected components.
///
/// Parallel circuits between the same pair of buses are never bridges.
pub fn bridge_branches(network: &Network) -> Vec<BranchId> {
    let topology = build_topology(network);
    let base = topology.component_count();
    let mut bridges = Vec::new();
    for edge in topology.graph.edge_indices() {
        let mut reduced = topology.graph.clone();
        let id = reduced.remove_edge(edge);
        if connected_components(&reduced) > base {
            if let Some(id) = id {
                bridges.push(id);
            }
        }
    }
    bridges.sort();
    bridges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Branch, Bus, BusType};

    /// Triangle 1-2-3 with a radial spur 3-4.
    fn triangle_with_spur() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus::new("1", BusType::Reference));
        for id in ["2", "3", "4"] {
            network.add_bus(Bus::new(id, BusType::Pq));
        }
        network.add_branch(Branch::new("a", "1", "2", 0.0, 0.1));
        network.add_branch(Branch::new("b", "2", "3", 0.0, 0.1));
        network.add_branch(Branch::new("c", "1", "3", 0.0, 0.1));
        network.add_branch(Branch::new("d", "3", "4", 0.0, 0.1));
        network
    }

    #[test]
    fn test_connected_network_has_one_island() {
        let network = triangle_with_spur();
        let analysis = find_islands(&network);
        assert_eq!(analysis.count(), 1);
        assert!(analysis.islands[0].contains_reference);
        assert!(ensure_connected(&network).is_ok());
    }

    #[test]
    fn test_out_of_service_branch_creates_island() {
        let mut network = triangle_with_spur();
        network.branches.get_mut(&BranchId::new("d")).unwrap().in_service = false;

        let analysis = find_islands(&network);
        assert_eq!(analysis.count(), 2);
        assert_eq!(analysis.unreachable_buses(), vec![&BusId::new("4")]);

        let err = ensure_connected(&network).unwrap_err();
        assert!(matches!(err, OpfkitError::SingularSystem { islands: 2, .. }));
    }

    #[test]
    fn test_bridge_detection() {
        let network = triangle_with_spur();
        assert_eq!(bridge_branches(&network), vec![BranchId::new("d")]);
    }

    #[test]
    fn test_parallel_circuit_is_not_a_bridge() {
        let mut network = triangle_with_spur();
        network.add_branch(Branch::new("e", "3", "4", 0.0, 0.2));
        assert!(bridge_branches(&network).is_empty());
    }
}
