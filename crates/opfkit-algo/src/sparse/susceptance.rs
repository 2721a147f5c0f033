//! Incidence and susceptance matrices for the linearized (DC) network.
//!
//! With branch susceptance `b(e) = -x / (r² + x²)`:
//!
//! ```text
//! S_br (E×B):  S_br[e, from(e)] = +b(e),  S_br[e, to(e)] = -b(e)
//! S_b  (B×B):  S_b[i,i] = Σ b(e) over branches at i,  S_b[i,j] = -Σ b(e) between i and j
//! I_g  (B×G):  1 at (bus(g), g)
//! I_l  (B×L):  1 at (bus(l), l)
//! Φ    (B×E):  +1 at (from(e), e), -1 at (to(e), e)
//! ```
//!
//! `S_b` built from Kirchhoff's law is singular (its rows sum to zero). The
//! grounded variant zeroes the slack row and column and puts 1 on the slack
//! diagonal, which fixes the slack angle and makes the system solvable for a
//! connected network. All builders read an [`IndexedNetwork`], so rows and
//! columns follow its dense index order and out-of-service elements are absent.

use opfkit_core::IndexedNetwork;
use sprs::{CsMat, TriMat};

/// `E×B` branch susceptance matrix mapping bus angles to branch flows.
pub fn branch_susceptance_matrix(indexed: &IndexedNetwork) -> CsMat<f64> {
    let mut triplets = TriMat::new((indexed.num_branches(), indexed.num_buses()));
    for e in 0..indexed.num_branches() {
        let (from, to) = indexed.branch_ends(e);
        let b = indexed.branch(e).susceptance();
        triplets.add_triplet(e, from, b);
        triplets.add_triplet(e, to, -b);
    }
    triplets.to_csr()
}

/// `B×B` nodal susceptance matrix.
///
/// With `ground = Some(slack)` the slack row and column are zeroed and the slack
/// diagonal entry is set to 1. Parallel branches accumulate.
pub fn bus_susceptance_matrix(indexed: &IndexedNetwork, ground: Option<usize>) -> CsMat<f64> {
    let n = indexed.num_buses();
    let mut triplets = TriMat::new((n, n));
    for e in 0..indexed.num_branches() {
        let (from, to) = indexed.branch_ends(e);
        let b = indexed.branch(e).susceptance();
        let entries = [(from, to, -b), (to, from, -b), (from, from, b), (to, to, b)];
        for (i, j, v) in entries {
            if ground.is_some_and(|s| i == s || j == s) {
                continue;
            }
            triplets.add_triplet(i, j, v);
        }
    }
    if let Some(slack) = ground {
        triplets.add_triplet(slack, slack, 1.0);
    }
    triplets.to_csr()
}

/// Bus susceptance matrix grounded at the network's reference bus.
pub fn grounded_bus_susceptance_matrix(indexed: &IndexedNetwork) -> CsMat<f64> {
    bus_susceptance_matrix(indexed, Some(indexed.slack()))
}

/// `B×G` 0/1 matrix mapping each in-service generator to its bus.
pub fn generator_incidence_matrix(indexed: &IndexedNetwork) -> CsMat<f64> {
    let mut triplets = TriMat::new((indexed.num_buses(), indexed.num_generators()));
    for g in 0..indexed.num_generators() {
        triplets.add_triplet(indexed.gen_bus(g), g, 1.0);
    }
    triplets.to_csr()
}

/// `B×L` 0/1 matrix mapping each load to its bus.
pub fn load_incidence_matrix(indexed: &IndexedNetwork) -> CsMat<f64> {
    let mut triplets = TriMat::new((indexed.num_buses(), indexed.num_loads()));
    for l in 0..indexed.num_loads() {
        triplets.add_triplet(indexed.load_bus(l), l, 1.0);
    }
    triplets.to_csr()
}

/// `B×E` signed incidence: +1 at the from-bus, -1 at the to-bus of each branch.
pub fn line_incidence_matrix(indexed: &IndexedNetwork) -> CsMat<f64> {
    let all: Vec<usize> = (0..indexed.num_branches()).collect();
    line_incidence_columns(indexed, &all)
}

/// Columns `branches` of [`line_incidence_matrix`], in the given order.
pub fn line_incidence_columns(indexed: &IndexedNetwork, branches: &[usize]) -> CsMat<f64> {
    let mut triplets = TriMat::new((indexed.num_buses(), branches.len()));
    for (col, &e) in branches.iter().enumerate() {
        let (from, to) = indexed.branch_ends(e);
        triplets.add_triplet(from, col, 1.0);
        triplets.add_triplet(to, col, -1.0);
    }
    triplets.to_csr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfkit_core::{index_network, Branch, Bus, BusType, Generator, Load, Network};

    /// Triangle network: 1 (slack) - 2 - 3 - 1, all x = 0.1, r = 0.
    fn triangle() -> IndexedNetwork {
        let mut network = Network::new();
        network.add_bus(Bus::new("1", BusType::Reference));
        network.add_bus(Bus::new("2", BusType::Pv));
        network.add_bus(Bus::new("3", BusType::Pq));
        network.add_branch(Branch::new("1", "1", "2", 0.0, 0.1));
        network.add_branch(Branch::new("2", "2", "3", 0.0, 0.1));
        network.add_branch(Branch::new("3", "1", "3", 0.0, 0.1));
        network.add_generator(Generator::new("1", "1").with_p_limits(0.0, 1.0));
        network.add_generator(Generator::new("2", "2").with_p_limits(0.0, 1.0));
        network.add_load(Load::new("1", "3", 0.5));
        index_network(&network).unwrap()
    }

    fn entry(m: &CsMat<f64>, i: usize, j: usize) -> f64 {
        m.get(i, j).copied().unwrap_or(0.0)
    }

    #[test]
    fn test_branch_susceptance_rows() {
        let s_br = branch_susceptance_matrix(&triangle());
        assert_eq!(s_br.shape(), (3, 3));
        // b = -x/(r²+x²) = -10
        assert!((entry(&s_br, 0, 0) + 10.0).abs() < 1e-12);
        assert!((entry(&s_br, 0, 1) - 10.0).abs() < 1e-12);
        assert_eq!(entry(&s_br, 0, 2), 0.0);
        for row in s_br.outer_iterator() {
            let sum: f64 = row.iter().map(|(_, &v)| v).sum();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn test_bus_susceptance_symmetric_with_zero_row_sums() {
        let s_b = bus_susceptance_matrix(&triangle(), None);
        assert_eq!(s_b.shape(), (3, 3));
        for i in 0..3 {
            for j in 0..3 {
                assert!((entry(&s_b, i, j) - entry(&s_b, j, i)).abs() < 1e-12);
            }
            let sum: f64 = (0..3).map(|j| entry(&s_b, i, j)).sum();
            assert!(sum.abs() < 1e-12, "row {i} sums to {sum}");
        }
        assert!((entry(&s_b, 0, 0) + 20.0).abs() < 1e-12);
        assert!((entry(&s_b, 0, 1) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_grounding_zeroes_slack_row_and_column() {
        let indexed = triangle();
        let s_b = grounded_bus_susceptance_matrix(&indexed);
        let slack = indexed.slack();
        for k in 0..3 {
            if k != slack {
                assert_eq!(entry(&s_b, slack, k), 0.0);
                assert_eq!(entry(&s_b, k, slack), 0.0);
            }
        }
        assert_eq!(entry(&s_b, slack, slack), 1.0);
        assert!((entry(&s_b, 1, 1) + 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_branches_accumulate() {
        let mut network = triangle().network().clone();
        network.add_branch(Branch::new("4", "1", "2", 0.0, 0.1));
        let indexed = index_network(&network).unwrap();
        let s_b = bus_susceptance_matrix(&indexed, None);
        assert!((entry(&s_b, 0, 1) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_incidence_matrices() {
        let indexed = triangle();
        let i_g = generator_incidence_matrix(&indexed);
        assert_eq!(i_g.shape(), (3, 2));
        assert_eq!(entry(&i_g, 0, 0), 1.0);
        assert_eq!(entry(&i_g, 1, 1), 1.0);
        assert_eq!(i_g.nnz(), 2);

        let i_l = load_incidence_matrix(&indexed);
        assert_eq!(i_l.shape(), (3, 1));
        assert_eq!(entry(&i_l, 2, 0), 1.0);

        let phi = line_incidence_matrix(&indexed);
        assert_eq!(phi.shape(), (3, 3));
        // branch "3" runs 1 -> 3
        assert_eq!(entry(&phi, 0, 2), 1.0);
        assert_eq!(entry(&phi, 2, 2), -1.0);
        for e in 0..3 {
            let col: f64 = (0..3).map(|b| entry(&phi, b, e)).sum();
            assert_eq!(col, 0.0);
        }

        let picked = line_incidence_columns(&indexed, &[2, 0]);
        assert_eq!(picked.shape(), (3, 2));
        assert_eq!(entry(&picked, 0, 0), 1.0);
        assert_eq!(entry(&picked, 2, 0), -1.0);
        assert_eq!(entry(&picked, 1, 1), -1.0);
    }
}
