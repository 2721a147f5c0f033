#![allow(dead_code)]

use opfkit_core::{index_network, Branch, Bus, BusType, Generator, IndexedNetwork, Load, Network};

/// PJM 5-bus case (pglib_opf_case5_pjm) in per-unit on 100 MVA.
///
/// Linear costs are scaled to $/p.u.h.
pub fn case5() -> Network {
    let mut network = Network::new().with_base_mva(100.0);
    network.add_bus(Bus::new("1", BusType::Pv));
    network.add_bus(Bus::new("2", BusType::Pq));
    network.add_bus(Bus::new("3", BusType::Pv));
    network.add_bus(Bus::new("4", BusType::Reference));
    network.add_bus(Bus::new("5", BusType::Pv));

    let gens = [
        ("1", "1", 0.4, 1400.0),
        ("2", "1", 1.7, 1500.0),
        ("3", "3", 5.2, 3000.0),
        ("4", "4", 2.0, 4000.0),
        ("5", "5", 6.0, 1000.0),
    ];
    for (id, bus, pmax, c1) in gens {
        network.add_generator(
            Generator::new(id, bus)
                .with_p_limits(0.0, pmax)
                .with_cost(0.0, c1, 0.0),
        );
    }

    let branches = [
        ("1", "1", "2", 0.00281, 0.0281, 4.0),
        ("2", "1", "4", 0.00304, 0.0304, 4.26),
        ("3", "1", "5", 0.00064, 0.0064, 4.26),
        ("4", "2", "3", 0.00108, 0.0108, 4.26),
        ("5", "3", "4", 0.00297, 0.0297, 4.26),
        ("6", "4", "5", 0.00297, 0.0297, 2.4),
    ];
    for (id, from, to, r, x, rate) in branches {
        network.add_branch(Branch::new(id, from, to, r, x).with_ratings(rate, rate));
    }

    network.add_load(Load::new("1", "2", 3.0));
    network.add_load(Load::new("2", "3", 3.0));
    network.add_load(Load::new("3", "4", 4.0));
    network
}

pub fn case5_indexed() -> IndexedNetwork {
    index_network(&case5()).expect("case5 indexes")
}

/// Triangle 1-2-3 (equal reactances), one unit per bus, 1.2 p.u. of load at bus 3.
///
/// Branch "13" has rate A 1.0 and rate C 1.1; the others are loose.
pub fn triangle() -> Network {
    let mut network = Network::new();
    network.add_bus(Bus::new("1", BusType::Reference));
    network.add_bus(Bus::new("2", BusType::Pv));
    network.add_bus(Bus::new("3", BusType::Pv));
    network.add_branch(Branch::new("12", "1", "2", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_branch(Branch::new("13", "1", "3", 0.0, 0.1).with_ratings(1.0, 1.1));
    network.add_branch(Branch::new("23", "2", "3", 0.0, 0.1).with_ratings(5.0, 5.0));
    network.add_generator(Generator::new("a", "1").with_p_limits(0.0, 1.0).with_cost(0.0, 10.0, 0.0));
    network.add_generator(Generator::new("b", "2").with_p_limits(0.0, 1.0).with_cost(0.0, 20.0, 0.0));
    network.add_generator(Generator::new("c", "3").with_p_limits(0.0, 1.0).with_cost(0.0, 30.0, 0.0));
    network.add_load(Load::new("1", "3", 1.2));
    network
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tolerance {tol})"
    );
}
