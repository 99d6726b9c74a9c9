//! End-to-end correctness properties of the distributed automaton.
//!
//! The core property: for a fixed seed, cell count and iteration count, the
//! aggregate results must not depend on how the ring is partitioned. The
//! single-partition reference path is the oracle every multi-partition run
//! is compared against.

use ringroad_core::driver::{generate_road, run, run_reference};
use ringroad_core::{SimConfig, SimError};

fn config(cells: usize, iterations: u64, partitions: usize, seed: u64) -> SimConfig {
    let mut cfg = SimConfig::new(cells, iterations, partitions, seed);
    cfg.timeout_ms = 5_000;
    cfg
}

/// Partition-count invariance: P = 1, 2, 4 and N all reproduce the oracle's
/// move count, velocity and final road bit-for-bit.
#[test]
fn partition_count_invariance() {
    let cells = 64;
    let iterations = 25;
    let seed = 0xBEEF;

    let oracle = run_reference(&config(cells, iterations, 1, seed)).unwrap();
    assert!(oracle.report.total_occupied > 0, "seed produced an empty road");

    for partitions in [1, 2, 4, cells] {
        let parallel = run(&config(cells, iterations, partitions, seed)).unwrap();
        assert_eq!(
            parallel.report.cumulative_moves, oracle.report.cumulative_moves,
            "move count diverged for P={partitions}"
        );
        assert_eq!(
            parallel.report.average_velocity, oracle.report.average_velocity,
            "velocity diverged for P={partitions}"
        );
        assert_eq!(
            parallel.road, oracle.road,
            "final road diverged for P={partitions}"
        );
    }
}

/// Identical parameters give identical results across repeated runs.
#[test]
fn repeated_runs_are_deterministic() {
    let cfg = config(32, 10, 4, 7);
    let first = run(&cfg).unwrap();
    let second = run(&cfg).unwrap();
    assert_eq!(first.report.cumulative_moves, second.report.cumulative_moves);
    assert_eq!(
        first.report.average_velocity,
        second.report.average_velocity
    );
    assert_eq!(first.road, second.road);
}

/// The cumulative move count never decreases as the iteration count grows.
#[test]
fn cumulative_moves_are_monotone() {
    let mut previous = 0u64;
    for iterations in [1, 2, 5, 10, 20] {
        let run = run_reference(&config(48, iterations, 1, 3)).unwrap();
        assert!(
            run.report.cumulative_moves >= previous,
            "moves decreased between iteration counts"
        );
        previous = run.report.cumulative_moves;
    }
}

/// A completely occupied road keeps every car blocked: zero moves on every
/// step and the road never changes.
#[test]
fn fully_occupied_road_never_moves() {
    use ringroad_core::partition::PartitionState;
    let mut part = PartitionState::new(6, vec![1; 6]).unwrap();
    for _ in 0..4 {
        part.set_ghosts(part.last(), part.first());
        assert_eq!(part.step(), 0);
    }
    assert_eq!(part.cells(), &[1; 6]);
}

/// Zero-occupancy short-circuit: the summary is the literal `0, 0.0, 0.0`
/// regardless of N, iterations and P.
#[test]
fn zero_occupancy_short_circuits() {
    // An empty 8-cell road shows up once every 256 seeds on average, so a
    // bounded hunt finds one quickly and keeps the test deterministic.
    let mut empty_seed = None;
    for seed in 0..20_000u64 {
        let cfg = config(8, 3, 2, seed);
        if generate_road(&cfg).iter().all(|&c| c == 0) {
            empty_seed = Some(seed);
            break;
        }
    }
    let seed = empty_seed.expect("no seed in range produces an empty 8-cell road");

    for partitions in [1, 2, 4] {
        let cfg = config(8, 3, partitions, seed);
        let run = run(&cfg).unwrap();
        assert_eq!(run.report.summary_line(), "0, 0.0, 0.0");
        assert_eq!(run.report.cumulative_moves, 0);
    }
    let reference = run_reference(&config(8, 3, 1, seed)).unwrap();
    assert_eq!(reference.report.summary_line(), "0, 0.0, 0.0");
}

/// The worked boundary scenario: N=4, road [1,0,1,0], one iteration. Both
/// cars have an empty cell ahead, so moves=2 and the average velocity is
/// 2 / (1 * 2) = 1.0.
#[test]
fn hand_computed_boundary_scenario() {
    use ringroad_core::partition::PartitionState;

    let mut part = PartitionState::new(4, vec![1, 0, 1, 0]).unwrap();
    part.set_ghosts(part.last(), part.first());
    let moves = part.step();
    let total_occupied = 2u64;

    assert_eq!(moves, 2);
    assert_eq!(part.cells(), &[0, 1, 0, 1]);
    let velocity = moves as f64 / (1.0 * total_occupied as f64);
    assert_eq!(velocity, 1.0);
}

/// Divisibility is checked before anything is distributed.
#[test]
fn indivisible_domain_is_fatal() {
    let err = run(&config(9, 1, 2, 0)).unwrap_err();
    assert!(matches!(
        err,
        SimError::IndivisibleDomain {
            cells: 9,
            partitions: 2
        }
    ));
}
