//! Simulation driver: distribute, run in lockstep, collect.
//!
//! The calling thread plays the coordinator: it owns the full road during the
//! distributing and collecting phases and the cumulative move counter during
//! the run; worker threads own exactly one partition each and communicate
//! only through halo links and reduction rounds. `run_reference` is the
//! single-partition oracle every multi-partition run is tested against.

use std::thread;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{reduce_channels, reduce_sum, ReduceHandle};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::halo::HaloLinks;
use crate::partition::PartitionState;
use crate::rule::{Cell, OCCUPIED};

/// Final metrics, reported by the coordinator once the run is done.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub cumulative_moves: u64,
    pub total_occupied: u64,
    pub elapsed_secs: f64,
    pub average_velocity: f64,
}

impl SimReport {
    fn zero() -> Self {
        Self {
            cumulative_moves: 0,
            total_occupied: 0,
            elapsed_secs: 0.0,
            average_velocity: 0.0,
        }
    }

    /// The one-line stdout contract: `"<moves>, <elapsed>, <velocity>"`.
    /// An empty road short-circuits to the literal `0, 0.0, 0.0`.
    pub fn summary_line(&self) -> String {
        if self.total_occupied == 0 {
            "0, 0.0, 0.0".to_string()
        } else {
            format!(
                "{}, {:.6}, {:.6}",
                self.cumulative_moves, self.elapsed_secs, self.average_velocity
            )
        }
    }
}

/// A finished run: the report plus the collected final road, in cell order.
#[derive(Debug)]
pub struct SimRun {
    pub report: SimReport,
    pub road: Vec<Cell>,
}

/// Seeded uniform 0/1 fill; identical seeds give identical roads, which is
/// what makes runs reproducible across partition counts.
pub fn generate_road(config: &SimConfig) -> Vec<Cell> {
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    (0..config.cells).map(|_| rng.gen_range(0..=1u8)).collect()
}

fn velocity(moves: u64, iterations: u64, occupied: u64) -> f64 {
    moves as f64 / (iterations as f64 * occupied as f64)
}

/// Single-partition reference path. Same rule, same partition state, same
/// reduction identity; only the halo exchange is replaced by the periodic
/// self-wrap, re-derived from the current buffer at the top of every step
/// (the swap leaves the new buffer's ghost slots stale).
pub fn run_reference(config: &SimConfig) -> Result<SimRun, SimError> {
    let single = SimConfig {
        partitions: 1,
        ..config.clone()
    };
    single.validate()?;

    let road = generate_road(&single);
    let total_occupied = reduce_sum([road.iter().filter(|&&c| c == OCCUPIED).count() as u64]);
    if total_occupied == 0 {
        info!("empty road, skipping the iteration loop");
        return Ok(SimRun {
            report: SimReport::zero(),
            road,
        });
    }

    let mut part = PartitionState::new(single.cells, road)?;
    let start = Instant::now();
    let mut cumulative = 0u64;
    for _ in 0..single.iterations {
        part.set_ghosts(part.last(), part.first());
        cumulative += reduce_sum([part.step()]);
    }
    let elapsed = start.elapsed().as_secs_f64();

    Ok(SimRun {
        report: SimReport {
            cumulative_moves: cumulative,
            total_occupied,
            elapsed_secs: elapsed,
            average_velocity: velocity(cumulative, single.iterations, total_occupied),
        },
        road: part.into_cells(),
    })
}

/// One worker: initial occupied-count reduction, then `iterations` rounds of
/// exchange, step, move-count reduction, in strict lockstep with its peers.
fn worker_loop(
    mut part: PartitionState,
    links: HaloLinks,
    reducer: ReduceHandle,
    iterations: u64,
) -> Result<Vec<Cell>, SimError> {
    let total_occupied = reducer.allreduce(part.occupied())?;
    if total_occupied == 0 {
        return Ok(part.into_cells());
    }
    for _ in 0..iterations {
        links.exchange(&mut part)?;
        let moves = part.step();
        reducer.allreduce(moves)?;
    }
    Ok(part.into_cells())
}

/// Runs the full distributed simulation.
///
/// Phases: validate and generate (Distributing), spawn one worker per rank
/// and drive `iterations` reduction rounds (Running), then join workers and
/// reassemble the final road in rank order (Collecting).
pub fn run(config: &SimConfig) -> Result<SimRun, SimError> {
    config.validate()?;

    let road = generate_road(config);
    let local_n = config.local_cells();
    info!(
        cells = config.cells,
        partitions = config.partitions,
        seed = config.seed,
        "distributing road"
    );

    // Scatter: partition construction takes ownership of each contiguous
    // chunk, and checks its allocation before any thread starts.
    let mut parts = Vec::with_capacity(config.partitions);
    for chunk in road.chunks_exact(local_n) {
        parts.push(PartitionState::new(local_n, chunk.to_vec())?);
    }

    let links = HaloLinks::ring(config.partitions, config.timeout());
    let (hub, reducers) = reduce_channels(config.partitions, config.timeout());

    thread::scope(|s| {
        let iterations = config.iterations;
        let joins: Vec<_> = parts
            .drain(..)
            .zip(links)
            .zip(reducers)
            .map(|((part, link), reducer)| {
                s.spawn(move || worker_loop(part, link, reducer, iterations))
            })
            .collect();

        let coordinate = || -> Result<SimReport, SimError> {
            let total_occupied = hub.round()?;
            if total_occupied == 0 {
                info!("empty road, skipping the iteration loop");
                return Ok(SimReport::zero());
            }

            let start = Instant::now();
            let mut cumulative = 0u64;
            for iter in 0..iterations {
                let moves = hub.round()?;
                cumulative += moves;
                debug!(iter, moves, cumulative, "iteration complete");
            }
            let elapsed = start.elapsed().as_secs_f64();
            Ok(SimReport {
                cumulative_moves: cumulative,
                total_occupied,
                elapsed_secs: elapsed,
                average_velocity: velocity(cumulative, iterations, total_occupied),
            })
        };
        let outcome = coordinate();
        // Dropping the hub disconnects any worker still blocked on a
        // broadcast, so joins below cannot hang.
        drop(hub);

        let mut collected = Vec::with_capacity(config.cells);
        let mut worker_err = None;
        for join in joins {
            match join.join() {
                Ok(Ok(cells)) => collected.extend(cells),
                Ok(Err(e)) => worker_err = Some(e),
                Err(_) => worker_err = Some(SimError::comm(0, "a worker panicked")),
            }
        }

        let report = match (outcome, worker_err) {
            // A worker's own error names the failing rank; prefer it over
            // the coordinator's view of the same failure.
            (_, Some(e)) => return Err(e),
            (Err(e), None) => return Err(e),
            (Ok(report), None) => report,
        };
        info!(
            moves = report.cumulative_moves,
            occupied = report.total_occupied,
            velocity = report.average_velocity,
            "run complete"
        );
        Ok(SimRun {
            report,
            road: collected,
        })
    })
}
