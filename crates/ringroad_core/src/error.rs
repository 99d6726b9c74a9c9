//! Error taxonomy for the simulation engine.
//!
//! Every error is detected at the boundary closest to its cause: domain
//! validation before any distribution, allocation at partition construction,
//! communication at the blocking receive that observed the failure. There is
//! no partial-failure mode; a failed exchange or reduction aborts the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A partition was constructed with the wrong number of cells.
    #[error("partition expects {expected} cells, got {got}")]
    InvalidSize { expected: usize, got: usize },

    /// The cell count cannot be split into equal contiguous partitions.
    #[error("{cells} cells not divisible by {partitions} partitions")]
    IndivisibleDomain { cells: usize, partitions: usize },

    /// A partition buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes for partition buffers")]
    ResourceExhaustion { bytes: usize },

    /// A halo exchange or reduction round did not complete.
    #[error("rank {rank}: {context}")]
    Communication { rank: usize, context: String },
}

impl SimError {
    pub(crate) fn comm(rank: usize, context: impl Into<String>) -> Self {
        SimError::Communication {
            rank,
            context: context.into(),
        }
    }
}
