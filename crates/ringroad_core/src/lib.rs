//! ringroad_core: a domain-decomposed ring-topology traffic cellular
//! automaton.
//!
//! A periodic array of binary cells advances under a Rule-184-style local
//! rule. The road is split into equal contiguous partitions, one worker
//! thread each; every step the workers refresh their ghost cells from their
//! ring neighbors (halo exchange), apply the rule over a double-buffered
//! local slice, and contribute their move count to a global reduction whose
//! broadcast keeps the whole group in lockstep. A single-partition reference
//! path produces bit-identical aggregate results and serves as the
//! correctness oracle for every partition count.

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod error;
pub mod halo;
pub mod partition;
pub mod rule;

pub use config::SimConfig;
pub use driver::{run, run_reference, SimReport, SimRun};
pub use error::SimError;
pub use rule::{Cell, EMPTY, OCCUPIED};
