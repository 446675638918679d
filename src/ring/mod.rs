//! Ring-based leader election.
//!
//! Processes sit in a fixed cycle and only ever talk to their successor.
//! An election circulates candidate identifiers around the cycle until the
//! highest live identifier comes back to its owner, which then becomes leader.
//!
//! # Components
//!
//! - [`Ring`]: the topology, built once from a list of [`ProcessSpec`]s
//! - [`ElectionGuard`]: shared atomic state (election running, current leader)
//! - [`Ring::start_election`]: the per-round state machine
//! - [`Ring::broadcast_leader`]: publishes the result
//! - [`Ring::listen_for_leader`]: watchdog that retriggers a stalled election

mod broadcast;
mod election;
pub mod guard;
mod listener;
pub mod process;
pub mod state;
pub mod topology;

pub use guard::ElectionGuard;
pub use process::{Process, ProcessSpec};
pub use state::{Candidate, ElectionOutcome, ListenOutcome};
pub use topology::Ring;
