use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::ring::state::Candidate;

/// Identifier and liveness assigned to one ring slot at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessSpec {
    pub id: u64,
    pub alive: bool,
}

impl ProcessSpec {
    pub fn live(id: u64) -> Self {
        Self { id, alive: true }
    }

    pub fn dead(id: u64) -> Self {
        Self { id, alive: false }
    }
}

/// One participant in the ring.
///
/// A dead process keeps its slot and channels but never reads them, so any
/// message sent to it stays in its inbox and is never forwarded.
#[derive(Debug)]
pub struct Process {
    pub id: u64,
    pub alive: bool,
    /// Slot index in the ring
    pub position: usize,
    /// Candidates written by the predecessor slot
    pub(crate) inbox: Mutex<mpsc::Receiver<Candidate>>,
    /// The successor slot's inbox
    pub(crate) outbound: mpsc::Sender<Candidate>,
    /// Leader announcements, read by this process's listener
    pub(crate) announce: Mutex<mpsc::Receiver<u64>>,
    pub(crate) announce_tx: mpsc::Sender<u64>,
}

impl Process {
    pub(crate) fn new(
        spec: ProcessSpec,
        position: usize,
        inbox: mpsc::Receiver<Candidate>,
        outbound: mpsc::Sender<Candidate>,
        announce: (mpsc::Sender<u64>, mpsc::Receiver<u64>),
    ) -> Self {
        let (announce_tx, announce_rx) = announce;
        Self {
            id: spec.id,
            alive: spec.alive,
            position,
            inbox: Mutex::new(inbox),
            outbound,
            announce: Mutex::new(announce_rx),
            announce_tx,
        }
    }

    pub fn spec(&self) -> ProcessSpec {
        ProcessSpec {
            id: self.id,
            alive: self.alive,
        }
    }
}
