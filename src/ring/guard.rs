use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

use crate::ring::state::ElectionOutcome;

/// Sentinel stored in the leader slot while no leader is known.
pub const NO_LEADER: u64 = u64::MAX;

/// Process-wide election state shared by every ring member.
///
/// # Invariants
///
/// - `running` goes false -> true only through [`ElectionGuard::try_claim`],
///   so when several processes race exactly one claim succeeds.
/// - `running` returns to false once per claimed attempt, after that attempt
///   converges or is abandoned and every one of its participants has stopped.
/// - `leader` changes only when an election converges.
///
/// No lock is involved: the two shared scalars are accessed with
/// compare-and-set, load and store only.
#[derive(Debug)]
pub struct ElectionGuard {
    running: AtomicBool,
    leader: AtomicU64,
    rounds: AtomicU64,
}

impl ElectionGuard {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            leader: AtomicU64::new(NO_LEADER),
            rounds: AtomicU64::new(0),
        }
    }

    /// Claim exclusive right to run an election.
    ///
    /// Returns the round number of the new attempt, or `None` if another
    /// election is already in flight.
    pub fn try_claim(&self) -> Option<u64> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(self.rounds.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn release(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn leader_id(&self) -> Option<u64> {
        match self.leader.load(Ordering::Acquire) {
            NO_LEADER => None,
            id => Some(id),
        }
    }

    pub fn set_leader(&self, id: u64) {
        self.leader.store(id, Ordering::Release);
    }

    /// Number of election attempts that successfully claimed the guard
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Acquire)
    }
}

impl Default for ElectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Bookkeeping for one claimed election attempt.
///
/// Several participants may detect a timeout at once; only the first call to
/// [`ElectionRound::settle`] wins. The token is a child of the ring's halt
/// token, so halting the ring stops every participant of the round.
#[derive(Debug)]
pub(crate) struct ElectionRound {
    number: u64,
    token: CancellationToken,
    resolution: OnceLock<Option<u64>>,
}

impl ElectionRound {
    pub(crate) fn new(number: u64, token: CancellationToken) -> Self {
        Self {
            number,
            token,
            resolution: OnceLock::new(),
        }
    }

    pub(crate) fn number(&self) -> u64 {
        self.number
    }

    /// Record how the round ended. Returns false if it was already settled.
    pub(crate) fn settle(&self, leader: Option<u64>) -> bool {
        self.resolution.set(leader).is_ok()
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.resolution.get().is_some()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn outcome(&self) -> ElectionOutcome {
        match self.resolution.get() {
            Some(Some(id)) => ElectionOutcome::Elected(*id),
            _ => ElectionOutcome::Abandoned,
        }
    }
}
