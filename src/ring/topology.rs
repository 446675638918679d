use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{RingConfig, LINK_CAPACITY};
use crate::error::{Result, RingError};
use crate::ring::guard::{ElectionGuard, NO_LEADER};
use crate::ring::process::{Process, ProcessSpec};
use crate::ring::state::Candidate;

/// A fixed cycle of process slots.
///
/// Slot `i` sends to the inbox of slot `(i + 1) % len`, which yields exactly
/// one cycle covering every slot. Dead slots stay in the cycle; they simply
/// never drain their inbox.
///
/// Every election round runs under a child of the ring's halt token, so
/// [`Ring::halt`] stops whatever round is in flight and blocks new ones.
#[derive(Debug)]
pub struct Ring {
    config: RingConfig,
    processes: Vec<Process>,
    guard: ElectionGuard,
    halt: CancellationToken,
}

impl Ring {
    /// Build and wire the ring in slot order.
    ///
    /// # Errors
    ///
    /// - [`RingError::EmptyRing`] if `specs` is empty
    /// - [`RingError::ReservedId`] if an identifier collides with the no-leader sentinel
    /// - [`RingError::DuplicateId`] if two live processes share an identifier
    pub fn new(config: RingConfig, specs: Vec<ProcessSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(RingError::EmptyRing);
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.id == NO_LEADER {
                return Err(RingError::ReservedId(spec.id));
            }
            // Equality ends an election, so two live holders of one id would
            // both claim leadership.
            if spec.alive && !seen.insert(spec.id) {
                return Err(RingError::DuplicateId(spec.id));
            }
        }

        let len = specs.len();
        let (inbox_txs, inbox_rxs): (Vec<_>, Vec<_>) = (0..len)
            .map(|_| mpsc::channel::<Candidate>(LINK_CAPACITY))
            .unzip();

        let processes = specs
            .into_iter()
            .zip(inbox_rxs)
            .enumerate()
            .map(|(position, (spec, inbox))| {
                let outbound = inbox_txs[(position + 1) % len].clone();
                Process::new(
                    spec,
                    position,
                    inbox,
                    outbound,
                    mpsc::channel(LINK_CAPACITY),
                )
            })
            .collect();

        Ok(Self {
            config,
            processes,
            guard: ElectionGuard::new(),
            halt: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn guard(&self) -> &ElectionGuard {
        &self.guard
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub fn process(&self, position: usize) -> &Process {
        &self.processes[position]
    }

    /// Slot index that `position` forwards to
    pub fn successor(&self, position: usize) -> usize {
        (position + 1) % self.processes.len()
    }

    /// Position of the process holding `id`, preferring a live holder
    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.processes
            .iter()
            .find(|p| p.id == id && p.alive)
            .or_else(|| self.processes.iter().find(|p| p.id == id))
            .map(|p| p.position)
    }

    /// Position of the live process with the highest identifier
    pub fn highest_live(&self) -> Option<usize> {
        self.processes
            .iter()
            .filter(|p| p.alive)
            .max_by_key(|p| p.id)
            .map(|p| p.position)
    }

    pub fn live_count(&self) -> usize {
        self.processes.iter().filter(|p| p.alive).count()
    }

    pub fn leader_id(&self) -> Option<u64> {
        self.guard.leader_id()
    }

    /// Stop the ring for good.
    ///
    /// The running round, if any, is abandoned and releases the guard once
    /// its participants return. Listeners stop waiting, and later calls to
    /// `start_election` return [`ElectionOutcome::Halted`](crate::ring::ElectionOutcome::Halted).
    pub fn halt(&self) {
        if !self.halt.is_cancelled() {
            tracing::info!(processes = self.processes.len(), "Halting ring");
        }
        self.halt.cancel();
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_cancelled()
    }

    pub(crate) fn halt_token(&self) -> &CancellationToken {
        &self.halt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(ids: &[u64]) -> Vec<ProcessSpec> {
        ids.iter().copied().map(ProcessSpec::live).collect()
    }

    #[test]
    fn test_empty_ring_rejected() {
        let err = Ring::new(RingConfig::default(), Vec::new()).unwrap_err();
        assert_eq!(err, RingError::EmptyRing);
    }

    #[test]
    fn test_duplicate_live_ids_rejected() {
        let err = Ring::new(RingConfig::default(), specs(&[4, 9, 4])).unwrap_err();
        assert_eq!(err, RingError::DuplicateId(4));
    }

    #[test]
    fn test_duplicate_dead_id_allowed() {
        let ring = Ring::new(
            RingConfig::default(),
            vec![
                ProcessSpec::live(4),
                ProcessSpec::dead(4),
                ProcessSpec::live(9),
            ],
        )
        .unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.position_of(4), Some(0));
    }

    #[test]
    fn test_reserved_id_rejected() {
        let err = Ring::new(RingConfig::default(), specs(&[1, NO_LEADER])).unwrap_err();
        assert_eq!(err, RingError::ReservedId(NO_LEADER));
    }

    #[test]
    fn test_successor_forms_single_cycle() {
        let ring = Ring::new(RingConfig::default(), specs(&[42, 17, 83, 5, 60])).unwrap();

        let mut visited = vec![false; ring.len()];
        let mut pos = 0;
        for _ in 0..ring.len() {
            assert!(!visited[pos], "slot {} visited twice", pos);
            visited[pos] = true;
            pos = ring.successor(pos);
        }
        assert_eq!(pos, 0);
        assert!(visited.iter().all(|v| *v));
    }

    #[test]
    fn test_positions_follow_input_order() {
        let ring = Ring::new(RingConfig::default(), specs(&[42, 17, 83])).unwrap();
        for (i, p) in ring.processes().iter().enumerate() {
            assert_eq!(p.position, i);
        }
        assert_eq!(ring.position_of(83), Some(2));
        assert_eq!(ring.position_of(99), None);
    }

    #[test]
    fn test_highest_live_skips_dead() {
        let ring = Ring::new(
            RingConfig::default(),
            vec![
                ProcessSpec::live(42),
                ProcessSpec::dead(90),
                ProcessSpec::live(83),
            ],
        )
        .unwrap();
        assert_eq!(ring.highest_live(), Some(2));
        assert_eq!(ring.live_count(), 2);
    }

    #[test]
    fn test_all_dead_has_no_highest() {
        let ring = Ring::new(
            RingConfig::default(),
            vec![ProcessSpec::dead(1), ProcessSpec::dead(2)],
        )
        .unwrap();
        assert_eq!(ring.highest_live(), None);
        assert_eq!(ring.live_count(), 0);
    }

    #[tokio::test]
    async fn test_link_delivers_to_successor_inbox() {
        let ring = Ring::new(RingConfig::default(), specs(&[42, 17, 83])).unwrap();

        let candidate = Candidate { round: 1, id: 42 };
        ring.process(2).outbound.send(candidate).await.unwrap();

        let received = ring.process(0).inbox.lock().await.recv().await;
        assert_eq!(received, Some(candidate));
    }

    #[tokio::test]
    async fn test_link_capacity_is_one() {
        let ring = Ring::new(RingConfig::default(), specs(&[1, 2])).unwrap();
        let link = &ring.process(0).outbound;

        link.try_send(Candidate { round: 1, id: 1 }).unwrap();
        assert!(link.try_send(Candidate { round: 1, id: 1 }).is_err());
    }

    #[test]
    fn test_halt_is_sticky() {
        let ring = Ring::new(RingConfig::default(), specs(&[1, 2])).unwrap();
        assert!(!ring.is_halted());

        ring.halt();
        ring.halt();
        assert!(ring.is_halted());
        assert!(ring.halt_token().child_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_single_slot_ring_links_to_itself() {
        let ring = Ring::new(RingConfig::default(), specs(&[7])).unwrap();
        assert_eq!(ring.successor(0), 0);

        let candidate = Candidate { round: 1, id: 7 };
        ring.process(0).outbound.send(candidate).await.unwrap();
        let received = ring.process(0).inbox.lock().await.recv().await;
        assert_eq!(received, Some(candidate));
    }
}
