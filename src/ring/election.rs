use std::cmp::Ordering;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::ring::guard::ElectionRound;
use crate::ring::state::{Candidate, ElectionOutcome};
use crate::ring::Ring;

impl Ring {
    /// Run one Chang-Roberts election initiated by the process at `position`.
    ///
    /// Returns immediately with [`ElectionOutcome::Ineligible`] if the
    /// initiator is dead, or [`ElectionOutcome::AlreadyRunning`] if another
    /// election holds the guard. Otherwise the initiator sends its own id to
    /// its successor and every live process relays the round:
    ///
    /// - a larger candidate is forwarded unchanged
    /// - a smaller candidate is replaced by the relay's own id
    /// - a process that receives its own id is the leader
    ///
    /// Every receive and every forward is bounded by the election timeout.
    /// The first participant to time out abandons the round, and so does a
    /// [`Ring::halt`]. The guard is released exactly once, after every
    /// participant of the round has stopped touching its links.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub async fn start_election(self: &Arc<Self>, position: usize) -> ElectionOutcome {
        let initiator = self.process(position);

        if !initiator.alive {
            tracing::debug!(process_id = initiator.id, "Dead process cannot start an election");
            return ElectionOutcome::Ineligible;
        }

        if self.is_halted() {
            tracing::debug!(process_id = initiator.id, "Ring halted, not starting election");
            return ElectionOutcome::Halted;
        }

        let Some(number) = self.guard().try_claim() else {
            tracing::debug!(process_id = initiator.id, "Election already running, skipping");
            return ElectionOutcome::AlreadyRunning;
        };

        tracing::info!(process_id = initiator.id, round = number, "Process started election");
        let round = Arc::new(ElectionRound::new(number, self.halt_token().child_token()));

        let mut participants = JoinSet::new();
        for process in self.processes().iter().filter(|p| p.alive) {
            let ring = Arc::clone(self);
            let round = Arc::clone(&round);
            let position = process.position;
            participants.spawn(async move { ring.participate(position, &round).await });
        }

        let opening = Candidate {
            round: number,
            id: initiator.id,
        };
        self.forward(position, opening, &round).await;

        while let Some(joined) = participants.join_next().await {
            if let Err(e) = joined {
                tracing::error!(round = number, error = %e, "Election participant failed");
            }
        }

        // Halted, or a participant panicked, before anyone settled the round
        if !round.is_settled() {
            self.conclude(&round, None);
        }

        // No participant of this round is left on a link, so the next
        // claimant cannot have its candidates taken by this round.
        self.guard().release();

        let outcome = round.outcome();
        if outcome == ElectionOutcome::Abandoned && self.is_halted() {
            tracing::info!(
                process_id = initiator.id,
                round = number,
                "Election abandoned, ring halted"
            );
        } else if outcome == ElectionOutcome::Abandoned {
            tracing::info!(
                process_id = initiator.id,
                round = number,
                "Election timed out without a leader, abandoning"
            );
        }
        outcome
    }

    /// Relay loop for one live process during one round.
    async fn participate(&self, position: usize, round: &ElectionRound) {
        let process = self.process(position);
        let budget = self.config().election_timeout();

        let mut inbox = tokio::select! {
            biased;
            _ = round.cancelled() => return,
            inbox = process.inbox.lock() => inbox,
        };

        loop {
            let received = tokio::select! {
                biased;
                _ = round.cancelled() => return,
                received = timeout(budget, inbox.recv()) => received,
            };

            let candidate = match received {
                Ok(Some(candidate)) => candidate,
                Ok(None) => {
                    tracing::warn!(process_id = process.id, "Inbound link closed");
                    self.conclude(round, None);
                    return;
                }
                Err(_) => {
                    tracing::debug!(
                        process_id = process.id,
                        round = round.number(),
                        timeout_ms = budget.as_millis(),
                        "Timed out waiting for candidate"
                    );
                    self.conclude(round, None);
                    return;
                }
            };

            if candidate.round != round.number() {
                tracing::debug!(
                    process_id = process.id,
                    stale_round = candidate.round,
                    round = round.number(),
                    "Dropping candidate from another round"
                );
                continue;
            }

            let outgoing = match candidate.id.cmp(&process.id) {
                Ordering::Greater => candidate.id,
                Ordering::Less => process.id,
                Ordering::Equal => {
                    tracing::info!(
                        process_id = process.id,
                        round = round.number(),
                        "Process is the new leader"
                    );
                    self.conclude(round, Some(process.id));
                    return;
                }
            };

            tracing::debug!(
                process_id = process.id,
                received = candidate.id,
                forwarded = outgoing,
                "Forwarding candidate"
            );

            let next = Candidate {
                round: round.number(),
                id: outgoing,
            };
            if !self.forward(position, next, round).await {
                return;
            }
        }
    }

    /// Send `candidate` to the successor of `position` within the election
    /// timeout. Returns false if the round is over or the send failed, in
    /// which case the round has been settled.
    async fn forward(&self, position: usize, candidate: Candidate, round: &ElectionRound) -> bool {
        let process = self.process(position);
        let budget = self.config().election_timeout();

        let sent = tokio::select! {
            biased;
            _ = round.cancelled() => return false,
            sent = timeout(budget, process.outbound.send(candidate)) => sent,
        };

        match sent {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                tracing::warn!(process_id = process.id, "Outbound link closed");
                self.conclude(round, None);
                false
            }
            Err(_) => {
                tracing::debug!(
                    process_id = process.id,
                    successor = self.process(self.successor(position)).id,
                    "Timed out forwarding candidate"
                );
                self.conclude(round, None);
                false
            }
        }
    }

    /// Settle the round once: broadcast on convergence, then stop the
    /// remaining participants. The guard stays claimed until
    /// `start_election` has drained them.
    fn conclude(&self, round: &ElectionRound, leader: Option<u64>) {
        if !round.settle(leader) {
            return;
        }
        if let Some(id) = leader {
            self.broadcast_leader(id);
        }
        round.cancel();
    }
}
