use std::sync::Arc;

use tokio::time::timeout;
use tokio_util::task::TaskTracker;

use crate::ring::state::ListenOutcome;
use crate::ring::Ring;

impl Ring {
    /// One watchdog cycle for the process at `position`.
    ///
    /// Waits up to the announce timeout for a leader announcement. On timeout,
    /// if no election is running and no leader is known, a new election from
    /// this process is spawned onto `tracker` and the listener returns without
    /// waiting for it. A [`Ring::halt`] ends the wait early and never
    /// retriggers.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub async fn listen_for_leader(
        self: &Arc<Self>,
        position: usize,
        tracker: &TaskTracker,
    ) -> ListenOutcome {
        let process = self.process(position);
        let wait = self.config().announce_timeout();
        let halt = self.halt_token();

        let announced = tokio::select! {
            biased;
            _ = halt.cancelled() => None,
            announced = async {
                let mut announce = process.announce.lock().await;
                timeout(wait, announce.recv()).await
            } => Some(announced),
        };

        let Some(announced) = announced else {
            tracing::debug!(process_id = process.id, "Ring halted, listener stopping");
            return ListenOutcome::Halted;
        };

        if let Ok(Some(leader)) = announced {
            tracing::info!(
                process_id = process.id,
                leader_id = leader,
                "Process acknowledges leader"
            );
            return ListenOutcome::Acknowledged(leader);
        }

        if self.is_halted() {
            return ListenOutcome::Halted;
        }

        if self.guard().is_running() || self.guard().leader_id().is_some() {
            tracing::debug!(
                process_id = process.id,
                election_running = self.guard().is_running(),
                leader_id = ?self.guard().leader_id(),
                "No announcement received, nothing to retry"
            );
            return ListenOutcome::Expired;
        }

        tracing::info!(
            process_id = process.id,
            waited_ms = wait.as_millis(),
            "No leader announced, triggering election"
        );
        let ring = Arc::clone(self);
        tracker.spawn(async move {
            ring.start_election(position).await;
        });
        ListenOutcome::Retriggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RingConfig;
    use crate::ring::{ElectionOutcome, ProcessSpec};
    use tokio::time::Instant;

    fn ring(specs: Vec<ProcessSpec>) -> Arc<Ring> {
        Arc::new(Ring::new(RingConfig::default(), specs).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_announcement_is_acknowledged() {
        let ring = ring(vec![ProcessSpec::live(1), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();
        ring.broadcast_leader(2);

        let outcome = ring.listen_for_leader(0, &tracker).await;

        assert_eq!(outcome, ListenOutcome::Acknowledged(2));
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_leader_retriggers_once() {
        let ring = ring(vec![ProcessSpec::live(1), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();
        let start = Instant::now();

        let outcome = ring.listen_for_leader(0, &tracker).await;

        assert_eq!(outcome, ListenOutcome::Retriggered);
        assert!(start.elapsed() >= ring.config().announce_timeout());
        assert_eq!(tracker.len(), 1);

        tracker.close();
        tracker.wait().await;
        assert_eq!(ring.guard().rounds(), 1);
        assert_eq!(ring.leader_id(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_known_leader_does_nothing() {
        let ring = ring(vec![ProcessSpec::live(1), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();
        ring.guard().set_leader(2);

        let outcome = ring.listen_for_leader(0, &tracker).await;

        assert_eq!(outcome, ListenOutcome::Expired);
        assert!(tracker.is_empty());
        assert_eq!(ring.guard().rounds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_during_running_election_does_nothing() {
        let ring = ring(vec![ProcessSpec::live(1), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();
        ring.guard().try_claim().unwrap();

        let outcome = ring.listen_for_leader(1, &tracker).await;

        assert_eq!(outcome, ListenOutcome::Expired);
        assert!(tracker.is_empty());
        assert_eq!(ring.guard().rounds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_from_dead_process_is_ineligible() {
        let ring = ring(vec![ProcessSpec::dead(9), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();

        let outcome = ring.listen_for_leader(0, &tracker).await;
        assert_eq!(outcome, ListenOutcome::Retriggered);

        tracker.close();
        tracker.wait().await;
        assert_eq!(ring.guard().rounds(), 0);
        assert_eq!(ring.leader_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_stops_listener_without_retrigger() {
        let ring = ring(vec![ProcessSpec::live(1), ProcessSpec::live(2)]);
        let tracker = TaskTracker::new();

        let listener = tokio::spawn({
            let ring = Arc::clone(&ring);
            let tracker = tracker.clone();
            async move { ring.listen_for_leader(0, &tracker).await }
        });
        tokio::time::sleep(ring.config().time_unit).await;
        let start = Instant::now();
        ring.halt();

        assert_eq!(listener.await.unwrap(), ListenOutcome::Halted);
        assert!(start.elapsed() < ring.config().time_unit);
        assert!(tracker.is_empty());
        assert_eq!(ring.guard().rounds(), 0);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "index out of bounds")]
    async fn test_out_of_range_listener_panics() {
        let ring = ring(vec![ProcessSpec::live(1)]);
        ring.listen_for_leader(1, &TaskTracker::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_observes_election_result() {
        let ring = ring(vec![
            ProcessSpec::live(42),
            ProcessSpec::live(17),
            ProcessSpec::live(83),
        ]);
        let tracker = TaskTracker::new();

        assert_eq!(ring.start_election(1).await, ElectionOutcome::Elected(83));
        for position in 0..ring.len() {
            assert_eq!(
                ring.listen_for_leader(position, &tracker).await,
                ListenOutcome::Acknowledged(83)
            );
        }
    }
}
