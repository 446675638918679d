use tokio::sync::mpsc::error::TrySendError;

use crate::ring::Ring;

impl Ring {
    /// Publish `id` as leader and announce it to every live process.
    ///
    /// The shared leader slot is updated first, so readers of
    /// [`Ring::leader_id`] see the leader even if an announcement is skipped.
    /// Announcements never block: a process that has not consumed an earlier
    /// announcement keeps that one.
    pub fn broadcast_leader(&self, id: u64) {
        self.guard().set_leader(id);
        tracing::info!(leader_id = id, "Broadcasting leader");

        for process in self.processes().iter().filter(|p| p.alive) {
            match process.announce_tx.try_send(id) {
                Ok(()) => {
                    tracing::debug!(process_id = process.id, leader_id = id, "Leader announced");
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(
                        process_id = process.id,
                        leader_id = id,
                        "Announcement still pending, skipping"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(process_id = process.id, "Announcement channel closed");
                }
            }
        }
    }
}
