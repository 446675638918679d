use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::error::{Result, RingError};
use crate::population::Population;
use crate::ring::{ElectionOutcome, ListenOutcome, Ring};

/// Final state of one process's listener.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerReport {
    pub process_id: u64,
    pub alive: bool,
    /// `None` if the listener task failed
    pub outcome: Option<ListenOutcome>,
}

/// Everything observable about a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Identifier of the process that started the first election
    pub initiator: u64,
    /// Outcome of the first election. `None` if its task failed.
    pub election: Option<ElectionOutcome>,
    pub listeners: Vec<ListenerReport>,
    /// Elections that claimed the guard, retriggered ones included
    pub election_attempts: u64,
    pub leader_id: Option<u64>,
    pub interrupted: bool,
}

/// Drives a single run: one initial election plus one watchdog cycle per process.
pub struct Simulation {
    config: SimulationConfig,
    ring: Arc<Ring>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, population: Population) -> Result<Self> {
        let ring = Ring::new(config.ring.clone(), population.into_specs())?;
        Ok(Self {
            config,
            ring: Arc::new(ring),
        })
    }

    pub fn ring(&self) -> &Arc<Ring> {
        &self.ring
    }

    /// Run the protocol to completion.
    ///
    /// 1. Picks the initiator: the configured id, or the live process with the
    ///    highest identifier
    /// 2. Spawns the initial election and every process's listener
    /// 3. Waits until all of them, and any election a listener retriggered,
    ///    have reached a terminal state
    ///
    /// Cancelling `shutdown` halts the ring: the running election is
    /// abandoned and releases the guard, listeners stop, and the report is
    /// built once every task has returned.
    ///
    /// # Errors
    ///
    /// - [`RingError::NoLiveProcesses`] if every process is dead; nothing is launched
    /// - [`RingError::UnknownInitiator`] if the configured initiator is not a live member
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunReport> {
        let ring = self.ring;

        if ring.live_count() == 0 {
            tracing::warn!(processes = ring.len(), "No live processes, run aborted");
            return Err(RingError::NoLiveProcesses);
        }

        let initiator = match self.config.initiator {
            Some(id) => ring
                .position_of(id)
                .filter(|&pos| ring.process(pos).alive)
                .ok_or(RingError::UnknownInitiator(id))?,
            None => ring.highest_live().ok_or(RingError::NoLiveProcesses)?,
        };
        let initiator_id = ring.process(initiator).id;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            %run_id,
            processes = ring.len(),
            live = ring.live_count(),
            initiator = initiator_id,
            "Starting ring election run"
        );

        let tracker = TaskTracker::new();

        let election_ring = ring.clone();
        let election = tracker.spawn(async move { election_ring.start_election(initiator).await });

        let listeners: Vec<JoinHandle<ListenOutcome>> = (0..ring.len())
            .map(|position| {
                let listener_ring = ring.clone();
                let listener_tracker = tracker.clone();
                tracker.spawn(async move {
                    listener_ring
                        .listen_for_leader(position, &listener_tracker)
                        .await
                })
            })
            .collect();

        // Closing only lets `wait` finish once the tracker drains; listeners
        // can still spawn retriggered elections onto it.
        tracker.close();

        let interrupted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::warn!(%run_id, "Shutdown requested, stopping run");
                true
            }
            _ = tracker.wait() => false,
        };

        if interrupted {
            // Abandon the round in flight and stop the listeners, then let
            // every task return on its own so the guard is released.
            ring.halt();
            tracker.wait().await;
        }

        let election = collect(election).await;
        let mut listener_reports = Vec::with_capacity(listeners.len());
        for (process, handle) in ring.processes().iter().zip(listeners) {
            listener_reports.push(ListenerReport {
                process_id: process.id,
                alive: process.alive,
                outcome: collect(handle).await,
            });
        }

        let report = RunReport {
            run_id,
            started_at,
            initiator: initiator_id,
            election,
            listeners: listener_reports,
            election_attempts: ring.guard().rounds(),
            leader_id: ring.leader_id(),
            interrupted,
        };

        tracing::info!(
            %run_id,
            leader_id = ?report.leader_id,
            attempts = report.election_attempts,
            interrupted,
            "Run complete"
        );

        Ok(report)
    }
}

/// Result of a finished task, or `None` if it panicked.
async fn collect<T>(handle: JoinHandle<T>) -> Option<T> {
    match handle.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "Ring task failed");
            None
        }
    }
}
