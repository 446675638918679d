use serde::Serialize;

/// Candidate identifier travelling along a ring link.
///
/// Tagged with the election round that produced it so a message stranded
/// by an abandoned round is recognised and dropped by later rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub round: u64,
    pub id: u64,
}

/// Terminal state of one `start_election` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "leader")]
pub enum ElectionOutcome {
    /// The round converged on this leader
    Elected(u64),
    /// A participant timed out before the round converged
    Abandoned,
    /// Another election held the guard; nothing was done
    AlreadyRunning,
    /// The calling process is dead and may not initiate
    Ineligible,
    /// The ring was halted before the election could claim the guard
    Halted,
}

impl std::fmt::Display for ElectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionOutcome::Elected(id) => write!(f, "elected {}", id),
            ElectionOutcome::Abandoned => write!(f, "abandoned"),
            ElectionOutcome::AlreadyRunning => write!(f, "already running"),
            ElectionOutcome::Ineligible => write!(f, "ineligible"),
            ElectionOutcome::Halted => write!(f, "halted"),
        }
    }
}

/// Terminal state of one watchdog cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "leader")]
pub enum ListenOutcome {
    /// An announcement arrived
    Acknowledged(u64),
    /// Timed out with no leader and no election running; a new election was spawned
    Retriggered,
    /// Timed out while an election was running or a leader was already known
    Expired,
    /// The ring was halted while waiting
    Halted,
}

impl std::fmt::Display for ListenOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenOutcome::Acknowledged(id) => write!(f, "acknowledged {}", id),
            ListenOutcome::Retriggered => write!(f, "retriggered"),
            ListenOutcome::Expired => write!(f, "expired"),
            ListenOutcome::Halted => write!(f, "halted"),
        }
    }
}
