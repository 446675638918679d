use std::time::Duration;

/// Capacity of every ring link and announcement channel.
///
/// One slot bounds the number of in-flight messages per link to one, so a
/// send into an unconsumed buffer blocks until the receiver drains it.
pub const LINK_CAPACITY: usize = 1;

/// Timing parameters for the ring protocol.
///
/// All timeouts are expressed in protocol time units so tests can shrink
/// the whole schedule by changing `time_unit` alone.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Wall-clock length of one time unit
    pub time_unit: Duration,
    /// Budget for each receive and forward step of an election participant
    pub election_timeout_units: u32,
    /// How long a listener waits for a leader announcement
    pub announce_timeout_units: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            election_timeout_units: 3,
            announce_timeout_units: 5,
        }
    }
}

impl RingConfig {
    pub fn election_timeout(&self) -> Duration {
        self.time_unit * self.election_timeout_units
    }

    pub fn announce_timeout(&self) -> Duration {
        self.time_unit * self.announce_timeout_units
    }

    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_election_timeout_units(mut self, units: u32) -> Self {
        self.election_timeout_units = units;
        self
    }

    pub fn with_announce_timeout_units(mut self, units: u32) -> Self {
        self.announce_timeout_units = units;
        self
    }
}

/// Parameters for random population generation.
#[derive(Debug, Clone)]
pub struct PopulationConfig {
    /// Number of ring slots
    pub processes: usize,
    /// Exclusive upper bound for generated identifiers
    pub max_id: u64,
    /// Probability that a generated process starts dead
    pub dead_probability: f64,
    /// Seed for reproducible populations. Entropy-seeded when unset.
    pub seed: Option<u64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            processes: 5,
            max_id: 100,
            dead_probability: 0.2,
            seed: None,
        }
    }
}

impl PopulationConfig {
    pub fn new(processes: usize) -> Self {
        Self {
            processes,
            ..Default::default()
        }
    }

    pub fn with_max_id(mut self, max_id: u64) -> Self {
        self.max_id = max_id;
        self
    }

    pub fn with_dead_probability(mut self, probability: f64) -> Self {
        self.dead_probability = probability;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub ring: RingConfig,
    /// Identifier of the process that starts the first election.
    /// Defaults to the live process with the highest identifier.
    pub initiator: Option<u64>,
}

impl SimulationConfig {
    pub fn new(ring: RingConfig) -> Self {
        Self {
            ring,
            initiator: None,
        }
    }

    pub fn with_initiator(mut self, id: u64) -> Self {
        self.initiator = Some(id);
        self
    }
}
