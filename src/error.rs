use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring must contain at least one process")]
    EmptyRing,

    #[error("Identifier {0} is shared by more than one live process")]
    DuplicateId(u64),

    #[error("Identifier {0} is reserved and cannot be assigned to a process")]
    ReservedId(u64),

    #[error("No live processes available, election cannot start")]
    NoLiveProcesses,

    #[error("Initiator {0} is not a live member of the ring")]
    UnknownInitiator(u64),

    #[error("Invalid population: {0}")]
    InvalidPopulation(String),
}

pub type Result<T> = std::result::Result<T, RingError>;
