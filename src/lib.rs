pub mod config;
pub mod error;
pub mod population;
pub mod ring;
pub mod shutdown;
pub mod simulation;
