//! Process population for a ring run.
//!
//! Either generated at random (unique identifiers below `max_id`, each
//! process dead with `dead_probability`) or given explicitly.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::PopulationConfig;
use crate::error::{Result, RingError};
use crate::ring::ProcessSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Population {
    specs: Vec<ProcessSpec>,
}

impl Population {
    /// Generate a random population.
    ///
    /// Identifiers are drawn without replacement so live processes never
    /// collide. With a seed the result is reproducible.
    pub fn generate(config: &PopulationConfig) -> Result<Self> {
        if config.processes == 0 {
            return Err(RingError::InvalidPopulation(
                "at least one process is required".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.dead_probability) {
            return Err(RingError::InvalidPopulation(format!(
                "dead probability {} is outside [0, 1]",
                config.dead_probability
            )));
        }
        let id_space = usize::try_from(config.max_id)
            .ok()
            .filter(|space| *space >= config.processes)
            .ok_or_else(|| {
                RingError::InvalidPopulation(format!(
                    "cannot draw {} unique ids below {}",
                    config.processes, config.max_id
                ))
            })?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let ids = index::sample(&mut rng, id_space, config.processes);
        let specs = ids
            .into_iter()
            .map(|id| ProcessSpec {
                id: id as u64,
                alive: !rng.gen_bool(config.dead_probability),
            })
            .collect();

        Ok(Self { specs })
    }

    /// Explicit population in ring order. Every id is alive unless listed in `dead`.
    pub fn from_ids(ids: &[u64], dead: &[u64]) -> Result<Self> {
        if let Some(unknown) = dead.iter().find(|id| !ids.contains(id)) {
            return Err(RingError::InvalidPopulation(format!(
                "dead id {} is not part of the ring",
                unknown
            )));
        }

        let specs = ids
            .iter()
            .map(|&id| ProcessSpec {
                id,
                alive: !dead.contains(&id),
            })
            .collect();
        Ok(Self { specs })
    }

    pub fn from_specs(specs: Vec<ProcessSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[ProcessSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.specs.iter().filter(|s| s.alive).count()
    }

    /// Highest identifier among live processes
    pub fn highest_live(&self) -> Option<u64> {
        self.specs.iter().filter(|s| s.alive).map(|s| s.id).max()
    }

    pub fn into_specs(self) -> Vec<ProcessSpec> {
        self.specs
    }
}
