//! Population-level statistics read off the population store.
//!
//! Nothing in this module mutates the simulation. Counts can be taken any number of times per
//! step.
use serde::{Deserialize, Serialize};

use crate::health::HealthState;
use crate::population::grid::Position;
use crate::population::{PersonId, PopulationStore};

/// Number of individuals in each health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    pub vaccinated: usize,
    pub dead: usize,
}

impl StateCounts {
    #[must_use]
    pub fn from_population(population: &PopulationStore) -> Self {
        StateCounts {
            susceptible: population.count(HealthState::Susceptible),
            infected: population.count(HealthState::Infected),
            recovered: population.count(HealthState::Recovered),
            vaccinated: population.count(HealthState::Vaccinated),
            dead: population.count(HealthState::Dead),
        }
    }

    #[must_use]
    pub fn get(&self, state: HealthState) -> usize {
        match state {
            HealthState::Susceptible => self.susceptible,
            HealthState::Infected => self.infected,
            HealthState::Recovered => self.recovered,
            HealthState::Vaccinated => self.vaccinated,
            HealthState::Dead => self.dead,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered + self.vaccinated + self.dead
    }
}

/// What happened during one step, and the state counts once it completed. `step` is the value
/// of the step counter after the step, so the first record has `step == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub new_infections: usize,
    pub new_deaths: usize,
    pub new_recoveries: usize,
    pub new_vaccinations: usize,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    pub vaccinated: usize,
    pub dead: usize,
}

impl StepRecord {
    #[must_use]
    pub fn counts(&self) -> StateCounts {
        StateCounts {
            susceptible: self.susceptible,
            infected: self.infected,
            recovered: self.recovered,
            vaccinated: self.vaccinated,
            dead: self.dead,
        }
    }
}

/// The reduced per-step view of the linear engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidenceRecord {
    pub step: u64,
    pub new_infections: usize,
    pub new_deaths: usize,
    pub total_infected: usize,
}

impl From<&StepRecord> for IncidenceRecord {
    fn from(record: &StepRecord) -> Self {
        IncidenceRecord {
            step: record.step,
            new_infections: record.new_infections,
            new_deaths: record.new_deaths,
            total_infected: record.infected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: PersonId,
    pub state: HealthState,
    /// Last known cell; absent in the linear topology.
    pub position: Option<Position>,
}

/// Everything a renderer or a web handler needs to draw the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    pub counts: StateCounts,
    /// One entry per individual in the spatial topology, the dead included. Empty in the linear
    /// topology.
    pub agents: Vec<AgentSnapshot>,
    pub destinations: Vec<Position>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(population: &PopulationStore, step: u64, destinations: &[Position]) -> Self {
        let agents = if population.is_spatial() {
            population
                .iter()
                .map(|(id, individual)| AgentSnapshot {
                    id,
                    state: individual.health_state(),
                    position: individual.position(),
                })
                .collect()
        } else {
            Vec::new()
        };
        Snapshot {
            step,
            counts: StateCounts::from_population(population),
            agents,
            destinations: destinations.to_vec(),
        }
    }
}
