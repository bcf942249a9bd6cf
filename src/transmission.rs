//! Exposure of susceptible and vaccinated individuals to their infected neighbours.
use log::trace;

use crate::define_rng;
use crate::health::HealthState;
use crate::population::{PersonId, PopulationStore};
use crate::random::RngStore;

define_rng!(pub TransmissionRng);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionRule {
    /// Per-contact probability of infection.
    pub transmission_rate: f64,
    /// Multiplier on `transmission_rate` when the exposed individual is vaccinated.
    pub vaccine_transmission_factor: f64,
}

impl TransmissionRule {
    #[must_use]
    pub fn probability_for(&self, exposed: HealthState) -> f64 {
        match exposed {
            HealthState::Vaccinated => self.transmission_rate * self.vaccine_transmission_factor,
            _ => self.transmission_rate,
        }
    }
}

/// Scans the neighbours of `person_id` in order and draws once per infected neighbour until a
/// contact succeeds. At most one infection is credited per individual per step. Returns the
/// infecting neighbour on success.
///
/// Neighbours infected earlier in the same step count as infected.
pub(crate) fn expose(
    population: &mut PopulationStore,
    rngs: &mut RngStore,
    person_id: PersonId,
    step: u64,
    rule: TransmissionRule,
) -> Option<PersonId> {
    let exposed_state = population.state(person_id);
    debug_assert!(matches!(
        exposed_state,
        HealthState::Susceptible | HealthState::Vaccinated
    ));
    let probability = rule.probability_for(exposed_state);

    for neighbor in population.neighbors_of(person_id) {
        if population.state(neighbor) != HealthState::Infected {
            continue;
        }
        if rngs.sample_uniform(TransmissionRng) < probability {
            trace!("{neighbor:?} infected {person_id:?}");
            population.set_state(person_id, HealthState::Infected, step);
            return Some(neighbor);
        }
    }
    None
}
