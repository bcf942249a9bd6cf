//! Scheduled vaccination drives for the spatial topology.
use log::debug;

use crate::define_rng;
use crate::health::HealthState;
use crate::parameters::SpatialParameters;
use crate::population::{PersonId, PopulationStore};
use crate::random::RngStore;

define_rng!(pub VaccinationRng);

/// Fires a drive at every step `t` with `t >= start` and `t % interval == 0`, vaccinating up to
/// `batch_size` susceptible agents drawn without replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaccinationScheduler {
    interval: u64,
    start: u64,
    batch_size: usize,
}

impl VaccinationScheduler {
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    #[must_use]
    pub fn new(interval: u64, start: u64, batch_size: usize) -> Self {
        assert!(interval > 0, "vaccination interval must be positive");
        VaccinationScheduler {
            interval,
            start,
            batch_size,
        }
    }

    #[must_use]
    pub fn from_parameters(spatial: &SpatialParameters) -> Self {
        VaccinationScheduler::new(
            spatial.vaccination_interval,
            spatial.vaccination_start,
            spatial.vaccination_batch_size,
        )
    }

    #[must_use]
    pub fn is_due(&self, step: u64) -> bool {
        step >= self.start && step % self.interval == 0
    }

    /// Runs the drive for `step` if one is due and returns who was vaccinated.
    pub(crate) fn run(
        &self,
        population: &mut PopulationStore,
        rngs: &mut RngStore,
        step: u64,
    ) -> Vec<PersonId> {
        if !self.is_due(step) || self.batch_size == 0 {
            return Vec::new();
        }
        let susceptible: Vec<PersonId> = population
            .schedule()
            .into_iter()
            .filter(|&person_id| population.state(person_id) == HealthState::Susceptible)
            .collect();
        if susceptible.is_empty() {
            return Vec::new();
        }

        let chosen =
            rngs.sample_without_replacement(VaccinationRng, &susceptible, self.batch_size);
        for &person_id in &chosen {
            population.set_state(person_id, HealthState::Vaccinated, step);
        }
        debug!(
            "step {step}: vaccinated {} of {} susceptible",
            chosen.len(),
            susceptible.len()
        );
        chosen
    }
}
