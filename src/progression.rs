//! Disease progression for individuals who are already infected: first a mortality check, then a
//! recovery check under one of the recovery policies.
use log::trace;

use crate::define_rng;
use crate::health::HealthState;
use crate::parameters::{RecoveryPolicy, TopologyParameters};
use crate::population::{PersonId, PopulationStore};
use crate::random::RngStore;

define_rng!(pub ProgressionRng);

/// When an infected individual recovers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryRule {
    /// Recover when a uniform draw is at least `recovery_rate`.
    FixedRate { recovery_rate: f64 },
    /// Recover once the infection is `recovery_time` steps old.
    FixedDuration { recovery_time: u64 },
    /// Draw a duration uniformly from `[min, max]` at every check and recover once the
    /// infection is at least that old.
    UniformDuration { min: u64, max: u64 },
}

impl RecoveryRule {
    #[must_use]
    pub fn from_topology(topology: &TopologyParameters) -> Self {
        match topology {
            TopologyParameters::Linear(linear) => match linear.recovery {
                RecoveryPolicy::FixedRate { recovery_rate } => {
                    RecoveryRule::FixedRate { recovery_rate }
                }
                RecoveryPolicy::FixedDuration { recovery_time } => {
                    RecoveryRule::FixedDuration { recovery_time }
                }
            },
            TopologyParameters::Spatial(spatial) => RecoveryRule::UniformDuration {
                min: spatial.incubation_period,
                max: spatial.treatment_period,
            },
        }
    }

    fn recovers(self, rngs: &mut RngStore, infection_age: u64) -> bool {
        match self {
            RecoveryRule::FixedRate { recovery_rate } => {
                rngs.sample_uniform(ProgressionRng) >= recovery_rate
            }
            RecoveryRule::FixedDuration { recovery_time } => infection_age >= recovery_time,
            RecoveryRule::UniformDuration { min, max } => {
                let duration: u64 = rngs.sample_range(ProgressionRng, min..=max);
                infection_age >= duration
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionOutcome {
    Died,
    Recovered,
}

/// Resolves one step of progression for an infected individual. Returns what happened, or
/// `None` if the individual is still infected.
///
/// # Panics
///
/// Panics if `person_id` is not currently infected.
pub(crate) fn progress_infection(
    population: &mut PopulationStore,
    rngs: &mut RngStore,
    person_id: PersonId,
    step: u64,
    mortality_rate: f64,
    recovery: RecoveryRule,
) -> Option<ProgressionOutcome> {
    let infection_age = population
        .individual(person_id)
        .infection_age(step)
        .unwrap_or_else(|| panic!("{person_id:?} is not infected"));

    if rngs.sample_uniform(ProgressionRng) < mortality_rate {
        population.set_state(person_id, HealthState::Dead, step);
        return Some(ProgressionOutcome::Died);
    }

    if recovery.recovers(rngs, infection_age) {
        trace!("{person_id:?} recovered after {infection_age} steps");
        population.set_state(person_id, HealthState::Recovered, step);
        return Some(ProgressionOutcome::Recovered);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameters;

    fn infected_store(size: usize, infected_at: u64) -> PopulationStore {
        let mut store = PopulationStore::linear(size);
        for index in 0..size {
            store.set_state(PersonId::new(index), HealthState::Infected, infected_at);
        }
        store
    }

    #[test]
    fn certain_death() {
        let mut store = infected_store(3, 0);
        let mut rngs = RngStore::new(5);
        let rule = RecoveryRule::FixedDuration { recovery_time: 0 };
        for index in 0..3 {
            let outcome =
                progress_infection(&mut store, &mut rngs, PersonId::new(index), 1, 1.0, rule);
            assert_eq!(outcome, Some(ProgressionOutcome::Died));
        }
        assert_eq!(store.count(HealthState::Dead), 3);
    }

    #[test]
    fn fixed_duration_uses_infection_timestamp() {
        let mut store = infected_store(1, 4);
        let mut rngs = RngStore::new(5);
        let rule = RecoveryRule::FixedDuration { recovery_time: 3 };
        let person = PersonId::new(0);

        for step in 4..7 {
            assert_eq!(
                progress_infection(&mut store, &mut rngs, person, step, 0.0, rule),
                None
            );
        }
        assert_eq!(
            progress_infection(&mut store, &mut rngs, person, 7, 0.0, rule),
            Some(ProgressionOutcome::Recovered)
        );
        assert_eq!(store.state(person), HealthState::Recovered);
    }

    #[test]
    fn fixed_rate_extremes() {
        let mut rngs = RngStore::new(11);

        // A recovery rate of one can never be met by a draw in [0, 1).
        let mut store = infected_store(50, 0);
        let never = RecoveryRule::FixedRate { recovery_rate: 1.0 };
        for index in 0..50 {
            let outcome =
                progress_infection(&mut store, &mut rngs, PersonId::new(index), 1, 0.0, never);
            assert_eq!(outcome, None);
        }

        let always = RecoveryRule::FixedRate { recovery_rate: 0.0 };
        for index in 0..50 {
            let outcome =
                progress_infection(&mut store, &mut rngs, PersonId::new(index), 2, 0.0, always);
            assert_eq!(outcome, Some(ProgressionOutcome::Recovered));
        }
    }

    #[test]
    fn uniform_duration_bounds() {
        let rule = RecoveryRule::UniformDuration { min: 3, max: 6 };
        let mut rngs = RngStore::new(2);
        let mut store = infected_store(100, 0);

        for index in 0..100 {
            let person = PersonId::new(index);
            assert_eq!(
                progress_infection(&mut store, &mut rngs, person, 2, 0.0, rule),
                None
            );
            assert_eq!(
                progress_infection(&mut store, &mut rngs, person, 6, 0.0, rule),
                Some(ProgressionOutcome::Recovered)
            );
        }
    }

    #[test]
    fn rule_follows_topology() {
        let spatial = Parameters::spatial_default();
        assert_eq!(
            RecoveryRule::from_topology(&spatial.topology),
            RecoveryRule::UniformDuration { min: 8, max: 14 }
        );
        let linear = Parameters::linear_default();
        assert_eq!(
            RecoveryRule::from_topology(&linear.topology),
            RecoveryRule::FixedDuration { recovery_time: 14 }
        );
    }

    #[test]
    #[should_panic(expected = "is not infected")]
    fn susceptible_cannot_progress() {
        let mut store = PopulationStore::linear(1);
        let mut rngs = RngStore::new(0);
        progress_infection(
            &mut store,
            &mut rngs,
            PersonId::new(0),
            0,
            0.5,
            RecoveryRule::FixedRate { recovery_rate: 0.5 },
        );
    }
}
