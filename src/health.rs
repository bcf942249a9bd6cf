//! The closed set of health states an individual can be in.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthState {
    Susceptible,
    Infected,
    Recovered,
    Vaccinated,
    Dead,
}

impl HealthState {
    /// Position of the state in per-state tally arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the engine may move an individual from `self` to `next`.
    ///
    /// `Vaccinated -> Infected` is a breakthrough infection; only the spatial engine has
    /// vaccinated individuals, and it exposes them at a reduced transmission probability.
    /// `Dead` is absorbing.
    #[must_use]
    pub const fn can_transition_to(self, next: HealthState) -> bool {
        matches!(
            (self, next),
            (HealthState::Susceptible, HealthState::Infected)
                | (HealthState::Susceptible, HealthState::Vaccinated)
                | (HealthState::Vaccinated, HealthState::Infected)
                | (HealthState::Infected, HealthState::Recovered)
                | (HealthState::Infected, HealthState::Dead)
        )
    }

    /// States in which an individual still takes part in the epidemic.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, HealthState::Dead)
    }
}
