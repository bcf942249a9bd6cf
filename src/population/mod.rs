//! The population store: the fixed roster of individuals, their health states, and the adjacency
//! structure used to find who can infect whom.
//!
//! Population size is fixed at construction. Nobody is ever added, and nobody is ever removed from
//! the roster: the dead stay in place as inert records so that ids remain valid indexes. In the
//! spatial topology the store additionally keeps an *active schedule* of living agents and takes
//! the dead off the grid, while their last position stays on record for reporting.
//!
//! The store is the only writer of health state and position. Its mutators are crate-private and
//! are called from the progression, transmission, movement and vaccination rules.
pub mod grid;

use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};

use log::trace;
use serde::{Deserialize, Serialize};
use strum::EnumCount;

use crate::health::HealthState;
use grid::{Grid, Position};

/// How far either side of an individual the linear topology looks for contacts.
pub const LINEAR_CONTACT_RADIUS: usize = 2;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub(crate) usize);

impl PersonId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        PersonId(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Person {}", self.0)
    }
}

/// The two-point commute of a spatial agent: a fixed home and the place it is currently
/// heading for, if it has picked one yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commute {
    pub home: Position,
    pub target: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    health_state: HealthState,
    infected_at: Option<u64>,
    position: Option<Position>,
    commute: Option<Commute>,
    stays_home_when_symptomatic: bool,
}

impl Individual {
    fn linear() -> Self {
        Individual {
            health_state: HealthState::Susceptible,
            infected_at: None,
            position: None,
            commute: None,
            stays_home_when_symptomatic: false,
        }
    }

    fn spatial(home: Position, stays_home_when_symptomatic: bool) -> Self {
        Individual {
            health_state: HealthState::Susceptible,
            infected_at: None,
            position: Some(home),
            commute: Some(Commute { home, target: None }),
            stays_home_when_symptomatic,
        }
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        self.health_state
    }

    /// The step at which the individual was infected, if ever.
    #[must_use]
    pub fn infected_at(&self) -> Option<u64> {
        self.infected_at
    }

    /// Steps since infection, for individuals who are currently infected.
    #[must_use]
    pub fn infection_age(&self, step: u64) -> Option<u64> {
        match self.health_state {
            HealthState::Infected => self.infected_at.map(|at| step.saturating_sub(at)),
            _ => None,
        }
    }

    /// Whether an infected individual's infection has outlasted the incubation period.
    #[must_use]
    pub fn is_symptomatic(&self, step: u64, incubation_period: u64) -> bool {
        self.infection_age(step)
            .is_some_and(|age| age >= incubation_period)
    }

    #[must_use]
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    #[must_use]
    pub fn home_position(&self) -> Option<Position> {
        self.commute.map(|commute| commute.home)
    }

    #[must_use]
    pub fn target_position(&self) -> Option<Position> {
        self.commute.and_then(|commute| commute.target)
    }

    #[must_use]
    pub fn commute(&self) -> Option<Commute> {
        self.commute
    }

    #[must_use]
    pub fn stays_home_when_symptomatic(&self) -> bool {
        self.stays_home_when_symptomatic
    }
}

#[derive(Debug, Clone)]
enum Topology {
    Linear,
    Spatial {
        grid: Grid,
        active: BTreeSet<PersonId>,
    },
}

#[derive(Debug, Clone)]
pub struct PopulationStore {
    individuals: Vec<Individual>,
    tallies: [usize; HealthState::COUNT],
    topology: Topology,
}

impl PopulationStore {
    /// A row of `size` susceptible individuals.
    #[must_use]
    pub fn linear(size: usize) -> Self {
        let mut tallies = [0; HealthState::COUNT];
        tallies[HealthState::Susceptible.index()] = size;
        PopulationStore {
            individuals: vec![Individual::linear(); size],
            tallies,
            topology: Topology::Linear,
        }
    }

    /// One susceptible agent per entry of `homes`, each placed on the grid at its home cell.
    #[must_use]
    pub fn spatial(mut grid: Grid, homes: &[Position], stays_home_when_symptomatic: bool) -> Self {
        let mut individuals = Vec::with_capacity(homes.len());
        let mut active = BTreeSet::new();
        for (index, &home) in homes.iter().enumerate() {
            let person_id = PersonId(index);
            grid.place(person_id, home);
            active.insert(person_id);
            individuals.push(Individual::spatial(home, stays_home_when_symptomatic));
        }
        let mut tallies = [0; HealthState::COUNT];
        tallies[HealthState::Susceptible.index()] = homes.len();
        PopulationStore {
            individuals,
            tallies,
            topology: Topology::Spatial { grid, active },
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    #[must_use]
    pub fn is_spatial(&self) -> bool {
        matches!(self.topology, Topology::Spatial { .. })
    }

    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        match &self.topology {
            Topology::Linear => None,
            Topology::Spatial { grid, .. } => Some(grid),
        }
    }

    /// # Panics
    ///
    /// Panics if `person_id` is not part of this population.
    #[must_use]
    pub fn individual(&self, person_id: PersonId) -> &Individual {
        &self.individuals[person_id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonId, &Individual)> {
        self.individuals
            .iter()
            .enumerate()
            .map(|(index, individual)| (PersonId(index), individual))
    }

    #[must_use]
    pub fn state(&self, person_id: PersonId) -> HealthState {
        self.individual(person_id).health_state
    }

    /// The ids to visit during a step, in ascending order. The linear topology visits the whole
    /// roster (the dead are skipped by the rules); the spatial topology visits only its active
    /// schedule.
    #[must_use]
    pub fn schedule(&self) -> Vec<PersonId> {
        match &self.topology {
            Topology::Linear => (0..self.individuals.len()).map(PersonId).collect(),
            Topology::Spatial { active, .. } => active.iter().copied().collect(),
        }
    }

    /// Everyone who can pass an infection to `person_id` this step.
    ///
    /// * Linear: ids in `[max(0, i - 2), min(N, i + 3))`, excluding `i`.
    /// * Spatial: every living agent in the same grid cell, including `person_id` itself.
    #[must_use]
    pub fn neighbors_of(&self, person_id: PersonId) -> Vec<PersonId> {
        match &self.topology {
            Topology::Linear => {
                let index = person_id.0;
                let start = index.saturating_sub(LINEAR_CONTACT_RADIUS);
                let end = (index + LINEAR_CONTACT_RADIUS + 1).min(self.individuals.len());
                (start..end)
                    .filter(|&neighbor| neighbor != index)
                    .map(PersonId)
                    .collect()
            }
            Topology::Spatial { grid, .. } => match self.individual(person_id).position {
                Some(position) => grid.occupants(position).to_vec(),
                None => Vec::new(),
            },
        }
    }

    /// The cells `person_id` could step into next. Empty in the linear topology.
    #[must_use]
    pub fn movement_candidates(&self, person_id: PersonId) -> Vec<Position> {
        match (&self.topology, self.individual(person_id).position) {
            (Topology::Spatial { grid, .. }, Some(position)) => grid.neighborhood(position),
            _ => Vec::new(),
        }
    }

    /// Number of individuals currently in `state`.
    ///
    /// In the spatial topology the dead are counted as the original population size minus the
    /// size of the active schedule.
    #[must_use]
    pub fn count(&self, state: HealthState) -> usize {
        match (&self.topology, state) {
            (Topology::Spatial { active, .. }, HealthState::Dead) => {
                let dead = self.individuals.len() - active.len();
                debug_assert_eq!(dead, self.tallies[HealthState::Dead.index()]);
                dead
            }
            _ => self.tallies[state.index()],
        }
    }

    /// Counts every state by scanning the whole roster. `Simulation::step` checks the running
    /// tallies against it.
    #[must_use]
    pub fn tabulate(&self) -> [usize; HealthState::COUNT] {
        let mut counts = [0; HealthState::COUNT];
        for individual in &self.individuals {
            counts[individual.health_state.index()] += 1;
        }
        counts
    }

    /// Moves `person_id` to `new_state`, stamping `infected_at` on infection. A death in the
    /// spatial topology also takes the agent off the grid and out of the active schedule.
    ///
    /// # Panics
    ///
    /// Panics if the transition is not permitted by [`HealthState::can_transition_to`].
    pub(crate) fn set_state(&mut self, person_id: PersonId, new_state: HealthState, step: u64) {
        let individual = &mut self.individuals[person_id.0];
        let current = individual.health_state;
        assert!(
            current.can_transition_to(new_state),
            "illegal health state transition for {person_id:?}: {current} -> {new_state}"
        );
        trace!("step {step}: {person_id:?} {current} -> {new_state}");

        individual.health_state = new_state;
        if new_state == HealthState::Infected {
            individual.infected_at = Some(step);
        }
        self.tallies[current.index()] -= 1;
        self.tallies[new_state.index()] += 1;

        if new_state == HealthState::Dead {
            if let Topology::Spatial { grid, active } = &mut self.topology {
                active.remove(&person_id);
                if let Some(position) = individual.position {
                    grid.remove(person_id, position);
                }
            }
        }
    }

    /// # Panics
    ///
    /// Panics in the linear topology, for the dead, or for a position off the grid.
    pub(crate) fn move_to(&mut self, person_id: PersonId, new_position: Position) {
        let individual = &mut self.individuals[person_id.0];
        assert!(
            individual.health_state.is_alive(),
            "{person_id:?} is dead and cannot move"
        );
        let Topology::Spatial { grid, .. } = &mut self.topology else {
            panic!("individuals in a linear population have no position");
        };
        let Some(current) = individual.position else {
            panic!("{person_id:?} has no position");
        };
        grid.relocate(person_id, current, new_position);
        individual.position = Some(new_position);
    }

    pub(crate) fn set_target(&mut self, person_id: PersonId, target: Option<Position>) {
        if let Some(commute) = self.individuals[person_id.0].commute.as_mut() {
            commute.target = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::grid::Neighborhood;
    use strum::IntoEnumIterator;

    fn ids(indexes: &[usize]) -> Vec<PersonId> {
        indexes.iter().copied().map(PersonId).collect()
    }

    fn spatial_store() -> PopulationStore {
        let grid = Grid::new(4, 4, true, Neighborhood::Moore);
        let homes = [
            Position::new(0, 0),
            Position::new(0, 0),
            Position::new(1, 1),
            Position::new(0, 0),
        ];
        PopulationStore::spatial(grid, &homes, true)
    }

    #[test]
    fn linear_neighbors_window() {
        let store = PopulationStore::linear(10);
        assert_eq!(store.neighbors_of(PersonId(0)), ids(&[1, 2]));
        assert_eq!(store.neighbors_of(PersonId(1)), ids(&[0, 2, 3]));
        assert_eq!(store.neighbors_of(PersonId(5)), ids(&[3, 4, 6, 7]));
        assert_eq!(store.neighbors_of(PersonId(9)), ids(&[7, 8]));
    }

    #[test]
    fn linear_neighbors_tiny_population() {
        let store = PopulationStore::linear(1);
        assert!(store.neighbors_of(PersonId(0)).is_empty());
    }

    #[test]
    fn spatial_neighbors_are_cellmates_including_self() {
        let store = spatial_store();
        assert_eq!(store.neighbors_of(PersonId(1)), ids(&[0, 1, 3]));
        assert_eq!(store.neighbors_of(PersonId(2)), ids(&[2]));
        assert_eq!(store.movement_candidates(PersonId(2)).len(), 8);
    }

    #[test]
    fn counts_follow_transitions() {
        let mut store = PopulationStore::linear(5);
        store.set_state(PersonId(0), HealthState::Infected, 3);
        store.set_state(PersonId(1), HealthState::Infected, 3);
        store.set_state(PersonId(1), HealthState::Recovered, 4);
        store.set_state(PersonId(0), HealthState::Dead, 5);

        assert_eq!(store.count(HealthState::Susceptible), 3);
        assert_eq!(store.count(HealthState::Infected), 0);
        assert_eq!(store.count(HealthState::Recovered), 1);
        assert_eq!(store.count(HealthState::Dead), 1);
        assert_eq!(store.individual(PersonId(0)).infected_at(), Some(3));
        assert_eq!(store.individual(PersonId(1)).infected_at(), Some(3));

        let tabulated = store.tabulate();
        for state in HealthState::iter() {
            assert_eq!(tabulated[state.index()], store.count(state));
        }
    }

    #[test]
    fn linear_dead_stay_on_the_roster() {
        let mut store = PopulationStore::linear(3);
        store.set_state(PersonId(1), HealthState::Infected, 0);
        store.set_state(PersonId(1), HealthState::Dead, 1);
        assert_eq!(store.len(), 3);
        assert_eq!(store.schedule(), ids(&[0, 1, 2]));
        assert_eq!(store.neighbors_of(PersonId(0)), ids(&[1, 2]));
    }

    #[test]
    fn spatial_death_leaves_schedule_and_grid() {
        let mut store = spatial_store();
        store.set_state(PersonId(1), HealthState::Infected, 0);
        store.set_state(PersonId(1), HealthState::Dead, 2);

        assert_eq!(store.schedule(), ids(&[0, 2, 3]));
        assert_eq!(store.neighbors_of(PersonId(0)), ids(&[0, 3]));
        assert_eq!(store.count(HealthState::Dead), 1);
        assert_eq!(store.len(), 4);
        // The record and last position persist.
        assert_eq!(store.individual(PersonId(1)).position(), Some(Position::new(0, 0)));
        assert_eq!(store.state(PersonId(1)), HealthState::Dead);
    }

    #[test]
    fn move_updates_grid() {
        let mut store = spatial_store();
        store.move_to(PersonId(2), Position::new(0, 0));
        assert_eq!(store.neighbors_of(PersonId(0)), ids(&[0, 1, 3, 2]));
        assert_eq!(store.individual(PersonId(2)).home_position(), Some(Position::new(1, 1)));

        store.set_target(PersonId(2), Some(Position::new(3, 3)));
        assert_eq!(store.individual(PersonId(2)).target_position(), Some(Position::new(3, 3)));
    }

    #[test]
    fn symptoms_follow_infection_age() {
        let mut store = spatial_store();
        assert!(!store.individual(PersonId(0)).is_symptomatic(10, 0));
        store.set_state(PersonId(0), HealthState::Infected, 4);
        let individual = store.individual(PersonId(0));
        assert_eq!(individual.infection_age(9), Some(5));
        assert!(!individual.is_symptomatic(7, 4));
        assert!(individual.is_symptomatic(8, 4));
        assert!(individual.stays_home_when_symptomatic());
    }

    #[test]
    #[should_panic(expected = "illegal health state transition")]
    fn dead_cannot_recover() {
        let mut store = PopulationStore::linear(1);
        store.set_state(PersonId(0), HealthState::Infected, 0);
        store.set_state(PersonId(0), HealthState::Dead, 1);
        store.set_state(PersonId(0), HealthState::Recovered, 2);
    }

    #[test]
    #[should_panic(expected = "illegal health state transition")]
    fn recovered_cannot_be_reinfected() {
        let mut store = PopulationStore::linear(1);
        store.set_state(PersonId(0), HealthState::Infected, 0);
        store.set_state(PersonId(0), HealthState::Recovered, 1);
        store.set_state(PersonId(0), HealthState::Infected, 2);
    }

    #[test]
    #[should_panic(expected = "no position")]
    fn linear_individuals_cannot_move() {
        let mut store = PopulationStore::linear(2);
        store.move_to(PersonId(0), Position::new(0, 0));
    }
}
