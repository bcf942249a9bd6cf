//! Commuting for spatial agents.
//!
//! Every agent oscillates between its home and a destination drawn from the shared destination
//! set. Arriving home picks a fresh destination; arriving at the destination points the agent
//! back home. The target only steers the agent's intent: the cell it actually moves into each step
//! is drawn uniformly from the neighbourhood of its current cell.
//!
//! A symptomatic agent that stays home when ill does not move at all while it is at home, and has
//! its target reset to home while it is anywhere else.
use crate::define_rng;
use crate::population::grid::Position;
use crate::population::{PersonId, PopulationStore};
use crate::random::RngStore;

define_rng!(pub MovementRng);

/// Draws `count` destination cells uniformly over a `width` x `height` grid. Destinations may
/// repeat.
pub(crate) fn draw_destinations(
    rngs: &mut RngStore,
    width: u32,
    height: u32,
    count: usize,
) -> Vec<Position> {
    (0..count)
        .map(|_| {
            let x = rngs.sample_range(MovementRng, 0..width);
            let y = rngs.sample_range(MovementRng, 0..height);
            Position::new(x, y)
        })
        .collect()
}

/// Updates the commute target of `person_id` and moves it one cell. Returns the new position,
/// or `None` if the agent stayed where it was.
pub(crate) fn commute(
    population: &mut PopulationStore,
    rngs: &mut RngStore,
    person_id: PersonId,
    step: u64,
    destinations: &[Position],
    incubation_period: u64,
) -> Option<Position> {
    let individual = population.individual(person_id);
    let (Some(commute), Some(position)) = (individual.commute(), individual.position()) else {
        return None;
    };
    let quarantined = individual.stays_home_when_symptomatic()
        && individual.is_symptomatic(step, incubation_period);

    if position == commute.home {
        let target = rngs.sample_element(MovementRng, destinations);
        population.set_target(person_id, target);
        if quarantined {
            return None;
        }
    } else if Some(position) == commute.target {
        population.set_target(person_id, Some(commute.home));
    }
    if quarantined {
        population.set_target(person_id, Some(commute.home));
    }

    let candidates = population.movement_candidates(person_id);
    let next = rngs.sample_element(MovementRng, &candidates)?;
    population.move_to(person_id, next);
    Some(next)
}
