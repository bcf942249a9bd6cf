//! A simulation run: one population, one seeded random source and the rules that advance them.
//!
//! Each call to [`Simulation::step`] visits every scheduled individual once, in ascending id
//! order:
//!
//! 1. the dead are skipped;
//! 2. the infected go through progression (a mortality check, then a recovery check);
//! 3. the susceptible and the vaccinated are exposed to their infected neighbours.
//!
//! Because the scan is sequential, an individual infected earlier in the pass is already
//! infectious to those visited after it. In the spatial topology every living agent then
//! commutes, and a vaccination drive runs if one is due. Finally the running infected tally is
//! reconciled and the step counter advances.
use log::{debug, trace};
use strum::IntoEnumIterator;

use crate::define_rng;
use crate::error::EpiError;
use crate::health::HealthState;
use crate::movement::{commute, draw_destinations};
use crate::parameters::{Parameters, TopologyParameters};
use crate::population::grid::{Grid, Position};
use crate::population::{PersonId, PopulationStore};
use crate::progression::{progress_infection, ProgressionOutcome, RecoveryRule};
use crate::random::RngStore;
use crate::statistics::{Snapshot, StateCounts, StepRecord};
use crate::transmission::{expose, TransmissionRule};
use crate::vaccination::VaccinationScheduler;

define_rng!(pub SeedingRng);

/// Behaviour that only exists in the spatial topology.
#[derive(Debug, Clone)]
struct SpatialBehavior {
    destinations: Vec<Position>,
    incubation_period: u64,
    vaccination: VaccinationScheduler,
}

pub struct Simulation {
    parameters: Parameters,
    population: PopulationStore,
    rngs: RngStore,
    recovery: RecoveryRule,
    transmission: TransmissionRule,
    spatial: Option<SpatialBehavior>,
    current_step: u64,
    infected_count: usize,
}

impl Simulation {
    /// Validates `parameters`, builds the population and infects `initial_infected` distinct
    /// individuals chosen uniformly at random at step 0.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::InvalidParameter` if any parameter is out of range.
    pub fn new(parameters: Parameters) -> Result<Self, EpiError> {
        parameters.validate()?;
        let mut rngs = RngStore::new(parameters.seed);

        let (population, spatial, vaccine_transmission_factor) = match &parameters.topology {
            TopologyParameters::Linear(_) => {
                (PopulationStore::linear(parameters.population_size), None, 1.0)
            }
            TopologyParameters::Spatial(spatial) => {
                let destinations = draw_destinations(
                    &mut rngs,
                    spatial.width,
                    spatial.height,
                    spatial.destination_size,
                );
                let homes: Vec<Position> = (0..parameters.population_size)
                    .map(|_| {
                        let x = rngs.sample_range(SeedingRng, 0..spatial.width);
                        let y = rngs.sample_range(SeedingRng, 0..spatial.height);
                        Position::new(x, y)
                    })
                    .collect();
                let grid = Grid::new(
                    spatial.width,
                    spatial.height,
                    spatial.torus,
                    spatial.neighborhood,
                );
                let behavior = SpatialBehavior {
                    destinations,
                    incubation_period: spatial.incubation_period,
                    vaccination: VaccinationScheduler::from_parameters(spatial),
                };
                (
                    PopulationStore::spatial(grid, &homes, spatial.stay_at_home),
                    Some(behavior),
                    spatial.vaccine_transmission_factor,
                )
            }
        };

        let mut simulation = Simulation {
            recovery: RecoveryRule::from_topology(&parameters.topology),
            transmission: TransmissionRule {
                transmission_rate: parameters.transmission_rate,
                vaccine_transmission_factor,
            },
            parameters,
            population,
            rngs,
            spatial,
            current_step: 0,
            infected_count: 0,
        };
        simulation.seed_infections();
        debug!(
            "created {} simulation of {} individuals with seed {}",
            if simulation.population.is_spatial() {
                "spatial"
            } else {
                "linear"
            },
            simulation.population.len(),
            simulation.rngs.base_seed()
        );
        Ok(simulation)
    }

    fn seed_infections(&mut self) {
        let everyone: Vec<PersonId> = self.population.schedule();
        let seeds = self.rngs.sample_without_replacement(
            SeedingRng,
            &everyone,
            self.parameters.initial_infected,
        );
        for &person_id in &seeds {
            self.population
                .set_state(person_id, HealthState::Infected, self.current_step);
        }
        self.infected_count = seeds.len();
        debug!("seeded {} initial infections: {seeds:?}", seeds.len());
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn population(&self) -> &PopulationStore {
        &self.population
    }

    /// Number of completed steps.
    #[must_use]
    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// The running infected tally, adjusted incrementally at the end of every step.
    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.infected_count
    }

    /// The shared destination set. Empty in the linear topology.
    #[must_use]
    pub fn destinations(&self) -> &[Position] {
        match &self.spatial {
            Some(spatial) => &spatial.destinations,
            None => &[],
        }
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        StateCounts::from_population(&self.population)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.population, self.current_step, self.destinations())
    }

    /// Whether the driving loop should stop. The run is over when nobody is infected, or when
    /// nobody is left who is either susceptible or infected. Both conditions are checked.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let infected = self.infected_count;
        let susceptible = self.population.count(HealthState::Susceptible);
        let no_infections = infected == 0;
        let nobody_at_risk_or_ill = susceptible == 0 && infected == 0;
        no_infections || nobody_at_risk_or_ill
    }

    /// Advances the simulation by one step and reports what happened.
    ///
    /// # Panics
    ///
    /// Panics if the simulation has already finished, or if the running infected tally no
    /// longer matches the population.
    pub fn step(&mut self) -> StepRecord {
        assert!(
            !self.is_finished(),
            "step called on a finished simulation (step {})",
            self.current_step
        );
        let step = self.current_step;
        let mut record = StepRecord::default();

        for person_id in self.population.schedule() {
            match self.population.state(person_id) {
                HealthState::Dead | HealthState::Recovered => {}
                HealthState::Infected => {
                    match progress_infection(
                        &mut self.population,
                        &mut self.rngs,
                        person_id,
                        step,
                        self.parameters.mortality_rate,
                        self.recovery,
                    ) {
                        Some(ProgressionOutcome::Died) => record.new_deaths += 1,
                        Some(ProgressionOutcome::Recovered) => record.new_recoveries += 1,
                        None => {}
                    }
                }
                HealthState::Susceptible | HealthState::Vaccinated => {
                    if expose(
                        &mut self.population,
                        &mut self.rngs,
                        person_id,
                        step,
                        self.transmission,
                    )
                    .is_some()
                    {
                        record.new_infections += 1;
                    }
                }
            }
        }

        if let Some(spatial) = &self.spatial {
            for person_id in self.population.schedule() {
                commute(
                    &mut self.population,
                    &mut self.rngs,
                    person_id,
                    step,
                    &spatial.destinations,
                    spatial.incubation_period,
                );
            }
            record.new_vaccinations = spatial
                .vaccination
                .run(&mut self.population, &mut self.rngs, step)
                .len();
        }

        self.infected_count =
            self.infected_count + record.new_infections - record.new_deaths - record.new_recoveries;
        let tabulated = self.population.tabulate();
        assert_eq!(
            self.infected_count,
            tabulated[HealthState::Infected.index()],
            "infected tally drifted at step {step}"
        );
        debug_assert!(
            HealthState::iter()
                .all(|state| tabulated[state.index()] == self.population.count(state)),
            "state tallies drifted at step {step}"
        );

        self.current_step += 1;
        let counts = self.counts();
        record.step = self.current_step;
        record.susceptible = counts.susceptible;
        record.infected = counts.infected;
        record.recovered = counts.recovered;
        record.vaccinated = counts.vaccinated;
        record.dead = counts.dead;
        trace!("{record:?}");
        record
    }

    /// Steps until the run is finished or `max_steps` steps have been taken, whichever comes
    /// first, and returns one record per step.
    pub fn run_to_completion(&mut self, max_steps: Option<u64>) -> Vec<StepRecord> {
        let mut records = Vec::new();
        while !self.is_finished() && max_steps.is_none_or(|max| self.current_step < max) {
            records.push(self.step());
        }
        records
    }
}
