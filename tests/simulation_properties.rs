use assert_approx_eq::assert_approx_eq;
use episim::parameters::{
    LinearParameters, Parameters, RecoveryPolicy, SpatialParameters, TopologyParameters,
};
use episim::population::grid::Neighborhood;
use episim::{HealthState, Simulation, StepRecord};

fn linear(
    population_size: usize,
    initial_infected: usize,
    transmission_rate: f64,
    mortality_rate: f64,
    recovery: RecoveryPolicy,
) -> Parameters {
    Parameters {
        population_size,
        initial_infected,
        transmission_rate,
        mortality_rate,
        seed: 12,
        max_steps: None,
        topology: TopologyParameters::Linear(LinearParameters { recovery }),
    }
}

fn small_spatial(seed: u64) -> Parameters {
    Parameters {
        population_size: 60,
        initial_infected: 3,
        transmission_rate: 0.6,
        mortality_rate: 0.05,
        seed,
        max_steps: Some(80),
        topology: TopologyParameters::Spatial(SpatialParameters {
            width: 6,
            height: 6,
            torus: true,
            neighborhood: Neighborhood::Moore,
            incubation_period: 2,
            treatment_period: 6,
            stay_at_home: true,
            destination_size: 3,
            vaccination_interval: 5,
            vaccination_batch_size: 3,
            vaccination_start: 5,
            vaccine_transmission_factor: 0.05,
        }),
    }
}

fn states(simulation: &Simulation) -> Vec<HealthState> {
    simulation
        .population()
        .iter()
        .map(|(_, individual)| individual.health_state())
        .collect()
}

/// Steps until finished or `max_steps`, checking the per-step bookkeeping and the legality of
/// every individual's transition along the way.
fn run_checked(simulation: &mut Simulation, max_steps: u64) -> Vec<StepRecord> {
    let population_size = simulation.parameters().population_size;
    let mut records = Vec::new();
    let mut before = states(simulation);
    let mut infected_at: Vec<Option<u64>> = simulation
        .population()
        .iter()
        .map(|(_, individual)| individual.infected_at())
        .collect();

    while !simulation.is_finished() && simulation.current_step() < max_steps {
        let infected_before = simulation.counts().infected;
        let record = simulation.step();

        assert_eq!(record.counts().total(), population_size);
        assert_eq!(record.counts(), simulation.counts());
        assert_eq!(
            record.infected + record.new_deaths + record.new_recoveries,
            infected_before + record.new_infections
        );

        let after = states(simulation);
        let mut changed = 0;
        for (index, (from, to)) in before.iter().zip(&after).enumerate() {
            if from != to {
                assert!(
                    from.can_transition_to(*to),
                    "individual {index}: {from} -> {to} at step {}",
                    record.step
                );
                changed += 1;
            }
        }
        assert_eq!(
            changed,
            record.new_infections
                + record.new_deaths
                + record.new_recoveries
                + record.new_vaccinations
        );

        for (index, (_, individual)) in simulation.population().iter().enumerate() {
            if before[index] == HealthState::Infected && after[index] == HealthState::Infected {
                assert_eq!(individual.infected_at(), infected_at[index]);
            }
            infected_at[index] = individual.infected_at();
        }

        before = after;
        records.push(record);
    }
    records
}

#[test]
fn deterministic_replay_linear() {
    let parameters = linear(300, 4, 0.3, 0.02, RecoveryPolicy::FixedRate { recovery_rate: 0.8 });
    let first = Simulation::new(parameters.clone())
        .unwrap()
        .run_to_completion(Some(200));
    let second = Simulation::new(parameters).unwrap().run_to_completion(Some(200));
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn deterministic_replay_spatial() {
    let first = Simulation::new(small_spatial(5))
        .unwrap()
        .run_to_completion(Some(80));
    let mut replay = Simulation::new(small_spatial(5)).unwrap();
    let second = replay.run_to_completion(Some(80));
    assert_eq!(first, second);

    let mut again = Simulation::new(small_spatial(5)).unwrap();
    again.run_to_completion(Some(80));
    assert_eq!(again.snapshot(), replay.snapshot());
}

#[test]
fn bookkeeping_holds_every_step_linear() {
    for seed in 0..5 {
        let mut parameters = linear(
            200,
            5,
            0.4,
            0.05,
            RecoveryPolicy::FixedDuration { recovery_time: 4 },
        );
        parameters.seed = seed;
        let mut simulation = Simulation::new(parameters).unwrap();
        let records = run_checked(&mut simulation, 5000);
        assert!(simulation.is_finished());
        assert!(records.iter().all(|record| record.new_vaccinations == 0));
        assert_eq!(simulation.counts().vaccinated, 0);
    }
}

#[test]
fn bookkeeping_holds_every_step_spatial() {
    for seed in 0..5 {
        let mut simulation = Simulation::new(small_spatial(seed)).unwrap();
        run_checked(&mut simulation, 80);

        let population = simulation.population();
        let active = population.schedule().len();
        assert_eq!(simulation.counts().dead, population.len() - active);
        assert_eq!(simulation.snapshot().agents.len(), 60);
    }
}

#[test]
fn dead_is_absorbing() {
    let mut simulation = Simulation::new(linear(
        100,
        100,
        0.0,
        0.3,
        RecoveryPolicy::FixedRate { recovery_rate: 1.0 },
    ))
    .unwrap();
    let mut dead_so_far = Vec::new();
    while !simulation.is_finished() {
        simulation.step();
        for &id in &dead_so_far {
            assert_eq!(simulation.population().state(id), HealthState::Dead);
        }
        dead_so_far = simulation
            .population()
            .iter()
            .filter(|(_, individual)| individual.health_state() == HealthState::Dead)
            .map(|(id, _)| id)
            .collect();
    }
    // Nobody recovers with a recovery rate of one, so everyone eventually dies.
    assert_eq!(simulation.counts().dead, 100);
}

#[test]
fn no_initial_infections_terminates_immediately() {
    let mut linear_run = Simulation::new(linear(
        50,
        0,
        1.0,
        0.0,
        RecoveryPolicy::FixedDuration { recovery_time: 3 },
    ))
    .unwrap();
    assert!(linear_run.is_finished());
    assert!(linear_run.run_to_completion(None).is_empty());
    assert_eq!(linear_run.current_step(), 0);

    let mut parameters = small_spatial(1);
    parameters.initial_infected = 0;
    let spatial_run = Simulation::new(parameters).unwrap();
    assert!(spatial_run.is_finished());
    assert_eq!(spatial_run.current_step(), 0);
}

#[test]
#[should_panic(expected = "finished simulation")]
fn stepping_after_termination_panics() {
    let mut simulation = Simulation::new(linear(
        20,
        2,
        0.0,
        0.0,
        RecoveryPolicy::FixedDuration { recovery_time: 1 },
    ))
    .unwrap();
    simulation.run_to_completion(None);
    assert!(simulation.is_finished());
    simulation.step();
}

#[test]
fn full_contact_infects_whole_row_without_regressing() {
    let mut simulation = Simulation::new(linear(
        100,
        1,
        1.0,
        0.0,
        RecoveryPolicy::FixedRate { recovery_rate: 1.0 },
    ))
    .unwrap();
    let mut infected = simulation.counts().infected;
    for _ in 0..100 {
        let record = simulation.step();
        assert!(record.infected >= infected);
        assert_eq!(record.new_deaths, 0);
        assert_eq!(record.new_recoveries, 0);
        infected = record.infected;
        if infected == 100 {
            break;
        }
    }
    assert_eq!(infected, 100);
    // Nobody left to infect, yet the infected remain: the run goes on.
    assert_eq!(simulation.counts().susceptible, 0);
    assert!(!simulation.is_finished());
}

#[test]
fn vaccination_drives_follow_schedule_and_clamp() {
    let parameters = Parameters {
        population_size: 175,
        initial_infected: 1,
        transmission_rate: 0.0,
        mortality_rate: 0.0,
        seed: 3,
        max_steps: None,
        topology: TopologyParameters::Spatial(SpatialParameters {
            width: 20,
            height: 20,
            torus: true,
            neighborhood: Neighborhood::Moore,
            incubation_period: 1000,
            treatment_period: 1000,
            stay_at_home: false,
            destination_size: 10,
            vaccination_interval: 10,
            vaccination_batch_size: 40,
            vaccination_start: 50,
            vaccine_transmission_factor: 0.05,
        }),
    };
    let mut simulation = Simulation::new(parameters).unwrap();
    let records = simulation.run_to_completion(Some(150));
    assert_eq!(records.len(), 150);

    let drives: Vec<(u64, usize)> = records
        .iter()
        .filter(|record| record.new_vaccinations > 0)
        // The drive runs while the step counter reads `record.step - 1`.
        .map(|record| (record.step - 1, record.new_vaccinations))
        .collect();
    assert_eq!(
        drives,
        vec![(50, 40), (60, 40), (70, 40), (80, 40), (90, 14)]
    );
    assert!(records
        .iter()
        .filter(|record| record.step <= 50)
        .all(|record| record.vaccinated == 0));
    assert_eq!(simulation.counts().vaccinated, 174);
    assert_eq!(simulation.counts().susceptible, 0);
}

#[test]
fn default_spatial_vaccinates_at_most_ten_per_drive() {
    let mut simulation = Simulation::new(Parameters::spatial_default()).unwrap();
    let records = simulation.run_to_completion(Some(100));
    for record in &records {
        let step = record.step - 1;
        if step < 50 || step % 10 != 0 {
            assert_eq!(record.new_vaccinations, 0, "step {step}");
        } else {
            assert!(record.new_vaccinations <= 10);
        }
    }
}

#[test]
fn fixed_rate_recovery_probability() {
    let mut simulation = Simulation::new(linear(
        10_000,
        10_000,
        0.0,
        0.0,
        RecoveryPolicy::FixedRate { recovery_rate: 0.3 },
    ))
    .unwrap();
    let record = simulation.step();
    assert_approx_eq!(record.new_recoveries as f64 / 10_000.0, 0.7, 0.02);
}

#[test]
fn mortality_probability() {
    let mut simulation = Simulation::new(linear(
        10_000,
        10_000,
        0.0,
        0.1,
        RecoveryPolicy::FixedRate { recovery_rate: 1.0 },
    ))
    .unwrap();
    let record = simulation.step();
    assert_approx_eq!(record.new_deaths as f64 / 10_000.0, 0.1, 0.02);
}

#[test]
fn fixed_duration_recovers_on_schedule() {
    let mut simulation = Simulation::new(linear(
        10,
        10,
        0.0,
        0.0,
        RecoveryPolicy::FixedDuration { recovery_time: 5 },
    ))
    .unwrap();
    let records = simulation.run_to_completion(None);
    // Infected at step 0, recovered during the pass at step 5.
    assert_eq!(records.len(), 6);
    assert_eq!(records[5].new_recoveries, 10);
    assert!(records[..5].iter().all(|record| record.new_recoveries == 0));
}

#[test]
fn cap_from_parameters_bounds_default_spatial_run() {
    let parameters = Parameters::spatial_default();
    let cap = parameters.max_steps;
    let mut simulation = Simulation::new(parameters).unwrap();
    let records = simulation.run_to_completion(cap);
    assert!(records.len() <= 100);
}
