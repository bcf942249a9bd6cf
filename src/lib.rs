//! An agent-based epidemic simulation engine
//!
//! A [`Simulation`](simulation::Simulation) advances a fixed population through discrete time
//! steps. In every step each individual is visited once, in ascending id order: the infected may
//! die or recover, and the susceptible may catch the disease from an infected neighbour. Two
//! topologies decide who counts as a neighbour:
//! * Linear: individuals stand in a row and contact the two people on either side of them.
//! * Spatial: agents live on a 2D grid and contact everyone sharing their cell. They commute
//!   between a home and a shared set of destinations, may stay home once symptomatic, and are
//!   vaccinated in scheduled drives.
//!
//! Every run is reproducible: all randomness comes from one seeded [`RngStore`](random::RngStore)
//! owned by the simulation.
//!
//! ```
//! use episim::parameters::Parameters;
//! use episim::simulation::Simulation;
//!
//! let mut simulation = Simulation::new(Parameters::linear_default()).unwrap();
//! while !simulation.is_finished() {
//!     let record = simulation.step();
//!     assert_eq!(record.counts().total(), 1000);
//! }
//! ```
pub mod error;
pub mod execution_stats;
pub mod hashing;
pub mod health;
pub mod log;
pub mod movement;
pub mod parameters;
pub mod population;
pub mod progression;
pub mod random;
pub mod report;
pub mod runner;
pub mod simulation;
pub mod statistics;
pub mod transmission;
pub mod vaccination;

// Re-exports for use in `define_rng!` and by downstream code
pub use rand;

pub use error::EpiError;
pub use hashing::HashMap;
pub use health::HealthState;
pub use parameters::Parameters;
pub use population::PersonId;
pub use simulation::Simulation;
pub use statistics::{StateCounts, StepRecord};
