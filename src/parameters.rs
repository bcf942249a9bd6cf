//! Simulation parameters: the configuration schema, built-in defaults, JSON loading and
//! range validation.
//!
//! Parameters are validated before any simulation is built from them. Out-of-range values are
//! rejected with [`EpiError::InvalidParameter`] naming the offending field; nothing is clamped.
//!
//! A linear configuration file looks like:
//!
//! ```json
//! {
//!     "population_size": 1000,
//!     "initial_infected": 10,
//!     "transmission_rate": 0.1,
//!     "mortality_rate": 0.01,
//!     "seed": 42,
//!     "topology": {
//!         "type": "linear",
//!         "recovery": { "kind": "fixed_duration", "recovery_time": 14 }
//!     }
//! }
//! ```
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EpiError;
use crate::population::grid::Neighborhood;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub population_size: usize,
    pub initial_infected: usize,
    /// Per-contact infection probability. Spatial configurations may call it `infection_prob`.
    #[serde(alias = "infection_prob")]
    pub transmission_rate: f64,
    pub mortality_rate: f64,
    #[serde(default)]
    pub seed: u64,
    /// Optional cap on the number of steps the driving loop will run.
    #[serde(default)]
    pub max_steps: Option<u64>,
    pub topology: TopologyParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopologyParameters {
    Linear(LinearParameters),
    Spatial(SpatialParameters),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParameters {
    pub recovery: RecoveryPolicy,
}

/// How an infected individual in the linear engine recovers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Recover on any step whose uniform draw is at least `recovery_rate`, so the per-step
    /// recovery probability is `1 - recovery_rate`.
    FixedRate { recovery_rate: f64 },
    /// Recover deterministically once the infection is `recovery_time` steps old.
    FixedDuration { recovery_time: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialParameters {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_torus")]
    pub torus: bool,
    #[serde(default)]
    pub neighborhood: Neighborhood,
    pub incubation_period: u64,
    pub treatment_period: u64,
    #[serde(default)]
    pub stay_at_home: bool,
    pub destination_size: usize,
    pub vaccination_interval: u64,
    #[serde(default)]
    pub vaccination_batch_size: usize,
    #[serde(default)]
    pub vaccination_start: u64,
    /// Multiplier applied to the transmission probability when the exposed individual is
    /// vaccinated.
    #[serde(default = "default_vaccine_transmission_factor")]
    pub vaccine_transmission_factor: f64,
}

fn default_torus() -> bool {
    true
}

fn default_vaccine_transmission_factor() -> f64 {
    0.05
}

fn check_probability(parameter: &'static str, value: f64) -> Result<(), EpiError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EpiError::invalid_parameter(
            parameter,
            format!("must be a probability in [0, 1], got {value}"),
        ))
    }
}

fn check_positive(parameter: &'static str, value: u64) -> Result<(), EpiError> {
    if value > 0 {
        Ok(())
    } else {
        Err(EpiError::invalid_parameter(parameter, "must be positive"))
    }
}

impl Parameters {
    /// The linear-population defaults: a thousand people in a row with ten initial cases and a
    /// two-week illness.
    #[must_use]
    pub fn linear_default() -> Self {
        Parameters {
            population_size: 1000,
            initial_infected: 10,
            transmission_rate: 0.1,
            mortality_rate: 0.01,
            seed: 0,
            max_steps: None,
            topology: TopologyParameters::Linear(LinearParameters {
                recovery: RecoveryPolicy::FixedDuration { recovery_time: 14 },
            }),
        }
    }

    /// The spatial-grid defaults: 175 commuting agents on a 20x20 torus with a vaccination
    /// campaign starting at step 50, run for at most 100 steps.
    #[must_use]
    pub fn spatial_default() -> Self {
        Parameters {
            population_size: 175,
            initial_infected: 1,
            transmission_rate: 0.7,
            mortality_rate: 0.005,
            seed: 0,
            max_steps: Some(100),
            topology: TopologyParameters::Spatial(SpatialParameters {
                width: 20,
                height: 20,
                torus: true,
                neighborhood: Neighborhood::Moore,
                incubation_period: 8,
                treatment_period: 14,
                stay_at_home: false,
                destination_size: 10,
                vaccination_interval: 10,
                vaccination_batch_size: 10,
                vaccination_start: 50,
                vaccine_transmission_factor: default_vaccine_transmission_factor(),
            }),
        }
    }

    #[must_use]
    pub fn is_spatial(&self) -> bool {
        matches!(self.topology, TopologyParameters::Spatial(_))
    }

    /// Parses and validates parameters from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an `EpiError` if the document is malformed or a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, EpiError> {
        let parameters: Parameters = serde_json::from_str(json)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Checks every value against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::InvalidParameter` for the first value that is out of range.
    pub fn validate(&self) -> Result<(), EpiError> {
        check_positive("population_size", self.population_size as u64)?;
        if self.initial_infected > self.population_size {
            return Err(EpiError::invalid_parameter(
                "initial_infected",
                format!(
                    "must not exceed population_size ({}), got {}",
                    self.population_size, self.initial_infected
                ),
            ));
        }
        check_probability("transmission_rate", self.transmission_rate)?;
        check_probability("mortality_rate", self.mortality_rate)?;

        match &self.topology {
            TopologyParameters::Linear(linear) => match linear.recovery {
                RecoveryPolicy::FixedRate { recovery_rate } => {
                    check_probability("recovery_rate", recovery_rate)
                }
                RecoveryPolicy::FixedDuration { .. } => Ok(()),
            },
            TopologyParameters::Spatial(spatial) => spatial.validate(),
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::linear_default()
    }
}

impl SpatialParameters {
    fn validate(&self) -> Result<(), EpiError> {
        check_positive("width", u64::from(self.width))?;
        check_positive("height", u64::from(self.height))?;
        if self.treatment_period < self.incubation_period {
            return Err(EpiError::invalid_parameter(
                "treatment_period",
                format!(
                    "must be at least incubation_period ({}), got {}",
                    self.incubation_period, self.treatment_period
                ),
            ));
        }
        check_positive("destination_size", self.destination_size as u64)?;
        check_positive("vaccination_interval", self.vaccination_interval)?;
        check_probability(
            "vaccine_transmission_factor",
            self.vaccine_transmission_factor,
        )
    }
}

/// Reads, parses and validates a parameters file.
///
/// # Errors
///
/// Returns an `EpiError` if the file cannot be read, is not valid JSON for [`Parameters`], or
/// holds an out-of-range value.
pub fn load_parameters_from_json(file_path: &Path) -> Result<Parameters, EpiError> {
    debug!("loading parameters from {}", file_path.display());
    let json = fs::read_to_string(file_path)?;
    Parameters::from_json_str(&json)
}
