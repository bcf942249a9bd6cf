//! CSV reports of per-step output.
//!
//! A report type is any `Serialize` struct registered with [`create_report_trait!`]. Each type
//! is written to its own file, `<directory>/<file_prefix><name>.csv`, opened with
//! [`Reports::add_report`]. Rows are appended with [`Reports::send_report`].
use std::any::TypeId;
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EpiError;
use crate::health::HealthState;
use crate::statistics::{IncidenceRecord, Snapshot, StepRecord};

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use create_report_trait;

/// Where report files go and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Replace report files that already exist instead of failing.
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            directory: PathBuf::from("."),
            file_prefix: String::new(),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    pub fn directory(&mut self, directory: PathBuf) -> &mut Self {
        self.directory = directory;
        self
    }

    pub fn file_prefix(&mut self, file_prefix: impl Into<String>) -> &mut Self {
        self.file_prefix = file_prefix.into();
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn path_for(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{short_name}.csv", self.file_prefix))
    }
}

/// The open report files of a run, one per report type.
#[derive(Default)]
pub struct Reports {
    options: ReportOptions,
    file_writers: HashMap<TypeId, Writer<File>>,
}

impl Reports {
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Reports {
            options,
            file_writers: HashMap::new(),
        }
    }

    /// Opens `<directory>/<file_prefix><short_name>.csv` for reports of type `T`, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::ReportError` if the file exists and overwriting is off, or an
    /// `EpiError::IoError` if the file cannot be created.
    pub fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpiError> {
        let path = self.options.path_for(short_name);
        if path.exists() && !self.options.overwrite {
            return Err(EpiError::ReportError(format!(
                "report file {} already exists; pass --force-overwrite to replace it",
                path.display()
            )));
        }
        create_dir_all(&self.options.directory)?;
        let file = File::create(&path)?;
        debug!("writing {short_name} report to {}", path.display());
        self.file_writers
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    #[must_use]
    pub fn is_open<T: Report>(&self) -> bool {
        self.file_writers.contains_key(&TypeId::of::<T>())
    }

    /// Writes a new row with columns following the fields of `report` to the file for its type.
    ///
    /// # Errors
    ///
    /// Returns an `EpiError` if no file was added for this report type, or if the row cannot be
    /// written.
    pub fn send_report<T: Report>(&mut self, report: T) -> Result<(), EpiError> {
        let writer = self
            .file_writers
            .get_mut(&report.type_id())
            .ok_or_else(|| EpiError::ReportError("No writer found for the report type".into()))?;
        report.serialize(writer)?;
        Ok(())
    }

    /// Flushes every open report file.
    ///
    /// # Errors
    ///
    /// Returns an `EpiError::IoError` if a file cannot be flushed.
    pub fn flush(&mut self) -> Result<(), EpiError> {
        for writer in self.file_writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// New cases and deaths per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceReportItem {
    pub replicate: u64,
    pub step: u64,
    pub new_infections: usize,
    pub new_deaths: usize,
    pub total_infected: usize,
}

impl IncidenceReportItem {
    #[must_use]
    pub fn new(replicate: u64, record: &StepRecord) -> Self {
        let incidence = IncidenceRecord::from(record);
        IncidenceReportItem {
            replicate,
            step: incidence.step,
            new_infections: incidence.new_infections,
            new_deaths: incidence.new_deaths,
            total_infected: incidence.total_infected,
        }
    }
}

create_report_trait!(IncidenceReportItem);

/// How many individuals are in each state after each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceReportItem {
    pub replicate: u64,
    pub step: u64,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    pub vaccinated: usize,
    pub dead: usize,
    pub new_recoveries: usize,
    pub new_vaccinations: usize,
}

impl PrevalenceReportItem {
    #[must_use]
    pub fn new(replicate: u64, record: &StepRecord) -> Self {
        PrevalenceReportItem {
            replicate,
            step: record.step,
            susceptible: record.susceptible,
            infected: record.infected,
            recovered: record.recovered,
            vaccinated: record.vaccinated,
            dead: record.dead,
            new_recoveries: record.new_recoveries,
            new_vaccinations: record.new_vaccinations,
        }
    }
}

create_report_trait!(PrevalenceReportItem);

/// One row per agent per step: its state and cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReportItem {
    pub replicate: u64,
    pub step: u64,
    pub id: usize,
    pub state: HealthState,
    pub x: Option<u32>,
    pub y: Option<u32>,
}

impl AgentReportItem {
    /// One row for every agent in `snapshot`.
    #[must_use]
    pub fn from_snapshot(replicate: u64, snapshot: &Snapshot) -> Vec<Self> {
        snapshot
            .agents
            .iter()
            .map(|agent| AgentReportItem {
                replicate,
                step: snapshot.step,
                id: agent.id.index(),
                state: agent.state,
                x: agent.position.map(|position| position.x),
                y: agent.position.map(|position| position.y),
            })
            .collect()
    }
}

create_report_trait!(AgentReportItem);
