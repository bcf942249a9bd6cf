//! The command-line driver: builds parameters from a config file, a mode's defaults and flags,
//! then runs one or more replicates to completion while writing reports.
use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _, ValueEnum};
use log::{debug, info, LevelFilter};
use serde::Serialize;

use crate::error::EpiError;
use crate::execution_stats::{log_execution_statistics, ExecutionProfilingCollector};
use crate::log::{set_log_level, set_module_filter};
use crate::parameters::{load_parameters_from_json, Parameters};
use crate::report::{
    AgentReportItem, IncidenceReportItem, PrevalenceReportItem, ReportOptions, Reports,
};
use crate::simulation::Simulation;
use crate::statistics::{IncidenceRecord, StateCounts, StepRecord};

fn parse_log_level(level: &str) -> Result<LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("`{level}` is not one of off, error, warn, info, debug, trace"))
}

fn parse_module_filter(filter: &str) -> Result<(String, LevelFilter), String> {
    let (module, level) = filter
        .split_once('=')
        .ok_or_else(|| format!("`{filter}` is not of the form <module>=<level>"))?;
    if module.is_empty() {
        return Err(format!("`{filter}` names no module"));
    }
    Ok((module.to_string(), parse_log_level(level)?))
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Linear,
    Spatial,
}

/// Command line arguments for the `episim` binary
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Optional path to a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the built-in defaults for this topology. Ignored when a config file is given, unless
    /// it disagrees with the file.
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Random seed; overrides the seed in the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Stop after this many steps even if the epidemic is still running
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Number of independent runs. Replicate `r` uses the base seed plus `r`.
    #[arg(long, default_value_t = 1)]
    pub replicates: u64,

    /// Directory for CSV reports. No reports are written without it.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prefix for report file names
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Replace report files that already exist
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Also write the state and cell of every agent after every step
    #[arg(long, requires = "output_dir")]
    pub agent_report: bool,

    /// Print each replicate's step records to stdout as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Enable logging at this level (error, warn, info, debug or trace)
    #[arg(long, value_parser = parse_log_level)]
    pub log_level: Option<LevelFilter>,

    /// Level for one module, e.g. `episim::movement=off`. May be repeated.
    #[arg(long = "log-filter", value_name = "MODULE=LEVEL", value_parser = parse_module_filter)]
    pub log_filters: Vec<(String, LevelFilter)>,
}

impl Default for BaseArgs {
    fn default() -> Self {
        BaseArgs {
            config: None,
            mode: None,
            random_seed: None,
            max_steps: None,
            replicates: 1,
            output_dir: None,
            file_prefix: String::new(),
            force_overwrite: false,
            agent_report: false,
            json: false,
            log_level: None,
            log_filters: Vec::new(),
        }
    }
}

/// The outcome of one replicate.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub replicate: u64,
    pub seed: u64,
    pub steps: u64,
    /// Whether the epidemic ended before the step cap.
    pub finished: bool,
    pub final_counts: StateCounts,
    pub records: Vec<StepRecord>,
}

#[must_use]
pub fn create_cli() -> Command {
    let cli = Command::new("episim")
        .about("Agent-based epidemic simulation on a line or a grid")
        .version(env!("CARGO_PKG_VERSION"));
    BaseArgs::augment_args(cli)
}

/// Parses `std::env::args` and runs the simulation.
///
/// # Errors
/// Returns an error if argument parsing, parameter loading, or report writing fails
pub fn run_with_args() -> Result<Vec<RunSummary>, Box<dyn std::error::Error>> {
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_base_args(args)?)
}

fn resolve_parameters(args: &BaseArgs) -> Result<Parameters, EpiError> {
    let mut parameters = match &args.config {
        Some(path) => {
            info!("Loading parameters from: {}", path.display());
            let parameters = load_parameters_from_json(path)?;
            let mode = if parameters.is_spatial() {
                Mode::Spatial
            } else {
                Mode::Linear
            };
            if let Some(requested) = args.mode.filter(|&requested| requested != mode) {
                return Err(EpiError::EpiError(format!(
                    "--mode {requested:?} contradicts the {mode:?} topology in {}",
                    path.display()
                )));
            }
            parameters
        }
        None => match args.mode.unwrap_or(Mode::Linear) {
            Mode::Linear => Parameters::linear_default(),
            Mode::Spatial => Parameters::spatial_default(),
        },
    };
    if let Some(seed) = args.random_seed {
        parameters.seed = seed;
    }
    if args.max_steps.is_some() {
        parameters.max_steps = args.max_steps;
    }
    parameters.validate()?;
    Ok(parameters)
}

fn open_reports(args: &BaseArgs) -> Result<Option<Reports>, EpiError> {
    let Some(output_dir) = &args.output_dir else {
        return Ok(None);
    };
    let mut options = ReportOptions::default();
    options
        .directory(output_dir.clone())
        .file_prefix(args.file_prefix.clone())
        .overwrite(args.force_overwrite);
    let mut reports = Reports::new(options);
    reports.add_report::<IncidenceReportItem>("incidence")?;
    reports.add_report::<PrevalenceReportItem>("prevalence")?;
    if args.agent_report {
        reports.add_report::<AgentReportItem>("agents")?;
    }
    Ok(Some(reports))
}

fn run_replicate(
    replicate: u64,
    parameters: Parameters,
    reports: &mut Option<Reports>,
) -> Result<RunSummary, EpiError> {
    let seed = parameters.seed;
    let max_steps = parameters.max_steps;
    let mut collector = ExecutionProfilingCollector::new();
    let mut simulation = Simulation::new(parameters)?;
    debug!("replicate {replicate} starting with seed {seed}");

    let agent_report = reports
        .as_ref()
        .is_some_and(Reports::is_open::<AgentReportItem>);
    if agent_report {
        if let Some(reports) = reports.as_mut() {
            for row in AgentReportItem::from_snapshot(replicate, &simulation.snapshot()) {
                reports.send_report(row)?;
            }
        }
    }

    let mut records = Vec::new();
    while !simulation.is_finished()
        && max_steps.is_none_or(|max| simulation.current_step() < max)
    {
        let record = simulation.step();
        info!(
            "Day {}: {} new infections, {} new deaths",
            record.step, record.new_infections, record.new_deaths
        );
        if let Some(reports) = reports.as_mut() {
            reports.send_report(IncidenceReportItem::new(replicate, &record))?;
            reports.send_report(PrevalenceReportItem::new(replicate, &record))?;
            if agent_report {
                for row in AgentReportItem::from_snapshot(replicate, &simulation.snapshot()) {
                    reports.send_report(row)?;
                }
            }
        }
        collector.refresh();
        records.push(record);
    }

    let stats =
        collector.compute_final_statistics(simulation.population().len(), simulation.current_step());
    log_execution_statistics(&stats);

    Ok(RunSummary {
        replicate,
        seed,
        steps: simulation.current_step(),
        finished: simulation.is_finished(),
        final_counts: simulation.counts(),
        records,
    })
}

/// Linear runs print the reduced incidence view, spatial runs the full step records.
fn json_line(spatial: bool, records: &[StepRecord]) -> Result<String, serde_json::Error> {
    if spatial {
        serde_json::to_string(records)
    } else {
        let incidence: Vec<IncidenceRecord> = records.iter().map(IncidenceRecord::from).collect();
        serde_json::to_string(&incidence)
    }
}

/// Runs every replicate described by `args` and returns their summaries.
///
/// # Errors
/// Returns an `EpiError` if the parameters are invalid or a report cannot be written
pub fn run_with_base_args(args: BaseArgs) -> Result<Vec<RunSummary>, EpiError> {
    if let Some(level) = args.log_level {
        set_log_level(level);
    }
    for (module, level) in &args.log_filters {
        set_module_filter(module, *level);
    }
    if args.replicates == 0 {
        return Err(EpiError::invalid_parameter("replicates", "must be positive"));
    }
    let parameters = resolve_parameters(&args)?;
    let mut reports = open_reports(&args)?;

    let mut summaries = Vec::new();
    for replicate in 0..args.replicates {
        let mut replicate_parameters = parameters.clone();
        replicate_parameters.seed = parameters.seed.wrapping_add(replicate);
        let summary = run_replicate(replicate, replicate_parameters, &mut reports)?;
        info!(
            "Replicate {replicate} ended after {} steps: {:?}",
            summary.steps, summary.final_counts
        );
        if args.json {
            println!("{}", json_line(parameters.is_spatial(), &summary.records)?);
        }
        summaries.push(summary);
    }

    if let Some(reports) = reports.as_mut() {
        reports.flush()?;
    }
    Ok(summaries)
}
