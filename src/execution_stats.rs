// Loss of precision is allowable in this module's use cases.
#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use bytesize::ByteSize;
use humantime::format_duration;
use log::{debug, error, info};
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// How frequently we update the max memory used value.
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Final statistics for one replicate. If no steps were taken, the per-step statistics are zero.
#[derive(Debug, Serialize)]
pub struct ExecutionStatistics {
    pub max_memory_usage: u64,
    pub cpu_time: Duration,
    pub wall_time: Duration,

    pub population: usize,
    pub steps: u64,
    pub wall_time_per_step: Duration,
    pub memory_per_person: u64,
}

pub struct ExecutionProfilingCollector {
    /// Used to compute elapsed wall time
    start_time: Instant,
    /// Last memory poll, so callers can invoke `refresh` every step without worrying about cost
    last_refresh: Instant,
    /// Accumulated CPU time of the process in CPU-milliseconds when collection started
    start_cpu_time: u64,
    /// Largest resident memory seen so far, as reported by `sysinfo`
    max_memory_usage: u64,
    system: System,
    /// `None` on platforms `sysinfo` does not support
    process_id: Option<Pid>,
}

impl Default for ExecutionProfilingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionProfilingCollector {
    #[must_use]
    pub fn new() -> ExecutionProfilingCollector {
        let process_id = sysinfo::get_current_pid().ok();
        let now = Instant::now();

        let mut collector = ExecutionProfilingCollector {
            start_time: now,
            last_refresh: now,
            start_cpu_time: 0,
            max_memory_usage: 0,
            system: System::new(),
            process_id,
        };
        if let Some(process_id) = process_id {
            debug!("Process ID: {process_id}");
            collector.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
            if let Some(process) = collector.system.process(process_id) {
                collector.max_memory_usage = process.memory();
                collector.start_cpu_time = process.accumulated_cpu_time();
            }
        }
        collector
    }

    /// Polls memory usage if at least `REFRESH_INTERVAL` has passed since the previous poll.
    /// Cheap enough to call once per step.
    #[inline]
    pub fn refresh(&mut self) {
        if self.last_refresh.elapsed() >= REFRESH_INTERVAL {
            self.poll_memory();
            self.last_refresh = Instant::now();
        }
    }

    fn poll_memory(&mut self) {
        if let Some(pid) = self.process_id {
            self.update_system_info(ProcessRefreshKind::nothing().with_memory());
            if let Some(process) = self.system.process(pid) {
                self.max_memory_usage = self.max_memory_usage.max(process.memory());
            }
        }
    }

    #[inline]
    fn update_system_info(&mut self, process_refresh_kind: ProcessRefreshKind) {
        if let Some(pid) = self.process_id {
            if self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                process_refresh_kind,
            ) < 1
            {
                error!("could not refresh process statistics");
            }
        }
    }

    pub fn compute_final_statistics(&mut self, population: usize, steps: u64) -> ExecutionStatistics {
        let mut cpu_time_millis = 0;
        if let Some(pid) = self.process_id {
            self.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
            if let Some(process) = self.system.process(pid) {
                self.max_memory_usage = self.max_memory_usage.max(process.memory());
                cpu_time_millis = process
                    .accumulated_cpu_time()
                    .saturating_sub(self.start_cpu_time);
            }
        }
        let wall_time = self.start_time.elapsed();

        let wall_time_per_step = if steps > 0 {
            Duration::from_secs_f64(wall_time.as_secs_f64() / steps as f64)
        } else {
            Duration::ZERO
        };
        let memory_per_person = if population > 0 {
            self.max_memory_usage / population as u64
        } else {
            0
        };

        ExecutionStatistics {
            max_memory_usage: self.max_memory_usage,
            cpu_time: Duration::from_millis(cpu_time_millis),
            wall_time,
            population,
            steps,
            wall_time_per_step,
            memory_per_person,
        }
    }
}

/// Logs execution statistics at `info`.
pub fn log_execution_statistics(stats: &ExecutionStatistics) {
    info!("Execution complete.");
    if stats.max_memory_usage == 0 {
        info!("Memory and CPU statistics are not available on your platform.");
    } else {
        info!("Max memory usage: {}", ByteSize::b(stats.max_memory_usage));
        info!("CPU time: {}", format_duration(stats.cpu_time));
    }
    info!("Wall time: {}", format_duration(stats.wall_time));
    info!("Steps: {}", stats.steps);
    if stats.steps > 0 {
        info!(
            "Wall time per step: {}",
            format_duration(stats.wall_time_per_step)
        );
    }
    if stats.population > 0 && stats.max_memory_usage > 0 {
        info!(
            "Memory per person: {}",
            ByteSize::b(stats.memory_per_person)
        );
    }
}
