use std::time::Instant;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use super::platform;
use super::snapshot::{CpuTimes, LoadAverage, MemoryUsage, Snapshot, SystemLoad};
use crate::error::{MonitorError, Result};

/// Anything that can produce a [`Snapshot`] on demand.
///
/// A failed capture is not fatal: the sampling loop skips that tick.
pub trait MetricSource: Send + 'static {
    fn capture(&mut self) -> Result<Snapshot>;
}

/// sysinfo-backed reader for a single process plus host-wide load figures.
pub struct Collector {
    sys: System,
    pid: Pid,
    epoch: Instant,
    logical_cores: usize,
}

impl Collector {
    pub fn current_process() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(MonitorError::unavailable)?;
        Ok(Self::for_pid(pid.as_u32()))
    }

    pub fn for_pid(pid: u32) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        let logical_cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };
        Collector {
            sys,
            pid: Pid::from_u32(pid),
            epoch: Instant::now(),
            logical_cores,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_u32()
    }

    pub fn logical_cores(&self) -> usize {
        self.logical_cores
    }

    fn read_memory(&self, process: &sysinfo::Process) -> MemoryUsage {
        platform::process_memory(self.pid.as_u32()).unwrap_or_else(|| {
            let rss = process.memory();
            MemoryUsage {
                rss,
                heap_total: process.virtual_memory().max(rss),
                heap_used: rss,
                external: 0,
            }
        })
    }

    fn read_cpu(&self, process: &sysinfo::Process) -> CpuTimes {
        platform::process_cpu_times(self.pid.as_u32()).unwrap_or_else(|| CpuTimes {
            user_us: process.accumulated_cpu_time().saturating_mul(1000),
            system_us: 0,
        })
    }

    fn read_system(&self) -> SystemLoad {
        let load = System::load_average();
        SystemLoad {
            load_average: LoadAverage::clamped(load.one, load.five, load.fifteen),
            free_memory: self.sys.free_memory(),
            total_memory: self.sys.total_memory(),
            uptime_secs: System::uptime(),
            logical_cores: self.logical_cores,
        }
    }
}

impl MetricSource for Collector {
    fn capture(&mut self) -> Result<Snapshot> {
        let _capture_span =
            tracing::debug_span!("collector.capture", pid = self.pid.as_u32()).entered();

        self.sys.refresh_memory();
        let pids = [self.pid];
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        let Some(process) = self.sys.process(self.pid) else {
            return Err(MonitorError::unavailable(format!(
                "process {} is not running",
                self.pid
            )));
        };

        Ok(Snapshot {
            timestamp: self.epoch.elapsed(),
            memory: self.read_memory(process),
            cpu: self.read_cpu(process),
            system: self.read_system(),
        })
    }
}
