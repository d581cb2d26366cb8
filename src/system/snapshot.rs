use std::time::Duration;

/// Memory figures for the sampled process, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
}

/// Cumulative CPU time since the process started, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user_us: u64,
    pub system_us: u64,
}

impl CpuTimes {
    pub fn total_us(&self) -> u64 {
        self.user_us.saturating_add(self.system_us)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    /// Negative or NaN readings (reported by some platforms) become 0.
    pub fn clamped(one: f64, five: f64, fifteen: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            one: clamp(one),
            five: clamp(five),
            fifteen: clamp(fifteen),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SystemLoad {
    pub load_average: LoadAverage,
    pub free_memory: u64,
    pub total_memory: u64,
    pub uptime_secs: u64,
    pub logical_cores: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Offset from the collector's epoch.
    pub timestamp: Duration,
    pub memory: MemoryUsage,
    pub cpu: CpuTimes,
    pub system: SystemLoad,
}
