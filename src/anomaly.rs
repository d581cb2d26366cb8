//! Advisory trend heuristics evaluated after every new snapshot.
//!
//! Detectors only ever produce [`Warning`]s. They never touch the history
//! and never stop the sampling loop; a warning is a tripwire, not a proof.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DetectorsConfig;
use crate::error::{MonitorError, Result};
use crate::format::format_bytes;
use crate::system::history::History;
use crate::system::snapshot::Snapshot;

pub const DEFAULT_LEAK_WINDOW: usize = 10;
pub const DEFAULT_LEAK_INCREASE_RATIO: f64 = 0.7;
pub const DEFAULT_CPU_LOAD_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    PotentialMemoryLeak {
        heap_used: u64,
        increases: usize,
        window: usize,
    },
    HighCpuLoad {
        load_average: f64,
        cores: usize,
        threshold: f64,
    },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::PotentialMemoryLeak { .. } => "potential_memory_leak",
            Warning::HighCpuLoad { .. } => "high_cpu_load",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PotentialMemoryLeak {
                heap_used,
                increases,
                window,
            } => write!(
                f,
                "potential memory leak: heap used {} ({increases} of the last {window} samples grew)",
                format_bytes(*heap_used)
            ),
            Warning::HighCpuLoad {
                load_average,
                cores,
                threshold,
            } => write!(
                f,
                "high CPU load: 1m load average {load_average:.2} exceeds {threshold:.2} ({cores} cores)"
            ),
        }
    }
}

pub trait Detector: Send + Sync {
    /// `latest` is already the newest entry of `history`.
    fn check(&self, latest: &Snapshot, history: &History) -> Option<Warning>;

    /// Rejects settings under which the detector could never fire with a
    /// history bounded to `history_capacity` snapshots.
    fn validate(&self, _history_capacity: usize) -> Result<()> {
        Ok(())
    }
}

/// Fires when heap usage grew across most of the recent window.
#[derive(Debug, Clone)]
pub struct LeakDetector {
    window: usize,
    increase_ratio: f64,
}

impl LeakDetector {
    pub fn new(window: usize, increase_ratio: f64) -> Self {
        Self {
            window,
            increase_ratio,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// A window of `n` values has `n - 1` transitions, so the ratio must
    /// stay below `(n - 1) / n` for the threshold to be reachable.
    pub fn max_increase_ratio(window: usize) -> f64 {
        if window < 2 {
            return 0.0;
        }
        (window - 1) as f64 / window as f64
    }

    /// Strictly increasing adjacent pairs among the newest `window` values.
    pub fn count_increases<I>(values: I) -> usize
    where
        I: IntoIterator<Item = u64>,
    {
        let mut prev = None;
        let mut increases = 0;
        for value in values {
            if let Some(p) = prev
                && value > p
            {
                increases += 1;
            }
            prev = Some(value);
        }
        increases
    }
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LEAK_WINDOW, DEFAULT_LEAK_INCREASE_RATIO)
    }
}

impl Detector for LeakDetector {
    fn check(&self, latest: &Snapshot, history: &History) -> Option<Warning> {
        if self.window < 2 || history.len() < self.window {
            return None;
        }
        let increases =
            Self::count_increases(history.recent(self.window).map(|s| s.memory.heap_used));
        // With the defaults: more than 7 of the 9 transitions must be increases.
        if increases as f64 > self.window as f64 * self.increase_ratio {
            Some(Warning::PotentialMemoryLeak {
                heap_used: latest.memory.heap_used,
                increases,
                window: self.window,
            })
        } else {
            None
        }
    }

    fn validate(&self, history_capacity: usize) -> Result<()> {
        if self.window < 2 {
            return Err(MonitorError::invalid_config(format!(
                "leak window must be at least 2, got {}",
                self.window
            )));
        }
        if history_capacity < self.window {
            return Err(MonitorError::invalid_config(format!(
                "history capacity ({history_capacity}) is smaller than the leak window ({})",
                self.window
            )));
        }
        let max = Self::max_increase_ratio(self.window);
        let ratio = self.increase_ratio;
        if !(ratio.is_finite() && ratio > 0.0 && ratio < max) {
            return Err(MonitorError::invalid_config(format!(
                "leak increase ratio {ratio} is unreachable with a window of {}; use a value in (0, {max:.3})",
                self.window
            )));
        }
        Ok(())
    }
}

/// Fires when the 1-minute load average exceeds a share of the logical cores.
#[derive(Debug, Clone)]
pub struct CpuLoadDetector {
    core_ratio: f64,
}

impl CpuLoadDetector {
    pub fn new(core_ratio: f64) -> Self {
        Self { core_ratio }
    }

    pub fn threshold(&self, cores: usize) -> f64 {
        cores as f64 * self.core_ratio
    }
}

impl Default for CpuLoadDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_LOAD_RATIO)
    }
}

impl Detector for CpuLoadDetector {
    fn check(&self, latest: &Snapshot, _history: &History) -> Option<Warning> {
        let cores = latest.system.logical_cores;
        let load = latest.system.load_average.one;
        let threshold = self.threshold(cores);
        (load > threshold).then_some(Warning::HighCpuLoad {
            load_average: load,
            cores,
            threshold,
        })
    }

    fn validate(&self, _history_capacity: usize) -> Result<()> {
        if self.core_ratio.is_finite() && self.core_ratio > 0.0 {
            Ok(())
        } else {
            Err(MonitorError::invalid_config(format!(
                "cpu load ratio must be a positive number, got {}",
                self.core_ratio
            )))
        }
    }
}

pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorSet {
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    pub fn from_config(config: &DetectorsConfig) -> Self {
        let mut set = Self::empty();
        if config.leak_enabled {
            set.push(LeakDetector::new(
                config.leak_window,
                config.leak_increase_ratio,
            ));
        }
        if config.cpu_enabled {
            set.push(CpuLoadDetector::new(config.cpu_load_ratio));
        }
        set
    }

    pub fn push<D: Detector + 'static>(&mut self, detector: D) {
        self.detectors.push(Box::new(detector));
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Fails on the first detector that could never fire with this capacity.
    pub fn validate(&self, history_capacity: usize) -> Result<()> {
        self.detectors
            .iter()
            .try_for_each(|d| d.validate(history_capacity))
    }

    pub fn evaluate(&self, latest: &Snapshot, history: &History) -> Vec<Warning> {
        self.detectors
            .iter()
            .filter_map(|d| d.check(latest, history))
            .collect()
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::from_config(&DetectorsConfig::default())
    }
}

/// Where warnings go once raised.
pub trait WarningSink: Send + Sync {
    fn emit(&self, warning: &Warning);
}

/// Default sink: one structured `warn` event per warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn emit(&self, warning: &Warning) {
        match warning {
            Warning::PotentialMemoryLeak {
                heap_used,
                increases,
                window,
            } => tracing::warn!(
                kind = warning.kind(),
                heap_used,
                increases,
                window,
                "{warning}"
            ),
            Warning::HighCpuLoad {
                load_average,
                cores,
                threshold,
            } => tracing::warn!(
                kind = warning.kind(),
                load_average,
                cores,
                threshold,
                "{warning}"
            ),
        }
    }
}

/// Keeps every warning in memory, for embedding callers and tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl WarningSink for CollectingSink {
    fn emit(&self, warning: &Warning) {
        self.warnings.lock().push(warning.clone());
    }
}
