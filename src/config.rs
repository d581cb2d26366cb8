use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::anomaly::{
    DEFAULT_CPU_LOAD_RATIO, DEFAULT_LEAK_INCREASE_RATIO, DEFAULT_LEAK_WINDOW, LeakDetector,
};
use crate::error::{MonitorError, Result};
use crate::system::history::DEFAULT_CAPACITY;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub detectors: DetectorsConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    pub history_capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            interval_ms: 1000,
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorsConfig {
    pub leak_enabled: bool,
    pub leak_window: usize,
    pub leak_increase_ratio: f64,
    pub cpu_enabled: bool,
    pub cpu_load_ratio: f64,
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        DetectorsConfig {
            leak_enabled: true,
            leak_window: DEFAULT_LEAK_WINDOW,
            leak_increase_ratio: DEFAULT_LEAK_INCREASE_RATIO,
            cpu_enabled: true,
            cpu_load_ratio: DEFAULT_CPU_LOAD_RATIO,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            format: "text".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.sampling.interval_ms == 0 {
            return Err(MonitorError::invalid_config(
                "sampling.interval_ms must be greater than 0",
            ));
        }
        let d = &self.detectors;
        if d.leak_enabled {
            if d.leak_window < 2 {
                return Err(MonitorError::invalid_config(
                    "detectors.leak_window must be at least 2",
                ));
            }
            if self.sampling.history_capacity < d.leak_window {
                return Err(MonitorError::invalid_config(format!(
                    "sampling.history_capacity ({}) is smaller than detectors.leak_window ({})",
                    self.sampling.history_capacity, d.leak_window
                )));
            }
            check_ratio("detectors.leak_increase_ratio", d.leak_increase_ratio)?;
            let max = LeakDetector::max_increase_ratio(d.leak_window);
            if d.leak_increase_ratio >= max {
                return Err(MonitorError::invalid_config(format!(
                    "detectors.leak_increase_ratio ({}) must be below {max:.3} with detectors.leak_window = {}",
                    d.leak_increase_ratio, d.leak_window
                )));
            }
        }
        if d.cpu_enabled {
            check_ratio("detectors.cpu_load_ratio", d.cpu_load_ratio)?;
        }
        if self.sampling.history_capacity == 0 {
            return Err(MonitorError::invalid_config(
                "sampling.history_capacity must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MonitorError::invalid_config(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("heapwatch").join("config.toml"))
}

/// Defaults when no config file exists; an error when one exists but is
/// unreadable or malformed.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Ok(Config::default()),
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MonitorError::invalid_config(format!("cannot read {}: {e}", path.display()))
    })?;
    toml::from_str(&contents)
        .map_err(|e| MonitorError::invalid_config(format!("cannot parse {}: {e}", path.display())))
}
