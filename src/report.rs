//! Summary statistics over a [`History`].
//!
//! A report is a pure function of the history it was built from: no clocks
//! are read here, so the same history always yields the same report.

use std::fmt::{self, Write};

use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::format::{format_bytes, format_bytes_delta, format_duration_ms, format_micros};
use crate::system::history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Heap-used statistics, in bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryReport {
    pub min: u64,
    pub max: u64,
    pub average: f64,
    pub current: u64,
    /// Last minus first heap-used value.
    pub growth: i64,
}

/// Statistics of cumulative user + system CPU time, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuReport {
    pub min_us: u64,
    pub max_us: u64,
    pub average_us: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub duration_ms: u64,
    pub samples: usize,
    pub recorded: u64,
    pub memory: MemoryReport,
    pub cpu: CpuReport,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

pub fn parse_format(s: &str) -> Option<ReportFormat> {
    match s.trim().to_ascii_lowercase().as_str() {
        "text" | "txt" => Some(ReportFormat::Text),
        "json" => Some(ReportFormat::Json),
        "markdown" | "md" => Some(ReportFormat::Markdown),
        _ => None,
    }
}

pub fn generate_report(history: &History) -> Result<Report> {
    let (Some(first), Some(last)) = (history.first(), history.latest()) else {
        return Err(MonitorError::NoData);
    };

    let heap: Vec<u64> = history.iter().map(|s| s.memory.heap_used).collect();
    let cpu: Vec<u64> = history.iter().map(|s| s.cpu.total_us()).collect();
    let heap_f: Vec<f64> = heap.iter().map(|&v| v as f64).collect();

    let memory = MemoryReport {
        min: heap.iter().copied().min().unwrap_or(0),
        max: heap.iter().copied().max().unwrap_or(0),
        average: mean(&heap),
        current: last.memory.heap_used,
        growth: signed_delta(first.memory.heap_used, last.memory.heap_used),
    };

    let cpu = CpuReport {
        min_us: cpu.iter().copied().min().unwrap_or(0),
        max_us: cpu.iter().copied().max().unwrap_or(0),
        average_us: mean(&cpu),
    };

    let duration = last.timestamp.saturating_sub(first.timestamp);

    Ok(Report {
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        samples: history.len(),
        recorded: history.recorded(),
        memory,
        cpu,
        trend: classify_trend(&heap_f),
    })
}

/// Sign of the least-squares slope of `values` against their index.
pub fn classify_trend(values: &[f64]) -> Trend {
    let slope = linear_slope(values);
    if slope > 0.0 {
        Trend::Increasing
    } else if slope < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Ordinary least-squares slope of `values` against `0..n`.
///
/// Uses the centered form so a constant series gives exactly 0.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }
    if denominator == 0.0 || !numerator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

fn signed_delta(from: u64, to: u64) -> i64 {
    if to >= from {
        i64::try_from(to - from).unwrap_or(i64::MAX)
    } else {
        i64::try_from(from - to).map(|d| -d).unwrap_or(i64::MIN)
    }
}

impl Report {
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Markdown => Ok(self.render_markdown()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Performance report");
        let _ = writeln!(
            out,
            "  Duration:     {}",
            format_duration_ms(self.duration_ms)
        );
        let _ = writeln!(
            out,
            "  Samples:      {} ({} recorded)",
            self.samples, self.recorded
        );
        let _ = writeln!(
            out,
            "  Heap used:    min {}, max {}, avg {}",
            format_bytes(self.memory.min),
            format_bytes(self.memory.max),
            format_bytes(self.memory.average.round() as u64)
        );
        let _ = writeln!(
            out,
            "  Heap current: {} (growth {})",
            format_bytes(self.memory.current),
            format_bytes_delta(self.memory.growth)
        );
        let _ = writeln!(
            out,
            "  CPU time:     min {}, max {}, avg {}",
            format_micros(self.cpu.min_us as f64),
            format_micros(self.cpu.max_us as f64),
            format_micros(self.cpu.average_us)
        );
        let _ = write!(out, "  Trend:        {}", self.trend);
        out
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Performance Report");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "- Duration: `{}`",
            format_duration_ms(self.duration_ms)
        );
        let _ = writeln!(
            out,
            "- Samples: `{}` retained, `{}` recorded",
            self.samples, self.recorded
        );
        let _ = writeln!(out, "- Heap trend: `{}`", self.trend);
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | min | max | avg | current | growth |");
        let _ = writeln!(out, "| --- | ---: | ---: | ---: | ---: | ---: |");
        let _ = writeln!(
            out,
            "| Heap used | {} | {} | {} | {} | {} |",
            format_bytes(self.memory.min),
            format_bytes(self.memory.max),
            format_bytes(self.memory.average.round() as u64),
            format_bytes(self.memory.current),
            format_bytes_delta(self.memory.growth)
        );
        let _ = writeln!(
            out,
            "| CPU time | {} | {} | {} | | |",
            format_micros(self.cpu.min_us as f64),
            format_micros(self.cpu.max_us as f64),
            format_micros(self.cpu.average_us)
        );
        out
    }
}
