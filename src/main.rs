use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use heapwatch::config::{self, load_config, load_config_from_path};
use heapwatch::error::MonitorError;
use heapwatch::logging::init_logging;
use heapwatch::report::parse_format;
use heapwatch::sampler::Monitor;
use heapwatch::system::collector::Collector;
use tokio::process::{Child, Command};

#[derive(Parser)]
#[command(
    name = "heapwatch",
    about = "Sample a process's memory and CPU, flag leaks and load, report trends"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Number of snapshots kept in history
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Monitor an already running process instead of this one.
    #[arg(long, conflicts_with = "command")]
    pid: Option<u32>,

    /// Stop after this many seconds (default: until Ctrl-C or the command exits).
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Report format: text, json, markdown
    #[arg(long)]
    format: Option<String>,

    /// Write the report to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `heapwatch=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,

    /// Command to spawn and monitor, after `--`.
    #[arg(last = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let (config, load_error) = load_config_for_cli(&cli);
    config.validate()?;
    init_logging(&config.logging)?;
    if let Some(err) = load_error {
        tracing::warn!(error = %err, "config file not loaded, using defaults");
    }

    let format = parse_format(&config.report.format).ok_or_else(|| {
        eyre!(
            "unknown report format `{}`; expected text, json or markdown",
            config.report.format
        )
    })?;

    let mut child = match cli.command.split_first() {
        Some((program, args)) => Some(
            Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .spawn()
                .wrap_err_with(|| format!("failed to spawn `{program}`"))?,
        ),
        None => None,
    };

    let collector = match (&child, cli.pid) {
        (Some(child), _) => {
            let pid = child
                .id()
                .ok_or_else(|| eyre!("spawned command exited before sampling began"))?;
            Collector::for_pid(pid)
        }
        (None, Some(pid)) => Collector::for_pid(pid),
        (None, None) => Collector::current_process()?,
    };
    let pid = collector.pid();

    let mut monitor = Monitor::from_config(collector, &config)?;
    let interval = Duration::from_millis(config.sampling.interval_ms);
    monitor.start(interval)?;
    tracing::info!(
        pid,
        interval_ms = config.sampling.interval_ms,
        capacity = config.sampling.history_capacity,
        "monitoring started"
    );

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("interrupted");
        }
        _ = wait_for(cli.duration_secs.map(Duration::from_secs)) => {
            tracing::info!("duration elapsed");
        }
        status = wait_child(child.as_mut()) => {
            tracing::info!(?status, "command exited");
        }
    }

    monitor.shutdown().await;
    if let Some(child) = child.as_mut()
        && child.id().is_some()
    {
        let _ = child.start_kill();
    }

    match monitor.report() {
        Ok(report) => {
            let rendered = report.render(format)?;
            match &cli.output {
                Some(path) => {
                    ensure_parent_dir(path)?;
                    std::fs::write(path, rendered)?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => println!("{rendered}"),
            }
        }
        Err(MonitorError::NoData) => eprintln!("heapwatch: no samples were collected"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

/// Falls back to defaults when the file cannot be used, and hands back the
/// reason so it can be logged once logging is up.
fn load_config_for_cli(cli: &Cli) -> (config::Config, Option<MonitorError>) {
    let loaded = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(err) => (config::Config::default(), Some(err)),
    };

    if let Some(ms) = cli.interval_ms {
        config.sampling.interval_ms = ms;
    }
    if let Some(capacity) = cli.history_capacity {
        config.sampling.history_capacity = capacity;
    }
    if let Some(ref format) = cli.format {
        config.report.format = format.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }

    (config, load_error)
}

async fn wait_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn wait_child(child: Option<&mut Child>) -> Option<ExitStatus> {
    match child {
        Some(child) => child.wait().await.ok(),
        None => std::future::pending().await,
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
