//! The sampling loop: capture, append, detect, on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::anomaly::{DetectorSet, LogSink, Warning, WarningSink};
use crate::config::Config;
use crate::error::{MonitorError, Result};
use crate::report::{Report, generate_report};
use crate::system::collector::MetricSource;
use crate::system::history::{DEFAULT_CAPACITY, History};
use crate::system::snapshot::Snapshot;

struct Shared {
    source: Mutex<Box<dyn MetricSource>>,
    history: Mutex<History>,
    detectors: DetectorSet,
    sink: Arc<dyn WarningSink>,
}

impl Shared {
    /// One tick. Returns `None` when the sample was skipped.
    fn sample(&self) -> Option<Vec<Warning>> {
        // Held until the push so concurrent callers append in capture order.
        let mut source = self.source.lock();
        let snapshot = match source.capture() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unavailable sample");
                return None;
            }
        };

        let warnings = {
            let mut history = self.history.lock();
            let pushed = history.push(snapshot);
            drop(source);
            if let Err(err) = pushed {
                tracing::debug!(error = %err, "skipping out-of-order sample");
                return None;
            }
            let latest = history.latest()?;
            self.detectors.evaluate(latest, &history)
        };

        for warning in &warnings {
            self.sink.emit(warning);
        }
        Some(warnings)
    }
}

/// Owned handle to a running sampling task.
///
/// Dropping the handle also stops the task, since the shutdown channel closes.
pub struct SamplerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    fn spawn(shared: Arc<Shared>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        let (tx, mut rx) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            // First sample lands one interval after start.
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(interval_ms = interval.as_millis() as u64, "sampling loop started");

            loop {
                tokio::select! {
                    biased;
                    _ = &mut rx => break,
                    _ = ticker.tick() => {
                        shared.sample();
                    }
                }
            }

            tracing::debug!("sampling loop stopped");
        });

        Ok(Self {
            shutdown: Some(tx),
            task,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the task to stop after the sample in flight, if any.
    pub fn stop(mut self) {
        self.signal();
    }

    /// Stop and wait for the task to exit.
    pub async fn join(mut self) {
        self.signal();
        if let Err(err) = (&mut self.task).await {
            tracing::warn!(error = %err, "sampling task ended abnormally");
        }
    }

    fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct MonitorBuilder {
    source: Box<dyn MetricSource>,
    history_capacity: usize,
    detectors: DetectorSet,
    sink: Arc<dyn WarningSink>,
}

impl MonitorBuilder {
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn detectors(mut self, detectors: DetectorSet) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn sink<W: WarningSink + 'static>(mut self, sink: W) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Fails with [`MonitorError::InvalidConfig`] when a detector could never
    /// fire, e.g. a leak window larger than the history capacity.
    pub fn build(self) -> Result<Monitor> {
        if self.history_capacity == 0 {
            return Err(MonitorError::invalid_config(
                "history capacity must be greater than 0",
            ));
        }
        self.detectors.validate(self.history_capacity)?;
        Ok(Monitor {
            shared: Arc::new(Shared {
                source: Mutex::new(self.source),
                history: Mutex::new(History::new(self.history_capacity)),
                detectors: self.detectors,
                sink: self.sink,
            }),
            sampler: None,
        })
    }
}

/// Owns the history and at most one sampling task.
pub struct Monitor {
    shared: Arc<Shared>,
    sampler: Option<SamplerHandle>,
}

impl Monitor {
    pub fn builder<S: MetricSource>(source: S) -> MonitorBuilder {
        MonitorBuilder {
            source: Box::new(source),
            history_capacity: DEFAULT_CAPACITY,
            detectors: DetectorSet::default(),
            sink: Arc::new(LogSink),
        }
    }

    pub fn new<S: MetricSource>(source: S) -> Result<Self> {
        Self::builder(source).build()
    }

    /// Validates `config` before building.
    pub fn from_config<S: MetricSource>(source: S, config: &Config) -> Result<Self> {
        config.validate()?;
        Self::builder(source)
            .history_capacity(config.sampling.history_capacity)
            .detectors(DetectorSet::from_config(&config.detectors))
            .build()
    }

    /// Begin sampling every `interval`. Must be called inside a tokio runtime.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        let handle = SamplerHandle::spawn(Arc::clone(&self.shared), interval)?;
        self.sampler = Some(handle);
        Ok(())
    }

    /// Halt sampling. A no-op when not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.stop();
        }
    }

    /// Like [`Monitor::stop`], but waits until the task has exited.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.join().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.sampler.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Take one sample immediately, outside the schedule.
    ///
    /// Returns the warnings it raised, or `None` if the sample was skipped.
    pub fn sample_now(&self) -> Option<Vec<Warning>> {
        self.shared.sample()
    }

    pub fn report(&self) -> Result<Report> {
        generate_report(&self.shared.history.lock())
    }

    pub fn history_len(&self) -> usize {
        self.shared.history.lock().len()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.shared.history.lock().to_vec()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.shared.history.lock().latest().cloned()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}
