use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("metric snapshot unavailable: {0}")]
    Unavailable(String),

    #[error("no samples have been recorded yet")]
    NoData,

    #[error("sampling loop is already running")]
    AlreadyRunning,

    #[error("sampling interval must be greater than zero")]
    InvalidInterval,

    #[error("no tokio runtime is available to drive the sampling loop")]
    NoRuntime,

    #[error("snapshot timestamp {current:?} does not advance past {previous:?}")]
    NonMonotonic { previous: Duration, current: Duration },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    pub(crate) fn unavailable<S: Into<String>>(msg: S) -> Self {
        MonitorError::Unavailable(msg.into())
    }

    pub(crate) fn invalid_config<S: Into<String>>(msg: S) -> Self {
        MonitorError::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
