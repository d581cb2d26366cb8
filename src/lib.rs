//! Periodic process resource sampling with memory-growth and CPU-load
//! detection, plus on-demand trend reports.
//!
//! ```no_run
//! # async fn demo() -> heapwatch::error::Result<()> {
//! use std::time::Duration;
//! use heapwatch::sampler::Monitor;
//! use heapwatch::system::collector::Collector;
//!
//! let mut monitor = Monitor::new(Collector::current_process()?)?;
//! monitor.start(Duration::from_secs(1))?;
//! tokio::time::sleep(Duration::from_secs(30)).await;
//! monitor.stop();
//! println!("{}", monitor.report()?.render_text());
//! # Ok(())
//! # }
//! ```

pub mod anomaly;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod report;
pub mod sampler;
pub mod system;
