//! # Tirex Status Collector
//!
//! Samples the tirex render queue through `tirex-status -r` and keeps a set of Prometheus gauges
//! up to date.
//!
//! ## Architecture
//!
//! - **`source`**: [`StatusSource`] produces a raw status report; [`TirexStatusCommand`] runs the
//!   external command with a bounded runtime
//! - **`status`**: [`TirexStatus`] decodes the JSON report
//! - **`metrics`**: [`MetricSet`] holds `tirex_queue_size`, `tirex_prio_queue_size{prio}` and
//!   `tirex_rendering`, readable from any thread at any time
//! - **`sampler`**: [`Sampler`] runs fetch, decode, publish on a fixed interval and survives
//!   failures of any single cycle
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use tirex_exporter_collector::{
//!     MetricSet,
//!     Sampler,
//!     TirexStatusCommand,
//! };
//!
//! # async fn example() -> prometheus::Result<()> {
//! let metrics = MetricSet::new()?;
//! let source = TirexStatusCommand::new("tirex-status", vec!["-r".to_string()], Duration::from_secs(5));
//! let sampler = Sampler::new(source, metrics.clone(), Duration::from_secs(10));
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! sampler.run(shutdown_rx).await;
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod sampler;
pub mod source;
pub mod status;

pub use metrics::MetricSet;
pub use sampler::{
    SampleError,
    Sampler,
};
pub use source::{
    FetchError,
    StatusSource,
    TirexStatusCommand,
};
pub use status::{
    DecodeError,
    TirexStatus,
};
