//! Speedtest Metrics Module
//!
//! Prometheus registry, per-scrape collector and HTTP endpoint for the
//! speedtest exporter.
//!
//! # Exported series
//!
//! - `speedtest_server{name,latitude,longitude}`: server used, value 1
//! - `speedtest_latency`: round trip latency in seconds
//! - `speedtest_download` / `speedtest_upload`: bandwidth in bit/s
//! - `speedtest_up`: 1 if the last measurement succeeded, else 0
//! - `speedtest_scrape_duration_seconds`: time spent in the last scrape
//!
//! # Example
//!
//! ```ignore
//! use speedtest_metrics::{MetricsConfig, MetricsRegistry, MetricsServer, SpeedtestCollector};
//!
//! let collector = SpeedtestCollector::new(MetricsRegistry::new(), Some(client))?;
//! MetricsServer::new(collector, MetricsConfig::default())?.serve().await?;
//! ```

pub mod collector;
pub mod error;
pub mod registry;
pub mod server;
pub mod types;

pub use collector::SpeedtestCollector;
pub use error::{MetricsError, MetricsResult};
pub use registry::{MetricsRegistry, SeriesHandle};
pub use server::MetricsServer;
pub use types::{MetricKind, MetricSeries, MetricsConfig, NAMESPACE};
