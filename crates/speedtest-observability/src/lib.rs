//! Speedtest exporter observability
//!
//! Structured logging for the exporter binary and its libraries.
//!
//! - **Multiple Output Formats**: pretty, compact and JSON
//! - **Environment-based Filtering**: `--log.level`, then `RUST_LOG`, then `info`
//!
//! # Example
//!
//! ```ignore
//! use speedtest_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, None)?;
//! tracing::info!("exporter started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat};
pub use initialization::{init_tracing, init_tracing_with_config};
