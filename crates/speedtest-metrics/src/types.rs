//! Common types for metrics declaration and the exposition endpoint

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};

/// Namespace prefixed to every exporter series
pub const NAMESPACE: &str = "speedtest";

/// Configuration for the exposition endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Listen address; `:port` means every interface
    pub listen_address: String,

    /// Path under which metrics are exposed
    pub telemetry_path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_address: ":9112".to_string(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create config with a listen address and the default telemetry path
    pub fn with_listen_address(listen_address: impl Into<String>) -> Self {
        Self {
            listen_address: listen_address.into(),
            ..Default::default()
        }
    }

    /// Address suitable for `TcpListener::bind`
    pub fn socket_addr(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    /// Reject telemetry paths that cannot be routed next to the landing page
    pub fn validate(&self) -> MetricsResult<()> {
        let path = &self.telemetry_path;
        if !path.starts_with('/') {
            return Err(MetricsError::InvalidConfig(format!(
                "telemetry path '{}' must start with '/'",
                path
            )));
        }
        if path == "/" {
            return Err(MetricsError::InvalidConfig(
                "telemetry path cannot be '/', it serves the landing page".to_string(),
            ));
        }
        if path.contains(['{', '}', '*']) {
            return Err(MetricsError::InvalidConfig(format!(
                "telemetry path '{}' contains route pattern characters",
                path
            )));
        }
        if self.listen_address.is_empty() {
            return Err(MetricsError::InvalidConfig("listen address is empty".to_string()));
        }
        Ok(())
    }
}

/// Metric value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Point-in-time value that may go up and down
    Gauge,
}

/// Declaration of one metric family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSeries {
    /// Name without namespace
    pub name: String,
    /// Help text rendered in `# HELP`
    pub help: String,
    /// Value type
    pub kind: MetricKind,
    /// Label keys, fixed for the life of the series
    pub label_keys: Vec<String>,
}

impl MetricSeries {
    /// Declare a gauge without labels
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Gauge,
            label_keys: Vec::new(),
        }
    }

    /// Attach label keys
    pub fn with_labels(mut self, keys: &[&str]) -> Self {
        self.label_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}
