// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Metric registry for exporter series
//!
//! Series are declared once at startup and hold at most one sample per
//! label combination. A cleared series renders nothing at all, not even
//! its `# HELP` line.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{MetricsError, MetricsResult};
use crate::types::{MetricKind, MetricSeries, NAMESPACE};

/// Handle to a declared series, used to publish and clear samples
#[derive(Clone, Debug)]
pub struct SeriesHandle {
    fq_name: String,
    label_keys: Vec<String>,
    gauge: GaugeVec,
}

impl SeriesHandle {
    /// Fully-qualified name, namespace included
    pub fn name(&self) -> &str {
        &self.fq_name
    }

    /// Label keys fixed at declaration
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }
}

/// Central registry for exporter metrics
///
/// Thread-safe and cheap to clone; clones share the same series.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<MetricsRegistryInner>,
}

struct MetricsRegistryInner {
    /// Prometheus registry
    registry: Registry,
    /// Namespace prefixed to each series name
    namespace: String,
    /// Declared fully-qualified names, in declaration order
    declared: Mutex<Vec<String>>,
}

impl MetricsRegistry {
    /// Create an empty registry using the `speedtest` namespace
    pub fn new() -> Self {
        Self::with_namespace(NAMESPACE)
    }

    /// Create an empty registry with a custom namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MetricsRegistryInner {
                registry: Registry::new(),
                namespace: namespace.into(),
                declared: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Namespace used for series names
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Declare a new series
    ///
    /// # Errors
    ///
    /// `RegistrationConflict` if a series with the same fully-qualified name
    /// exists already, or a `Prometheus` error if the name or label keys are
    /// not valid.
    pub fn declare(&self, series: MetricSeries) -> MetricsResult<SeriesHandle> {
        let mut declared = self
            .inner
            .declared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let opts = Opts::new(series.name.as_str(), series.help.as_str())
            .namespace(self.inner.namespace.as_str());
        let fq_name = opts.fq_name();
        if declared.contains(&fq_name) {
            return Err(MetricsError::RegistrationConflict(fq_name));
        }

        let label_keys: Vec<&str> = series.label_keys.iter().map(String::as_str).collect();
        let gauge = match series.kind {
            MetricKind::Gauge => GaugeVec::new(opts, &label_keys)?,
        };

        self.inner
            .registry
            .register(Box::new(gauge.clone()))
            .map_err(|e| match e {
                prometheus::Error::AlreadyReg => MetricsError::RegistrationConflict(fq_name.clone()),
                other => MetricsError::Prometheus(other),
            })?;

        debug!(series = %fq_name, labels = ?series.label_keys, "Declared metric series");
        declared.push(fq_name.clone());

        Ok(SeriesHandle {
            fq_name,
            label_keys: series.label_keys,
            gauge,
        })
    }

    /// Set the sample for one label combination, replacing any previous value
    ///
    /// `label_values` must match the series' label keys in number and order.
    pub fn publish(&self, handle: &SeriesHandle, label_values: &[&str], value: f64) -> MetricsResult<()> {
        handle.gauge.get_metric_with_label_values(label_values)?.set(value);
        Ok(())
    }

    /// Drop every sample of a series
    pub fn clear(&self, handle: &SeriesHandle) {
        handle.gauge.reset();
    }

    /// Render every non-empty series in Prometheus text exposition format
    ///
    /// Families are sorted by name and samples by label values, so two
    /// renders without an intervening publish are byte-identical.
    pub fn render(&self) -> MetricsResult<String> {
        let families = self.inner.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Fully-qualified names of declared series, in declaration order
    pub fn declared(&self) -> Vec<String> {
        self.inner
            .declared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
