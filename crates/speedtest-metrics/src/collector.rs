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
//! Scrape-time collector
//!
//! Each scrape runs one measurement through the [`MeasurementClient`] and
//! publishes the outcome before the registry is rendered.

use speedtest_net::{MeasurementClient, MeasurementResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::MetricsResult;
use crate::registry::{MetricsRegistry, SeriesHandle};
use crate::types::MetricSeries;

/// Handles of the series the collector publishes
struct ExporterSeries {
    server: SeriesHandle,
    latency: SeriesHandle,
    download: SeriesHandle,
    upload: SeriesHandle,
    up: SeriesHandle,
    scrape_duration: SeriesHandle,
}

impl ExporterSeries {
    fn declare(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            server: registry.declare(
                MetricSeries::gauge("server", "Speedtest server used to measure")
                    .with_labels(&["name", "latitude", "longitude"]),
            )?,
            latency: registry.declare(MetricSeries::gauge("latency", "Latency (seconds)"))?,
            download: registry.declare(MetricSeries::gauge("download", "Download bandwidth (bit/s)"))?,
            upload: registry.declare(MetricSeries::gauge("upload", "Upload bandwidth (bit/s)"))?,
            up: registry.declare(MetricSeries::gauge(
                "up",
                "Whether the last speedtest measurement succeeded",
            ))?,
            scrape_duration: registry.declare(MetricSeries::gauge(
                "scrape_duration_seconds",
                "Time taken by the last scrape (seconds)",
            ))?,
        })
    }

    /// Series whose samples come from a measurement
    fn measured(&self) -> [&SeriesHandle; 4] {
        [&self.server, &self.latency, &self.download, &self.upload]
    }
}

/// Runs a measurement per scrape and renders the registry
///
/// Scrapes are serialized: a concurrent scrape waits for the running one,
/// then runs its own measurement. The rendered output therefore always
/// reflects exactly one measurement.
pub struct SpeedtestCollector {
    registry: MetricsRegistry,
    client: Option<MeasurementClient>,
    series: ExporterSeries,
    scrape_gate: Mutex<()>,
    unconfigured_reported: AtomicBool,
}

impl SpeedtestCollector {
    /// Declare the exporter series on `registry`
    ///
    /// `client` may be `None`, in which case scrapes render the registry as
    /// it is and the condition is logged once.
    pub fn new(registry: MetricsRegistry, client: Option<MeasurementClient>) -> MetricsResult<Self> {
        let series = ExporterSeries::declare(&registry)?;
        Ok(Self {
            registry,
            client,
            series,
            scrape_gate: Mutex::new(()),
            unconfigured_reported: AtomicBool::new(false),
        })
    }

    /// Get reference to the underlying metrics registry
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Whether a measurement client is attached
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Measure, publish and render
    ///
    /// Measurement failures are not errors here: they clear the measured
    /// series and set `up` to 0. Only registry failures propagate.
    pub async fn scrape(&self) -> MetricsResult<String> {
        let _gate = self.scrape_gate.lock().await;

        let Some(client) = &self.client else {
            if !self.unconfigured_reported.swap(true, Ordering::SeqCst) {
                error!("Speedtest client not configured, serving metrics without measurement");
            }
            return self.registry.render();
        };

        let start = Instant::now();
        match client.run_measurement().await {
            Ok(result) => self.publish_success(&result)?,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Speedtest measurement failed");
                self.publish_failure()?;
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        self.registry.publish(&self.series.scrape_duration, &[], elapsed)?;
        debug!(duration_seconds = elapsed, "Scrape finished");

        self.registry.render()
    }

    fn publish_success(&self, result: &MeasurementResult) -> MetricsResult<()> {
        let latitude = format!("{:.6}", result.server.latitude);
        let longitude = format!("{:.6}", result.server.longitude);

        // One server sample per scrape, even if the server changed
        self.registry.clear(&self.series.server);
        self.registry.publish(
            &self.series.server,
            &[result.server.name.as_str(), latitude.as_str(), longitude.as_str()],
            1.0,
        )?;
        self.registry.publish(&self.series.latency, &[], result.latency_seconds)?;
        self.registry.publish(&self.series.download, &[], result.download_bps)?;
        self.registry.publish(&self.series.upload, &[], result.upload_bps)?;
        self.registry.publish(&self.series.up, &[], 1.0)
    }

    fn publish_failure(&self) -> MetricsResult<()> {
        for handle in self.series.measured() {
            self.registry.clear(handle);
        }
        self.registry.publish(&self.series.up, &[], 0.0)
    }
}
