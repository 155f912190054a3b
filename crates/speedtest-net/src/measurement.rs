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

//! Measurement client adapter
//!
//! [`MeasurementClient`] is the single entry point the exporter calls per
//! scrape. It owns the server selection state and converts backend units
//! (kbit/s, milliseconds) into exported units (bit/s, seconds).

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SpeedtestError, SpeedtestResult};
use crate::types::{ClientConfig, Server};
use crate::SpeedtestBackend;

/// When to look for the fastest server again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerPolicy {
    /// Select once on the first measurement and keep that server
    #[default]
    CacheAfterFirst,
    /// Select before every measurement
    AlwaysReselect,
}

impl ServerPolicy {
    /// Map the `--speedtest.reload-server` flag onto a policy
    pub fn from_reload_flag(reload_server: bool) -> Self {
        if reload_server {
            ServerPolicy::AlwaysReselect
        } else {
            ServerPolicy::CacheAfterFirst
        }
    }
}

/// Result of one complete measurement, in exported units
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult {
    /// Server the measurement ran against
    pub server: Server,
    /// Download throughput in bit/s
    pub download_bps: f64,
    /// Upload throughput in bit/s
    pub upload_bps: f64,
    /// Round trip latency in seconds
    pub latency_seconds: f64,
}

impl MeasurementResult {
    /// Build a result from backend units: throughput in kbit/s, latency in
    /// `server.latency_ms`.
    ///
    /// Fails if any value is negative or not finite; there are no partial
    /// results.
    pub fn from_backend_units(
        server: Server,
        download_kbps: f64,
        upload_kbps: f64,
    ) -> SpeedtestResult<Self> {
        let latency_ms = checked("latency", server.latency_ms)?;
        let download_kbps = checked("download", download_kbps)?;
        let upload_kbps = checked("upload", upload_kbps)?;

        Ok(Self {
            server,
            download_bps: download_kbps * 1000.0,
            upload_bps: upload_kbps * 1000.0,
            latency_seconds: latency_ms / 1000.0,
        })
    }
}

fn checked(what: &str, value: f64) -> SpeedtestResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SpeedtestError::probe(format!("{} probe produced invalid value {}", what, value)))
    }
}

#[derive(Debug)]
struct Inner {
    backend: Arc<dyn SpeedtestBackend>,
    policy: ServerPolicy,
    config: ClientConfig,
    candidates: Vec<Server>,
    current_server: Mutex<Option<Server>>,
}

/// Adapter between the exporter and a [`SpeedtestBackend`]
///
/// Cheap to clone; clones share selection state. Measurements are
/// serialized: a second caller waits until the running measurement is done.
#[derive(Debug, Clone)]
pub struct MeasurementClient {
    inner: Arc<Inner>,
}

impl MeasurementClient {
    /// Bootstrap the adapter: fetch configuration and server list, then rank
    /// the candidate servers by distance.
    ///
    /// # Errors
    ///
    /// - `ConfigFetch` / `ServerListFetch` if bootstrap data is unavailable
    /// - `ServerSelection` if no usable server remains after ranking
    pub async fn connect(
        backend: Arc<dyn SpeedtestBackend>,
        policy: ServerPolicy,
    ) -> SpeedtestResult<Self> {
        debug!("Retrieving configuration");
        let config = backend.get_config().await?;

        debug!("Retrieving all servers");
        let servers = backend.get_servers().await?;

        let candidates = backend.get_closest_servers(&config, &servers);
        if candidates.is_empty() {
            return Err(SpeedtestError::server_selection(format!(
                "no usable server among {} listed",
                servers.len()
            )));
        }

        for server in &candidates {
            debug!(server = %server, "Candidate server");
        }
        info!(
            servers = servers.len(),
            candidates = candidates.len(),
            policy = ?policy,
            "Speedtest client ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                policy,
                config,
                candidates,
                current_server: Mutex::new(None),
            }),
        })
    }

    /// Run one measurement: select (or reuse) a server, then probe latency,
    /// download and upload.
    ///
    /// The measurement runs on its own task. A panic inside the backend
    /// surfaces as [`SpeedtestError::Aborted`] instead of unwinding into the
    /// caller. Dropping the returned future aborts the task, so a caller
    /// that gives up does not leave a measurement running behind it.
    pub async fn run_measurement(&self) -> SpeedtestResult<MeasurementResult> {
        let inner = Arc::clone(&self.inner);
        let mut task = AbortOnDrop(tokio::spawn(async move { inner.measure().await }));
        match (&mut task.0).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(SpeedtestError::aborted("measurement task panicked")),
            Err(e) => Err(SpeedtestError::aborted(e.to_string())),
        }
    }

    /// Server selection policy
    pub fn policy(&self) -> ServerPolicy {
        self.inner.policy
    }

    /// Client configuration fetched at startup
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Candidate servers, nearest first
    pub fn candidates(&self) -> &[Server] {
        &self.inner.candidates
    }

    /// Currently cached server, if any
    pub async fn current_server(&self) -> Option<Server> {
        self.inner.current_server.lock().await.clone()
    }
}

/// Aborts the wrapped task when dropped; a no-op once the task finished
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Inner {
    async fn measure(&self) -> SpeedtestResult<MeasurementResult> {
        let mut current = self.current_server.lock().await;

        let cached = match self.policy {
            ServerPolicy::CacheAfterFirst => current.clone(),
            ServerPolicy::AlwaysReselect => None,
        };

        let server = match cached {
            Some(mut server) => match self.backend.latency(&server).await {
                Ok(latency_ms) => {
                    server.latency_ms = latency_ms;
                    debug!(server = %server, latency_ms, "Reusing test server");
                    server
                }
                Err(e) => {
                    // Forget the server so the next measurement selects again
                    warn!(server = %server, error = %e, "Cached test server stopped answering");
                    *current = None;
                    return Err(e);
                }
            },
            None => {
                let server = self.backend.get_fastest_server(&self.candidates).await?;
                info!(server = %server, latency_ms = server.latency_ms, "Test server selected");
                if self.policy == ServerPolicy::CacheAfterFirst {
                    *current = Some(server.clone());
                }
                server
            }
        };

        let download_kbps = self.backend.download(&server).await?;
        let upload_kbps = self.backend.upload(&server).await?;
        let result = MeasurementResult::from_backend_units(server, download_kbps, upload_kbps)?;

        info!(
            server = %result.server,
            download_bps = result.download_bps,
            upload_bps = result.upload_bps,
            latency_seconds = result.latency_seconds,
            "Speedtest results"
        );
        Ok(result)
    }
}
