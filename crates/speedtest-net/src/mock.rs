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

//! In-memory mock speedtest backend for testing
//!
//! [`MockBackend`] answers every [`SpeedtestBackend`](crate::SpeedtestBackend)
//! call from shared in-memory state. Clones share that state, so a test can
//! hand one clone to a [`MeasurementClient`](crate::MeasurementClient) and keep
//! another to change latencies or inject failures between scrapes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use speedtest_net::{mock::MockBackend, MeasurementClient, Server, ServerPolicy};
//!
//! # async fn example() -> Result<(), speedtest_net::SpeedtestError> {
//! let backend = MockBackend::new()
//!     .with_server(Server::new("1", "Alpha", 10.0, 20.0, "http://alpha/upload.php"), 25.0)
//!     .with_throughput(50_000.0, 10_000.0);
//!
//! let client = MeasurementClient::connect(Arc::new(backend), ServerPolicy::CacheAfterFirst).await?;
//! let result = client.run_measurement().await?;
//! assert_eq!(result.download_bps, 50_000_000.0);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{SpeedtestError, SpeedtestResult};
use crate::types::{ClientConfig, Server};
use crate::SpeedtestBackend;

/// Operations a [`MockBackend`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    /// `get_config` returns a ConfigFetch error
    Config,
    /// `get_servers` returns a ServerListFetch error
    ServerList,
    /// every `latency` probe returns a Probe error
    Latency,
    /// `download` returns a Probe error
    Download,
    /// `upload` returns a Probe error
    Upload,
    /// `download` panics
    PanicOnDownload,
}

#[derive(Debug, Default)]
struct MockState {
    config: ClientConfig,
    servers: Vec<Server>,
    latencies: HashMap<String, f64>,
    download_kbps: f64,
    upload_kbps: f64,
    delay: Duration,
    failures: HashSet<MockFailure>,
    ramp: bool,
    round: u64,
    latency_calls: u64,
    download_calls: u64,
    upload_calls: u64,
}

/// In-memory mock speedtest backend
///
/// By default every server is unreachable until it is given a latency.
/// In ramp mode each measurement round `n` (counted by download calls)
/// reports latency `n` ms, download `n * 1000` kbit/s and upload `n * 100`
/// kbit/s, which makes samples from different measurements tell-tale.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock with no servers and zero throughput
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // Only a test panicking mid-update can poison the lock; keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the client configuration returned by `get_config`
    pub fn with_config(self, config: ClientConfig) -> Self {
        self.state().config = config;
        self
    }

    /// Add a server reachable with the given latency in milliseconds
    pub fn with_server(self, server: Server, latency_ms: f64) -> Self {
        {
            let mut state = self.state();
            state.latencies.insert(server.id.clone(), latency_ms);
            state.servers.push(server);
        }
        self
    }

    /// Add a server that never answers latency probes
    pub fn with_unreachable_server(self, server: Server) -> Self {
        self.state().servers.push(server);
        self
    }

    /// Set download and upload throughput in kbit/s
    pub fn with_throughput(self, download_kbps: f64, upload_kbps: f64) -> Self {
        self.set_throughput(download_kbps, upload_kbps);
        self
    }

    /// Sleep this long inside every download and upload call
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = delay;
        self
    }

    /// Switch on ramp mode (see type docs)
    pub fn with_ramp(self) -> Self {
        self.state().ramp = true;
        self
    }

    /// Make one operation fail
    pub fn with_failure(self, failure: MockFailure) -> Self {
        self.fail(failure);
        self
    }

    /// Change the latency of a server by id
    pub fn set_latency(&self, server_id: &str, latency_ms: f64) {
        self.state().latencies.insert(server_id.to_string(), latency_ms);
    }

    /// Stop answering latency requests for a server by id
    pub fn set_unreachable(&self, server_id: &str) {
        self.state().latencies.remove(server_id);
    }

    /// Change reported throughput in kbit/s
    pub fn set_throughput(&self, download_kbps: f64, upload_kbps: f64) {
        let mut state = self.state();
        state.download_kbps = download_kbps;
        state.upload_kbps = upload_kbps;
    }

    /// Start failing an operation
    pub fn fail(&self, failure: MockFailure) {
        self.state().failures.insert(failure);
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Number of latency probes served
    pub fn latency_calls(&self) -> u64 {
        self.state().latency_calls
    }

    /// Number of download probes served
    pub fn download_calls(&self) -> u64 {
        self.state().download_calls
    }

    /// Number of upload probes served
    pub fn upload_calls(&self) -> u64 {
        self.state().upload_calls
    }

    fn check(&self, failure: MockFailure, error: impl FnOnce() -> SpeedtestError) -> SpeedtestResult<()> {
        if self.state().failures.contains(&failure) {
            Err(error())
        } else {
            Ok(())
        }
    }

    fn delay(&self) -> Duration {
        self.state().delay
    }
}

#[async_trait]
impl SpeedtestBackend for MockBackend {
    async fn get_config(&self) -> SpeedtestResult<ClientConfig> {
        self.check(MockFailure::Config, || {
            SpeedtestError::config_fetch("mock: configuration unavailable")
        })?;
        Ok(self.state().config.clone())
    }

    async fn get_servers(&self) -> SpeedtestResult<Vec<Server>> {
        self.check(MockFailure::ServerList, || {
            SpeedtestError::server_list_fetch("mock: server list unavailable")
        })?;
        Ok(self.state().servers.clone())
    }

    async fn latency(&self, server: &Server) -> SpeedtestResult<f64> {
        self.check(MockFailure::Latency, || SpeedtestError::probe("mock: latency probe failed"))?;

        let mut state = self.state();
        state.latency_calls += 1;
        if state.ramp {
            return Ok((state.round + 1) as f64);
        }
        state
            .latencies
            .get(&server.id)
            .copied()
            .ok_or_else(|| SpeedtestError::probe(format!("mock: server {} unreachable", server.id)))
    }

    async fn download(&self, _server: &Server) -> SpeedtestResult<f64> {
        self.check(MockFailure::Download, || SpeedtestError::probe("mock: download failed"))?;
        if self.state().failures.contains(&MockFailure::PanicOnDownload) {
            panic!("mock: download panicked");
        }

        let value = {
            let mut state = self.state();
            state.download_calls += 1;
            if state.ramp {
                state.round += 1;
                state.round as f64 * 1000.0
            } else {
                state.download_kbps
            }
        };

        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(value)
    }

    async fn upload(&self, _server: &Server) -> SpeedtestResult<f64> {
        self.check(MockFailure::Upload, || SpeedtestError::probe("mock: upload failed"))?;

        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.upload_calls += 1;
        if state.ramp {
            Ok(state.round as f64 * 100.0)
        } else {
            Ok(state.upload_kbps)
        }
    }
}
