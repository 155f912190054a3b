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

//! speedtest.net measurement client
//!
//! Two layers live in this crate:
//!
//! - [`SpeedtestBackend`]: the measurement collaborator. [`HttpBackend`] talks
//!   to speedtest.net over HTTP; [`mock::MockBackend`] is an in-memory stand-in
//!   for tests.
//! - [`MeasurementClient`]: the adapter the exporter calls once per scrape. It
//!   owns server selection state and turns backend output into a
//!   [`MeasurementResult`] in exported units.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use speedtest_net::{HttpBackend, MeasurementClient, ServerPolicy, SpeedtestSettings};
//!
//! # async fn example() -> Result<(), speedtest_net::SpeedtestError> {
//! let backend = Arc::new(HttpBackend::new(SpeedtestSettings::default())?);
//! let client = MeasurementClient::connect(backend, ServerPolicy::CacheAfterFirst).await?;
//!
//! let result = client.run_measurement().await?;
//! println!("{} bit/s down via {}", result.download_bps, result.server);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geo;
pub mod http;
pub mod measurement;
pub mod mock;
pub mod parse;
pub mod types;

use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, warn};

pub use error::{SpeedtestError, SpeedtestResult};
pub use http::HttpBackend;
pub use measurement::{MeasurementClient, MeasurementResult, ServerPolicy};
pub use types::{ClientConfig, ClientInfo, LatencyAlgorithm, Server, SpeedtestSettings};

/// Measurement collaborator: everything the adapter needs from a speed test
/// service.
///
/// All network operations are fallible and report failures as
/// [`SpeedtestError`] values. Implementations must never terminate the
/// process.
///
/// Throughput is reported in kilobits per second and latency in
/// milliseconds; [`MeasurementClient`] rescales to the exported units.
#[async_trait]
pub trait SpeedtestBackend: Send + Sync + Debug {
    /// Fetch the client configuration (location, ignored server ids)
    async fn get_config(&self) -> SpeedtestResult<ClientConfig>;

    /// Fetch the full list of reference servers
    async fn get_servers(&self) -> SpeedtestResult<Vec<Server>>;

    /// How many servers [`get_closest_servers`](Self::get_closest_servers) keeps
    fn num_closest(&self) -> usize {
        types::DEFAULT_NUM_CLOSEST
    }

    /// Rank servers by distance from the client and keep the nearest ones
    fn get_closest_servers(&self, config: &ClientConfig, servers: &[Server]) -> Vec<Server> {
        geo::closest_servers(config, servers, self.num_closest())
    }

    /// Measure the round trip latency to one server, in milliseconds
    async fn latency(&self, server: &Server) -> SpeedtestResult<f64>;

    /// Probe every server in order and return the one with the lowest latency.
    ///
    /// Unreachable servers are skipped. Ties go to the server that comes
    /// first. The returned server carries its measured `latency_ms`.
    async fn get_fastest_server(&self, servers: &[Server]) -> SpeedtestResult<Server> {
        let mut fastest: Option<Server> = None;

        for server in servers {
            match self.latency(server).await {
                Ok(latency_ms) => {
                    debug!(server = %server, latency_ms, "Latency probe finished");
                    let faster = fastest
                        .as_ref()
                        .is_none_or(|best| latency_ms < best.latency_ms);
                    if faster {
                        let mut candidate = server.clone();
                        candidate.latency_ms = latency_ms;
                        fastest = Some(candidate);
                    }
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "Skipping unreachable server");
                }
            }
        }

        fastest.ok_or_else(|| {
            SpeedtestError::server_selection(format!(
                "none of {} candidate servers answered a latency probe",
                servers.len()
            ))
        })
    }

    /// Measure download throughput against a server, in kbit/s
    async fn download(&self, server: &Server) -> SpeedtestResult<f64>;

    /// Measure upload throughput against a server, in kbit/s
    async fn upload(&self, server: &Server) -> SpeedtestResult<f64>;
}
