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

//! speedtest.net backend over HTTP
//!
//! Every speedtest.net server exposes its probe resources next to its
//! `upload.php` endpoint:
//!
//! - `latency.txt` for round trip measurements
//! - `random{N}x{N}.jpg` images for the download ladder
//! - `upload.php` accepting form posts for the upload ladder
//!
//! Throughput is aggregate bits over aggregate elapsed time across the whole
//! ladder, so one slow or fast step does not dominate the result.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{SpeedtestError, SpeedtestResult};
use crate::parse::{parse_config, parse_servers};
use crate::types::{cache_buster, random_alphanumeric, ClientConfig, Server, SpeedtestSettings};
use crate::SpeedtestBackend;

/// speedtest.net client backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    settings: SpeedtestSettings,
}

impl HttpBackend {
    /// Build a backend with its own connection pool
    pub fn new(settings: SpeedtestSettings) -> SpeedtestResult<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SpeedtestError::invalid_settings(format!("HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// Settings this backend was built with
    pub fn settings(&self) -> &SpeedtestSettings {
        &self.settings
    }

    async fn fetch_text(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Resolve a probe resource relative to the server's upload endpoint
    fn resource_url(server: &Server, resource: &str) -> SpeedtestResult<Url> {
        let base = Url::parse(&server.url).map_err(|e| {
            SpeedtestError::probe(format!("server {} has invalid url '{}': {}", server.id, server.url, e))
        })?;
        let mut url = base
            .join(resource)
            .map_err(|e| SpeedtestError::probe(format!("cannot resolve {}: {}", resource, e)))?;
        url.set_query(Some(&format!("x={}", cache_buster())));
        Ok(url)
    }

    async fn round_trip(&self, url: Url) -> SpeedtestResult<Duration> {
        let start = Instant::now();
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SpeedtestError::probe(format!("latency request failed: {}", e)))?
            .bytes()
            .await
            .map_err(|e| SpeedtestError::probe(format!("latency response failed: {}", e)))?;
        Ok(start.elapsed())
    }

    async fn download_one(&self, url: Url) -> SpeedtestResult<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SpeedtestError::probe(format!("download request failed: {}", e)))?;

        let mut received = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SpeedtestError::probe(format!("download interrupted: {}", e)))?
        {
            received += chunk.len() as u64;
        }
        Ok(received)
    }

    async fn upload_one(&self, url: Url, payload: Vec<u8>) -> SpeedtestResult<u64> {
        let sent = payload.len() as u64;
        self.client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SpeedtestError::probe(format!("upload request failed: {}", e)))?
            .bytes()
            .await
            .map_err(|e| SpeedtestError::probe(format!("upload response failed: {}", e)))?;
        Ok(sent)
    }
}

/// Form body of exactly `size` bytes
fn upload_payload(size: usize) -> Vec<u8> {
    const PREFIX: &str = "content1=";
    let mut body = String::with_capacity(size.max(PREFIX.len()));
    body.push_str(PREFIX);
    body.push_str(&random_alphanumeric(size.saturating_sub(PREFIX.len())));
    body.into_bytes()
}

/// Aggregate throughput in kbit/s
pub fn kilobits_per_second(bytes: u64, elapsed: Duration) -> SpeedtestResult<f64> {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return Err(SpeedtestError::probe("transfer finished in zero time"));
    }
    Ok(bytes as f64 * 8.0 / seconds / 1000.0)
}

#[async_trait]
impl SpeedtestBackend for HttpBackend {
    async fn get_config(&self) -> SpeedtestResult<ClientConfig> {
        debug!(url = %self.settings.config_url, "Fetching speedtest configuration");
        let body = self
            .fetch_text(&self.settings.config_url)
            .await
            .map_err(|e| SpeedtestError::config_fetch(e.to_string()))?;
        let config = parse_config(&body)?;

        info!(
            ip = %config.client.ip,
            isp = %config.client.isp,
            latitude = config.client.latitude,
            longitude = config.client.longitude,
            "Client environment"
        );
        Ok(config)
    }

    async fn get_servers(&self) -> SpeedtestResult<Vec<Server>> {
        debug!(url = %self.settings.server_list_url, "Fetching server list");
        let body = self
            .fetch_text(&self.settings.server_list_url)
            .await
            .map_err(|e| SpeedtestError::server_list_fetch(e.to_string()))?;
        let servers = parse_servers(&body)?;

        debug!(count = servers.len(), "Server list loaded");
        Ok(servers)
    }

    fn num_closest(&self) -> usize {
        self.settings.num_closest
    }

    async fn latency(&self, server: &Server) -> SpeedtestResult<f64> {
        let mut samples = Vec::with_capacity(self.settings.num_latency_tests);
        for _ in 0..self.settings.num_latency_tests {
            let url = Self::resource_url(server, "latency.txt")?;
            let rtt = self.round_trip(url).await?;
            samples.push(rtt.as_secs_f64() * 1000.0);
        }

        self.settings
            .latency_algorithm
            .reduce(&samples)
            .ok_or_else(|| SpeedtestError::probe("latency probe count is zero"))
    }

    async fn download(&self, server: &Server) -> SpeedtestResult<f64> {
        let mut total_bytes = 0u64;
        let mut total_elapsed = Duration::ZERO;

        for size in &self.settings.download_sizes {
            let url = Self::resource_url(server, &format!("random{0}x{0}.jpg", size))?;
            let start = Instant::now();
            let bytes = self.download_one(url).await?;
            let elapsed = start.elapsed();
            debug!(size, bytes, elapsed_ms = elapsed.as_millis() as u64, "Download step");

            total_bytes += bytes;
            total_elapsed += elapsed;
        }

        kilobits_per_second(total_bytes, total_elapsed)
    }

    async fn upload(&self, server: &Server) -> SpeedtestResult<f64> {
        let mut total_bytes = 0u64;
        let mut total_elapsed = Duration::ZERO;

        for &size in &self.settings.upload_sizes {
            let url = Self::resource_url(server, "upload.php")?;
            let payload = upload_payload(size);
            let start = Instant::now();
            let bytes = self.upload_one(url, payload).await?;
            let elapsed = start.elapsed();
            debug!(size, elapsed_ms = elapsed.as_millis() as u64, "Upload step");

            total_bytes += bytes;
            total_elapsed += elapsed;
        }

        kilobits_per_second(total_bytes, total_elapsed)
    }
}
