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

use clap::Parser;
use speedtest_metrics::MetricsConfig;
use speedtest_net::types::{default_config_url, default_server_list_url};
use speedtest_net::{ServerPolicy, SpeedtestSettings};
use speedtest_observability::LogFormat;
use std::time::Duration;

/// Banner printed by `--version`
pub fn version_banner() -> String {
    format!("Speedtest Prometheus exporter. v{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Parser, Debug)]
#[command(name = "speedtest_exporter")]
#[command(about = "Prometheus exporter for speedtest.net measurements")]
#[command(
    long_about = "Runs a speedtest.net measurement (latency, download, upload) on every scrape \
of the telemetry path and exposes the results as Prometheus gauges."
)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version information and exit
    #[arg(long)]
    pub version: bool,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", value_name = "ADDR", default_value = ":9112")]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", value_name = "PATH", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Speedtest configuration URL
    #[arg(long = "speedtest.config-url", value_name = "URL")]
    pub config_url: Option<String>,

    /// Speedtest server list URL
    #[arg(long = "speedtest.server-list-url", value_name = "URL")]
    pub server_list_url: Option<String>,

    /// Select the fastest server again before every measurement
    #[arg(long = "speedtest.reload-server")]
    pub reload_server: bool,

    /// Timeout for each speedtest.net request, in seconds
    #[arg(long = "speedtest.timeout", value_name = "SECONDS", default_value_t = 60)]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error) or a full filter directive;
    /// falls back to RUST_LOG, then info
    #[arg(long = "log.level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long = "log.format", value_name = "FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Measurement settings derived from the `speedtest.*` flags
    pub fn speedtest_settings(&self) -> SpeedtestSettings {
        SpeedtestSettings::with_urls(
            self.config_url.clone().unwrap_or_else(default_config_url),
            self.server_list_url.clone().unwrap_or_else(default_server_list_url),
        )
        .with_timeout(Duration::from_secs(self.timeout))
    }

    /// Server selection policy from `--speedtest.reload-server`
    pub fn server_policy(&self) -> ServerPolicy {
        ServerPolicy::from_reload_flag(self.reload_server)
    }

    /// Endpoint configuration from the `web.*` flags
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            listen_address: self.listen_address.clone(),
            telemetry_path: self.telemetry_path.clone(),
        }
    }
}
