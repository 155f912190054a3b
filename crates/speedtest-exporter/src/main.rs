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

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{version_banner, Cli};
use speedtest_metrics::{MetricsRegistry, MetricsServer, SpeedtestCollector};
use speedtest_net::{HttpBackend, MeasurementClient};
use speedtest_observability::init_tracing;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version_banner());
        return Ok(());
    }

    init_tracing(cli.log_format, cli.log_level.as_deref()).context("failed to initialize logging")?;

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting speedtest exporter");

    let settings = cli.speedtest_settings();
    let backend = HttpBackend::new(settings).context("failed to build speedtest HTTP client")?;
    let client = MeasurementClient::connect(Arc::new(backend), cli.server_policy())
        .await
        .context("could not initialize speedtest client")?;

    let collector = SpeedtestCollector::new(MetricsRegistry::new(), Some(client))
        .context("failed to register metrics")?;
    let server = MetricsServer::new(collector, cli.metrics_config())
        .context("invalid web configuration")?;

    server.serve().await?;
    Ok(())
}
