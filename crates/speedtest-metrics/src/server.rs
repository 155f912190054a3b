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
//! HTTP server for the Prometheus exposition endpoint
//!
//! Serves a landing page on `/` and the metrics on the configured telemetry
//! path. Every request to the telemetry path triggers a measurement.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::collector::SpeedtestCollector;
use crate::error::{MetricsError, MetricsResult};
use crate::types::MetricsConfig;

#[derive(Clone)]
struct AppState {
    collector: Arc<SpeedtestCollector>,
    telemetry_path: Arc<str>,
}

/// HTTP server for Prometheus metrics
#[derive(Clone)]
pub struct MetricsServer {
    collector: Arc<SpeedtestCollector>,
    config: MetricsConfig,
}

impl MetricsServer {
    /// Create a new metrics server
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the telemetry path cannot be routed.
    pub fn new(collector: SpeedtestCollector, config: MetricsConfig) -> MetricsResult<Self> {
        config.validate()?;
        Ok(Self {
            collector: Arc::new(collector),
            config,
        })
    }

    /// Get the bind address for the server
    pub fn bind_address(&self) -> String {
        self.config.socket_addr()
    }

    /// Endpoint configuration
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Build the router: landing page plus telemetry path
    pub fn router(&self) -> Router {
        let state = AppState {
            collector: Arc::clone(&self.collector),
            telemetry_path: Arc::from(self.config.telemetry_path.as_str()),
        };

        Router::new()
            .route("/", get(landing_handler))
            .route(&self.config.telemetry_path, get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM
    pub async fn serve(self) -> MetricsResult<()> {
        let addr = self.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|source| MetricsError::Bind {
            address: addr.clone(),
            source,
        })?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> MetricsResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        info!(
            "Listening on http://{}{}",
            local, self.config.telemetry_path
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}

/// Handler for the telemetry path
async fn metrics_handler(State(state): State<AppState>) -> Response {
    debug!("Serving metrics");

    match state.collector.scrape().await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.collector.registry().content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Speedtest Exporter</title></head>\n\
         <body>\n\
         <h1>Speedtest Exporter</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.telemetry_path
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
