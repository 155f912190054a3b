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
//! Logging initialization and setup.

use crate::config::{LogConfig, LogError, LogFormat};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize tracing with the specified format and optional log level.
///
/// # Example
///
/// ```ignore
/// use speedtest_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("debug")).unwrap();
/// tracing::info!("exporter starting");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Initialize tracing with a detailed configuration.
///
/// Logs always go to stderr so stdout stays free for `--version` output.
/// Fails if the filter directive does not parse or a global subscriber is
/// already installed.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(config.include_targets)
                    .with_ansi(config.use_color)
                    .pretty(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(config.include_targets)
                    .with_ansi(config.use_color)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .json()
                    .with_target(config.include_targets),
            )
            .try_init(),
    };

    result.map_err(|e| LogError::ConfigError(format!("failed to install subscriber: {}", e)))
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let level_str = config.get_effective_level();

    EnvFilter::try_new(&level_str).map_err(|e| {
        LogError::ConfigError(format!("failed to parse log filter '{}': {}", level_str, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Global subscriber installation is covered in tests/integration_tests.rs;
    // it can only happen once per process.

    #[test]
    fn test_env_filter_parsing() {
        let result = build_env_filter(&LogConfig::new().with_level("debug"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_per_crate_directive() {
        let result = build_env_filter(&LogConfig::new().with_level("warn,speedtest_net=trace"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let result = build_env_filter(&LogConfig::new().with_level("speedtest_net=loud"));
        assert!(matches!(result, Err(LogError::ConfigError(_))));
    }
}
