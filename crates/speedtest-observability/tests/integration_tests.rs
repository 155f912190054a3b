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
//! Integration tests for logging setup
//!
//! The global subscriber can only be set once per process, so everything that
//! installs one lives in a single test.

use speedtest_observability::{init_tracing_with_config, LogConfig, LogFormat};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_color(false)
        .with_targets(false);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, Some("debug".to_string()));
    assert!(!config.use_color);
    assert!(!config.include_targets);
}

#[test]
fn test_explicit_level_wins_over_environment() {
    let config = LogConfig::new().with_level("warn");
    assert_eq!(config.get_effective_level(), "warn");
}

#[test]
fn test_subscriber_installs_once() {
    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("info")
        .with_color(false);

    assert!(init_tracing_with_config(config.clone()).is_ok());
    tracing::info!(component = "observability", "subscriber installed");

    // Second installation reports an error instead of panicking
    assert!(init_tracing_with_config(config).is_err());
}
