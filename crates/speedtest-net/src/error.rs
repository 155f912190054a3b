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

//! Measurement error types

use thiserror::Error;

/// Result type alias for measurement operations
pub type SpeedtestResult<T> = Result<T, SpeedtestError>;

/// Errors that can occur while talking to speedtest.net or measuring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeedtestError {
    /// The client configuration document could not be fetched or parsed
    #[error("failed to fetch speedtest configuration: {0}")]
    ConfigFetch(String),

    /// The server list could not be fetched or parsed
    #[error("failed to fetch server list: {0}")]
    ServerListFetch(String),

    /// No candidate server answered a latency probe
    #[error("no reachable speedtest server: {0}")]
    ServerSelection(String),

    /// A latency, download or upload transfer failed
    #[error("probe failed: {0}")]
    Probe(String),

    /// The measurement task died before producing a result
    #[error("measurement aborted: {0}")]
    Aborted(String),

    /// Client settings are unusable (bad URL, TLS backend unavailable, ...)
    #[error("invalid speedtest settings: {0}")]
    InvalidSettings(String),
}

impl SpeedtestError {
    /// Create a ConfigFetch error with context
    pub fn config_fetch<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::ConfigFetch(msg.into())
    }

    /// Create a ServerListFetch error with context
    pub fn server_list_fetch<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::ServerListFetch(msg.into())
    }

    /// Create a ServerSelection error with context
    pub fn server_selection<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::ServerSelection(msg.into())
    }

    /// Create a Probe error with context
    pub fn probe<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::Probe(msg.into())
    }

    /// Create an Aborted error with context
    pub fn aborted<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::Aborted(msg.into())
    }

    /// Create an InvalidSettings error with context
    pub fn invalid_settings<S: Into<String>>(msg: S) -> Self {
        SpeedtestError::InvalidSettings(msg.into())
    }

    /// Short, stable name of the error class, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            SpeedtestError::ConfigFetch(_) => "config_fetch",
            SpeedtestError::ServerListFetch(_) => "server_list_fetch",
            SpeedtestError::ServerSelection(_) => "server_selection",
            SpeedtestError::Probe(_) => "probe",
            SpeedtestError::Aborted(_) => "aborted",
            SpeedtestError::InvalidSettings(_) => "invalid_settings",
        }
    }

    /// Whether this error can only happen while bootstrapping the client
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            SpeedtestError::ConfigFetch(_)
                | SpeedtestError::ServerListFetch(_)
                | SpeedtestError::InvalidSettings(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpeedtestError::probe("connection reset");
        assert_eq!(err.to_string(), "probe failed: connection reset");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(SpeedtestError::config_fetch("x").kind(), "config_fetch");
        assert_eq!(SpeedtestError::server_list_fetch("x").kind(), "server_list_fetch");
        assert_eq!(SpeedtestError::server_selection("x").kind(), "server_selection");
        assert_eq!(SpeedtestError::aborted("x").kind(), "aborted");
    }

    #[test]
    fn test_startup_errors() {
        assert!(SpeedtestError::config_fetch("dns").is_startup_error());
        assert!(SpeedtestError::server_list_fetch("404").is_startup_error());
        assert!(!SpeedtestError::probe("timeout").is_startup_error());
        assert!(!SpeedtestError::server_selection("none").is_startup_error());
    }
}
