// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 winnyboy5

//! Command-line behaviour of the exporter binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::net::TcpListener;

#[allow(deprecated)]
fn exporter() -> Command {
    Command::cargo_bin("speedtest_exporter").unwrap()
}

/// A local URL nothing listens on
fn dead_url(path: &str) -> String {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    format!("http://127.0.0.1:{}/{}", port, path)
}

#[test]
fn test_version_prints_banner_and_exits() {
    let expected = format!("Speedtest Prometheus exporter. v{}\n", env!("CARGO_PKG_VERSION"));
    exporter()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::eq(expected));
}

#[test]
fn test_version_skips_startup() {
    // Would fail on bootstrap if --version did anything beyond printing
    exporter()
        .arg("--version")
        .arg("--speedtest.config-url")
        .arg(dead_url("speedtest-config.php"))
        .arg("--web.listen-address")
        .arg("256.0.0.1:1")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Speedtest Prometheus exporter. v"));
}

#[test]
fn test_help_lists_dotted_flags() {
    exporter()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--web.listen-address"))
        .stdout(predicate::str::contains("--web.telemetry-path"))
        .stdout(predicate::str::contains("--speedtest.reload-server"))
        .stdout(predicate::str::contains("--log.format"));
}

#[test]
fn test_unknown_flag_fails() {
    exporter()
        .arg("--no-such-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--no-such-flag"));
}

#[test]
fn test_unreachable_config_exits_non_zero() {
    exporter()
        .arg("--speedtest.config-url")
        .arg(dead_url("speedtest-config.php"))
        .arg("--speedtest.server-list-url")
        .arg(dead_url("speedtest-servers-static.php"))
        .arg("--speedtest.timeout")
        .arg("2")
        .arg("--web.listen-address")
        .arg("127.0.0.1:0")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not initialize speedtest client"));
}

#[test]
fn test_logs_go_to_stderr_only() {
    exporter()
        .arg("--speedtest.config-url")
        .arg(dead_url("speedtest-config.php"))
        .arg("--speedtest.timeout")
        .arg("2")
        .arg("--log.format")
        .arg("json")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Starting speedtest exporter"));
}
