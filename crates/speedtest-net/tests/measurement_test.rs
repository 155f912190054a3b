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
//! Integration tests for the measurement adapter against the mock backend

use std::sync::Arc;
use std::time::Duration;

use speedtest_net::mock::{MockBackend, MockFailure};
use speedtest_net::{MeasurementClient, Server, ServerPolicy, SpeedtestError};
use tokio_test::{assert_err, assert_ok};

fn alpha() -> Server {
    Server::new("101", "Alpha", 10.0, 20.0, "http://alpha.example.net/speedtest/upload.php")
}

fn beta() -> Server {
    Server::new("102", "Beta", 11.0, 21.0, "http://beta.example.net/speedtest/upload.php")
}

fn two_server_mock() -> MockBackend {
    MockBackend::new()
        .with_server(alpha(), 25.0)
        .with_server(beta(), 40.0)
        .with_throughput(50_000.0, 10_000.0)
}

#[tokio::test]
async fn test_connect_fails_on_config_error() {
    let mock = two_server_mock().with_failure(MockFailure::Config);
    let err = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap_err();
    assert!(matches!(err, SpeedtestError::ConfigFetch(_)));
    assert!(err.is_startup_error());
}

#[tokio::test]
async fn test_connect_fails_on_server_list_error() {
    let mock = two_server_mock().with_failure(MockFailure::ServerList);
    let err = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap_err();
    assert!(matches!(err, SpeedtestError::ServerListFetch(_)));
}

#[tokio::test]
async fn test_connect_fails_without_servers() {
    let err = MeasurementClient::connect(Arc::new(MockBackend::new()), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap_err();
    assert!(matches!(err, SpeedtestError::ServerSelection(_)));
}

#[tokio::test]
async fn test_candidates_are_nearest_first() {
    let far = Server::new("103", "Far", -60.0, -120.0, "http://far.example.net/speedtest/upload.php");
    let mock = MockBackend::new()
        .with_server(far, 1.0)
        .with_server(beta(), 40.0)
        .with_server(alpha(), 25.0);

    let client = assert_ok!(MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst).await);
    let names: Vec<_> = client.candidates().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Far"]);
}

#[tokio::test]
async fn test_measurement_reports_exported_units() {
    let client = MeasurementClient::connect(Arc::new(two_server_mock()), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    let result = assert_ok!(client.run_measurement().await);
    assert_eq!(result.server.name, "Alpha");
    assert_eq!(result.server.latitude, 10.0);
    assert_eq!(result.server.longitude, 20.0);
    assert_eq!(result.download_bps, 50_000_000.0);
    assert_eq!(result.upload_bps, 10_000_000.0);
    assert_eq!(result.latency_seconds, 0.025);
}

#[tokio::test]
async fn test_cached_server_is_not_reselected() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    let first = client.run_measurement().await.unwrap();
    assert_eq!(first.server.name, "Alpha");
    assert_eq!(client.current_server().await.map(|s| s.name), Some("Alpha".to_string()));

    // Beta is now clearly faster, but the cached choice sticks
    handle.set_latency("102", 1.0);
    let second = client.run_measurement().await.unwrap();
    assert_eq!(second.server.name, "Alpha");
    assert_eq!(second.server.latitude, 10.0);
    assert_eq!(second.server.longitude, 20.0);
}

#[tokio::test]
async fn test_cached_server_latency_is_refreshed() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    client.run_measurement().await.unwrap();
    handle.set_latency("101", 31.0);

    let second = client.run_measurement().await.unwrap();
    assert_eq!(second.latency_seconds, 0.031);
}

#[tokio::test]
async fn test_always_reselect_follows_fastest_server() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::AlwaysReselect)
        .await
        .unwrap();

    assert_eq!(client.run_measurement().await.unwrap().server.name, "Alpha");
    assert!(client.current_server().await.is_none());

    handle.set_latency("102", 1.0);
    let second = client.run_measurement().await.unwrap();
    assert_eq!(second.server.name, "Beta");
    assert_eq!(second.latency_seconds, 0.001);
}

#[tokio::test]
async fn test_probe_failure_yields_no_partial_result() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    handle.fail(MockFailure::Upload);
    let err = assert_err!(client.run_measurement().await);
    assert!(matches!(err, SpeedtestError::Probe(_)));

    // Recovers once the collaborator does
    handle.clear_failures();
    assert_ok!(client.run_measurement().await);
}

#[tokio::test]
async fn test_unreachable_candidates_fail_selection() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::AlwaysReselect)
        .await
        .unwrap();

    handle.fail(MockFailure::Latency);
    let err = client.run_measurement().await.unwrap_err();
    assert!(matches!(err, SpeedtestError::ServerSelection(_)));
}

#[tokio::test]
async fn test_backend_panic_becomes_error() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    handle.fail(MockFailure::PanicOnDownload);
    let err = client.run_measurement().await.unwrap_err();
    assert!(matches!(err, SpeedtestError::Aborted(_)));

    // The adapter is still usable afterwards
    handle.clear_failures();
    let result = client.run_measurement().await.unwrap();
    assert_eq!(result.server.name, "Alpha");
}

#[tokio::test]
async fn test_concurrent_measurements_do_not_mix_rounds() {
    let mock = two_server_mock()
        .with_ramp()
        .with_delay(Duration::from_millis(20));
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::AlwaysReselect)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.run_measurement().await })
        })
        .collect();

    let mut rounds = Vec::new();
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        let round = (result.latency_seconds * 1000.0).round();
        assert_eq!(result.download_bps, round * 1_000_000.0);
        assert_eq!(result.upload_bps, round * 100_000.0);
        rounds.push(round as u64);
    }

    rounds.sort_unstable();
    assert_eq!(rounds, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_dropped_measurement_stops_running() {
    let mock = two_server_mock().with_delay(Duration::from_millis(100));
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(10), client.run_measurement()).await;
    assert_err!(timed_out);

    // Long enough for an orphaned download and upload to finish
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(handle.download_calls() <= 1);
    assert_eq!(handle.upload_calls(), 0);
}

#[tokio::test]
async fn test_abandoned_measurements_do_not_queue() {
    let mock = two_server_mock().with_delay(Duration::from_millis(100));
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    for _ in 0..5 {
        let timed_out = tokio::time::timeout(Duration::from_millis(10), client.run_measurement()).await;
        assert_err!(timed_out);
    }
    assert_eq!(handle.upload_calls(), 0);

    let downloads_before = handle.download_calls();
    let started = std::time::Instant::now();
    let result = assert_ok!(client.run_measurement().await);
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());

    assert_eq!(result.server.name, "Alpha");
    assert_eq!(handle.download_calls(), downloads_before + 1);
    assert_eq!(handle.upload_calls(), 1);
}

#[tokio::test]
async fn test_silent_cached_server_is_reselected() {
    let mock = two_server_mock();
    let handle = mock.clone();
    let client = MeasurementClient::connect(Arc::new(mock), ServerPolicy::CacheAfterFirst)
        .await
        .unwrap();

    let first = assert_ok!(client.run_measurement().await);
    assert_eq!(first.server.name, "Alpha");

    handle.set_unreachable(&alpha().id);
    let err = client.run_measurement().await.unwrap_err();
    assert!(matches!(err, SpeedtestError::Probe(_)));
    assert!(client.current_server().await.is_none());

    let next = assert_ok!(client.run_measurement().await);
    assert_eq!(next.server.name, "Beta");
    assert_eq!(client.current_server().await.map(|s| s.name), Some("Beta".to_string()));
}
