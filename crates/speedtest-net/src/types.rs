//! Common types shared by the speedtest backends and the measurement adapter

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = "speedtest_exporter";

/// Base URL of the speedtest.net client configuration document
pub const CONFIG_URL: &str = "http://c.speedtest.net/speedtest-config.php";

/// Base URL of the speedtest.net static server list
pub const SERVER_LIST_URL: &str = "http://c.speedtest.net/speedtest-servers-static.php";

/// Number of nearest servers kept as selection candidates
pub const DEFAULT_NUM_CLOSEST: usize = 3;

/// Latency round trips per server probe
pub const DEFAULT_NUM_LATENCY_TESTS: usize = 5;

/// Image edge sizes fetched during the download probe, smallest first
pub const DEFAULT_DOWNLOAD_SIZES: [u32; 10] = [350, 500, 750, 1000, 1500, 2000, 2500, 3000, 3500, 4000];

/// Payload sizes in bytes posted during the upload probe, smallest first
pub const DEFAULT_UPLOAD_SIZES: [usize; 6] = [
    256 * 1024,
    512 * 1024,
    1024 * 1024,
    2 * 1024 * 1024,
    4 * 1024 * 1024,
    8 * 1024 * 1024,
];

/// Random alphanumeric token appended as `x=` to defeat intermediate caches
pub fn cache_buster() -> String {
    random_alphanumeric(16)
}

pub(crate) fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Default configuration URL with a fresh cache-busting suffix
pub fn default_config_url() -> String {
    format!("{}?x={}", CONFIG_URL, cache_buster())
}

/// Default server list URL with a fresh cache-busting suffix
pub fn default_server_list_url() -> String {
    format!("{}?x={}", SERVER_LIST_URL, cache_buster())
}

/// Where the measuring host is, as reported by speedtest.net
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientInfo {
    /// Public IP address seen by speedtest.net
    pub ip: String,
    /// Internet service provider name
    pub isp: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Client configuration fetched once at startup
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientConfig {
    /// Client location and identity
    pub client: ClientInfo,
    /// Server ids speedtest.net asks clients not to use
    pub ignore_ids: Vec<String>,
}

/// A speedtest reference server
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    /// speedtest.net server id
    pub id: String,
    /// City name
    pub name: String,
    /// Hosting organisation
    pub sponsor: String,
    /// Country name
    pub country: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Upload endpoint; the other probe resources live next to it
    pub url: String,
    /// `host:port` of the server
    pub host: String,
    /// Great-circle distance from the client, filled by closest-server selection
    pub distance_km: f64,
    /// Last measured latency, filled by latency probing
    pub latency_ms: f64,
}

impl Server {
    /// Create a server record with the fields needed for probing
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sponsor: String::new(),
            country: String::new(),
            latitude,
            longitude,
            url: url.into(),
            host: String::new(),
            distance_km: 0.0,
            latency_ms: 0.0,
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)?;
        if !self.sponsor.is_empty() {
            write!(f, " {}", self.sponsor)?;
        }
        write!(f, " ({:.2} km)", self.distance_km)
    }
}

/// How a batch of latency round trips is reduced to a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyAlgorithm {
    /// Worst round trip of the batch
    #[default]
    Max,
    /// Best round trip of the batch
    Min,
}

impl LatencyAlgorithm {
    /// Reduce a batch of round trip times in milliseconds
    pub fn reduce(&self, samples: &[f64]) -> Option<f64> {
        let mut iter = samples.iter().copied();
        let first = iter.next()?;
        Some(match self {
            LatencyAlgorithm::Max => iter.fold(first, f64::max),
            LatencyAlgorithm::Min => iter.fold(first, f64::min),
        })
    }
}

/// Settings for the HTTP speedtest backend
#[derive(Debug, Clone)]
pub struct SpeedtestSettings {
    /// Client configuration document URL
    pub config_url: String,
    /// Server list URL
    pub server_list_url: String,
    /// User agent header value
    pub user_agent: String,
    /// Candidate count kept after distance sorting
    pub num_closest: usize,
    /// Round trips per latency probe
    pub num_latency_tests: usize,
    /// Reduction applied to each latency batch
    pub latency_algorithm: LatencyAlgorithm,
    /// Download ladder (image edge sizes)
    pub download_sizes: Vec<u32>,
    /// Upload ladder (payload bytes)
    pub upload_sizes: Vec<usize>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SpeedtestSettings {
    fn default() -> Self {
        Self {
            config_url: default_config_url(),
            server_list_url: default_server_list_url(),
            user_agent: USER_AGENT.to_string(),
            num_closest: DEFAULT_NUM_CLOSEST,
            num_latency_tests: DEFAULT_NUM_LATENCY_TESTS,
            latency_algorithm: LatencyAlgorithm::default(),
            download_sizes: DEFAULT_DOWNLOAD_SIZES.to_vec(),
            upload_sizes: DEFAULT_UPLOAD_SIZES.to_vec(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SpeedtestSettings {
    /// Settings pointing at custom bootstrap URLs
    pub fn with_urls(config_url: impl Into<String>, server_list_url: impl Into<String>) -> Self {
        Self {
            config_url: config_url.into(),
            server_list_url: server_list_url.into(),
            ..Default::default()
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
