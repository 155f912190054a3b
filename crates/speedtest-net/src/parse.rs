//! Parsers for the speedtest.net XML bootstrap documents

use serde::Deserialize;

use crate::error::{SpeedtestError, SpeedtestResult};
use crate::types::{ClientConfig, ClientInfo, Server};

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    client: ClientElement,
    #[serde(rename = "server-config")]
    server_config: Option<ServerConfigElement>,
}

#[derive(Debug, Deserialize)]
struct ClientElement {
    #[serde(rename = "@ip", default)]
    ip: String,
    #[serde(rename = "@isp", default)]
    isp: String,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ServerConfigElement {
    #[serde(rename = "@ignoreids", default)]
    ignore_ids: String,
}

#[derive(Debug, Deserialize)]
struct ServerListDocument {
    servers: ServersElement,
}

#[derive(Debug, Deserialize)]
struct ServersElement {
    #[serde(rename = "server", default)]
    servers: Vec<ServerElement>,
}

#[derive(Debug, Deserialize)]
struct ServerElement {
    #[serde(rename = "@url")]
    url: String,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@country", default)]
    country: String,
    #[serde(rename = "@sponsor", default)]
    sponsor: String,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@host", default)]
    host: String,
}

/// Parse `speedtest-config.php`
pub fn parse_config(xml: &str) -> SpeedtestResult<ClientConfig> {
    let doc: ConfigDocument = quick_xml::de::from_str(xml)
        .map_err(|e| SpeedtestError::config_fetch(format!("malformed configuration: {}", e)))?;

    let ignore_ids = doc
        .server_config
        .map(|sc| {
            sc.ignore_ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ClientConfig {
        client: ClientInfo {
            ip: doc.client.ip,
            isp: doc.client.isp,
            latitude: doc.client.lat,
            longitude: doc.client.lon,
        },
        ignore_ids,
    })
}

/// Parse `speedtest-servers-static.php`
pub fn parse_servers(xml: &str) -> SpeedtestResult<Vec<Server>> {
    let doc: ServerListDocument = quick_xml::de::from_str(xml)
        .map_err(|e| SpeedtestError::server_list_fetch(format!("malformed server list: {}", e)))?;

    Ok(doc
        .servers
        .servers
        .into_iter()
        .map(|s| Server {
            id: s.id,
            name: s.name,
            sponsor: s.sponsor,
            country: s.country,
            latitude: s.lat,
            longitude: s.lon,
            url: s.url,
            host: s.host,
            distance_km: 0.0,
            latency_ms: 0.0,
        })
        .collect())
}
