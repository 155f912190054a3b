//! Great-circle distance and closest-server ranking

use crate::types::{ClientConfig, Server};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Rank servers by distance from the client and keep the `count` nearest.
///
/// Servers listed in the configuration's ignore list are dropped first. The
/// sort is stable, so equidistant servers keep their server-list order.
pub fn closest_servers(config: &ClientConfig, servers: &[Server], count: usize) -> Vec<Server> {
    let origin = &config.client;
    let mut ranked: Vec<Server> = servers
        .iter()
        .filter(|s| !config.ignore_ids.iter().any(|id| id == &s.id))
        .cloned()
        .map(|mut s| {
            s.distance_km = distance_km(origin.latitude, origin.longitude, s.latitude, s.longitude);
            s
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientInfo;

    fn config_at(latitude: f64, longitude: f64) -> ClientConfig {
        ClientConfig {
            client: ClientInfo {
                latitude,
                longitude,
                ..Default::default()
            },
            ignore_ids: Vec::new(),
        }
    }

    #[test]
    fn test_distance_zero() {
        assert_eq!(distance_km(48.2, 16.37, 48.2, 16.37), 0.0);
    }

    #[test]
    fn test_distance_quarter_meridian() {
        // Equator to pole is a quarter of the circumference
        let d = distance_km(0.0, 0.0, 90.0, 0.0);
        let expected = std::f64::consts::PI * EARTH_RADIUS_KM / 2.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_distance_vienna_berlin() {
        let d = distance_km(48.2082, 16.3738, 52.5200, 13.4050);
        assert!((d - 523.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_closest_servers_sorted_and_truncated() {
        let servers = vec![
            Server::new("1", "Far", 40.0, 40.0, "http://far/upload.php"),
            Server::new("2", "Near", 1.0, 1.0, "http://near/upload.php"),
            Server::new("3", "Mid", 10.0, 10.0, "http://mid/upload.php"),
        ];

        let closest = closest_servers(&config_at(0.0, 0.0), &servers, 2);
        let names: Vec<_> = closest.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Mid"]);
        assert!(closest[0].distance_km > 0.0);
        assert!(closest[0].distance_km < closest[1].distance_km);
    }

    #[test]
    fn test_closest_servers_honours_ignore_list() {
        let servers = vec![
            Server::new("1", "Near", 1.0, 1.0, "http://near/upload.php"),
            Server::new("2", "Mid", 10.0, 10.0, "http://mid/upload.php"),
        ];
        let mut config = config_at(0.0, 0.0);
        config.ignore_ids = vec!["1".to_string()];

        let closest = closest_servers(&config, &servers, 3);
        assert_eq!(closest.len(), 1);
        assert_eq!(closest[0].name, "Mid");
    }

    #[test]
    fn test_equidistant_servers_keep_list_order() {
        let servers = vec![
            Server::new("1", "East", 0.0, 5.0, "http://east/upload.php"),
            Server::new("2", "West", 0.0, -5.0, "http://west/upload.php"),
        ];

        let closest = closest_servers(&config_at(0.0, 0.0), &servers, 2);
        assert_eq!(closest[0].name, "East");
        assert_eq!(closest[1].name, "West");
    }
}
