use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use log::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CARS: usize = 10;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct ConfigFile {
    server: ServerSection,
    fleet: FleetSection,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct ServerSection {
    ip: IpAddr,
    port: u16,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct FleetSection {
    max_cars: usize,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub endpoint: SocketAddr,
    pub max_cars: usize,
}

impl ControllerConfig {
    pub fn get() -> Self {
        match read_config_file() {
            Some(file) => ControllerConfig {
                endpoint: SocketAddr::new(file.server.ip, file.server.port),
                max_cars: file.fleet.max_cars.max(DEFAULT_MAX_CARS),
            },
            None => ControllerConfig {
                endpoint: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
                max_cars: DEFAULT_MAX_CARS,
            },
        }
    }
}

fn read_config_file() -> Option<ConfigFile> {
    let contents = fs::read_to_string("config.json")
        .or_else(|_| fs::read_to_string("../config.json"))
        .ok()?;
    match serde_json::from_str(&contents) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("ignoring malformed config.json: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_localhost_3000() {
        let config = ControllerConfig::get();
        assert_eq!(config.endpoint.port(), DEFAULT_PORT);
        assert!(config.max_cars >= DEFAULT_MAX_CARS);
    }

    #[test]
    fn config_file_parses() {
        let file: ConfigFile = serde_json::from_str(
            r#"{"server": {"ip": "127.0.0.1", "port": 4000}, "fleet": {"max_cars": 12}}"#,
        )
        .unwrap();
        assert_eq!(file.server.port, 4000);
        assert_eq!(file.fleet.max_cars, 12);
    }
}
