use std::net::Ipv4Addr;

use crate::config::BrokerOverrides;

const SCANNER_FREQ: &str = "SCANNER_FREQ";

pub fn get_interval() -> Option<u64> {
    parse_seconds(std::env::var(SCANNER_FREQ).ok())
}

const SCANNER_TIMEOUT: &str = "SCANNER_TIMEOUT";

pub fn get_timeout() -> Option<u64> {
    parse_seconds(std::env::var(SCANNER_TIMEOUT).ok())
}

fn parse_seconds(value: Option<String>) -> Option<u64> {
    value.and_then(|res| res.trim().parse().ok())
}

const EXPORTER_PORT: &str = "EXPORTER_PORT";

const DEFAULT_PORT: u16 = 9185;

pub fn get_exporter_port() -> u16 {
    let port_from_env = std::env::var(EXPORTER_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const EXPORTER_ADDR: &str = "EXPORTER_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_exporter_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(EXPORTER_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn get_broker_overrides() -> BrokerOverrides {
    BrokerOverrides {
        address: env_value("BROKER_ADDRESS"),
        port: env_value("BROKER_PORT").and_then(|port| port.trim().parse().ok()),
        user: env_value("BROKER_USER"),
        password: env_value("BROKER_PASSWORD"),
        topic: env_value("BROKER_TOPIC"),
        client_id: env_value("CLIENT_ID"),
    }
}
