use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::scheduler::Pacing;
use crate::upstream::DEFAULT_BASE_URL;

pub const DEFAULT_SERVER_PORT: u16 = 7777;

#[derive(Debug, Clone, Parser)]
#[command(name = "price-deviation-alerts", about = "Flags trading pairs whose last price deviates from recent history")]
pub struct Config {
    /// Listen port
    #[arg(long, env = "SERVER_PORT", default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Base URL of the ticker service
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_BASE_URL)]
    pub upstream_url: String,

    /// Wait before every Nth upstream dispatch (0 disables pacing)
    #[arg(long, env = "PACING_EVERY", default_value_t = 10)]
    pub pacing_every: usize,

    /// Length of each pacing wait in milliseconds
    #[arg(long, env = "PACING_DELAY_MS", default_value_t = 1000)]
    pub pacing_delay_ms: u64,

    /// Per-call upstream timeout in milliseconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing { every: self.pacing_every, delay: Duration::from_millis(self.pacing_delay_ms) }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_from_flags() {
        let config = Config::try_parse_from([
            "price-deviation-alerts",
            "--port",
            "8080",
            "--bind",
            "127.0.0.1",
            "--pacing-every",
            "5",
            "--pacing-delay-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.pacing(), Pacing { every: 5, delay: Duration::from_millis(250) });
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Config::try_parse_from(["price-deviation-alerts", "--port", "http"]).is_err());
    }
}
