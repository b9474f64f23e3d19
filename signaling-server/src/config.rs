use std::net::SocketAddr;
use std::time::Duration;

use log::warn;

pub const DEFAULT_ADDR: &str = "0.0.0.0:9001";
pub const DEFAULT_LOOKUP_URL: &str = "https://xboxgamertag.com/search";
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub lookup_url: String,
    pub lookup_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// `SIGNALING_ADDR`, `GAMERTAG_LOOKUP_URL`, `GAMERTAG_LOOKUP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = var("SIGNALING_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.addr = addr,
                Err(e) => warn!(
                    "Invalid SIGNALING_ADDR {:?} ({}); using {}",
                    raw, e, DEFAULT_ADDR
                ),
            }
        }

        if let Some(raw) = var("GAMERTAG_LOOKUP_URL") {
            let raw = raw.trim();
            if raw.starts_with("http://") || raw.starts_with("https://") {
                config.lookup_url = raw.to_string();
            } else {
                warn!(
                    "Invalid GAMERTAG_LOOKUP_URL {:?}; using {}",
                    raw, DEFAULT_LOOKUP_URL
                );
            }
        }

        if let Some(raw) = var("GAMERTAG_LOOKUP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.lookup_timeout = Duration::from_secs(secs),
                _ => warn!(
                    "Invalid GAMERTAG_LOOKUP_TIMEOUT_SECS {:?}; using {}",
                    raw, DEFAULT_LOOKUP_TIMEOUT_SECS
                ),
            }
        }

        config
    }
}
