use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub manar_url: String,
    pub fetch_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            manar_url: "https://almanar.com.lb/salat".to_string(),
            fetch_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            manar_url: env::var("MANAR_URL").unwrap_or(defaults.manar_url),
            fetch_timeout: parse_var("FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            cache_ttl: parse_var("CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} is not valid: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
