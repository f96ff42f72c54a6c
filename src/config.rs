use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub api_token: String,
    pub here_api_key: String,
    pub here_geocode_url: String,
    pub here_router_url: String,
    pub here_timeout_secs: u64,
    pub database_url: String,
    pub municipalities_path: String,
    pub boundary_region_filter: String,
    pub points_of_interest_path: Option<String>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            api_token: env::var("API_TOKEN")
                .map_err(|_| anyhow::anyhow!("API_TOKEN not set"))?,
            here_api_key: env::var("HERE_API_KEY")
                .map_err(|_| anyhow::anyhow!("HERE_API_KEY not set"))?,
            here_geocode_url: env::var("HERE_GEOCODE_URL")
                .unwrap_or_else(|_| "https://geocode.search.hereapi.com/v1/geocode".to_string()),
            here_router_url: env::var("HERE_ROUTER_URL")
                .unwrap_or_else(|_| "https://router.hereapi.com/v8/routes".to_string()),
            here_timeout_secs: match env::var("HERE_TIMEOUT_SECS") {
                Ok(v) => v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("HERE_TIMEOUT_SECS must be a number of seconds"))?,
                Err(_) => 30,
            },
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./here_proxy.db?mode=rwc".to_string()),
            municipalities_path: env::var("MUNICIPALITIES_PATH")
                .unwrap_or_else(|_| "data/municipalities.geojson.json".to_string()),
            boundary_region_filter: env::var("BOUNDARY_REGION_FILTER")
                .unwrap_or_else(|_| "SOF".to_string()),
            points_of_interest_path: env::var("POINTS_OF_INTEREST_PATH").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Config pointing both HERE endpoints at a local fake server.
    pub fn for_tests(upstream_base: &str) -> Self {
        Config {
            api_token: "secret-token".to_string(),
            here_api_key: "test-key".to_string(),
            here_geocode_url: format!("{}/v1/geocode", upstream_base),
            here_router_url: format!("{}/v8/routes", upstream_base),
            here_timeout_secs: 5,
            database_url: "sqlite::memory:".to_string(),
            municipalities_path: "data/municipalities.geojson.json".to_string(),
            boundary_region_filter: "SOF".to_string(),
            points_of_interest_path: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_requires_token_and_key() {
        env::remove_var("API_TOKEN");
        env::set_var("HERE_API_KEY", "k");
        assert!(Config::from_env().is_err());

        env::set_var("API_TOKEN", "t");
        env::remove_var("HERE_TIMEOUT_SECS");
        env::remove_var("HERE_ROUTER_URL");
        env::remove_var("BOUNDARY_REGION_FILTER");
        env::remove_var("POINTS_OF_INTEREST_PATH");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_token, "t");
        assert_eq!(config.here_timeout_secs, 30);
        assert_eq!(config.boundary_region_filter, "SOF");
        assert!(config.points_of_interest_path.is_none());
        assert_eq!(config.here_router_url, "https://router.hereapi.com/v8/routes");
    }
}
