use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::client::{AnalysisApiClient, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::service::PollingOptions;

pub const CONFIG_FILE_NAME: &str = "verdict.json";

/// Where the analysis backend lives and how patiently to poll it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub polling: PollingOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            polling: PollingOptions::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

impl ClientConfig {
    /// Load client configuration from {dir}/verdict.json, or build it from
    /// `VERDICT_*` environment variables and defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<ClientConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded client config: api_url={}, max_attempts={}",
                            config.api_url,
                            config.polling.max_attempts
                        );
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse {}: {}, using defaults", CONFIG_FILE_NAME, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read {}: {}, using defaults", CONFIG_FILE_NAME, e);
                }
            }
        }

        let mut config = ClientConfig::default();
        if let Ok(url) = std::env::var("VERDICT_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }
        if let Some(secs) = env_parse::<u64>("VERDICT_HTTP_TIMEOUT_SECS").filter(|s| *s > 0) {
            config.request_timeout_secs = secs;
        }
        if let Some(attempts) = env_parse::<u32>("VERDICT_POLL_MAX_ATTEMPTS").filter(|a| *a > 0) {
            config.polling.max_attempts = attempts;
        }

        tracing::info!(
            "No {} found, using api_url={} timeout={}s max_attempts={}",
            CONFIG_FILE_NAME,
            config.api_url,
            config.request_timeout_secs,
            config.polling.max_attempts
        );
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn client(&self) -> AnalysisApiClient {
        AnalysisApiClient::with_timeout(&self.api_url, self.request_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn clear_env() {
        std::env::remove_var("VERDICT_API_URL");
        std::env::remove_var("VERDICT_HTTP_TIMEOUT_SECS");
        std::env::remove_var("VERDICT_POLL_MAX_ATTEMPTS");
    }

    #[test]
    #[serial_test::serial]
    fn test_load_or_default_no_file() {
        clear_env();
        let temp_dir = tempfile::tempdir().unwrap();

        let config = ClientConfig::load_or_default(temp_dir.path());

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.polling.max_attempts, 120);
    }

    #[test]
    #[serial_test::serial]
    fn test_load_or_default_valid_file() {
        clear_env();
        let temp_dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();
        file.write_all(
            br#"{
                "apiUrl": "https://stats.internal:9000",
                "polling": {"maxAttempts": 10, "initialDelay": 250}
            }"#,
        )
        .unwrap();

        let config = ClientConfig::load_or_default(temp_dir.path());

        assert_eq!(config.api_url, "https://stats.internal:9000");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.initial_delay, Duration::from_millis(250));
        assert_eq!(config.polling.max_delay, Duration::from_secs(5));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_or_default_invalid_json_falls_back_to_env() {
        clear_env();
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "invalid json").unwrap();
        std::env::set_var("VERDICT_API_URL", "http://env-host:8000");

        let config = ClientConfig::load_or_default(temp_dir.path());
        clear_env();

        assert_eq!(config.api_url, "http://env-host:8000");
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_and_invalid_values() {
        clear_env();
        let temp_dir = tempfile::tempdir().unwrap();
        std::env::set_var("VERDICT_HTTP_TIMEOUT_SECS", "5");
        std::env::set_var("VERDICT_POLL_MAX_ATTEMPTS", "lots");

        let config = ClientConfig::load_or_default(temp_dir.path());
        clear_env();

        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.polling.max_attempts, 120);
    }

    #[test]
    fn test_client_uses_configured_url() {
        let config = ClientConfig {
            api_url: "http://example.test:1234/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.client().base_url(), "http://example.test:1234");
    }
}
