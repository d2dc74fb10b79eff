use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "assistant.toml";
const ENV_PREFIX: &str = "ASSISTANT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub backtest: BacktestSettings,
    pub server: ServerSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            backtest: BacktestSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Layers built-in defaults, the optional TOML file at `path` and
    /// `ASSISTANT_*` environment variables (`ASSISTANT_API__BASE_URL`, ...).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let defaults = ClientConfig::default();

        Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("backtest.results_limit", defaults.backtest.results_limit as i64)?
            .set_default(
                "backtest.default_lookback_days",
                defaults.backtest.default_lookback_days as i64,
            )?
            .set_default("server.port", defaults.server.port as i64)?
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push("api.base_url must start with http:// or https://".to_string());
        }
        if self.api.request_timeout_secs == Some(0) {
            errors.push("api.request_timeout_secs must be > 0 when set".to_string());
        }

        if self.backtest.results_limit == 0 {
            errors.push("backtest.results_limit must be > 0".to_string());
        }
        if self.backtest.default_lookback_days == 0 {
            errors.push("backtest.default_lookback_days must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// No timeout unless set; a hung call keeps its page busy.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    pub results_limit: usize,
    pub default_lookback_days: u32,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            results_limit: 10,
            default_lookback_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}
