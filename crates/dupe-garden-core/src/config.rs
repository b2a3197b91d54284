use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the duplicate backend, without the `/api/...` suffix.
    pub backend_url: String,
    /// The signed-in user every request is made on behalf of.
    pub user_id: String,
    pub request_timeout_secs: u64,
    /// Local activity journal. `None` disables it.
    pub journal_path: Option<String>,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `backend_url` with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    /// Journal location, treating an empty path as disabled.
    pub fn journal_path(&self) -> Option<&str> {
        self.journal_path.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Load `Config.toml` (optional) overlaid with `DUPE_GARDEN_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("backend_url", DEFAULT_BACKEND_URL)?
        .set_default("user_id", "")?
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
        .set_default("journal_path", "dupe_garden.db")?
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("DUPE_GARDEN"))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.backend_url.trim().is_empty() {
        return Err(ConfigError::Message("backend_url must not be empty".to_string()));
    }
    if !(config.backend_url.starts_with("http://") || config.backend_url.starts_with("https://")) {
        return Err(ConfigError::Message(format!(
            "backend_url must be an http(s) URL, got '{}'",
            config.backend_url
        )));
    }
    Ok(())
}
