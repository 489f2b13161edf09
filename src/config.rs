use std::env;

use url::Url;

use crate::db::DbPool;
use crate::store;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const ENV_USERNAME: &str = "CHESS_LOG_USERNAME";
pub const ENV_API_BASE: &str = "CHESS_LOG_API_BASE";
pub const DEFAULT_API_BASE: &str = "https://api.chess.com/pub";

/// Explicit configuration passed to the API client and normalizer at call
/// time; nothing reads these values ambiently.
#[derive(Debug, Clone)]
pub struct AppConfig {
  /// The player whose game history is tracked.
  pub username: String,
  /// Base URL of the upstream API.
  pub api_base: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  Missing(String),

  #[error("Invalid API base URL: {0}")]
  InvalidApiBase(String),

  #[error("Database error: {0}")]
  Database(String),
}

impl AppConfig {
  /// Build from environment variables alone.
  pub fn from_env() -> Result<Self, ConfigError> {
    let username =
      env::var(ENV_USERNAME).map_err(|_| ConfigError::Missing(ENV_USERNAME.into()))?;
    let api_base = env::var(ENV_API_BASE).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    Self::validated(username, api_base)
  }

  /// Build from the `config` table, falling back to the environment for any
  /// key the table does not hold. A missing username is fatal.
  pub async fn load(pool: &DbPool) -> Result<Self, ConfigError> {
    let username = match store::get_config_value(pool, "username")
      .await
      .map_err(ConfigError::Database)?
    {
      Some(value) => value,
      None => env::var(ENV_USERNAME).map_err(|_| ConfigError::Missing("username".into()))?,
    };

    let api_base = match store::get_config_value(pool, "api_base")
      .await
      .map_err(ConfigError::Database)?
    {
      Some(value) => value,
      None => env::var(ENV_API_BASE).unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
    };

    Self::validated(username, api_base)
  }

  fn validated(username: String, api_base: String) -> Result<Self, ConfigError> {
    let username = username.trim().to_string();
    if username.is_empty() {
      return Err(ConfigError::Missing("username".into()));
    }

    Url::parse(&api_base)
      .map_err(|e| ConfigError::InvalidApiBase(format!("{}: {}", api_base, e)))?;

    Ok(Self {
      username,
      api_base: api_base.trim_end_matches('/').to_string(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
