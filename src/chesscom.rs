use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 8_000;
const JITTER_FACTOR: f64 = 0.3;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("API returned status {status} for {url}")]
  Status { status: u16, url: String },

  #[error("Failed to parse response from {url}: {source}")]
  Parse {
    url: String,
    #[source]
    source: serde_json::Error,
  },
}

/// ---------------------------------------------------------------------------
/// Upstream JSON Shapes
/// ---------------------------------------------------------------------------

/// One side of a raw archive game. Every field the upstream may omit is
/// optional; validation happens at the normalizer boundary, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayer {
  pub username: Option<String>,
  pub rating: Option<i64>,
  pub result: Option<String>,
}

/// One raw game object from a monthly archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGame {
  pub url: String,
  pub pgn: Option<String>,
  pub time_control: Option<String>,
  pub time_class: Option<String>,
  pub rules: Option<String>,
  pub rated: Option<bool>,
  pub start_time: Option<i64>,
  pub end_time: Option<i64>,
  pub white: Option<RawPlayer>,
  pub black: Option<RawPlayer>,
}

#[derive(Debug, Deserialize)]
struct ArchivesResponse {
  archives: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
  games: Vec<RawGame>,
}

/// Flat profile object; only the fields the tracker consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
  pub username: Option<String>,
  pub joined: Option<i64>,
  pub last_online: Option<i64>,
  pub status: Option<String>,
}

/// ---------------------------------------------------------------------------
/// API Client
/// ---------------------------------------------------------------------------

/// Client for the chess.com public data API. The base URL comes from the
/// configuration object so tests can point it at a local server.
pub struct ChessComClient {
  http: Client,
  base: String,
}

impl ChessComClient {
  pub fn new(config: &AppConfig) -> Self {
    Self {
      http: Client::new(),
      base: config.api_base.trim_end_matches('/').to_string(),
    }
  }

  /// GET a JSON document, retrying rate-limit and server-error responses
  /// with exponential backoff plus jitter. Any other non-2xx status fails
  /// immediately.
  async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
    let mut attempt: u32 = 0;
    loop {
      let response = self.http.get(url).send().await?;
      let status = response.status();

      if status.is_success() {
        let text = response.text().await?;
        return serde_json::from_str(&text).map_err(|e| ApiError::Parse {
          url: url.to_string(),
          source: e,
        });
      }

      attempt += 1;
      let retryable = status.as_u16() == 429 || status.is_server_error();
      if retryable && attempt < MAX_ATTEMPTS {
        let delay = backoff_delay(attempt);
        eprintln!(
          "Warning: {} returned {}, retrying in {}ms (attempt {}/{})",
          url,
          status,
          delay.as_millis(),
          attempt,
          MAX_ATTEMPTS
        );
        tokio::time::sleep(delay).await;
        continue;
      }

      return Err(ApiError::Status {
        status: status.as_u16(),
        url: url.to_string(),
      });
    }
  }

  /// List the player's monthly archive locators.
  pub async fn fetch_archives(&self, username: &str) -> Result<Vec<String>, ApiError> {
    let url = format!("{}/player/{}/games/archives", self.base, username);
    let response: ArchivesResponse = self.get_json(&url).await?;
    Ok(response.archives)
  }

  /// Fetch all raw games from one monthly archive. A 404 means the player
  /// has no games for that period and is not an error.
  pub async fn fetch_archive_games(&self, archive_url: &str) -> Result<Vec<RawGame>, ApiError> {
    match self.get_json::<GamesResponse>(archive_url).await {
      Ok(response) => Ok(response.games),
      Err(ApiError::Status { status: 404, .. }) => Ok(vec![]),
      Err(e) => Err(e),
    }
  }

  pub async fn fetch_profile(&self, username: &str) -> Result<Profile, ApiError> {
    let url = format!("{}/player/{}", self.base, username);
    self.get_json(&url).await
  }

  /// Stats come back as a nested per-category object; the tracker stores the
  /// snapshot verbatim.
  pub async fn fetch_stats(&self, username: &str) -> Result<serde_json::Value, ApiError> {
    let url = format!("{}/player/{}/stats", self.base, username);
    self.get_json(&url).await
  }

  /// Locator for one monthly archive, matching the URLs the archive list
  /// returns.
  pub fn archive_url(&self, username: &str, year: i32, month: u32) -> String {
    format!("{}/player/{}/games/{}/{:02}", self.base, username, year, month)
  }
}

/// Exponential backoff with +/- jitter around the midpoint, capped.
fn backoff_delay(attempt: u32) -> Duration {
  let exponent = attempt.saturating_sub(1).min(30);
  let base = BASE_DELAY_MS
    .saturating_mul(2_u64.saturating_pow(exponent))
    .min(MAX_DELAY_MS);

  let jitter_range = base as f64 * JITTER_FACTOR;
  let jitter = rand::thread_rng().gen_range(-jitter_range / 2.0..=jitter_range / 2.0);
  Duration::from_millis((base as f64 + jitter).max(0.0) as u64)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
