//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Time helpers

use chrono::{DateTime, Local, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::chesscom::{RawGame, RawPlayer};
use crate::models::{Color, GameRecord, GameResult, SpeedCategory};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A raw archive game as the upstream would serve it: testuser won with
/// white against rival, blitz 300+2, five minutes of play.
pub fn mock_raw_game(url: &str) -> RawGame {
  let end_time = 1_700_000_300;
  RawGame {
    url: url.to_string(),
    pgn: None,
    time_control: Some("300+2".to_string()),
    time_class: Some("blitz".to_string()),
    rules: Some("chess".to_string()),
    rated: Some(true),
    start_time: Some(end_time - 300),
    end_time: Some(end_time),
    white: Some(RawPlayer {
      username: Some("testuser".to_string()),
      rating: Some(1500),
      result: Some("win".to_string()),
    }),
    black: Some(RawPlayer {
      username: Some("rival".to_string()),
      rating: Some(1480),
      result: Some("resigned".to_string()),
    }),
  }
}

/// A canonical record with the fields the aggregation engine cares about;
/// everything else gets a plausible fixed value.
pub fn mock_record(
  url: &str,
  category: SpeedCategory,
  rating: Option<i64>,
  result: GameResult,
  end_time: DateTime<Utc>,
) -> GameRecord {
  GameRecord {
    url: url.to_string(),
    end_time: Some(end_time),
    duration_seconds: Some(300),
    speed_category: category,
    my_rating: rating,
    result,
    my_color: Color::White,
    opponent: "rival".to_string(),
    opponent_rating: Some(1480),
    termination: None,
    opening: None,
    eco: None,
    time_control: Some("300+2".to_string()),
    base_time: Some(300),
    increment_time: Some(2),
    rated: true,
    pgn: None,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// A UTC instant that falls on the given wall-clock time in the local
/// timezone, so day-bucketing expectations hold wherever the tests run.
pub fn local_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
  Local
    .with_ymd_and_hms(year, month, day, hour, minute, 0)
    .single()
    .expect("Valid local time")
    .with_timezone(&Utc)
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Datelike;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('games', 'daily_summaries', 'archives', 'player_profile', 'execution_log', 'config')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let raw = mock_raw_game("https://example.com/game/1");
    assert_eq!(raw.white.as_ref().and_then(|p| p.username.as_deref()), Some("testuser"));
    assert_eq!(raw.end_time.unwrap() - raw.start_time.unwrap(), 300);

    let record = mock_record(
      "https://example.com/game/1",
      SpeedCategory::Blitz,
      Some(1500),
      GameResult::Win,
      local_time(2024, 3, 1, 12, 0),
    );
    assert_eq!(record.speed_category, SpeedCategory::Blitz);
    assert!(record.end_time.is_some());
  }

  #[test]
  fn test_local_time_lands_on_requested_local_day() {
    let instant = local_time(2024, 3, 1, 23, 30);
    let local_day = instant.with_timezone(&Local).date_naive();
    assert_eq!((local_day.year(), local_day.month(), local_day.day()), (2024, 3, 1));
  }
}
