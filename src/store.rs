//! Persistence layer: append-only game archive, daily rollup table, archive
//! bookkeeping, profile snapshot, config values, and the execution log.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use crate::chesscom::Profile;
use crate::db::DbPool;
use crate::models::{CategoryDaily, Color, DailySummary, GameRecord, GameResult, SpeedCategory};

/// ---------------------------------------------------------------------------
/// Game Store
/// ---------------------------------------------------------------------------

/// Insert records that are not already present, deduplicated strictly by
/// game URL. Returns the number actually inserted. The archive is
/// append-only: no update, no delete.
pub async fn add_if_absent(db: &DbPool, records: &[GameRecord]) -> Result<usize, String> {
  let mut inserted = 0;
  for record in records {
    let result = sqlx::query(
      r#"
      INSERT INTO games (
        url, end_time, duration_seconds, speed_category, my_rating, result,
        my_color, opponent, opponent_rating, termination, opening, eco,
        time_control, base_time, increment_time, rated, pgn
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
      ON CONFLICT(url) DO NOTHING
      "#,
    )
    .bind(&record.url)
    .bind(record.end_time)
    .bind(record.duration_seconds)
    .bind(record.speed_category.as_str())
    .bind(record.my_rating)
    .bind(record.result.as_str())
    .bind(record.my_color.as_str())
    .bind(&record.opponent)
    .bind(record.opponent_rating)
    .bind(&record.termination)
    .bind(&record.opening)
    .bind(&record.eco)
    .bind(&record.time_control)
    .bind(record.base_time)
    .bind(record.increment_time)
    .bind(record.rated)
    .bind(&record.pgn)
    .execute(db)
    .await
    .map_err(|e| format!("Failed to insert game {}: {}", record.url, e))?;

    if result.rows_affected() > 0 {
      inserted += 1;
    }
  }
  Ok(inserted)
}

/// All stored records, newest first. The aggregation engine re-sorts by
/// end_time, so the order here is presentation only.
pub async fn all_records(db: &DbPool) -> Result<Vec<GameRecord>, String> {
  let rows = sqlx::query(
    r#"
    SELECT url, end_time, duration_seconds, speed_category, my_rating, result,
           my_color, opponent, opponent_rating, termination, opening, eco,
           time_control, base_time, increment_time, rated, pgn
    FROM games
    ORDER BY end_time DESC
    "#,
  )
  .fetch_all(db)
  .await
  .map_err(|e| format!("Failed to fetch games: {}", e))?;

  let mut records = Vec::with_capacity(rows.len());
  for row in rows {
    let speed: String = row.get("speed_category");
    let result: String = row.get("result");
    let color: String = row.get("my_color");

    records.push(GameRecord {
      url: row.get("url"),
      end_time: row.get::<Option<DateTime<Utc>>, _>("end_time"),
      duration_seconds: row.get("duration_seconds"),
      speed_category: SpeedCategory::from_str(&speed)?,
      my_rating: row.get("my_rating"),
      result: GameResult::from_str(&result)?,
      my_color: Color::from_str(&color)?,
      opponent: row.get("opponent"),
      opponent_rating: row.get("opponent_rating"),
      termination: row.get("termination"),
      opening: row.get("opening"),
      eco: row.get("eco"),
      time_control: row.get("time_control"),
      base_time: row.get("base_time"),
      increment_time: row.get("increment_time"),
      rated: row.get("rated"),
      pgn: row.get("pgn"),
    });
  }
  Ok(records)
}

pub async fn game_count(db: &DbPool) -> Result<i64, String> {
  sqlx::query_scalar("SELECT COUNT(*) FROM games")
    .fetch_one(db)
    .await
    .map_err(|e| format!("Failed to count games: {}", e))
}

/// ---------------------------------------------------------------------------
/// Daily Summaries
/// ---------------------------------------------------------------------------

/// Replace the entire daily rollup table in one transaction. The engine
/// rebuilds from the full store on every run, so a full overwrite is the
/// idempotent write path.
pub async fn replace_daily_summaries(
  db: &DbPool,
  summaries: &[DailySummary],
) -> Result<(), String> {
  let mut tx = db
    .begin()
    .await
    .map_err(|e| format!("Failed to begin transaction: {}", e))?;

  sqlx::query("DELETE FROM daily_summaries")
    .execute(&mut *tx)
    .await
    .map_err(|e| format!("Failed to clear daily summaries: {}", e))?;

  for summary in summaries {
    sqlx::query(
      r#"
      INSERT INTO daily_summaries (
        day,
        bullet_wins, bullet_losses, bullet_draws, bullet_rating, bullet_rating_change, bullet_seconds,
        blitz_wins, blitz_losses, blitz_draws, blitz_rating, blitz_rating_change, blitz_seconds,
        rapid_wins, rapid_losses, rapid_draws, rapid_rating, rapid_rating_change, rapid_seconds,
        games, wins, losses, draws,
        rating_sum, rating_change_total, seconds_total, avg_game_seconds
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
              ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)
      "#,
    )
    .bind(summary.day)
    .bind(summary.bullet.wins)
    .bind(summary.bullet.losses)
    .bind(summary.bullet.draws)
    .bind(summary.bullet.rating)
    .bind(summary.bullet.rating_change)
    .bind(summary.bullet.seconds_played)
    .bind(summary.blitz.wins)
    .bind(summary.blitz.losses)
    .bind(summary.blitz.draws)
    .bind(summary.blitz.rating)
    .bind(summary.blitz.rating_change)
    .bind(summary.blitz.seconds_played)
    .bind(summary.rapid.wins)
    .bind(summary.rapid.losses)
    .bind(summary.rapid.draws)
    .bind(summary.rapid.rating)
    .bind(summary.rapid.rating_change)
    .bind(summary.rapid.seconds_played)
    .bind(summary.games)
    .bind(summary.wins)
    .bind(summary.losses)
    .bind(summary.draws)
    .bind(summary.rating_sum)
    .bind(summary.rating_change_total)
    .bind(summary.seconds_total)
    .bind(summary.avg_game_seconds)
    .execute(&mut *tx)
    .await
    .map_err(|e| format!("Failed to insert daily summary for {}: {}", summary.day, e))?;
  }

  tx.commit()
    .await
    .map_err(|e| format!("Failed to commit daily summaries: {}", e))
}

/// Daily rollups newest first - the presentation order.
pub async fn daily_summaries_desc(db: &DbPool) -> Result<Vec<DailySummary>, String> {
  let rows = sqlx::query("SELECT * FROM daily_summaries ORDER BY day DESC")
    .fetch_all(db)
    .await
    .map_err(|e| format!("Failed to fetch daily summaries: {}", e))?;

  let category = |row: &sqlx::sqlite::SqliteRow, prefix: &str| CategoryDaily {
    wins: row.get::<i64, _>(format!("{}_wins", prefix).as_str()),
    losses: row.get::<i64, _>(format!("{}_losses", prefix).as_str()),
    draws: row.get::<i64, _>(format!("{}_draws", prefix).as_str()),
    rating: row.get::<Option<i64>, _>(format!("{}_rating", prefix).as_str()),
    rating_change: row.get::<Option<i64>, _>(format!("{}_rating_change", prefix).as_str()),
    seconds_played: row.get::<i64, _>(format!("{}_seconds", prefix).as_str()),
  };

  let mut summaries = Vec::with_capacity(rows.len());
  for row in rows {
    summaries.push(DailySummary {
      day: row.get::<NaiveDate, _>("day"),
      bullet: category(&row, "bullet"),
      blitz: category(&row, "blitz"),
      rapid: category(&row, "rapid"),
      games: row.get("games"),
      wins: row.get("wins"),
      losses: row.get("losses"),
      draws: row.get("draws"),
      rating_sum: row.get("rating_sum"),
      rating_change_total: row.get("rating_change_total"),
      seconds_total: row.get("seconds_total"),
      avg_game_seconds: row.get("avg_game_seconds"),
    });
  }
  Ok(summaries)
}

/// ---------------------------------------------------------------------------
/// Archive Bookkeeping
/// ---------------------------------------------------------------------------

pub async fn touch_archive(db: &DbPool, url: &str, year: i32, month: u32) -> Result<(), String> {
  sqlx::query(
    r#"
    INSERT INTO archives (url, year, month, last_refreshed_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(url) DO UPDATE SET last_refreshed_at = excluded.last_refreshed_at
    "#,
  )
  .bind(url)
  .bind(year)
  .bind(month as i64)
  .bind(Utc::now())
  .execute(db)
  .await
  .map_err(|e| format!("Failed to record archive {}: {}", url, e))?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Player Profile & Stats
/// ---------------------------------------------------------------------------

pub async fn save_profile(db: &DbPool, username: &str, profile: &Profile) -> Result<(), String> {
  let joined = profile.joined.and_then(|s| DateTime::from_timestamp(s, 0));
  let last_online = profile.last_online.and_then(|s| DateTime::from_timestamp(s, 0));

  sqlx::query(
    r#"
    INSERT INTO player_profile (username, joined, last_online, status, profile_fetched_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(username) DO UPDATE SET
      joined = excluded.joined,
      last_online = excluded.last_online,
      status = excluded.status,
      profile_fetched_at = excluded.profile_fetched_at
    "#,
  )
  .bind(username)
  .bind(joined)
  .bind(last_online)
  .bind(&profile.status)
  .bind(Utc::now())
  .execute(db)
  .await
  .map_err(|e| format!("Failed to save profile: {}", e))?;
  Ok(())
}

pub async fn save_stats_snapshot(
  db: &DbPool,
  username: &str,
  stats: &serde_json::Value,
) -> Result<(), String> {
  sqlx::query(
    r#"
    INSERT INTO player_profile (username, stats_json, stats_fetched_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(username) DO UPDATE SET
      stats_json = excluded.stats_json,
      stats_fetched_at = excluded.stats_fetched_at
    "#,
  )
  .bind(username)
  .bind(stats.to_string())
  .bind(Utc::now())
  .execute(db)
  .await
  .map_err(|e| format!("Failed to save stats snapshot: {}", e))?;
  Ok(())
}

/// Join date of the tracked player, if a profile snapshot has been stored.
pub async fn load_join_date(db: &DbPool) -> Result<Option<DateTime<Utc>>, String> {
  let row: Option<(Option<DateTime<Utc>>,)> =
    sqlx::query_as("SELECT joined FROM player_profile LIMIT 1")
      .fetch_optional(db)
      .await
      .map_err(|e| format!("Failed to load join date: {}", e))?;
  Ok(row.and_then(|(joined,)| joined))
}

/// ---------------------------------------------------------------------------
/// Config Values
/// ---------------------------------------------------------------------------

pub async fn get_config_value(db: &DbPool, key: &str) -> Result<Option<String>, String> {
  sqlx::query_scalar("SELECT value FROM config WHERE key = ?1")
    .bind(key)
    .fetch_optional(db)
    .await
    .map_err(|e| format!("Failed to read config key {}: {}", key, e))
}

pub async fn set_config_value(db: &DbPool, key: &str, value: &str) -> Result<(), String> {
  sqlx::query(
    r#"
    INSERT INTO config (key, value) VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value
    "#,
  )
  .bind(key)
  .bind(value)
  .execute(db)
  .await
  .map_err(|e| format!("Failed to write config key {}: {}", key, e))?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Execution Log
/// ---------------------------------------------------------------------------

/// Append one audit row. A failure to log is reported to stderr and
/// otherwise swallowed so it can never mask the outcome it was recording.
pub async fn log_execution(
  db: &DbPool,
  operation: &str,
  username: &str,
  status: &str,
  duration_ms: i64,
  notes: &str,
) {
  let result = sqlx::query(
    r#"
    INSERT INTO execution_log (operation, username, status, duration_ms, notes)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
  )
  .bind(operation)
  .bind(username)
  .bind(status)
  .bind(duration_ms)
  .bind(notes)
  .execute(db)
  .await;

  if let Err(e) = result {
    eprintln!("Warning: failed to write execution log entry: {}", e);
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::SpeedCategory;
  use crate::test_utils::{local_time, mock_record, setup_test_db, teardown_test_db};
  use chrono::NaiveDate;

  #[tokio::test]
  async fn test_add_if_absent_dedups_by_url() {
    let pool = setup_test_db().await;
    let record = mock_record(
      "https://example.com/game/1",
      SpeedCategory::Blitz,
      Some(1500),
      GameResult::Win,
      local_time(2024, 3, 1, 12, 0),
    );

    let first = add_if_absent(&pool, &[record.clone()]).await.expect("Should insert");
    let second = add_if_absent(&pool, &[record]).await.expect("Should not fail");

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(game_count(&pool).await.unwrap(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_records_roundtrip() {
    let pool = setup_test_db().await;
    let mut record = mock_record(
      "https://example.com/game/2",
      SpeedCategory::Rapid,
      Some(1400),
      GameResult::Draw,
      local_time(2024, 3, 2, 9, 30),
    );
    record.opening = Some("Sicilian Defense".to_string());
    record.eco = Some("B20".to_string());
    record.base_time = Some(600);
    record.increment_time = Some(0);

    add_if_absent(&pool, &[record.clone()]).await.expect("Should insert");
    let loaded = all_records(&pool).await.expect("Should load");

    assert_eq!(loaded, vec![record]);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_replace_daily_summaries_overwrites() {
    let pool = setup_test_db().await;

    let day1 = DailySummary::empty(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let mut day2 = DailySummary::empty(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    day2.games = 3;
    day2.wins = 2;
    day2.losses = 1;
    day2.blitz.rating = Some(1500);
    day2.blitz.rating_change = Some(12);
    day2.rating_sum = 1500;
    day2.rating_change_total = Some(12);

    replace_daily_summaries(&pool, &[day1.clone(), day2.clone()])
      .await
      .expect("Should write summaries");
    // Second rebuild with fewer rows fully replaces the first.
    replace_daily_summaries(&pool, &[day2.clone()])
      .await
      .expect("Should rewrite summaries");

    let loaded = daily_summaries_desc(&pool).await.expect("Should read back");
    assert_eq!(loaded, vec![day2]);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_config_roundtrip() {
    let pool = setup_test_db().await;

    assert_eq!(get_config_value(&pool, "username").await.unwrap(), None);
    set_config_value(&pool, "username", "alice").await.unwrap();
    set_config_value(&pool, "username", "bob").await.unwrap();
    assert_eq!(
      get_config_value(&pool, "username").await.unwrap(),
      Some("bob".to_string())
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_profile_and_stats_merge_into_one_row() {
    let pool = setup_test_db().await;

    let profile = Profile {
      username: Some("alice".to_string()),
      joined: Some(1_400_000_000),
      last_online: None,
      status: Some("premium".to_string()),
    };
    save_profile(&pool, "alice", &profile).await.expect("Should save profile");
    save_stats_snapshot(&pool, "alice", &serde_json::json!({"chess_blitz": {}}))
      .await
      .expect("Should save stats");

    let joined = load_join_date(&pool).await.expect("Should load join date");
    assert_eq!(joined.map(|d| d.timestamp()), Some(1_400_000_000));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player_profile")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(rows, 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_execution_log_appends() {
    let pool = setup_test_db().await;

    log_execution(&pool, "quick", "alice", "ok", 120, "2 new games").await;
    log_execution(&pool, "quick", "alice", "error", 80, "API returned status 503").await;

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM execution_log")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(rows, 2);

    teardown_test_db(pool).await;
  }
}
