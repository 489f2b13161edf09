//! Composite update operations: each one acquires the sync lock, runs its
//! steps in a fixed order, and writes one execution-log row per step. A
//! failed step is recorded and the remaining steps still run; the report
//! carries every outcome.

use std::time::{Duration, Instant};

use chrono::{Datelike, Local, NaiveDate};
use tokio::sync::MutexGuard;

use crate::aggregate;
use crate::chesscom::ChessComClient;
use crate::config::AppConfig;
use crate::db::{AppState, DbPool};
use crate::models::GameRecord;
use crate::normalize::normalize_game;
use crate::store;

/// How long an operation waits for an in-flight cycle before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(2);

/// Earliest plausible game date, used when no profile snapshot has been
/// stored yet and the store holds no dated games.
const FALLBACK_START: (i32, u32, u32) = (2007, 1, 1);

/// ---------------------------------------------------------------------------
/// Run Reports
/// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StepOutcome {
  pub name: &'static str,
  pub success: bool,
  pub message: String,
}

#[derive(Debug)]
pub struct RunReport {
  pub operation: &'static str,
  pub steps: Vec<StepOutcome>,
}

impl RunReport {
  fn new(operation: &'static str) -> Self {
    Self {
      operation,
      steps: Vec::new(),
    }
  }

  pub fn all_succeeded(&self) -> bool {
    self.steps.iter().all(|s| s.success)
  }
}

/// ---------------------------------------------------------------------------
/// Composite Operations
/// ---------------------------------------------------------------------------

/// Refresh the current month's games, rebuild the daily rollups, and update
/// the profile and stats snapshots. The everyday operation.
pub async fn quick_refresh(state: &AppState, config: &AppConfig) -> Result<RunReport, String> {
  let _guard = acquire_lock(state).await?;
  let client = ChessComClient::new(config);
  let mut report = RunReport::new("quick");

  let started = Instant::now();
  let outcome = ingest_current_month(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "ingest_games", started, outcome).await;

  let started = Instant::now();
  let outcome = rebuild_daily(&state.db).await;
  finish_step(&state.db, &mut report, config, "rebuild_summaries", started, outcome).await;

  let started = Instant::now();
  let outcome = refresh_profile(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "refresh_profile", started, outcome).await;

  let started = Instant::now();
  let outcome = refresh_stats(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "refresh_stats", started, outcome).await;

  Ok(report)
}

/// Walk every monthly archive the player has, then rebuild everything. Used
/// for first-time setup and recovery.
pub async fn full_refresh(state: &AppState, config: &AppConfig) -> Result<RunReport, String> {
  let _guard = acquire_lock(state).await?;
  let client = ChessComClient::new(config);
  let mut report = RunReport::new("full");

  let started = Instant::now();
  let outcome = ingest_all_archives(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "ingest_games", started, outcome).await;

  let started = Instant::now();
  let outcome = rebuild_daily(&state.db).await;
  finish_step(&state.db, &mut report, config, "rebuild_summaries", started, outcome).await;

  let started = Instant::now();
  let outcome = refresh_profile(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "refresh_profile", started, outcome).await;

  let started = Instant::now();
  let outcome = refresh_stats(&state.db, &client, config).await;
  finish_step(&state.db, &mut report, config, "refresh_stats", started, outcome).await;

  Ok(report)
}

/// Rebuild the daily rollups from the store alone. Never touches the
/// network.
pub async fn rebuild_summaries(state: &AppState, config: &AppConfig) -> Result<RunReport, String> {
  let _guard = acquire_lock(state).await?;
  let mut report = RunReport::new("aggregate");

  let started = Instant::now();
  let outcome = rebuild_daily(&state.db).await;
  finish_step(&state.db, &mut report, config, "rebuild_summaries", started, outcome).await;

  Ok(report)
}

async fn acquire_lock(state: &AppState) -> Result<MutexGuard<'_, ()>, String> {
  tokio::time::timeout(LOCK_WAIT, state.sync_lock.lock())
    .await
    .map_err(|_| "Another update cycle is already running".to_string())
}

/// Record one step's outcome, both in the report and in the execution log.
async fn finish_step(
  db: &DbPool,
  report: &mut RunReport,
  config: &AppConfig,
  name: &'static str,
  started: Instant,
  outcome: Result<String, String>,
) {
  let duration_ms = started.elapsed().as_millis() as i64;

  let (success, status, message) = match outcome {
    Ok(message) => (true, "ok", message),
    Err(message) => (false, "error", message),
  };

  store::log_execution(db, report.operation, &config.username, status, duration_ms, &message)
    .await;
  report.steps.push(StepOutcome {
    name,
    success,
    message,
  });
}

/// ---------------------------------------------------------------------------
/// Steps
/// ---------------------------------------------------------------------------

async fn ingest_current_month(
  db: &DbPool,
  client: &ChessComClient,
  config: &AppConfig,
) -> Result<String, String> {
  let now = Local::now();
  let url = client.archive_url(&config.username, now.year(), now.month());

  let raw = client
    .fetch_archive_games(&url)
    .await
    .map_err(|e| e.to_string())?;
  let records: Vec<GameRecord> = raw
    .iter()
    .filter_map(|g| normalize_game(g, &config.username))
    .collect();

  let inserted = store::add_if_absent(db, &records).await?;
  store::touch_archive(db, &url, now.year(), now.month()).await?;

  Ok(format!(
    "{} new games ({} fetched, {} matched player)",
    inserted,
    raw.len(),
    records.len()
  ))
}

async fn ingest_all_archives(
  db: &DbPool,
  client: &ChessComClient,
  config: &AppConfig,
) -> Result<String, String> {
  let archives = client
    .fetch_archives(&config.username)
    .await
    .map_err(|e| e.to_string())?;

  let mut fetched = 0;
  let mut inserted = 0;
  for url in &archives {
    let raw = client
      .fetch_archive_games(url)
      .await
      .map_err(|e| format!("{}: {}", url, e))?;
    let records: Vec<GameRecord> = raw
      .iter()
      .filter_map(|g| normalize_game(g, &config.username))
      .collect();

    fetched += raw.len();
    inserted += store::add_if_absent(db, &records).await?;
    if let Some((year, month)) = parse_archive_period(url) {
      store::touch_archive(db, url, year, month).await?;
    }
  }

  Ok(format!(
    "{} new games ({} fetched across {} archives)",
    inserted,
    fetched,
    archives.len()
  ))
}

async fn rebuild_daily(db: &DbPool) -> Result<String, String> {
  let records = store::all_records(db).await?;

  let start = match store::load_join_date(db).await? {
    Some(joined) => aggregate::local_day(joined),
    None => records
      .iter()
      .filter_map(|r| r.end_time)
      .min()
      .map(aggregate::local_day)
      .unwrap_or_else(fallback_start),
  };
  let end = Local::now().date_naive();

  let summaries = aggregate::build_daily_summaries(&records, start, end.max(start));
  let days = summaries.len();
  store::replace_daily_summaries(db, &summaries).await?;

  Ok(format!("{} days rebuilt from {} games", days, records.len()))
}

async fn refresh_profile(
  db: &DbPool,
  client: &ChessComClient,
  config: &AppConfig,
) -> Result<String, String> {
  let profile = client
    .fetch_profile(&config.username)
    .await
    .map_err(|e| e.to_string())?;
  store::save_profile(db, &config.username, &profile).await?;
  Ok("Profile snapshot updated".to_string())
}

async fn refresh_stats(
  db: &DbPool,
  client: &ChessComClient,
  config: &AppConfig,
) -> Result<String, String> {
  let stats = client
    .fetch_stats(&config.username)
    .await
    .map_err(|e| e.to_string())?;
  store::save_stats_snapshot(db, &config.username, &stats).await?;
  Ok("Stats snapshot updated".to_string())
}

/// Pull the trailing ".../{year}/{month}" out of an archive locator.
fn parse_archive_period(url: &str) -> Option<(i32, u32)> {
  let mut segments = url.trim_end_matches('/').rsplit('/');
  let month = segments.next()?.parse::<u32>().ok()?;
  let year = segments.next()?.parse::<i32>().ok()?;
  if (1..=12).contains(&month) {
    Some((year, month))
  } else {
    None
  }
}

fn fallback_start() -> NaiveDate {
  let (year, month, day) = FALLBACK_START;
  NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
