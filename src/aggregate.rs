//! Daily aggregation engine.
//!
//! Rebuilds the complete daily rollup from the full game store on every run:
//! one row per local calendar day across the requested range, gap-filled,
//! with forward-filled end-of-day ratings and signed deltas. Two passes are
//! required - the "last known rating" for a category can only be carried
//! onto a game-less day after walking the history forward in time.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::models::{DailySummary, GameRecord, GameResult, TRACKED_CATEGORIES};

/// The local calendar day a timestamp falls on; the day boundary used for
/// bucketing everywhere in the tracker.
pub fn local_day(ts: DateTime<Utc>) -> NaiveDate {
  ts.with_timezone(&Local).date_naive()
}

/// Build one DailySummary per calendar day in `[start, end]` inclusive, in
/// chronological order. Deterministic over its inputs: two runs over the
/// same store and range produce identical output. Presentation order is the
/// caller's concern.
pub fn build_daily_summaries(
  records: &[GameRecord],
  start: NaiveDate,
  end: NaiveDate,
) -> Vec<DailySummary> {
  if start > end {
    return Vec::new();
  }
  let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();

  // Pass 0: bucket by local day of end_time. Records without a usable
  // end_time never reach a bucket.
  let mut buckets: BTreeMap<NaiveDate, Vec<&GameRecord>> = BTreeMap::new();
  for record in records {
    let Some(end_time) = record.end_time else { continue };
    let day = local_day(end_time);
    if day < start || day > end {
      continue;
    }
    buckets.entry(day).or_default().push(record);
  }

  // Pass 1 (forward): end-of-day rating per tracked category. A day's own
  // rating is the chronologically-last rated game of that category that day;
  // days without one carry the running last-known value.
  let mut carried: [Option<i64>; 3] = [None; 3];
  let mut history: Vec<[Option<i64>; 3]> = Vec::with_capacity(days.len());
  for day in &days {
    let mut row = [None; 3];
    for (slot, category) in TRACKED_CATEGORIES.iter().enumerate() {
      let own = buckets.get(day).and_then(|games| {
        games
          .iter()
          .filter(|g| g.speed_category == *category && g.my_rating.is_some())
          .max_by_key(|g| g.end_time)
          .and_then(|g| g.my_rating)
      });
      row[slot] = own.or(carried[slot]);
      if own.is_some() {
        carried[slot] = own;
      }
    }
    history.push(row);
  }

  // Pass 2: per-day rollup. Deltas compare against the previous calendar
  // day's history entry - gap days still count as one step - and the first
  // day in range never reports one.
  let mut summaries = Vec::with_capacity(days.len());
  for (idx, day) in days.iter().enumerate() {
    let mut summary = DailySummary::empty(*day);

    if let Some(games) = buckets.get(day) {
      for game in games {
        let seconds = game.duration_seconds.unwrap_or(0);
        summary.games += 1;
        summary.seconds_total += seconds;
        match game.result {
          GameResult::Win => summary.wins += 1,
          GameResult::Loss => summary.losses += 1,
          GameResult::Draw => summary.draws += 1,
        }

        if let Some(bucket) = summary.category_mut(game.speed_category) {
          bucket.seconds_played += seconds;
          match game.result {
            GameResult::Win => bucket.wins += 1,
            GameResult::Loss => bucket.losses += 1,
            GameResult::Draw => bucket.draws += 1,
          }
        }
      }
    }

    let mut change_total = 0i64;
    for (slot, category) in TRACKED_CATEGORIES.iter().enumerate() {
      let rating = history[idx][slot];
      let change = if idx == 0 {
        None
      } else {
        match (rating, history[idx - 1][slot]) {
          (Some(current), Some(previous)) if current != previous => Some(current - previous),
          _ => None,
        }
      };

      summary.rating_sum += rating.unwrap_or(0);
      change_total += change.unwrap_or(0);

      if let Some(bucket) = summary.category_mut(*category) {
        bucket.rating = rating;
        bucket.rating_change = change;
      }
    }

    summary.rating_change_total = if change_total == 0 { None } else { Some(change_total) };
    summary.avg_game_seconds = if summary.games > 0 {
      Some(summary.seconds_total / summary.games)
    } else {
      None
    };

    summaries.push(summary);
  }

  summaries
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
