//! Standalone rating-change derivation over parallel (category, rating,
//! timestamp) columns, one delta per input position.
//!
//! This is deliberately not the daily engine's policy: the first occurrence
//! of a category yields 0 (not "no value"), and zero deltas are reported as
//! 0 (not suppressed). Positions missing any of the three inputs get no
//! value, and output order always mirrors input order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

pub fn rating_changes(
  categories: &[Option<String>],
  ratings: &[Option<i64>],
  timestamps: &[Option<DateTime<Utc>>],
) -> Vec<Option<i64>> {
  let len = categories.len().max(ratings.len()).max(timestamps.len());

  let mut usable: Vec<(usize, &str, i64, DateTime<Utc>)> = Vec::new();
  for idx in 0..len {
    let category = categories.get(idx).and_then(|c| c.as_deref());
    let rating = ratings.get(idx).and_then(|r| *r);
    let timestamp = timestamps.get(idx).and_then(|t| *t);
    if let (Some(category), Some(rating), Some(timestamp)) = (category, rating, timestamp) {
      if !category.is_empty() {
        usable.push((idx, category, rating, timestamp));
      }
    }
  }

  // Stable sort: equal timestamps keep their input order.
  usable.sort_by_key(|&(_, _, _, timestamp)| timestamp);

  let mut deltas = vec![None; len];
  let mut last_seen: HashMap<&str, i64> = HashMap::new();
  for (idx, category, rating, _) in usable {
    let delta = match last_seen.get(category) {
      Some(previous) => rating - previous,
      None => 0,
    };
    deltas[idx] = Some(delta);
    last_seen.insert(category, rating);
  }

  deltas
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(seconds: i64) -> Option<DateTime<Utc>> {
    Some(Utc.timestamp_opt(seconds, 0).unwrap())
  }

  fn cat(name: &str) -> Option<String> {
    Some(name.to_string())
  }

  #[test]
  fn test_first_occurrence_is_zero_not_no_value() {
    let deltas = rating_changes(&[cat("Blitz")], &[Some(1500)], &[ts(100)]);
    assert_eq!(deltas, vec![Some(0)]);
  }

  #[test]
  fn test_zero_delta_is_reported() {
    let deltas = rating_changes(
      &[cat("Blitz"), cat("Blitz")],
      &[Some(1500), Some(1500)],
      &[ts(100), ts(200)],
    );
    assert_eq!(deltas, vec![Some(0), Some(0)]);
  }

  #[test]
  fn test_deltas_follow_timestamp_order_not_input_order() {
    // Newest first, as the game table is usually laid out.
    let deltas = rating_changes(
      &[cat("Blitz"), cat("Blitz"), cat("Blitz")],
      &[Some(1520), Some(1510), Some(1500)],
      &[ts(300), ts(200), ts(100)],
    );
    assert_eq!(deltas, vec![Some(10), Some(10), Some(0)]);
  }

  #[test]
  fn test_categories_are_independent() {
    let deltas = rating_changes(
      &[cat("Blitz"), cat("Bullet"), cat("Blitz"), cat("Bullet")],
      &[Some(1500), Some(1200), Some(1490), Some(1230)],
      &[ts(100), ts(200), ts(300), ts(400)],
    );
    assert_eq!(deltas, vec![Some(0), Some(0), Some(-10), Some(30)]);
  }

  #[test]
  fn test_incomplete_positions_get_no_value() {
    let deltas = rating_changes(
      &[cat("Blitz"), None, cat(""), cat("Blitz"), cat("Blitz")],
      &[Some(1500), Some(1510), Some(1520), None, Some(1530)],
      &[ts(100), ts(200), ts(300), ts(400), None],
    );
    assert_eq!(deltas, vec![Some(0), None, None, None, None]);
  }

  #[test]
  fn test_excluded_positions_do_not_break_the_chain() {
    let deltas = rating_changes(
      &[cat("Blitz"), cat("Blitz"), cat("Blitz")],
      &[Some(1500), None, Some(1520)],
      &[ts(100), ts(200), ts(300)],
    );
    // The middle row is skipped entirely; the chain runs 1500 -> 1520.
    assert_eq!(deltas, vec![Some(0), None, Some(20)]);
  }

  #[test]
  fn test_timestamp_ties_keep_input_order() {
    let deltas = rating_changes(
      &[cat("Blitz"), cat("Blitz")],
      &[Some(1500), Some(1510)],
      &[ts(100), ts(100)],
    );
    assert_eq!(deltas, vec![Some(0), Some(10)]);
  }

  #[test]
  fn test_ragged_inputs_align_to_longest() {
    let deltas = rating_changes(&[cat("Blitz"), cat("Blitz")], &[Some(1500)], &[ts(100), ts(200)]);
    assert_eq!(deltas, vec![Some(0), None]);
  }

  #[test]
  fn test_empty_input() {
    assert!(rating_changes(&[], &[], &[]).is_empty());
  }
}
