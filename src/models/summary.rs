use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::SpeedCategory;

/// One speed category's slice of a daily rollup.
///
/// `rating` is the end-of-day rating after forward-fill; `rating_change` is
/// the signed delta against the previous calendar day, suppressed to None
/// when either side is unknown or the difference is exactly zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDaily {
  pub wins: i64,
  pub losses: i64,
  pub draws: i64,
  pub rating: Option<i64>,
  pub rating_change: Option<i64>,
  pub seconds_played: i64,
}

/// One calendar day's rollup. Exactly one row exists per day in the
/// aggregated range, including days with zero games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
  pub day: NaiveDate,
  pub bullet: CategoryDaily,
  pub blitz: CategoryDaily,
  pub rapid: CategoryDaily,
  /// Overall totals, including games in unclassified speed categories.
  pub games: i64,
  pub wins: i64,
  pub losses: i64,
  pub draws: i64,
  /// Sum of the three category end-of-day ratings, unknown counted as zero.
  pub rating_sum: i64,
  /// Sum of the three category deltas (unknown as zero), itself suppressed
  /// to None when it sums to exactly zero.
  pub rating_change_total: Option<i64>,
  pub seconds_total: i64,
  pub avg_game_seconds: Option<i64>,
}

impl DailySummary {
  pub fn empty(day: NaiveDate) -> Self {
    Self {
      day,
      bullet: CategoryDaily::default(),
      blitz: CategoryDaily::default(),
      rapid: CategoryDaily::default(),
      games: 0,
      wins: 0,
      losses: 0,
      draws: 0,
      rating_sum: 0,
      rating_change_total: None,
      seconds_total: 0,
      avg_game_seconds: None,
    }
  }

  pub fn category(&self, category: SpeedCategory) -> Option<&CategoryDaily> {
    match category {
      SpeedCategory::Bullet => Some(&self.bullet),
      SpeedCategory::Blitz => Some(&self.blitz),
      SpeedCategory::Rapid => Some(&self.rapid),
      SpeedCategory::Other => None,
    }
  }

  pub fn category_mut(&mut self, category: SpeedCategory) -> Option<&mut CategoryDaily> {
    match category {
      SpeedCategory::Bullet => Some(&mut self.bullet),
      SpeedCategory::Blitz => Some(&mut self.blitz),
      SpeedCategory::Rapid => Some(&mut self.rapid),
      SpeedCategory::Other => None,
    }
  }
}
