use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Speed Category
/// ---------------------------------------------------------------------------

/// Coarse game-pace classification derived from the upstream time-class.
/// Anything that is not bullet/blitz/rapid (daily, variants, missing) lands
/// in Other: it counts toward overall totals but never toward a per-category
/// bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedCategory {
  Bullet,
  Blitz,
  Rapid,
  Other,
}

/// The categories that get their own daily rating history.
pub const TRACKED_CATEGORIES: [SpeedCategory; 3] =
  [SpeedCategory::Bullet, SpeedCategory::Blitz, SpeedCategory::Rapid];

impl SpeedCategory {
  /// Classify an upstream time-class string, decided once at normalization.
  pub fn from_time_class(time_class: Option<&str>) -> Self {
    match time_class.map(|t| t.trim().to_lowercase()).as_deref() {
      Some("bullet") => SpeedCategory::Bullet,
      Some("blitz") => SpeedCategory::Blitz,
      Some("rapid") => SpeedCategory::Rapid,
      _ => SpeedCategory::Other,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      SpeedCategory::Bullet => "bullet",
      SpeedCategory::Blitz => "blitz",
      SpeedCategory::Rapid => "rapid",
      SpeedCategory::Other => "other",
    }
  }

  /// Index into the tracked-category arrays, None for Other.
  pub fn tracked_index(&self) -> Option<usize> {
    TRACKED_CATEGORIES.iter().position(|c| c == self)
  }
}

impl std::str::FromStr for SpeedCategory {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "bullet" => Ok(SpeedCategory::Bullet),
      "blitz" => Ok(SpeedCategory::Blitz),
      "rapid" => Ok(SpeedCategory::Rapid),
      "other" => Ok(SpeedCategory::Other),
      _ => Err(format!("Unknown speed category: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Game Result
/// ---------------------------------------------------------------------------

/// Result from the tracked player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
  Win,
  Loss,
  Draw,
}

impl GameResult {
  /// Map an upstream per-player result code onto win/draw/loss.
  /// The draw vocabulary is fixed; every other non-win code (resigned,
  /// timeout, checkmated, abandoned, ...) is a loss.
  pub fn from_code(code: &str) -> Self {
    match code.trim().to_lowercase().as_str() {
      "win" => GameResult::Win,
      "agreed" | "repetition" | "stalemate" | "insufficient" | "50move"
      | "timevsinsufficient" => GameResult::Draw,
      _ => GameResult::Loss,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      GameResult::Win => "win",
      GameResult::Loss => "loss",
      GameResult::Draw => "draw",
    }
  }
}

impl std::str::FromStr for GameResult {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "win" => Ok(GameResult::Win),
      "loss" => Ok(GameResult::Loss),
      "draw" => Ok(GameResult::Draw),
      _ => Err(format!("Unknown game result: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Color
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
  White,
  Black,
}

impl Color {
  pub fn as_str(&self) -> &'static str {
    match self {
      Color::White => "white",
      Color::Black => "black",
    }
  }
}

impl std::str::FromStr for Color {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "white" => Ok(Color::White),
      "black" => Ok(Color::Black),
      _ => Err(format!("Unknown color: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Time Control
/// ---------------------------------------------------------------------------

/// Decomposed time control. For live games `base` is in seconds; for the
/// correspondence "moves/seconds" shape it carries the upstream convention of
/// base minutes. Unparseable input leaves both fields unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
  pub base: Option<i64>,
  pub increment: Option<i64>,
}

/// ---------------------------------------------------------------------------
/// Game Record
/// ---------------------------------------------------------------------------

/// One finished game from the tracked player's perspective. Immutable once
/// stored; `url` is the dedup key and `end_time` the authoritative ordering
/// key for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
  pub url: String,
  pub end_time: Option<DateTime<Utc>>,
  pub duration_seconds: Option<i64>,
  pub speed_category: SpeedCategory,
  pub my_rating: Option<i64>,
  pub result: GameResult,
  pub my_color: Color,
  pub opponent: String,
  pub opponent_rating: Option<i64>,
  pub termination: Option<String>,
  pub opening: Option<String>,
  pub eco: Option<String>,
  pub time_control: Option<String>,
  pub base_time: Option<i64>,
  pub increment_time: Option<i64>,
  pub rated: bool,
  pub pgn: Option<String>,
}
