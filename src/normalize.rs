//! Game record normalization: one raw upstream game object in, one canonical
//! GameRecord out (or a rejection when the tracked player is not in the game).
//!
//! Pure functions of their inputs; all upstream validation happens here so
//! the store and the aggregation engine only ever see canonical rows.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::chesscom::{RawGame, RawPlayer};
use crate::models::{Color, GameRecord, GameResult, SpeedCategory, TimeControl};

/// ---------------------------------------------------------------------------
/// Normalizer
/// ---------------------------------------------------------------------------

/// Normalize one raw game from the tracked player's perspective. Returns
/// None when neither side's username matches (case-insensitively) - such
/// games never enter the store.
pub fn normalize_game(raw: &RawGame, username: &str) -> Option<GameRecord> {
  let white = raw.white.as_ref();
  let black = raw.black.as_ref();

  let (my_color, me, them) = if player_matches(white, username) {
    (Color::White, white?, black)
  } else if player_matches(black, username) {
    (Color::Black, black?, white)
  } else {
    return None;
  };

  let pgn = raw.pgn.as_deref();

  // Epoch fields are authoritative; PGN tags are the fallback when the
  // upstream omits them.
  let start_time = raw
    .start_time
    .and_then(|s| DateTime::from_timestamp(s, 0))
    .or_else(|| pgn.and_then(|p| pgn_timestamp(p, "UTCDate", "UTCTime")));
  let end_time = raw
    .end_time
    .and_then(|s| DateTime::from_timestamp(s, 0))
    .or_else(|| pgn.and_then(|p| pgn_timestamp(p, "EndDate", "EndTime")));

  let duration_seconds = match (start_time, end_time) {
    (Some(start), Some(end)) => Some((end - start).num_seconds().max(0)),
    _ => None,
  };

  let time_control = parse_time_control(raw.time_control.as_deref());

  Some(GameRecord {
    url: raw.url.clone(),
    end_time,
    duration_seconds,
    speed_category: SpeedCategory::from_time_class(raw.time_class.as_deref()),
    my_rating: me.rating,
    result: GameResult::from_code(me.result.as_deref().unwrap_or("")),
    my_color,
    opponent: them
      .and_then(|p| p.username.clone())
      .unwrap_or_default(),
    opponent_rating: them.and_then(|p| p.rating),
    termination: pgn.and_then(|p| pgn_tag(p, "Termination")),
    opening: pgn
      .and_then(|p| pgn_tag(p, "ECOUrl"))
      .and_then(|url| opening_from_eco_url(&url)),
    eco: pgn.and_then(|p| pgn_tag(p, "ECO")),
    time_control: raw.time_control.clone(),
    base_time: time_control.base,
    increment_time: time_control.increment,
    rated: raw.rated.unwrap_or(false),
    pgn: raw.pgn.clone(),
  })
}

fn player_matches(player: Option<&RawPlayer>, username: &str) -> bool {
  player
    .and_then(|p| p.username.as_deref())
    .is_some_and(|u| u.eq_ignore_ascii_case(username))
}

/// ---------------------------------------------------------------------------
/// Time Control Parsing
/// ---------------------------------------------------------------------------

/// Recognizes two shapes: "base+increment" in seconds (a bare integer is
/// base with zero increment), and the correspondence "moves/seconds" shape,
/// carried as base minutes with zero increment. Anything else is unknown,
/// never an error.
pub fn parse_time_control(input: Option<&str>) -> TimeControl {
  let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
    return TimeControl::default();
  };

  if let Some((moves, per_seconds)) = input.split_once('/') {
    if moves.parse::<i64>().is_ok() {
      if let Ok(per_seconds) = per_seconds.parse::<i64>() {
        return TimeControl {
          base: Some(per_seconds / 60),
          increment: Some(0),
        };
      }
    }
    return TimeControl::default();
  }

  if let Some((base, increment)) = input.split_once('+') {
    return match (base.parse::<i64>(), increment.parse::<i64>()) {
      (Ok(base), Ok(increment)) => TimeControl {
        base: Some(base),
        increment: Some(increment),
      },
      _ => TimeControl::default(),
    };
  }

  match input.parse::<i64>() {
    Ok(base) => TimeControl {
      base: Some(base),
      increment: Some(0),
    },
    Err(_) => TimeControl::default(),
  }
}

/// ---------------------------------------------------------------------------
/// PGN Tag Extraction
/// ---------------------------------------------------------------------------

/// Extract one `[Name "value"]` tag from embedded game text.
pub fn pgn_tag(pgn: &str, name: &str) -> Option<String> {
  let needle = format!("[{} \"", name);
  for line in pgn.lines() {
    if let Some(rest) = line.strip_prefix(&needle) {
      if let Some(end) = rest.find('"') {
        return Some(rest[..end].to_string());
      }
    }
  }
  None
}

fn pgn_timestamp(pgn: &str, date_tag: &str, time_tag: &str) -> Option<DateTime<Utc>> {
  let date = pgn_tag(pgn, date_tag)?;
  let time = pgn_tag(pgn, time_tag)?;
  let parsed =
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y.%m.%d %H:%M:%S").ok()?;
  Some(parsed.and_utc())
}

/// "https://www.chess.com/openings/Sicilian-Defense" -> "Sicilian Defense"
fn opening_from_eco_url(url: &str) -> Option<String> {
  let segment = url.trim_end_matches('/').rsplit('/').next()?;
  if segment.is_empty() {
    None
  } else {
    Some(segment.replace('-', " "))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
