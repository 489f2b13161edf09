pub mod game;
pub mod summary;

pub use game::{Color, GameRecord, GameResult, SpeedCategory, TimeControl, TRACKED_CATEGORIES};
pub use summary::{CategoryDaily, DailySummary};
