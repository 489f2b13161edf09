use std::fs;
use std::path::Path;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;

pub type DbPool = SqlitePool;

/// Application state: the connection pool plus the guard that keeps two
/// update cycles from interleaving.
pub struct AppState {
  pub db: DbPool,
  pub sync_lock: Mutex<()>,
}

impl AppState {
  pub fn new(db: DbPool) -> Self {
    Self {
      db,
      sync_lock: Mutex::new(()),
    }
  }
}

/// Initialize the database connection pool and run migrations.
pub async fn initialize_db(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
  if let Some(parent) = Path::new(path).parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }
  let db_url = format!("sqlite://{}?mode=rwc", path);

  println!("Initializing database at: {}", path);

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  Ok(pool)
}
