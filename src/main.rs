use chess_log::config::AppConfig;
use chess_log::db::{initialize_db, AppState};
use chess_log::ops::{self, RunReport};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  let operation = std::env::args().nth(1).unwrap_or_else(|| "quick".to_string());
  let db_path = std::env::var("CHESS_LOG_DB").unwrap_or_else(|_| "chess-log.db".to_string());

  let pool = match initialize_db(&db_path).await {
    Ok(pool) => pool,
    Err(e) => {
      eprintln!("Error: failed to initialize database: {}", e);
      std::process::exit(1);
    }
  };

  let config = match AppConfig::load(&pool).await {
    Ok(config) => config,
    Err(e) => {
      eprintln!("Error: {}", e);
      std::process::exit(1);
    }
  };

  let state = AppState::new(pool);

  let result = match operation.as_str() {
    "quick" => ops::quick_refresh(&state, &config).await,
    "full" => ops::full_refresh(&state, &config).await,
    "aggregate" => ops::rebuild_summaries(&state, &config).await,
    other => {
      eprintln!("Unknown operation: {} (expected quick, full, or aggregate)", other);
      std::process::exit(2);
    }
  };

  match result {
    Ok(report) => {
      print_report(&report);
      if !report.all_succeeded() {
        std::process::exit(1);
      }
    }
    Err(e) => {
      eprintln!("Error: {}", e);
      std::process::exit(1);
    }
  }
}

fn print_report(report: &RunReport) {
  println!("Operation '{}' finished:", report.operation);
  for step in &report.steps {
    let marker = if step.success { " ok" } else { "ERR" };
    println!("  [{}] {}: {}", marker, step.name, step.message);
  }
}
