mod config;
pub mod kv;
mod store;

pub use config::{Config, FeedbackConfig, RetentionConfig, StorageConfig, TimerConfig};
pub use kv::{KvBackend, MemoryKv, SqliteKv};
pub use store::{SharedStore, Store, CALENDAR_VISIBLE_KEY, GOALS_KEY, SESSIONS_KEY};

use std::path::PathBuf;

/// Returns `~/.config/regrow[-dev]/` based on REGROW_ENV.
///
/// Set REGROW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REGROW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("regrow-dev")
    } else {
        base_dir.join("regrow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
