//! Subcommand implementations. Each exposes an `execute` function.

pub mod exams;
pub mod import;
pub mod init;
pub mod logout;
pub mod register;
pub mod results;
pub mod review;
pub mod stats;
pub mod take;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use examkit_core::auth;
use examkit_core::model::User;
use examkit_store::{load_config_from, ExamkitConfig, SqliteStore};

/// Resolved configuration shared by the store-backed commands.
pub struct Context {
    pub config: ExamkitConfig,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, database: Option<String>) -> Result<Self> {
        let mut config = load_config_from(config_path.as_deref())?;
        if let Some(url) = database {
            config.database.url = url;
        }
        Ok(Self { config })
    }

    pub async fn open_store(&self) -> Result<Arc<SqliteStore>> {
        let store = SqliteStore::open(&self.config.database)
            .await
            .with_context(|| format!("failed to open database {}", self.config.database.url))?;
        Ok(Arc::new(store))
    }
}

/// Log in with command-line credentials.
pub async fn login(store: &SqliteStore, username: &str, password: &str) -> Result<User> {
    auth::login(store, username, password)
        .await
        .with_context(|| format!("cannot log in as {username}"))
}

/// `"2026-10-16 14:05"` in local time.
pub fn local_time(at: chrono::DateTime<chrono::Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
