//! examkit configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examkit_core::session::SessionConfig;

/// Where and how to open the SQLite store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite://examkit.db` or `sqlite::memory:`.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Create the `instructor` and `student` demo accounts on open.
    #[serde(default = "default_seed")]
    pub seed_demo_users: bool,
}

fn default_url() -> String {
    "sqlite://examkit.db".to_string()
}
fn default_max_connections() -> u32 {
    4
}
fn default_seed() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            seed_demo_users: default_seed(),
        }
    }
}

impl DatabaseConfig {
    /// A private in-memory database, handy for tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            seed_demo_users: false,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Top-level examkit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamkitConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// `EXAMKIT_DATABASE_URL` overrides the database URL.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examkit.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config(
                &std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?,
            )
            .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamkitConfig::default(),
    };

    if let Ok(url) = std::env::var("EXAMKIT_DATABASE_URL") {
        config.database.url = url;
    }
    config.database.url = resolve_env_vars(&config.database.url);

    Ok(config)
}

/// Parse a TOML config document. Missing sections take their defaults.
pub fn parse_config(content: &str) -> Result<ExamkitConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMKIT_TEST_VAR", "data");
        assert_eq!(
            resolve_env_vars("sqlite://${_EXAMKIT_TEST_VAR}/exams.db"),
            "sqlite://data/exams.db"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        std::env::remove_var("_EXAMKIT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamkitConfig::default();
        assert_eq!(config.database.url, "sqlite://examkit.db");
        assert!(config.database.seed_demo_users);
        assert_eq!(config.session.tick_ms, 1000);
        assert_eq!(config.session.checkpoint_every_secs, 10);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[database]
url = "sqlite://school.db"
seed_demo_users = false

[session]
checkpoint_every_secs = 0
"#,
        )
        .unwrap();
        assert_eq!(config.database.url, "sqlite://school.db");
        assert_eq!(config.database.max_connections, 4);
        assert!(!config.database.seed_demo_users);
        assert_eq!(config.session.tick_ms, 1000);
        assert_eq!(config.session.checkpoint_every_secs, 0);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/examkit.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examkit.toml");
        std::fs::write(&path, "[database]\nmax_connections = 2\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.database.max_connections, 2);
    }

    #[test]
    fn in_memory_detection() {
        assert!(DatabaseConfig::in_memory().is_in_memory());
        assert!(!DatabaseConfig::default().is_in_memory());
    }
}
