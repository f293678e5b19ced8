//! examkit-store — SQLite persistence and configuration.
//!
//! Implements the `ExamStore` and `UserStore` traits over a SQLite pool and
//! loads `examkit.toml`.

pub mod config;
pub mod schema;
pub mod sqlite;

pub use config::{load_config, load_config_from, DatabaseConfig, ExamkitConfig};
pub use sqlite::SqliteStore;
