//! SQLite storage backend for loginflow
//!
//! Login flows live in a single `login_flows` table with unique poll and login
//! token columns and an integer `created_at` (unix seconds) indexed for the
//! age-based sweep.
//!
//! # Example
//!
//! ```rust,no_run
//! use loginflow_core::LoginFlowRepositoryProvider;
//! use loginflow_storage_sqlite::SqliteRepositoryProvider;
//!
//! # async fn example() -> Result<(), loginflow_core::Error> {
//! let provider = SqliteRepositoryProvider::connect("sqlite://loginflow.db?mode=rwc").await?;
//! provider.migrate().await?;
//! # Ok(())
//! # }
//! ```
pub mod migrations;
pub mod repositories;

pub use repositories::{SqliteLoginFlowRepository, SqliteRepositoryProvider};
