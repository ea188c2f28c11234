//! Builder pattern for constructing [`LoginFlows`] instances
//!
//! The builder is type-stated so that `build()` only exists once storage has
//! been configured.
//!
//! # Example
//!
//! ```rust,no_run
//! use loginflow::LoginFlowsBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let flows = LoginFlowsBuilder::new()
//!         .with_sqlite("sqlite://loginflow.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let flow = flows.start("Desktop client").await?;
//!     println!("poll with {}", flow.poll_token);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use loginflow_core::{Clock, LoginFlowConfig, LoginFlowRepositoryProvider, SystemClock};

use crate::LoginFlows;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a [`LoginFlows`] instance.
#[derive(Debug, thiserror::Error)]
pub enum LoginFlowsBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: LoginFlowRepositoryProvider> {
    repositories: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`LoginFlows`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build
pub struct LoginFlowsBuilder<Storage> {
    storage: Storage,
    config: LoginFlowConfig,
    apply_migrations: bool,
}

impl Default for LoginFlowsBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlowsBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lifetime: 1200 seconds
    /// - Cleanup interval: 1 hour
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: LoginFlowConfig::default(),
            apply_migrations: false,
        }
    }

    /// Use an already constructed repository provider.
    pub fn with_repositories<R: LoginFlowRepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> LoginFlowsBuilder<WithStorage<R>> {
        LoginFlowsBuilder {
            storage: WithStorage { repositories },
            config: self.config,
            apply_migrations: self.apply_migrations,
        }
    }
}

// ============================================================================
// Storage Configuration Methods (NoStorage -> WithStorage)
// ============================================================================

#[cfg(feature = "sqlite")]
impl LoginFlowsBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite://path/to/db.sqlite?mode=rwc")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        LoginFlowsBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>>,
        LoginFlowsBuilderError,
    > {
        let repositories = crate::sqlite::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| LoginFlowsBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(repositories)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> LoginFlowsBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>> {
        let repositories = Arc::new(crate::sqlite::SqliteRepositoryProvider::new(pool));
        self.with_repositories(repositories)
    }
}

// ============================================================================
// Configuration Methods (available in any state)
// ============================================================================

impl<S> LoginFlowsBuilder<S> {
    /// Replace the whole login flow configuration.
    pub fn with_config(mut self, config: LoginFlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how long a flow stays usable after creation.
    ///
    /// Default: 1200 seconds
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.lifetime = lifetime;
        self
    }

    /// Set how often the background cleanup task sweeps expired flows.
    ///
    /// Default: 1 hour
    pub fn with_cleanup_interval(mut self, interval: std::time::Duration) -> Self {
        self.config.cleanup_interval = interval;
        self
    }

    /// Set whether to automatically apply database migrations during build.
    ///
    /// Default: false
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<R: LoginFlowRepositoryProvider> LoginFlowsBuilder<WithStorage<R>> {
    /// Build using the system clock.
    pub async fn build(self) -> Result<LoginFlows<R, SystemClock>, LoginFlowsBuilderError> {
        self.build_with_clock(Arc::new(SystemClock)).await
    }

    /// Build with an explicit clock, typically a `ManualClock` in tests.
    pub async fn build_with_clock<C: Clock>(
        self,
        clock: Arc<C>,
    ) -> Result<LoginFlows<R, C>, LoginFlowsBuilderError> {
        self.config
            .validate()
            .map_err(|e| LoginFlowsBuilderError::InvalidConfiguration(e.to_string()))?;

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| LoginFlowsBuilderError::Migration(e.to_string()))?;
        }

        Ok(LoginFlows::from_parts(
            self.storage.repositories,
            clock,
            self.config,
        ))
    }
}
