//! Repository implementations for SQLite storage

pub mod login_flow;

pub use login_flow::SqliteLoginFlowRepository;

use async_trait::async_trait;
use loginflow_core::{
    Error,
    error::StorageError,
    repositories::LoginFlowRepositoryProvider,
};
use loginflow_migration::MigrationManager;
use sqlx::SqlitePool;

use crate::migrations::{SqliteMigrationManager, migrations};

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    login_flow: SqliteLoginFlowRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let login_flow = SqliteLoginFlowRepository::new(pool.clone());

        Self { pool, login_flow }
    }

    /// Connect to `database_url` and wrap the resulting pool.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            Error::Storage(StorageError::Connection(e.to_string()))
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LoginFlowRepositoryProvider for SqliteRepositoryProvider {
    type LoginFlowRepo = SqliteLoginFlowRepository;

    fn login_flow(&self) -> &Self::LoginFlowRepo {
        &self.login_flow
    }

    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        let migrations = migrations();
        let pending = manager.pending(&migrations).await?;
        if pending.is_empty() {
            tracing::debug!("Login flow schema is up to date");
            return Ok(());
        }

        tracing::info!(versions = ?pending, "Applying login flow migrations");
        manager.up(&migrations).await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?;
        Ok(())
    }
}
