//! Versioned schema migrations for the loginflow storage backends.
//!
//! A backend lists its migrations oldest first and hands the list to its
//! [`MigrationManager`]. Applied versions are recorded in [`MIGRATIONS_TABLE`],
//! so applying the same list twice changes nothing the second time.
use async_trait::async_trait;
use loginflow_core::{Error, error::StorageError};
use sqlx::Database;

/// Table holding one row per applied migration version.
pub const MIGRATIONS_TABLE: &str = "_loginflow_migrations";

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {name} (version {version}) is listed after version {previous}")]
    OutOfOrder {
        previous: i64,
        version: i64,
        name: String,
    },
}

impl From<MigrationError> for Error {
    fn from(error: MigrationError) -> Self {
        tracing::error!(error = %error, "Login flow migration failed");
        Error::Storage(StorageError::Migration(error.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

/// A single schema change. The manager runs `up` and `down` inside a transaction.
#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Position in the schema history; strictly increasing across a list
    fn version(&self) -> i64;

    fn name(&self) -> &str;

    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;
}

/// Reject a migration list whose versions do not strictly increase.
pub fn ensure_ordered<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    for pair in migrations.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.version() <= previous.version() {
            return Err(MigrationError::OutOfOrder {
                previous: previous.version(),
                version: next.version(),
                name: next.name().to_string(),
            });
        }
    }
    Ok(())
}

/// A row of [`MIGRATIONS_TABLE`]; `applied_at` is unix seconds like `created_at`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    /// Create [`MIGRATIONS_TABLE`] if it does not exist yet.
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration of the list that is not recorded yet, oldest first.
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Revert every recorded migration of the list, newest first.
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;

    /// Versions of `migrations` that `up` would apply, in list order.
    async fn pending(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<Vec<i64>> {
        let mut pending = Vec::new();
        for migration in migrations {
            if !self.is_applied(migration.version()).await? {
                pending.push(migration.version());
            }
        }
        Ok(pending)
    }
}
