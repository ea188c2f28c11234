use async_trait::async_trait;
use chrono::Utc;
use loginflow_migration::{
    MIGRATIONS_TABLE, Migration, MigrationError, MigrationManager, MigrationRecord, ensure_ordered,
};
use sqlx::{Database, Sqlite, SqlitePool};

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Every migration for the SQLite backend, oldest first.
pub fn migrations() -> Vec<Box<dyn Migration<Sqlite>>> {
    vec![Box::new(CreateLoginFlowsTable), Box::new(CreateLoginFlowIndexes)]
}

#[async_trait]
impl MigrationManager<Sqlite> for SqliteMigrationManager {
    async fn initialize(&self) -> Result<(), MigrationError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )"
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        ensure_ordered(migrations)?;
        let record =
            format!("INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at) VALUES (?, ?, ?)");

        for migration in migrations {
            if !self.is_applied(migration.version()).await? {
                let mut tx = self.pool.begin().await?;

                tracing::info!(
                    "Applying migration {} ({})",
                    migration.name(),
                    migration.version()
                );

                migration
                    .up(&mut *tx as &mut <Sqlite as Database>::Connection)
                    .await?;

                sqlx::query(&record)
                    .bind(migration.version())
                    .bind(migration.name())
                    .bind(Utc::now().timestamp())
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
            }
        }
        Ok(())
    }

    async fn down(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        ensure_ordered(migrations)?;
        let forget = format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?");

        for migration in migrations.iter().rev() {
            if self.is_applied(migration.version()).await? {
                let mut tx = self.pool.begin().await?;

                tracing::info!(
                    "Rolling back migration {} ({})",
                    migration.name(),
                    migration.version()
                );

                migration
                    .down(&mut *tx as &mut <Sqlite as Database>::Connection)
                    .await?;

                sqlx::query(&forget)
                    .bind(migration.version())
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
            }
        }
        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let sql =
            format!("SELECT version, name, applied_at FROM {MIGRATIONS_TABLE} ORDER BY version");
        let records = sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {MIGRATIONS_TABLE} WHERE version = ?)");
        let applied: bool = sqlx::query_scalar(&sql)
            .bind(version)
            .fetch_one(&self.pool)
            .await?;
        Ok(applied)
    }
}

pub struct CreateLoginFlowsTable;

#[async_trait]
impl Migration<Sqlite> for CreateLoginFlowsTable {
    fn version(&self) -> i64 {
        1
    }

    fn name(&self) -> &str {
        "CreateLoginFlowsTable"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS login_flows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                poll_token TEXT NOT NULL,
                login_token TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                client_name TEXT NOT NULL,
                server TEXT,
                login_name TEXT,
                app_password TEXT,
                UNIQUE(poll_token),
                UNIQUE(login_token)
            );"#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        sqlx::query("DROP TABLE IF EXISTS login_flows")
            .execute(conn)
            .await?;
        Ok(())
    }
}

/// Index for the age-based sweep; the token columns are covered by their unique constraints.
pub struct CreateLoginFlowIndexes;

#[async_trait]
impl Migration<Sqlite> for CreateLoginFlowIndexes {
    fn version(&self) -> i64 {
        2
    }

    fn name(&self) -> &str {
        "CreateLoginFlowIndexes"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_login_flows_created_at ON login_flows(created_at)",
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        sqlx::query("DROP INDEX IF EXISTS idx_login_flows_created_at")
            .execute(conn)
            .await?;
        Ok(())
    }
}
