//! SQLite implementation of the login flow repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loginflow_core::{
    Error,
    error::{StorageError, utilities::DatabaseResultExt},
    flow::{LoginFlow, LoginFlowCredentials, LoginToken, NewLoginFlow, PollToken},
    repositories::LoginFlowRepository,
};
use sqlx::SqlitePool;

/// SQLite repository for login flow records.
pub struct SqliteLoginFlowRepository {
    pool: SqlitePool,
}

impl SqliteLoginFlowRepository {
    /// Create a new SQLite login flow repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginFlow {
    poll_token: String,
    login_token: String,
    created_at: i64,
    client_name: String,
    server: Option<String>,
    login_name: Option<String>,
    app_password: Option<String>,
}

impl TryFrom<SqliteLoginFlow> for LoginFlow {
    type Error = Error;

    fn try_from(row: SqliteLoginFlow) -> Result<Self, Self::Error> {
        let created_at = DateTime::from_timestamp(row.created_at, 0).ok_or_else(|| {
            StorageError::Database(format!("Invalid created_at timestamp {}", row.created_at))
        })?;

        let credentials = match (row.server, row.login_name, row.app_password) {
            (Some(server), Some(login_name), Some(app_password)) => Some(LoginFlowCredentials {
                server,
                login_name,
                app_password,
            }),
            _ => None,
        };

        Ok(LoginFlow {
            poll_token: PollToken::from(row.poll_token),
            login_token: LoginToken::from(row.login_token),
            created_at,
            client_name: row.client_name,
            credentials,
        })
    }
}

const SELECT_LOGIN_FLOW: &str = r#"
    SELECT poll_token, login_token, created_at, client_name, server, login_name, app_password
    FROM login_flows
"#;

fn map_insert_error(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            tracing::warn!(error = %e, "Rejected login flow with a duplicate token");
            StorageError::Constraint("login flow token already exists".to_string()).into()
        }
        _ => {
            tracing::error!(error = %e, "Failed to create login flow");
            StorageError::Database("Failed to create login flow".to_string()).into()
        }
    }
}

#[async_trait]
impl LoginFlowRepository for SqliteLoginFlowRepository {
    async fn create(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error> {
        let credentials = flow.credentials.as_ref();

        sqlx::query(
            r#"
            INSERT INTO login_flows (poll_token, login_token, created_at, client_name, server, login_name, app_password)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(flow.poll_token.as_str())
        .bind(flow.login_token.as_str())
        .bind(flow.created_at.timestamp())
        .bind(&flow.client_name)
        .bind(credentials.map(|c| c.server.as_str()))
        .bind(credentials.map(|c| c.login_name.as_str()))
        .bind(credentials.map(|c| c.app_password.as_str()))
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(flow.into())
    }

    async fn find_by_poll_token(&self, poll_token: &str) -> Result<Option<LoginFlow>, Error> {
        let row = sqlx::query_as::<_, SqliteLoginFlow>(&format!(
            "{SELECT_LOGIN_FLOW} WHERE poll_token = ?1"
        ))
        .bind(poll_token)
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to find login flow by poll token")?;

        row.map(LoginFlow::try_from).transpose()
    }

    async fn find_by_login_token(&self, login_token: &str) -> Result<Option<LoginFlow>, Error> {
        let row = sqlx::query_as::<_, SqliteLoginFlow>(&format!(
            "{SELECT_LOGIN_FLOW} WHERE login_token = ?1"
        ))
        .bind(login_token)
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to find login flow by login token")?;

        row.map(LoginFlow::try_from).transpose()
    }

    async fn delete(&self, flow: &LoginFlow) -> Result<u64, Error> {
        let result =
            sqlx::query("DELETE FROM login_flows WHERE poll_token = ?1 AND login_token = ?2")
                .bind(flow.poll_token.as_str())
                .bind(flow.login_token.as_str())
                .execute(&self.pool)
                .await
                .map_db_err_with_context("Failed to delete login flow")?;

        Ok(result.rows_affected())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_flows WHERE created_at <= ?1")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to cleanup expired login flows")?;

        Ok(result.rows_affected())
    }
}
