//! # loginflow
//!
//! A time-bounded token store for browser-to-device sign in. A flow hands a
//! poll token to the browser and a login token to the device or app that
//! completes the login. Both tokens stop working once the flow is
//! [`LOGIN_FLOW_LIFETIME_SECS`] old (configurable), and stale flows are removed
//! both when they are looked up and by a periodic sweep.
//!
//! ## Storage Support
//!
//! - SQLite (feature `sqlite`, enabled by default)
//!
//! Any other backend can be plugged in by implementing
//! [`LoginFlowRepositoryProvider`].
//!
//! ## Example
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
//!
//!     match flows.get_by_poll_token(flow.poll_token.as_str()).await {
//!         Ok(flow) => println!("still waiting: {}", !flow.has_credentials()),
//!         Err(e) if e.requires_restart() => println!("start over"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```
pub mod builder;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use loginflow_core::{
    repositories::LoginFlowRepositoryAdapter, services::LoginFlowService,
};

pub use builder::{LoginFlowsBuilder, LoginFlowsBuilderError, NoStorage, WithStorage};

/// Re-export core types from loginflow_core
pub use loginflow_core::{
    Clock, Error, LOGIN_FLOW_LIFETIME_SECS, LoginFlow, LoginFlowConfig, LoginFlowCredentials,
    LoginFlowError, LoginFlowRepository, LoginFlowRepositoryProvider, LoginToken, ManualClock,
    NewLoginFlow, PollToken, SystemClock,
};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use loginflow_storage_sqlite::{SqliteLoginFlowRepository, SqliteRepositoryProvider};
}

/// Entry point for working with login flows.
///
/// Owns the repository provider (for migrations and health checks) and the
/// [`LoginFlowService`] that applies lifetimes on top of it.
pub struct LoginFlows<R: LoginFlowRepositoryProvider, C: Clock = SystemClock> {
    repositories: Arc<R>,
    service: LoginFlowService<LoginFlowRepositoryAdapter<R>, C>,
}

impl<R: LoginFlowRepositoryProvider> LoginFlows<R, SystemClock> {
    /// Create an instance with the default configuration and the system clock.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::from_parts(repositories, Arc::new(SystemClock), LoginFlowConfig::default())
    }
}

impl<R: LoginFlowRepositoryProvider, C: Clock> LoginFlows<R, C> {
    pub(crate) fn from_parts(repositories: Arc<R>, clock: Arc<C>, config: LoginFlowConfig) -> Self {
        let adapter = Arc::new(LoginFlowRepositoryAdapter::new(repositories.clone()));
        let service = LoginFlowService::with_clock(adapter, clock, config);

        Self {
            repositories,
            service,
        }
    }

    /// Run the storage backend's migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Check that the storage backend is reachable.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    pub fn config(&self) -> &LoginFlowConfig {
        self.service.config()
    }

    pub fn lifetime(&self) -> Duration {
        self.service.lifetime()
    }

    pub async fn start(&self, client_name: &str) -> Result<LoginFlow, Error> {
        self.service.start(client_name).await
    }

    pub async fn start_with_credentials(
        &self,
        client_name: &str,
        credentials: LoginFlowCredentials,
    ) -> Result<LoginFlow, Error> {
        self.service
            .start_with_credentials(client_name, credentials)
            .await
    }

    /// See [`LoginFlowService::get_by_poll_token`].
    pub async fn get_by_poll_token(&self, poll_token: &str) -> Result<LoginFlow, Error> {
        self.service.get_by_poll_token(poll_token).await
    }

    /// See [`LoginFlowService::get_by_login_token`].
    pub async fn get_by_login_token(&self, login_token: &str) -> Result<LoginFlow, Error> {
        self.service.get_by_login_token(login_token).await
    }

    pub async fn retire(&self, flow: &LoginFlow) -> Result<(), Error> {
        self.service.retire(flow).await
    }

    pub async fn cleanup(&self) -> Result<(), Error> {
        self.service.cleanup().await
    }

    pub fn is_live(&self, flow: &LoginFlow) -> bool {
        self.service.is_live(flow)
    }

    pub fn expires_at(&self, flow: &LoginFlow) -> DateTime<Utc> {
        self.service.expires_at(flow)
    }

    /// Spawn the periodic sweep; it stops when `shutdown` changes or its sender is dropped.
    pub fn start_cleanup_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.service.start_cleanup_task(shutdown)
    }
}
