//! Login flow service with lazy expiry.
//!
//! This module implements the lookup side of a browser-to-device login
//! handshake. A flow is created with a poll token and a login token and stays
//! usable for a fixed lifetime.
//!
//! # Expiry
//!
//! Expiry is enforced on two independent paths:
//!
//! - Every lookup compares the record's age with the lifetime. A stale record is
//!   deleted on the spot and the lookup fails with [`LoginFlowError::Expired`].
//! - [`LoginFlowService::cleanup`] removes every stale record in one bulk delete,
//!   whether or not it was ever read. It is meant to run periodically, see
//!   [`LoginFlowService::start_cleanup_task`].
//!
//! Either path is sufficient on its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use loginflow_core::services::LoginFlowService;
//! use loginflow_core::LoginFlowConfig;
//!
//! let service = LoginFlowService::new(repository, LoginFlowConfig::default());
//!
//! let flow = service.start("Desktop client").await?;
//! // hand flow.poll_token to the browser and flow.login_token to the device
//!
//! match service.get_by_poll_token(flow.poll_token.as_str()).await {
//!     Ok(flow) if flow.has_credentials() => { /* done */ }
//!     Ok(_) => { /* keep polling */ }
//!     Err(e) if e.requires_restart() => { /* start over */ }
//!     Err(e) => return Err(e),
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    clock::{Clock, SystemClock},
    config::LoginFlowConfig,
    error::{LoginFlowError, utilities::RequiredFieldExt},
    flow::{LoginFlow, LoginFlowCredentials, NewLoginFlow},
    repositories::LoginFlowRepository,
};

/// Service for creating, looking up and expiring login flows.
///
/// # Thread Safety
///
/// This service holds no mutable state of its own and can be shared across
/// tasks. All state lives in the repository.
pub struct LoginFlowService<R: LoginFlowRepository, C: Clock = SystemClock> {
    repository: Arc<R>,
    clock: Arc<C>,
    config: LoginFlowConfig,
}

impl<R: LoginFlowRepository> LoginFlowService<R, SystemClock> {
    /// Create a new LoginFlowService using the system clock.
    pub fn new(repository: Arc<R>, config: LoginFlowConfig) -> Self {
        Self::with_clock(repository, Arc::new(SystemClock), config)
    }
}

impl<R: LoginFlowRepository, C: Clock> LoginFlowService<R, C> {
    /// Create a new LoginFlowService with an explicit clock.
    ///
    /// # Arguments
    ///
    /// * `repository` - The durable store for flow records
    /// * `clock` - Source of the current time for every expiry decision
    /// * `config` - Lifetime and cleanup settings, expected to pass [`LoginFlowConfig::validate`]
    pub fn with_clock(repository: Arc<R>, clock: Arc<C>, config: LoginFlowConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LoginFlowConfig {
        &self.config
    }

    pub fn lifetime(&self) -> Duration {
        self.config.lifetime
    }

    /// Begin a new flow with a fresh token pair and no credentials.
    pub async fn start(&self, client_name: &str) -> Result<LoginFlow, Error> {
        let client_name = client_name.require_non_empty("client_name")?;
        let flow = NewLoginFlow::generate(client_name, self.clock.now());
        self.insert(flow).await
    }

    /// Begin a new flow whose credentials are already known.
    pub async fn start_with_credentials(
        &self,
        client_name: &str,
        credentials: LoginFlowCredentials,
    ) -> Result<LoginFlow, Error> {
        let client_name = client_name.require_non_empty("client_name")?;
        let flow =
            NewLoginFlow::generate(client_name, self.clock.now()).with_credentials(credentials);
        self.insert(flow).await
    }

    /// Look up a live flow by its poll token.
    ///
    /// # Errors
    ///
    /// - [`LoginFlowError::NotFound`] if no flow has this poll token
    /// - [`LoginFlowError::Expired`] if the flow outlived its lifetime; it has been deleted
    /// - storage errors from the repository, unmodified
    pub async fn get_by_poll_token(&self, poll_token: &str) -> Result<LoginFlow, Error> {
        let flow = self.repository.find_by_poll_token(poll_token).await?;
        self.validate_timestamp(flow).await
    }

    /// Look up a live flow by its login token.
    ///
    /// Same error semantics as [`get_by_poll_token`](Self::get_by_poll_token).
    pub async fn get_by_login_token(&self, login_token: &str) -> Result<LoginFlow, Error> {
        let flow = self.repository.find_by_login_token(login_token).await?;
        self.validate_timestamp(flow).await
    }

    /// Retire a flow once the caller is done with it.
    ///
    /// Retiring a flow that is already gone is not an error.
    pub async fn retire(&self, flow: &LoginFlow) -> Result<(), Error> {
        let removed = self.repository.delete(flow).await?;
        tracing::debug!(
            client_name = %flow.client_name,
            removed = removed,
            "Retired login flow"
        );
        Ok(())
    }

    /// Delete every flow whose age has reached the lifetime.
    ///
    /// Idempotent. Storage errors are returned as-is and not retried.
    pub async fn cleanup(&self) -> Result<(), Error> {
        let count = sweep(self.repository.as_ref(), self.clock.now(), self.config.lifetime).await?;
        if count > 0 {
            tracing::info!(count = count, "Cleaned up expired login flows");
        }
        Ok(())
    }

    /// Whether the flow is still within its lifetime right now.
    pub fn is_live(&self, flow: &LoginFlow) -> bool {
        !flow.is_expired(self.clock.now(), self.config.lifetime)
    }

    /// When the flow stops being usable.
    pub fn expires_at(&self, flow: &LoginFlow) -> DateTime<Utc> {
        flow.expires_at(self.config.lifetime)
    }

    /// Start the background cleanup task.
    ///
    /// This spawns a task that calls the bulk sweep every
    /// `config.cleanup_interval`. Failures are logged and the task keeps
    /// running.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - A watch receiver that signals when to stop the task
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let lifetime = self.config.lifetime;
        let period = self
            .config
            .cleanup_interval
            .max(std::time::Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match sweep(repository.as_ref(), clock.now(), lifetime).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Cleaned up expired login flows");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to cleanup expired login flows");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login flow cleanup task");
                        break;
                    }
                }
            }
        })
    }

    async fn insert(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error> {
        let flow = self.repository.create(flow).await?;
        tracing::debug!(
            client_name = %flow.client_name,
            created_at = %flow.created_at,
            "Started login flow"
        );
        Ok(flow)
    }

    /// Turn a lookup result into a live flow or the matching failure.
    async fn validate_timestamp(&self, flow: Option<LoginFlow>) -> Result<LoginFlow, Error> {
        let Some(flow) = flow else {
            return Err(LoginFlowError::NotFound.into());
        };

        if flow.is_expired(self.clock.now(), self.config.lifetime) {
            // Another reader may have removed it already; zero rows is fine.
            let removed = self.repository.delete(&flow).await?;
            tracing::debug!(
                client_name = %flow.client_name,
                removed = removed,
                "Deleted expired login flow on lookup"
            );
            return Err(LoginFlowError::Expired.into());
        }

        Ok(flow)
    }
}

async fn sweep<R: LoginFlowRepository>(
    repository: &R,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<u64, Error> {
    // A cutoff before the earliest representable instant matches nothing.
    match now.checked_sub_signed(lifetime) {
        Some(cutoff) => repository.delete_created_before(cutoff).await,
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        error::{StorageError, ValidationError},
        flow::{LoginToken, PollToken},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock repository for testing
    #[derive(Default)]
    struct MockLoginFlowRepository {
        flows: Mutex<Vec<LoginFlow>>,
    }

    impl MockLoginFlowRepository {
        fn len(&self) -> usize {
            self.flows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LoginFlowRepository for MockLoginFlowRepository {
        async fn create(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error> {
            let mut flows = self.flows.lock().unwrap();
            if flows
                .iter()
                .any(|f| f.poll_token == flow.poll_token || f.login_token == flow.login_token)
            {
                return Err(StorageError::Constraint("duplicate token".to_string()).into());
            }
            let flow = LoginFlow::from(flow);
            flows.push(flow.clone());
            Ok(flow)
        }

        async fn find_by_poll_token(&self, poll_token: &str) -> Result<Option<LoginFlow>, Error> {
            let flows = self.flows.lock().unwrap();
            Ok(flows
                .iter()
                .find(|f| f.poll_token.as_str() == poll_token)
                .cloned())
        }

        async fn find_by_login_token(
            &self,
            login_token: &str,
        ) -> Result<Option<LoginFlow>, Error> {
            let flows = self.flows.lock().unwrap();
            Ok(flows
                .iter()
                .find(|f| f.login_token.as_str() == login_token)
                .cloned())
        }

        async fn delete(&self, flow: &LoginFlow) -> Result<u64, Error> {
            let mut flows = self.flows.lock().unwrap();
            let before_len = flows.len();
            flows.retain(|f| {
                !(f.poll_token == flow.poll_token && f.login_token == flow.login_token)
            });
            Ok((before_len - flows.len()) as u64)
        }

        async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
            let mut flows = self.flows.lock().unwrap();
            let before_len = flows.len();
            flows.retain(|f| f.created_at > cutoff);
            Ok((before_len - flows.len()) as u64)
        }
    }

    /// Always finds a stale record that some other reader already deleted.
    struct RacedRepository {
        stale: LoginFlow,
    }

    #[async_trait]
    impl LoginFlowRepository for RacedRepository {
        async fn create(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error> {
            Ok(flow.into())
        }

        async fn find_by_poll_token(&self, _poll_token: &str) -> Result<Option<LoginFlow>, Error> {
            Ok(Some(self.stale.clone()))
        }

        async fn find_by_login_token(
            &self,
            _login_token: &str,
        ) -> Result<Option<LoginFlow>, Error> {
            Ok(Some(self.stale.clone()))
        }

        async fn delete(&self, _flow: &LoginFlow) -> Result<u64, Error> {
            Ok(0)
        }

        async fn delete_created_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, Error> {
            Ok(0)
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl LoginFlowRepository for FailingRepository {
        async fn create(&self, _flow: NewLoginFlow) -> Result<LoginFlow, Error> {
            Err(StorageError::Database("disk I/O error".to_string()).into())
        }

        async fn find_by_poll_token(&self, _poll_token: &str) -> Result<Option<LoginFlow>, Error> {
            Err(StorageError::Database("disk I/O error".to_string()).into())
        }

        async fn find_by_login_token(
            &self,
            _login_token: &str,
        ) -> Result<Option<LoginFlow>, Error> {
            Err(StorageError::Database("disk I/O error".to_string()).into())
        }

        async fn delete(&self, _flow: &LoginFlow) -> Result<u64, Error> {
            Err(StorageError::Database("disk I/O error".to_string()).into())
        }

        async fn delete_created_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, Error> {
            Err(StorageError::Database("disk I/O error".to_string()).into())
        }
    }

    fn create_service(
        repository: Arc<MockLoginFlowRepository>,
        clock: &ManualClock,
    ) -> LoginFlowService<MockLoginFlowRepository, ManualClock> {
        LoginFlowService::with_clock(
            repository,
            Arc::new(clock.clone()),
            LoginFlowConfig::default(),
        )
    }

    async fn insert_flow(
        repository: &MockLoginFlowRepository,
        poll: &str,
        login: &str,
        created_at: i64,
    ) -> LoginFlow {
        repository
            .create(NewLoginFlow::new(
                PollToken::new(poll),
                LoginToken::new(login),
                DateTime::from_timestamp(created_at, 0).unwrap(),
                "Desktop client",
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_flow_is_returned_by_either_token() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository.clone(), &clock);

        let stored = insert_flow(&repository, "p1", "l1", 0).await;

        let by_poll = service.get_by_poll_token("p1").await.unwrap();
        let by_login = service.get_by_login_token("l1").await.unwrap();
        assert_eq!(by_poll, stored);
        assert_eq!(by_login, stored);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository, &clock);

        let err = service.get_by_poll_token("missing").await.unwrap_err();
        assert!(err.is_not_found());

        let err = service.get_by_login_token("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_lifetime_scenario() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository.clone(), &clock);

        let stored = insert_flow(&repository, "p1", "l1", 0).await;
        insert_flow(&repository, "p2", "l2", 0).await;

        clock.set_timestamp(1199);
        assert_eq!(service.get_by_poll_token("p1").await.unwrap(), stored);

        clock.set_timestamp(1200);
        assert!(service.get_by_poll_token("p1").await.unwrap_err().is_expired());

        clock.set_timestamp(1201);
        assert!(service.get_by_login_token("l1").await.unwrap_err().is_not_found());

        // The second flow was never read; only the sweep removes it.
        assert_eq!(repository.len(), 1);
        service.cleanup().await.unwrap();
        assert_eq!(repository.len(), 0);
        assert!(service.get_by_poll_token("p2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_expired_lookup_deletes_for_both_tokens() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(5_000);
        let service = create_service(repository.clone(), &clock);

        insert_flow(&repository, "p1", "l1", 0).await;

        assert!(service.get_by_login_token("l1").await.unwrap_err().is_expired());
        assert!(service.get_by_poll_token("p1").await.unwrap_err().is_not_found());
        assert_eq!(repository.len(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_flows() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(2_000);
        let service = create_service(repository.clone(), &clock);

        insert_flow(&repository, "old", "old-l", 800).await; // age 1200
        insert_flow(&repository, "young", "young-l", 801).await; // age 1199

        service.cleanup().await.unwrap();

        assert!(service.get_by_poll_token("old").await.unwrap_err().is_not_found());
        assert!(service.get_by_poll_token("young").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(10_000);
        let service = create_service(repository.clone(), &clock);

        insert_flow(&repository, "p1", "l1", 0).await;
        insert_flow(&repository, "p2", "l2", 9_999).await;

        service.cleanup().await.unwrap();
        assert_eq!(repository.len(), 1);

        service.cleanup().await.unwrap();
        assert_eq!(repository.len(), 1);
        let second = repository
            .delete_created_before(clock.now() - service.lifetime())
            .await
            .unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_stale_record_already_deleted_by_another_reader() {
        let stale = LoginFlow::from(NewLoginFlow::new(
            PollToken::new("p1"),
            LoginToken::new("l1"),
            DateTime::from_timestamp(0, 0).unwrap(),
            "Desktop client",
        ));
        let service = LoginFlowService::with_clock(
            Arc::new(RacedRepository { stale }),
            Arc::new(ManualClock::at_timestamp(1_200)),
            LoginFlowConfig::default(),
        );

        assert!(service.get_by_poll_token("p1").await.unwrap_err().is_expired());
        assert!(service.get_by_login_token("l1").await.unwrap_err().is_expired());
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let service = LoginFlowService::with_clock(
            Arc::new(FailingRepository),
            Arc::new(ManualClock::at_timestamp(0)),
            LoginFlowConfig::default(),
        );

        assert!(service.get_by_poll_token("p1").await.unwrap_err().is_storage_error());
        assert!(service.cleanup().await.unwrap_err().is_storage_error());
        assert!(service.start("Desktop client").await.unwrap_err().is_storage_error());
    }

    #[tokio::test]
    async fn test_start_generates_fresh_pair() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(1_700_000_000);
        let service = create_service(repository.clone(), &clock);

        let first = service.start("Desktop client").await.unwrap();
        let second = service.start("Desktop client").await.unwrap();

        assert_eq!(first.created_at, clock.now());
        assert_eq!(first.client_name, "Desktop client");
        assert!(!first.has_credentials());
        assert_ne!(first.poll_token, second.poll_token);
        assert_ne!(first.login_token, second.login_token);
        assert_eq!(repository.len(), 2);

        let found = service
            .get_by_login_token(first.login_token.as_str())
            .await
            .unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_start_rejects_blank_client_name() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository.clone(), &clock);

        let err = service.start("  ").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField(_))
        ));
        assert_eq!(repository.len(), 0);
    }

    #[tokio::test]
    async fn test_start_with_credentials() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository, &clock);

        let credentials = LoginFlowCredentials {
            server: "https://cloud.example.com".to_string(),
            login_name: "alice".to_string(),
            app_password: "app-password".to_string(),
        };
        let flow = service
            .start_with_credentials("Phone", credentials.clone())
            .await
            .unwrap();

        let found = service
            .get_by_poll_token(flow.poll_token.as_str())
            .await
            .unwrap();
        assert_eq!(found.credentials, Some(credentials));
    }

    #[tokio::test]
    async fn test_duplicate_tokens_are_rejected() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        insert_flow(&repository, "p1", "l1", 0).await;

        let err = repository
            .create(NewLoginFlow::new(
                PollToken::new("p1"),
                LoginToken::new("other"),
                DateTime::from_timestamp(0, 0).unwrap(),
                "Desktop client",
            ))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_retire_is_idempotent() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = create_service(repository.clone(), &clock);

        let flow = service.start("Desktop client").await.unwrap();
        service.retire(&flow).await.unwrap();
        service.retire(&flow).await.unwrap();

        assert_eq!(repository.len(), 0);
        assert!(
            service
                .get_by_poll_token(flow.poll_token.as_str())
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_is_live_and_expires_at() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(100);
        let service = create_service(repository, &clock);

        let flow = service.start("Desktop client").await.unwrap();
        assert!(service.is_live(&flow));
        assert_eq!(service.expires_at(&flow).timestamp(), 1_300);

        clock.advance(Duration::seconds(1_200));
        assert!(!service.is_live(&flow));
    }

    #[tokio::test]
    async fn test_short_lifetime_from_config() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(0);
        let service = LoginFlowService::with_clock(
            repository.clone(),
            Arc::new(clock.clone()),
            LoginFlowConfig::default().with_lifetime(Duration::seconds(2)),
        );

        let flow = service.start("Desktop client").await.unwrap();
        clock.advance(Duration::seconds(1));
        assert!(service.get_by_poll_token(flow.poll_token.as_str()).await.is_ok());

        clock.advance(Duration::seconds(1));
        assert!(
            service
                .get_by_poll_token(flow.poll_token.as_str())
                .await
                .unwrap_err()
                .is_expired()
        );
    }

    #[tokio::test]
    async fn test_huge_lifetime_does_not_overflow() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(1_700_000_000);
        let service = LoginFlowService::with_clock(
            repository.clone(),
            Arc::new(clock.clone()),
            LoginFlowConfig::default().with_lifetime(Duration::days(365 * 1_000_000)),
        );

        let flow = service.start("Desktop client").await.unwrap();
        service.cleanup().await.unwrap();

        assert_eq!(repository.len(), 1);
        assert!(service.is_live(&flow));
        assert_eq!(service.expires_at(&flow), DateTime::<Utc>::MAX_UTC);
        assert!(service.get_by_poll_token(flow.poll_token.as_str()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_and_stops() {
        let repository = Arc::new(MockLoginFlowRepository::default());
        let clock = ManualClock::at_timestamp(5_000);
        let service = LoginFlowService::with_clock(
            repository.clone(),
            Arc::new(clock.clone()),
            LoginFlowConfig::default().with_cleanup_interval(std::time::Duration::from_secs(60)),
        );

        insert_flow(&repository, "p1", "l1", 0).await;
        insert_flow(&repository, "p2", "l2", 4_999).await;

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = service.start_cleanup_task(shutdown_rx);

        // The first tick fires immediately.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(repository.len(), 1);

        clock.advance(Duration::seconds(1_200));
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(repository.len(), 0);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
