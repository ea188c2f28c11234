use crate::{
    Error,
    flow::{LoginFlow, NewLoginFlow},
    repositories::{LoginFlowRepository, LoginFlowRepositoryProvider},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a provider and implements [`LoginFlowRepository`] by delegation
pub struct LoginFlowRepositoryAdapter<R: LoginFlowRepositoryProvider> {
    provider: Arc<R>,
}

impl<R: LoginFlowRepositoryProvider> LoginFlowRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: LoginFlowRepositoryProvider> LoginFlowRepository for LoginFlowRepositoryAdapter<R> {
    async fn create(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error> {
        self.provider.login_flow().create(flow).await
    }

    async fn find_by_poll_token(&self, poll_token: &str) -> Result<Option<LoginFlow>, Error> {
        self.provider.login_flow().find_by_poll_token(poll_token).await
    }

    async fn find_by_login_token(&self, login_token: &str) -> Result<Option<LoginFlow>, Error> {
        self.provider
            .login_flow()
            .find_by_login_token(login_token)
            .await
    }

    async fn delete(&self, flow: &LoginFlow) -> Result<u64, Error> {
        self.provider.login_flow().delete(flow).await
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.login_flow().delete_created_before(cutoff).await
    }
}
