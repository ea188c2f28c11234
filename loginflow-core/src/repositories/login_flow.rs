use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    flow::{LoginFlow, NewLoginFlow},
};

/// Durable storage for login flow records.
///
/// Implementations must enforce uniqueness of both tokens and must treat
/// deleting an absent record as success. Lookups never check expiry; that is
/// the service's job.
#[async_trait]
pub trait LoginFlowRepository: Send + Sync + 'static {
    /// Insert a new flow
    ///
    /// Fails with `StorageError::Constraint` if either token is already stored.
    async fn create(&self, flow: NewLoginFlow) -> Result<LoginFlow, Error>;

    /// Find a flow by exact poll token
    async fn find_by_poll_token(&self, poll_token: &str) -> Result<Option<LoginFlow>, Error>;

    /// Find a flow by exact login token
    async fn find_by_login_token(&self, login_token: &str) -> Result<Option<LoginFlow>, Error>;

    /// Delete a flow by its token pair, returning the number of records removed
    async fn delete(&self, flow: &LoginFlow) -> Result<u64, Error>;

    /// Delete every flow created at or before `cutoff`, returning the number of records removed
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}
