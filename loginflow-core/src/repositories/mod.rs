//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to interact with storage.
//!
//! - [`LoginFlowRepository`] defines the record operations
//! - [`LoginFlowRepositoryProvider`] hands out a repository and owns the
//!   backend lifecycle (migrations and health checks)

pub mod adapter;
pub mod login_flow;

pub use adapter::LoginFlowRepositoryAdapter;
pub use login_flow::LoginFlowRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait that storage implementations implement to expose their repositories.
///
/// # Example
///
/// ```rust,ignore
/// use loginflow_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// #[async_trait]
/// impl LoginFlowRepositoryProvider for MyStorage {
///     type LoginFlowRepo = MyLoginFlowRepository;
///     fn login_flow(&self) -> &Self::LoginFlowRepo { &self.login_flow }
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait LoginFlowRepositoryProvider: Send + Sync + 'static {
    /// The login flow repository implementation type
    type LoginFlowRepo: LoginFlowRepository;

    /// Get the login flow repository
    fn login_flow(&self) -> &Self::LoginFlowRepo;

    /// Run migrations for the backing store
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for the backing store
    async fn health_check(&self) -> Result<(), Error>;
}
