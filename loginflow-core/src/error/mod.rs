pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Login flow error: {0}")]
    LoginFlow(#[from] LoginFlowError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Failures of a token lookup.
///
/// `NotFound` means no record was stored for the token at all. `Expired` means a
/// record was found but had outlived the configured lifetime, and it has been
/// deleted as part of the lookup that reported it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoginFlowError {
    #[error("Login flow not found")]
    NotFound,

    #[error("Login flow expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid lifetime: {0}")]
    InvalidLifetime(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::LoginFlow(LoginFlowError::NotFound))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Error::LoginFlow(LoginFlowError::Expired))
    }

    /// Whether the caller has to begin a new login flow.
    ///
    /// Collapses `NotFound` and `Expired` for callers that do not care which one
    /// they hit.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Error::LoginFlow(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::Storage(StorageError::Constraint(_)))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
