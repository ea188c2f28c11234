use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Wrap backend errors as [`StorageError::Database`] with a caller supplied context.
///
/// ```rust,ignore
/// use loginflow_core::error::utilities::DatabaseResultExt;
///
/// let row = query.fetch_optional(&pool).await.map_db_err_with_context("Failed to find login flow")?;
/// ```
pub trait DatabaseResultExt<T> {
    fn map_db_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(format!("{context}: {e}")))
        })
    }
}

/// Reject blank string fields before they reach storage.
pub trait RequiredFieldExt {
    fn require_non_empty(self, field_name: &str) -> Result<Self, ValidationError>
    where
        Self: Sized;
}

impl RequiredFieldExt for &str {
    fn require_non_empty(self, field_name: &str) -> Result<Self, ValidationError> {
        if self.trim().is_empty() {
            Err(ValidationError::MissingField(format!(
                "{field_name} is required"
            )))
        } else {
            Ok(self)
        }
    }
}
