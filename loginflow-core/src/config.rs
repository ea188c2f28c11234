//! Login flow configuration

use chrono::Duration;

use crate::error::ValidationError;

/// How long a login flow stays usable after creation, in seconds.
pub const LOGIN_FLOW_LIFETIME_SECS: i64 = 1200;

/// How often the background reaper sweeps expired flows, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Configuration for [`LoginFlowService`](crate::services::LoginFlowService).
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use loginflow_core::LoginFlowConfig;
///
/// let config = LoginFlowConfig {
///     lifetime: Duration::seconds(30),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFlowConfig {
    /// Age at which a flow expires (default: 20 minutes)
    pub lifetime: Duration,
    /// Period of the background cleanup task (default: 1 hour)
    pub cleanup_interval: std::time::Duration,
}

impl Default for LoginFlowConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::seconds(LOGIN_FLOW_LIFETIME_SECS),
            cleanup_interval: std::time::Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl LoginFlowConfig {
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: std::time::Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lifetime <= Duration::zero() {
            return Err(ValidationError::InvalidLifetime(format!(
                "lifetime must be positive, got {}s",
                self.lifetime.num_seconds()
            )));
        }

        // tokio::time::interval panics on a zero period
        if self.cleanup_interval.is_zero() {
            return Err(ValidationError::InvalidField(
                "cleanup_interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
