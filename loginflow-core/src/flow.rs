//! Login flow records
//!
//! A login flow pairs two opaque tokens for a browser-to-device handshake. The
//! browser keeps polling with the poll token while the device signs in with the
//! login token. The record is defined as follows:
//!
//! | Field         | Type                           | Description                                               |
//! | ------------- | ------------------------------ | --------------------------------------------------------- |
//! | `poll_token`  | `PollToken`                    | Held by the browser session that started the flow.        |
//! | `login_token` | `LoginToken`                   | Handed to the device or app that completes the sign in.   |
//! | `created_at`  | `DateTime`                     | When the flow was created, seconds resolution, immutable. |
//! | `client_name` | `String`                       | Display name of the client that started the flow.         |
//! | `credentials` | `Option<LoginFlowCredentials>` | Payload produced once the login completes.                |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::generate_secure_token;

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(token: &str) -> Self {
                Self(token.to_string())
            }

            pub fn new_random() -> Self {
                Self(generate_secure_token())
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_token!(
    /// Token used by the initiating browser to ask whether the login finished.
    PollToken
);

opaque_token!(
    /// Token used by the authenticating device to complete the login.
    LoginToken
);

/// Credentials handed back to the poller once the device side completes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlowCredentials {
    pub server: String,
    pub login_name: String,
    pub app_password: String,
}

impl std::fmt::Debug for LoginFlowCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlowCredentials")
            .field("server", &self.server)
            .field("login_name", &self.login_name)
            .field("app_password", &"[redacted]")
            .finish()
    }
}

/// A stored login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlow {
    pub poll_token: PollToken,
    pub login_token: LoginToken,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub credentials: Option<LoginFlowCredentials>,
}

impl LoginFlow {
    /// Time elapsed since the flow was created.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// A flow is expired once its age reaches the lifetime.
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        self.age(now) >= lifetime
    }

    /// The first instant at which the flow counts as expired.
    ///
    /// Saturates at `DateTime::<Utc>::MAX_UTC` when the lifetime reaches past
    /// the representable range.
    pub fn expires_at(&self, lifetime: Duration) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

/// A login flow that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoginFlow {
    pub poll_token: PollToken,
    pub login_token: LoginToken,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub credentials: Option<LoginFlowCredentials>,
}

impl NewLoginFlow {
    pub fn new(
        poll_token: PollToken,
        login_token: LoginToken,
        created_at: DateTime<Utc>,
        client_name: &str,
    ) -> Self {
        Self {
            poll_token,
            login_token,
            created_at: truncate_to_seconds(created_at),
            client_name: client_name.to_string(),
            credentials: None,
        }
    }

    /// A flow with a fresh random token pair.
    pub fn generate(client_name: &str, created_at: DateTime<Utc>) -> Self {
        Self::new(
            PollToken::new_random(),
            LoginToken::new_random(),
            created_at,
            client_name,
        )
    }

    pub fn with_credentials(mut self, credentials: LoginFlowCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl From<NewLoginFlow> for LoginFlow {
    fn from(flow: NewLoginFlow) -> Self {
        LoginFlow {
            poll_token: flow.poll_token,
            login_token: flow.login_token,
            created_at: truncate_to_seconds(flow.created_at),
            client_name: flow.client_name,
            credentials: flow.credentials,
        }
    }
}

// Storage keeps whole seconds, so drop the fraction up front and let a stored
// record compare equal to the value that was inserted.
fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}
