//! Core functionality for loginflow
//!
//! This crate contains the login flow record types, the [`Clock`] abstraction,
//! the error taxonomy and the [`LoginFlowService`] that enforces lifetimes on
//! top of any [`LoginFlowRepository`].
//!
//! Storage backends depend on this crate and implement
//! [`LoginFlowRepositoryProvider`]. Application code normally goes through the
//! `loginflow` facade crate instead.
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod flow;
pub mod repositories;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LOGIN_FLOW_LIFETIME_SECS, LoginFlowConfig};
pub use error::{Error, LoginFlowError};
pub use flow::{LoginFlow, LoginFlowCredentials, LoginToken, NewLoginFlow, PollToken};
pub use repositories::{LoginFlowRepository, LoginFlowRepositoryProvider};
pub use services::LoginFlowService;
