//! Service layer for business logic
//!
//! Services wrap repositories with the rules that storage does not know about,
//! such as lifetimes and lazy expiry.

pub mod login_flow;

pub use login_flow::LoginFlowService;
