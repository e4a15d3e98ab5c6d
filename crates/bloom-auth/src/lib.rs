//! bloom-auth
//!
//! Identity provider contract, session observation, and the Cognito adapter.

pub mod cognito;
pub mod error;
pub mod provider;
pub mod session;
