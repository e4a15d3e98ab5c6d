//! bloom-client
//!
//! The client-side core of nutri bloom: goal and recipe lifecycles on top of
//! the synchronized collections, wired to the signed-in session.

pub mod aws;
pub mod client;
pub mod config;
pub mod error;
pub mod goals;
pub mod recipes;
pub mod telemetry;
