//! bloom-core
//!
//! Pure domain types, validation and filtering rules, and document key
//! conventions. No store or identity-provider dependency; this is the shared
//! vocabulary of the nutri bloom client.

pub mod doc_keys;
pub mod error;
pub mod filter;
pub mod ids;
pub mod models;
pub mod validation;
