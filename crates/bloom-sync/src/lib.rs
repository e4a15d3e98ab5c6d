//! bloom-sync
//!
//! Merges a store's live change stream with locally pending writes into one
//! ordered, client-visible collection per owner.

pub mod error;
pub mod synchronizer;
pub mod view;
