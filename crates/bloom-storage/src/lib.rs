//! bloom-storage
//!
//! Document store contract plus two backends: an in-process store and an
//! S3-backed store that polls for changes.

pub mod documents;
pub mod error;
pub mod memory;
pub mod objects;
pub mod s3;
pub mod store;
