//! Receiptly Storage Library
//!
//! This crate provides the storage abstraction for uploaded receipt files and
//! its local filesystem implementation.
//!
//! # Storage key format
//!
//! Every upload is stored under `receipts/{upload_id}-{filename}`, where the
//! filename has already been sanitized by the ingest layer. Distinct upload ids
//! keep concurrent uploads of identically named files from colliding.
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
