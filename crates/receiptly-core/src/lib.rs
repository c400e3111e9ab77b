//! Receiptly Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared by every Receiptly component: the receipt record and its
//! best-effort parsing, pending submissions, equal-split arithmetic, and
//! session credential states.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ReceiptlyConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
