//! Receiptly API Library
//!
//! This crate provides the HTTP handlers, session and auth middleware, the
//! receipt pipeline services, and application setup.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod services;
pub mod session;
pub mod setup;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use state::AppState;
