//! Receiptly Services Library
//!
//! External capabilities used by the receipt pipeline, each behind a trait so
//! the pipeline can be exercised without network access:
//!
//! - [`VisionClient`]: given receipt bytes and a prompt, return the model's raw text.
//! - [`LedgerClient`]: OAuth2 handshake and the shared-expense REST surface.

pub mod ledger;
pub mod vision;

pub use ledger::{
    resolve_category_id, Category, LedgerClient, LedgerError, LedgerGroup, LedgerUser,
    SplitwiseClient,
};
pub use vision::{OpenAiVisionClient, VisionClient, VisionError, VisionRequest};
