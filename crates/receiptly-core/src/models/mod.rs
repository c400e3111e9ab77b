//! Data models for the receipt pipeline
//!
//! Each sub-module represents one stage of the pipeline: the uploaded file,
//! the extracted receipt, the pending submission awaiting confirmation, the
//! ledger expense, and the session's authorization state.

mod expense;
mod receipt;
mod session;
mod submission;
mod upload;

pub use expense::*;
pub use receipt::*;
pub use session::*;
pub use submission::*;
pub use upload::*;
