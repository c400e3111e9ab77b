//! Receipt pipeline services
//!
//! Each service owns one step; [`PipelineController`] sequences them per
//! session.

pub mod catalog;
pub mod extraction;
pub mod ingest;
pub mod pipeline;
pub mod retention;
pub mod submission;

pub use catalog::CatalogService;
pub use extraction::ExtractionService;
pub use ingest::IngestService;
pub use pipeline::{ExtractedReceipt, PipelineController};
pub use retention::{RetentionReport, RetentionSweeper};
pub use submission::SubmissionService;
