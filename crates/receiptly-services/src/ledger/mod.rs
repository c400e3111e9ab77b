//! Ledger capability: OAuth2 handshake plus the shared-expense API

mod splitwise;

pub use splitwise::SplitwiseClient;

use async_trait::async_trait;
use receiptly_core::models::{ExpenseRequest, GroupMember};
use receiptly_core::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Request(String),

    /// The access token was rejected; the session must re-authorize.
    #[error("ledger rejected the access token: {0}")]
    Unauthorized(String),

    #[error("ledger API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request was accepted at the HTTP level but refused by the ledger.
    #[error("ledger refused the request: {0}")]
    Rejected(String),

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Mapping for ledger reads; submissions map failures to `SubmissionFailed`.
impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unauthorized(_) => AppError::NotAuthenticated,
            other => AppError::LedgerUnavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

/// A flattened expense category; subcategories are named "Parent / Child".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// URL of the identity provider's consent page.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, LedgerError>;

    async fn current_user(&self, access_token: &str) -> Result<LedgerUser, LedgerError>;

    async fn groups(&self, access_token: &str) -> Result<Vec<LedgerGroup>, LedgerError>;

    /// Current members of a group, the authenticated user included.
    async fn group_members(
        &self,
        access_token: &str,
        group_id: i64,
    ) -> Result<Vec<GroupMember>, LedgerError>;

    async fn categories(&self, access_token: &str) -> Result<Vec<Category>, LedgerError>;

    /// Create the expense with the request's shares as computed, and return
    /// its ledger id. Never retried.
    async fn create_expense(
        &self,
        access_token: &str,
        request: &ExpenseRequest,
    ) -> Result<String, LedgerError>;

    async fn attach_receipt(
        &self,
        access_token: &str,
        expense_id: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), LedgerError>;
}

/// Resolve a category name to its id: exact match first, then the first
/// category whose name contains `name`, ignoring case.
pub fn resolve_category_id(categories: &[Category], name: &str) -> Option<i64> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    categories
        .iter()
        .find(|c| c.name.to_lowercase() == needle)
        .or_else(|| {
            categories
                .iter()
                .find(|c| c.name.to_lowercase().contains(&needle))
        })
        .map(|c| c.id)
}
