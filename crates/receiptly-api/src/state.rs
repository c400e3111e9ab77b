//! Application state shared by handlers and middleware.

use receiptly_core::Config;

use crate::auth::handshake::AuthHandshake;
use crate::services::{CatalogService, PipelineController};
use crate::session::{CookieSigner, SessionStore};

/// Session store plus the signer for the session cookie.
#[derive(Clone)]
pub struct SessionState {
    pub store: SessionStore,
    pub signer: CookieSigner,
}

pub struct AppState {
    pub config: Config,
    pub session: SessionState,
    pub auth: AuthHandshake,
    pub pipeline: PipelineController,
    pub catalog: CatalogService,
}
