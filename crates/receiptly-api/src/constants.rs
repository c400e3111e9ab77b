//! Route paths and cookie names shared by handlers and middleware

pub const SESSION_COOKIE_NAME: &str = "receiptly_session";

pub const AUTHORIZE_PATH: &str = "/authorize";
pub const CALLBACK_PATH: &str = "/callback";
pub const HOME_PATH: &str = "/";

/// Multipart framing allowance on top of the upload ceiling.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
