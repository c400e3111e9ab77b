//! Signed session cookie
//!
//! Cookie value format: `<session_id>.<hmac>` where the HMAC-SHA256 over the
//! session id is keyed with `SESSION_SECRET` and hex encoded.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::SessionId;
use crate::constants::SESSION_COOKIE_NAME;

type HmacSha256 = Hmac<Sha256>;

const SESSION_ID_BYTES: usize = 16;

#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
    secure: bool,
}

impl CookieSigner {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            secure,
        }
    }

    fn signature(&self, session_id: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(session_id.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Signed cookie value for a session id.
    pub fn sign(&self, session_id: &SessionId) -> Option<String> {
        let signature = self.signature(session_id.as_str())?;
        Some(format!("{}.{}", session_id.as_str(), signature))
    }

    /// Session id carried by a cookie value, if its signature checks out.
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (session_id, signature) = value.split_once('.')?;
        if session_id.len() != SESSION_ID_BYTES * 2
            || !session_id.chars().all(|c| c.is_ascii_hexdigit())
        {
            return None;
        }

        let expected = self.signature(session_id)?;
        let valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        valid.then(|| SessionId(session_id.to_string()))
    }

    /// `Set-Cookie` header value for a session.
    pub fn set_cookie_header(&self, session_id: &SessionId) -> Option<String> {
        let value = self.sign(session_id)?;
        let mut header = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE_NAME, value
        );
        if self.secure {
            header.push_str("; Secure");
        }
        Some(header)
    }
}

/// A fresh random session id.
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..SESSION_ID_BYTES).map(|_| rng.random()).collect();
    SessionId(hex::encode(bytes))
}

/// Value of the session cookie from a `Cookie` header.
pub fn find_session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME).then_some(value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-min-32-characters-long";

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new(SECRET, false);
        let id = generate_session_id();
        let value = signer.sign(&id).unwrap();
        assert_eq!(signer.verify(&value), Some(id));
    }

    #[test]
    fn test_tampered_or_foreign_cookie_rejected() {
        let signer = CookieSigner::new(SECRET, false);
        let id = generate_session_id();
        let value = signer.sign(&id).unwrap();

        let other = CookieSigner::new("another-secret-key-min-32-characters", false);
        assert!(other.verify(&value).is_none());

        let forged = format!("{}.{}", "0".repeat(32), value.split_once('.').unwrap().1);
        assert!(signer.verify(&forged).is_none());
        assert!(signer.verify("not-a-cookie").is_none());
        assert!(signer.verify("").is_none());
    }

    #[test]
    fn test_set_cookie_attributes() {
        let id = generate_session_id();
        let header = CookieSigner::new(SECRET, false)
            .set_cookie_header(&id)
            .unwrap();
        assert!(header.starts_with("receiptly_session="));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(!header.contains("Secure"));

        let header = CookieSigner::new(SECRET, true)
            .set_cookie_header(&id)
            .unwrap();
        assert!(header.ends_with("; Secure"));
    }

    #[test]
    fn test_find_session_cookie() {
        assert_eq!(
            find_session_cookie("theme=dark; receiptly_session=abc.def; other=1"),
            Some("abc.def")
        );
        assert_eq!(find_session_cookie("theme=dark"), None);
    }
}
