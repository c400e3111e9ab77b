//! Session/auth gate: the OAuth2 handshake with the ledger service and the
//! middleware guarding pipeline routes.

pub mod handshake;
pub mod middleware;
