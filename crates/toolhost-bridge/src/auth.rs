//! Challenge-response proof for the bridge handshake.
//!
//! The token never leaves the `Authorization` header; the challenge is
//! answered with a digest of the challenge and the session identity.

use sha2::{Digest, Sha256};
use toolhost_core::BridgeCredential;

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `sha256_hex("{userId}:{tokenVersion}:{issuedAt}")`.
pub fn session_id(credential: &BridgeCredential) -> String {
    sha256_hex(&format!(
        "{}:{}:{}",
        credential.user_id, credential.token_version, credential.issued_at
    ))
}

/// `sha256_hex(challenge || userId || sessionId)`.
pub fn challenge_response(challenge: &str, credential: &BridgeCredential) -> String {
    let session = session_id(credential);
    sha256_hex(&format!("{challenge}{}{session}", credential.user_id))
}
