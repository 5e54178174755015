//! Bridge credentials from the environment.

use async_trait::async_trait;
use toolhost_core::{BridgeCredential, CredentialError, TokenProvider};

pub const TOKEN_ENV: &str = "TOOLHOST_BRIDGE_TOKEN";
pub const USER_ID_ENV: &str = "TOOLHOST_BRIDGE_USER_ID";
pub const TOKEN_VERSION_ENV: &str = "TOOLHOST_BRIDGE_TOKEN_VERSION";
pub const ISSUED_AT_ENV: &str = "TOOLHOST_BRIDGE_ISSUED_AT";

/// Reads the bridge credential from `TOOLHOST_BRIDGE_*` variables on every
/// connection attempt, so a rotated token is picked up on reconnect.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvTokenProvider;

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn credential(&self) -> Result<BridgeCredential, CredentialError> {
        credential_from(|key| std::env::var(key).ok())
    }
}

/// Build a credential from a variable lookup.
pub fn credential_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BridgeCredential, CredentialError> {
    let required = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CredentialError::Unavailable(format!("{key} is not set")))
    };

    let token = required(TOKEN_ENV)?;
    let user_id = required(USER_ID_ENV)?;
    let token_version = required(TOKEN_VERSION_ENV)?
        .trim()
        .parse::<u64>()
        .map_err(|e| CredentialError::Invalid(format!("{TOKEN_VERSION_ENV}: {e}")))?;
    let issued_at = required(ISSUED_AT_ENV)?
        .trim()
        .parse::<i64>()
        .map_err(|e| CredentialError::Invalid(format!("{ISSUED_AT_ENV}: {e}")))?;

    Ok(BridgeCredential {
        token,
        user_id,
        token_version,
        issued_at,
    })
}
