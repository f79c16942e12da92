//! Static API-key authentication.

use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiAuthError {
    #[error("missing api key")]
    Missing,
    #[error("invalid api key")]
    Invalid,
}

/// The single key every request to the post routes must present.
#[derive(Clone)]
pub struct StaticApiKey {
    secret: String,
}

impl StaticApiKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compare `presented` against the configured key in constant time.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), ApiAuthError> {
        let presented = presented.ok_or(ApiAuthError::Missing)?;
        if presented.is_empty() {
            return Err(ApiAuthError::Missing);
        }
        if self.secret.as_bytes().ct_eq(presented.as_bytes()).unwrap_u8() == 0 {
            return Err(ApiAuthError::Invalid);
        }
        Ok(())
    }
}

impl std::fmt::Debug for StaticApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticApiKey")
            .field("secret", &"<redacted>")
            .finish()
    }
}
