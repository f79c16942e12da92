//! Cache key derivation.

/// Key for a cached list response: `"<limit>:<offset>"`.
pub fn list_key(limit: usize, offset: usize) -> String {
    format!("{limit}:{offset}")
}
