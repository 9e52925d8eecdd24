//! Expiring key/value cache entry

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    /// Absolute expiry in epoch ms; `None` never expires
    pub expires_at: Option<i64>,
    pub updated_at: i64,
}

impl CacheEntry {
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}
