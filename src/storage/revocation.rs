//! Token revocation storage
//!
//! Session tokens are stateless, so deactivation alone cannot recall a
//! token already in the wild. Logout and administrative revocation
//! denylist the token's digest until its natural expiry; the gate
//! consults this list on every request.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::constants::REVOCATION_CLEANUP_INTERVAL_SECS;
use crate::error::Result;

/// Digest of a bearer token, safe to store and log.
/// Raw tokens never enter the revocation list.
pub fn token_digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Information about a revoked token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// SHA-256 digest of the token
    pub digest: String,
    /// User ID who owned the token
    pub user_id: String,
    /// When the token was revoked
    pub revoked_at: DateTime<Utc>,
    /// When the original token expires (for cleanup)
    pub expires_at: DateTime<Utc>,
    /// Reason for revocation
    pub reason: RevocationReason,
}

/// Reason for token revocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    /// User initiated logout
    UserLogout,
    /// Administrative action
    AdminRevocation,
    /// Security incident detected
    SecurityIncident,
}

/// Token revocation storage trait
#[async_trait]
pub trait TokenRevocationStore: Send + Sync {
    /// Add a token digest to the revocation list
    async fn revoke(&self, revoked: RevokedToken) -> Result<()>;

    /// Check whether a token digest has been revoked
    async fn is_revoked(&self, digest: &str) -> Result<bool>;

    /// Drop revocation entries whose tokens have expired anyway
    async fn cleanup_expired(&self) -> Result<usize>;
}

/// Shared reference to a token revocation store
pub type SharedTokenRevocationStore = Arc<dyn TokenRevocationStore>;

/// In-memory implementation of the revocation list
pub struct MemoryTokenRevocationStore {
    revoked: RwLock<HashMap<String, RevokedToken>>,
}

impl MemoryTokenRevocationStore {
    pub fn new() -> Self {
        Self {
            revoked: RwLock::new(HashMap::new()),
        }
    }

    /// Start the hourly background cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        let store = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                REVOCATION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                if let Err(e) = store.cleanup_expired().await {
                    log::error!("Failed to cleanup expired token revocations: {}", e);
                }
            }
        });
    }
}

impl Default for MemoryTokenRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRevocationStore for MemoryTokenRevocationStore {
    async fn revoke(&self, revoked: RevokedToken) -> Result<()> {
        let mut entries = self.revoked.write().await;
        log::info!(
            "Token revoked for user {} (reason: {:?})",
            revoked.user_id,
            revoked.reason
        );
        entries.insert(revoked.digest.clone(), revoked);
        Ok(())
    }

    async fn is_revoked(&self, digest: &str) -> Result<bool> {
        let entries = self.revoked.read().await;
        Ok(entries.contains_key(digest))
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.revoked.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();

        if removed > 0 {
            log::info!("Cleaned up {} expired token revocations", removed);
        }
        Ok(removed)
    }
}

/// Create a new memory-based token revocation store
pub fn create_memory_revocation_store() -> SharedTokenRevocationStore {
    Arc::new(MemoryTokenRevocationStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(digest: &str, expires_in: Duration) -> RevokedToken {
        RevokedToken {
            digest: digest.to_string(),
            user_id: "user1".to_string(),
            revoked_at: Utc::now(),
            expires_at: Utc::now() + expires_in,
            reason: RevocationReason::UserLogout,
        }
    }

    #[tokio::test]
    async fn test_revoked_token_is_found() {
        let store = MemoryTokenRevocationStore::new();
        store.revoke(entry("d1", Duration::hours(24))).await.unwrap();

        assert!(store.is_revoked("d1").await.unwrap());
        assert!(!store.is_revoked("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_drops_only_expired_entries() {
        let store = MemoryTokenRevocationStore::new();
        store.revoke(entry("live", Duration::hours(1))).await.unwrap();
        store.revoke(entry("dead", Duration::hours(-1))).await.unwrap();

        let removed = store.cleanup_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_revoked("live").await.unwrap());
        assert!(!store.is_revoked("dead").await.unwrap());
    }

    #[test]
    fn test_token_digest_is_stable_and_opaque() {
        let digest = token_digest("some.bearer.token");
        assert_eq!(digest, token_digest("some.bearer.token"));
        assert_ne!(digest, token_digest("other.bearer.token"));
        assert!(!digest.contains("bearer"));
    }
}
