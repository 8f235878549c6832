//! Audit logging for authentication and authorization outcomes
//!
//! Every denial is recorded with the principal (when known), the
//! permission involved, and the outcome. Credential material never
//! enters this log.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::auth::role::{Permission, Role};
use crate::storage::revocation::RevocationReason;

/// Authentication and authorization events worth keeping
#[derive(Debug, Clone)]
pub enum AuditEvent {
    LoginSucceeded {
        user_id: String,
    },
    LoginFailed {
        username: String,
    },
    AccessDenied {
        user_id: Option<String>,
        permission: Option<Permission>,
        reason: String,
    },
    TokenRevoked {
        user_id: String,
        reason: RevocationReason,
    },
    RolesUpdated {
        user_id: String,
        by: String,
        roles: Vec<Role>,
    },
    UserDeactivated {
        user_id: String,
        by: String,
    },
    AdminProvisioned {
        user_id: String,
    },
    MaintenanceTriggered {
        user_id: String,
    },
}

/// Audit event with timestamp
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub event: AuditEvent,
    pub at: DateTime<Utc>,
}

/// Bounded in-memory audit trail.
///
/// Events are also mirrored to the process log so external collectors
/// see them without polling.
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(10000)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }

    /// Record an event
    pub async fn record(&self, event: AuditEvent) {
        match &event {
            AuditEvent::LoginSucceeded { user_id } => {
                log::info!("audit: login succeeded for user {}", user_id);
            }
            AuditEvent::LoginFailed { username } => {
                log::warn!("audit: login failed for username {}", username);
            }
            AuditEvent::AccessDenied {
                user_id,
                permission,
                reason,
            } => {
                log::warn!(
                    "audit: access denied (user: {}, permission: {}, reason: {})",
                    user_id.as_deref().unwrap_or("unknown"),
                    permission
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                    reason
                );
            }
            AuditEvent::TokenRevoked { user_id, reason } => {
                log::info!("audit: token revoked for user {} ({:?})", user_id, reason);
            }
            AuditEvent::RolesUpdated { user_id, by, roles } => {
                log::info!(
                    "audit: roles of user {} set to {:?} by {}",
                    user_id,
                    roles,
                    by
                );
            }
            AuditEvent::UserDeactivated { user_id, by } => {
                log::info!("audit: user {} deactivated by {}", user_id, by);
            }
            AuditEvent::AdminProvisioned { user_id } => {
                log::info!("audit: bootstrap admin provisioned as user {}", user_id);
            }
            AuditEvent::MaintenanceTriggered { user_id } => {
                log::info!("audit: maintenance triggered by user {}", user_id);
            }
        }

        let mut entries = self.entries.write().await;
        entries.push(AuditEntry {
            event,
            at: Utc::now(),
        });

        // Limit memory usage
        if entries.len() > self.max_entries {
            let overflow = entries.len() - self.max_entries;
            entries.drain(0..overflow);
        }
    }

    /// Most recent entries, newest last
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
