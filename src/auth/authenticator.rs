//! Credential verification and session issuance

use std::sync::Arc;

use crate::audit::{AuditEvent, AuditLog};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{Claims, TokenManager};
use crate::auth::user::User;
use crate::error::{AideError, Result};
use crate::security::AuthTimer;
use crate::storage::traits::SharedUserStore;

/// Verifies credentials against the store and issues session tokens
pub struct Authenticator {
    store: SharedUserStore,
    tokens: Arc<TokenManager>,
    audit: Arc<AuditLog>,
    token_ttl_hours: usize,
}

impl Authenticator {
    pub fn new(
        store: SharedUserStore,
        tokens: Arc<TokenManager>,
        audit: Arc<AuditLog>,
        token_ttl_hours: usize,
    ) -> Self {
        Self {
            store,
            tokens,
            audit,
            token_ttl_hours,
        }
    }

    /// Verify a username/password pair.
    ///
    /// Fails closed: unknown username, wrong password, and inactive
    /// account all come back as `None` with the same shape. An Argon2
    /// computation runs on every path and a minimum-duration timer
    /// pads the result, so callers cannot tell the cases apart by
    /// timing. Verification runs on a blocking worker thread so one
    /// slow login never stalls unrelated traffic.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let timer = AuthTimer::standard();

        let user = self.store.find_by_username(username).await?;

        let verified = match &user {
            Some(user) => {
                let hash = user.password_hash.clone();
                let password = password.to_string();
                let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                    .await
                    .map_err(|e| {
                        AideError::AuthError(format!("password verification task failed: {}", e))
                    })?;

                match outcome {
                    Ok(matched) => matched,
                    Err(e) => {
                        // A malformed stored hash must not open the account
                        log::error!("stored password hash rejected for {}: {}", username, e);
                        false
                    }
                }
            }
            None => {
                // Unknown username: burn an equivalent Argon2 computation
                // so the two failure cases cost the same.
                let password = password.to_string();
                let _ = tokio::task::spawn_blocking(move || hash_password(&password)).await;
                false
            }
        };

        let outcome = match user {
            Some(user) if verified && user.active => {
                // Last-login is stamped only after verification completes,
                // so an abandoned attempt commits nothing.
                self.store.record_login(&user.id).await?;
                self.audit
                    .record(AuditEvent::LoginSucceeded {
                        user_id: user.id.clone(),
                    })
                    .await;
                self.store.find_by_id(&user.id).await?
            }
            _ => {
                self.audit
                    .record(AuditEvent::LoginFailed {
                        username: username.to_string(),
                    })
                    .await;
                None
            }
        };

        timer.wait().await;
        Ok(outcome)
    }

    /// Issue a session token embedding the user's current role and
    /// permission snapshot
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let claims = Claims::for_user(user, self.token_ttl_hours);
        self.tokens.issue(&claims)
    }
}
