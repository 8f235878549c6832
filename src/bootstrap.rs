//! First-run provisioning
//!
//! A fresh deployment has no accounts, and registration itself
//! requires `manage_users`; the startup path therefore provisions one
//! admin when none exists.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::audit::{AuditEvent, AuditLog};
use crate::auth::password::hash_password;
use crate::auth::role::Role;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::storage::traits::{NewUser, SharedUserStore};

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Provision the initial admin account if no admin exists yet.
///
/// Uses the configured admin credentials; when no password is
/// configured, a random one is generated and written to the log once.
/// The generated password is a one-time bootstrap credential: set
/// AIDE_ADMIN_PASSWORD, or log in and rotate it, before exposing the
/// service.
pub async fn ensure_admin(
    store: &SharedUserStore,
    audit: &AuditLog,
    config: &ServerConfig,
) -> Result<Option<String>> {
    let existing = store.list_users(0, 1, Some(Role::Admin)).await?;
    if !existing.is_empty() {
        return Ok(None);
    }

    let password = match &config.admin_password {
        Some(password) => password.clone(),
        None => {
            let generated = generate_password();
            log::warn!(
                "no AIDE_ADMIN_PASSWORD configured; generated one-time password for '{}': {}",
                config.admin_username,
                generated
            );
            generated
        }
    };

    let password_hash = hash_password(&password)?;
    let user = store
        .create_user(NewUser {
            username: config.admin_username.clone(),
            email: config.admin_email.clone(),
            password_hash,
            roles: vec![Role::Admin],
        })
        .await?;

    audit
        .record(AuditEvent::AdminProvisioned {
            user_id: user.id.clone(),
        })
        .await;
    log::info!(
        "bootstrap admin '{}' provisioned as user {}",
        user.username,
        user.id
    );

    Ok(Some(user.id))
}
