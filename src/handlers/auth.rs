//! Registration, login, and logout handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::audit::AuditEvent;
use crate::auth::password::hash_password;
use crate::auth::role::Role;
use crate::auth::user::UserProfile;
use crate::error::AideError;
use crate::handlers::gate::{reject, AppContext, Principal};
use crate::storage::revocation::{token_digest, RevocationReason, RevokedToken};
use crate::storage::traits::NewUser;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

fn validate_registration(request: &RegisterRequest) -> Result<(), AideError> {
    if request.username.trim().is_empty() {
        return Err(AideError::ValidationError("username is required".to_string()));
    }
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(AideError::ValidationError(
            "a valid email is required".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(AideError::ValidationError(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/auth/register (requires manage_users)
pub async fn register(
    _principal: Principal,
    request: RegisterRequest,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    validate_registration(&request).map_err(reject)?;

    // Argon2 hashing is deliberately slow; keep it off the event loop
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| reject(AideError::AuthError(format!("hashing task failed: {}", e))))?
        .map_err(reject)?;

    let user = ctx
        .store
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            roles: request.roles,
        })
        .await
        .map_err(reject)?;

    log::info!("user {} registered with roles {:?}", user.id, user.roles);
    Ok(warp::reply::with_status(
        warp::reply::json(&user.profile()),
        StatusCode::CREATED,
    ))
}

/// POST /api/auth/login
pub async fn login(request: LoginRequest, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let user = ctx
        .authenticator
        .authenticate(&request.username, &request.password)
        .await
        .map_err(reject)?;

    // One uniform denial for unknown username, wrong password, and
    // inactive account; nothing here may leak which case occurred.
    let user = user.ok_or_else(|| reject(AideError::Unauthorized))?;

    let access_token = ctx.authenticator.issue_token(&user).map_err(reject)?;

    Ok(warp::reply::json(&LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: user.profile(),
    }))
}

/// POST /api/auth/logout (any authenticated user)
pub async fn logout(principal: Principal, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let expires_at = DateTime::<Utc>::from_timestamp(principal.claims.exp as i64, 0)
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(24));

    ctx.revocations
        .revoke(RevokedToken {
            digest: token_digest(&principal.token),
            user_id: principal.user.id.clone(),
            revoked_at: Utc::now(),
            expires_at,
            reason: RevocationReason::UserLogout,
        })
        .await
        .map_err(reject)?;

    ctx.audit
        .record(AuditEvent::TokenRevoked {
            user_id: principal.user.id.clone(),
            reason: RevocationReason::UserLogout,
        })
        .await;

    Ok(warp::reply::json(&StatusResponse {
        status: "logged out".to_string(),
    }))
}
