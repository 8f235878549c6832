//! Authorization gate
//!
//! The single enforcement point for every protected route. Each
//! request walks Unauthenticated -> TokenPresented -> ClaimsValid ->
//! PermissionChecked and ends Allowed or Denied; no route implements
//! its own ad hoc check.

use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::audit::{AuditEvent, AuditLog};
use crate::auth::authenticator::Authenticator;
use crate::auth::role::Permission;
use crate::auth::token::{extract_bearer_token, Claims, TokenManager};
use crate::auth::user::User;
use crate::constants::MAX_TOKEN_LENGTH;
use crate::error::AideError;
use crate::storage::revocation::{token_digest, SharedTokenRevocationStore};
use crate::storage::traits::SharedUserStore;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppContext {
    pub store: SharedUserStore,
    pub tokens: Arc<TokenManager>,
    pub revocations: SharedTokenRevocationStore,
    pub audit: Arc<AuditLog>,
    pub authenticator: Arc<Authenticator>,
}

/// The authenticated caller attached to a request once the gate has
/// let it through
pub struct Principal {
    /// Fresh user record from the store
    pub user: User,
    /// Claims exactly as embedded in the presented token
    pub claims: Claims,
    /// The raw bearer token, kept for logout/revocation
    pub token: String,
}

/// Domain error carried through warp's rejection machinery
#[derive(Debug)]
pub struct ApiReject(pub AideError);

impl warp::reject::Reject for ApiReject {}

/// Wrap a domain error as a rejection
pub fn reject(err: AideError) -> Rejection {
    warp::reject::custom(ApiReject(err))
}

/// Injects the application context into a filter chain
pub fn with_context(
    ctx: AppContext,
) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Gate requiring a valid token and one specific permission
pub fn require_permission(
    ctx: &AppContext,
    required: Permission,
) -> impl Filter<Extract = (Principal,), Error = Rejection> + Clone {
    gate(ctx.clone(), Some(required))
}

/// Gate requiring only a valid token (any authenticated user)
pub fn require_authenticated(
    ctx: &AppContext,
) -> impl Filter<Extract = (Principal,), Error = Rejection> + Clone {
    gate(ctx.clone(), None)
}

fn gate(
    ctx: AppContext,
    required: Option<Permission>,
) -> impl Filter<Extract = (Principal,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let ctx = ctx.clone();
        async move {
            match authorize(&ctx, header.as_deref(), required).await {
                Ok(principal) => Ok(principal),
                Err(e) => Err(reject(e)),
            }
        }
    })
}

/// Resolve and check the caller.
///
/// The permission check runs against the claims' snapshot, preserving
/// the documented staleness window for grants; the active flag is
/// re-checked against the store so deactivation takes effect
/// immediately.
async fn authorize(
    ctx: &AppContext,
    auth_header: Option<&str>,
    required: Option<Permission>,
) -> crate::error::Result<Principal> {
    let token = match auth_header.and_then(extract_bearer_token) {
        Some(token) => token,
        None => {
            ctx.audit
                .record(AuditEvent::AccessDenied {
                    user_id: None,
                    permission: required,
                    reason: "missing bearer token".to_string(),
                })
                .await;
            return Err(AideError::Unauthorized);
        }
    };

    // Cheap sanity limits before any cryptographic work
    if token.len() > MAX_TOKEN_LENGTH || token.chars().any(|c| c.is_control()) {
        return Err(AideError::InvalidToken);
    }

    let claims = match ctx.tokens.validate(&token) {
        Ok(claims) => claims,
        Err(e) => {
            ctx.audit
                .record(AuditEvent::AccessDenied {
                    user_id: None,
                    permission: required,
                    reason: e.to_string(),
                })
                .await;
            return Err(e);
        }
    };

    if ctx.revocations.is_revoked(&token_digest(&token)).await? {
        ctx.audit
            .record(AuditEvent::AccessDenied {
                user_id: Some(claims.sub.clone()),
                permission: required,
                reason: "token revoked".to_string(),
            })
            .await;
        return Err(AideError::Unauthorized);
    }

    let user = match ctx.store.find_by_id(&claims.sub).await? {
        Some(user) => user,
        None => {
            ctx.audit
                .record(AuditEvent::AccessDenied {
                    user_id: Some(claims.sub.clone()),
                    permission: required,
                    reason: "unknown principal".to_string(),
                })
                .await;
            return Err(AideError::Unauthorized);
        }
    };

    if !user.active {
        ctx.audit
            .record(AuditEvent::AccessDenied {
                user_id: Some(user.id.clone()),
                permission: required,
                reason: "inactive account".to_string(),
            })
            .await;
        return Err(AideError::InactiveAccount);
    }

    if let Some(permission) = required {
        if !claims.has_permission(permission) {
            ctx.audit
                .record(AuditEvent::AccessDenied {
                    user_id: Some(user.id.clone()),
                    permission: Some(permission),
                    reason: "permission missing from token".to_string(),
                })
                .await;
            return Err(AideError::Forbidden(permission));
        }
    }

    Ok(Principal {
        user,
        claims,
        token,
    })
}

/// Error body shape shared by every denial
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn status_for(err: &AideError) -> StatusCode {
    match err {
        AideError::Conflict(_) | AideError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AideError::NotFound(_) => StatusCode::NOT_FOUND,
        AideError::Unauthorized
        | AideError::TokenExpired
        | AideError::InvalidToken
        | AideError::InactiveAccount => StatusCode::UNAUTHORIZED,
        AideError::Forbidden(_) => StatusCode::FORBIDDEN,
        AideError::AuthError(_) | AideError::StorageError(_) | AideError::ConfigError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Translate rejections into the JSON error replies the API promises
pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, message) = if let Some(ApiReject(domain_err)) = err.find::<ApiReject>() {
        (status_for(domain_err), domain_err.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, body_err.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        log::error!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse { error: message }),
        status,
    ))
}
