//! User management handlers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use warp::{Rejection, Reply};

use crate::audit::AuditEvent;
use crate::auth::role::Role;
use crate::auth::user::UserProfile;
use crate::constants::DEFAULT_LIST_LIMIT;
use crate::error::AideError;
use crate::handlers::gate::{reject, AppContext, Principal};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub roles: Option<Vec<Role>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// GET /api/users/me (any authenticated user)
pub async fn me(principal: Principal) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&principal.user.profile()))
}

/// GET /api/users (requires view_users)
pub async fn list(
    _principal: Principal,
    query: ListUsersQuery,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    let users = ctx
        .store
        .list_users(
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            query.role,
        )
        .await
        .map_err(reject)?;

    let profiles: Vec<UserProfile> = users.iter().map(|user| user.profile()).collect();
    Ok(warp::reply::json(&profiles))
}

/// PUT /api/users/{id} (requires manage_users)
pub async fn update(
    id: String,
    principal: Principal,
    request: UpdateUserRequest,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    if request.roles.is_none() && request.metadata.is_none() {
        return Err(reject(AideError::ValidationError(
            "nothing to update: provide roles or metadata".to_string(),
        )));
    }

    let mut updated = None;

    if let Some(roles) = request.roles {
        let user = ctx
            .store
            .update_roles(&id, roles.clone())
            .await
            .map_err(reject)?;
        ctx.audit
            .record(AuditEvent::RolesUpdated {
                user_id: user.id.clone(),
                by: principal.user.id.clone(),
                roles,
            })
            .await;
        updated = Some(user);
    }

    if let Some(metadata) = request.metadata {
        let user = ctx
            .store
            .update_metadata(&id, metadata)
            .await
            .map_err(reject)?;
        updated = Some(user);
    }

    // At least one branch ran; both return the freshest record
    let user = updated.ok_or_else(|| reject(AideError::NotFound(format!("user {}", id))))?;
    Ok(warp::reply::json(&user.profile()))
}

/// DELETE /api/users/{id} (requires manage_users)
pub async fn deactivate(
    id: String,
    principal: Principal,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    ctx.store.deactivate(&id).await.map_err(reject)?;

    ctx.audit
        .record(AuditEvent::UserDeactivated {
            user_id: id,
            by: principal.user.id.clone(),
        })
        .await;

    Ok(warp::reply::json(&StatusResponse {
        status: "success".to_string(),
    }))
}
