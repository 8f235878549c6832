//! System status and maintenance handlers

use serde::Serialize;
use warp::{Rejection, Reply};

use crate::audit::AuditEvent;
use crate::handlers::gate::{AppContext, Principal};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub status: String,
    pub version: String,
    pub services: SystemServices,
}

#[derive(Debug, Serialize)]
pub struct SystemServices {
    pub access_control: String,
    pub credential_store: String,
    pub token_revocation: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// GET /api/system/status (requires view_system)
pub async fn status(_principal: Principal) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&SystemStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: SystemServices {
            access_control: "running".to_string(),
            credential_store: "running".to_string(),
            token_revocation: "running".to_string(),
        },
    }))
}

/// POST /api/system/maintenance (requires manage_system)
pub async fn maintenance(principal: Principal, ctx: AppContext) -> Result<impl Reply, Rejection> {
    ctx.audit
        .record(AuditEvent::MaintenanceTriggered {
            user_id: principal.user.id.clone(),
        })
        .await;
    log::info!("maintenance scheduled by {}", principal.user.id);

    Ok(warp::reply::json(&StatusResponse {
        status: "maintenance scheduled".to_string(),
    }))
}
