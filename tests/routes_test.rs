use std::sync::Arc;

use warp::http::StatusCode;
use warp::Filter;

use aide_backend::audit::AuditLog;
use aide_backend::auth::authenticator::Authenticator;
use aide_backend::auth::password::hash_password;
use aide_backend::auth::role::{Permission, Role, RoleRegistry};
use aide_backend::auth::token::TokenManager;
use aide_backend::handlers::{self, gate};
use aide_backend::handlers::gate::AppContext;
use aide_backend::storage::memory::create_memory_user_store;
use aide_backend::storage::revocation::create_memory_revocation_store;
use aide_backend::storage::traits::NewUser;

const ADMIN_PASSWORD: &str = "admin-suite-password";

/// Build a context seeded with one admin account
async fn context() -> AppContext {
    let store = create_memory_user_store(Arc::new(RoleRegistry::builtin()));
    let tokens = Arc::new(TokenManager::new("routes-suite-signing-key"));
    let audit = Arc::new(AuditLog::new());
    let authenticator = Arc::new(Authenticator::new(
        store.clone(),
        tokens.clone(),
        audit.clone(),
        24,
    ));

    store
        .create_user(NewUser {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            roles: vec![Role::Admin],
        })
        .await
        .unwrap();

    AppContext {
        store,
        tokens,
        revocations: create_memory_revocation_store(),
        audit,
        authenticator,
    }
}

async fn seed_user(ctx: &AppContext, username: &str, password: &str, roles: Vec<Role>) {
    ctx.store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(password).unwrap(),
            roles,
        })
        .await
        .unwrap();
}

/// Shortcut past the login route for tests that only need a bearer token
async fn token_for(ctx: &AppContext, username: &str, password: &str) -> String {
    let user = ctx
        .authenticator
        .authenticate(username, password)
        .await
        .unwrap()
        .expect("test credentials should authenticate");
    ctx.authenticator.issue_token(&user).unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn test_health_is_unauthenticated() {
    let ctx = context().await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let resp = warp::test::request().path("/health").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_returns_bearer_token_and_profile() {
    let ctx = context().await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .json(&serde_json::json!({"username": "admin", "password": ADMIN_PASSWORD}))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().unwrap().contains('.'));
    assert_eq!(body["user"]["username"], "admin");
    // The password hash must never leave the store
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_failures_share_one_response_shape() {
    let ctx = context().await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let wrong_password = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .json(&serde_json::json!({"username": "admin", "password": "wrong"}))
        .reply(&api)
        .await;
    let unknown_user = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .json(&serde_json::json!({"username": "nobody", "password": "wrong"}))
        .reply(&api)
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body(), unknown_user.body());
}

#[tokio::test]
async fn test_me_requires_a_valid_token() {
    let ctx = context().await;
    let token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let missing = warp::test::request().path("/api/users/me").reply(&api).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = warp::test::request()
        .path("/api/users/me")
        .header("authorization", "Bearer not.a.token")
        .reply(&api)
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let ok = warp::test::request()
        .path("/api/users/me")
        .header("authorization", bearer(&token))
        .reply(&api)
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(ok.body()).unwrap();
    assert_eq!(body["username"], "admin");
}

#[tokio::test]
async fn test_register_is_gated_by_manage_users() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let user_token = token_for(&ctx, "plain", "plain-password-1").await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let payload = serde_json::json!({
        "username": "newbie",
        "email": "newbie@example.com",
        "password": "newbie-password",
        "roles": ["user"]
    });

    let anonymous = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .json(&payload)
        .reply(&api)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forbidden = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .header("authorization", bearer(&user_token))
        .json(&payload)
        .reply(&api)
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_slice(forbidden.body()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("manage_users"));

    let created = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .header("authorization", bearer(&admin_token))
        .json(&payload)
        .reply(&api)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: serde_json::Value = serde_json::from_slice(created.body()).unwrap();
    assert_eq!(body["username"], "newbie");
    assert!(body.get("password_hash").is_none());

    // Same username again conflicts
    let duplicate = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .header("authorization", bearer(&admin_token))
        .json(&payload)
        .reply(&api)
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_requires_view_users() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    seed_user(&ctx, "manager", "manager-password", vec![Role::Manager]).await;
    let manager_token = token_for(&ctx, "manager", "manager-password").await;
    let user_token = token_for(&ctx, "plain", "plain-password-1").await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let forbidden = warp::test::request()
        .path("/api/users")
        .header("authorization", bearer(&user_token))
        .reply(&api)
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let all = warp::test::request()
        .path("/api/users?skip=0&limit=10")
        .header("authorization", bearer(&manager_token))
        .reply(&api)
        .await;
    assert_eq!(all.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(all.body()).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 3);

    let admins_only = warp::test::request()
        .path("/api/users?role=admin")
        .header("authorization", bearer(&manager_token))
        .reply(&api)
        .await;
    let body: serde_json::Value = serde_json::from_slice(admins_only.body()).unwrap();
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["username"], "admin");
}

#[tokio::test]
async fn test_role_update_takes_effect_on_next_token() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let old_token = token_for(&ctx, "plain", "plain-password-1").await;
    let plain_id = ctx
        .store
        .find_by_username("plain")
        .await
        .unwrap()
        .unwrap()
        .id;
    let ctx_clone = ctx.clone();
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let promoted = warp::test::request()
        .method("PUT")
        .path(&format!("/api/users/{}", plain_id))
        .header("authorization", bearer(&admin_token))
        .json(&serde_json::json!({"roles": ["admin"]}))
        .reply(&api)
        .await;
    assert_eq!(promoted.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(promoted.body()).unwrap();
    assert!(body["permissions"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("manage_users")));

    // The token issued before the promotion still carries the old
    // snapshot: registering with it stays forbidden.
    let with_old_token = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .header("authorization", bearer(&old_token))
        .json(&serde_json::json!({
            "username": "x", "email": "x@example.com",
            "password": "x-password-123", "roles": ["user"]
        }))
        .reply(&api)
        .await;
    assert_eq!(with_old_token.status(), StatusCode::FORBIDDEN);

    // A freshly issued token picks up the new permissions
    let new_token = token_for(&ctx_clone, "plain", "plain-password-1").await;
    let with_new_token = warp::test::request()
        .method("POST")
        .path("/api/auth/register")
        .header("authorization", bearer(&new_token))
        .json(&serde_json::json!({
            "username": "x", "email": "x@example.com",
            "password": "x-password-123", "roles": ["user"]
        }))
        .reply(&api)
        .await;
    assert_eq!(with_new_token.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_metadata_update_preserves_permissions() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let plain_id = ctx
        .store
        .find_by_username("plain")
        .await
        .unwrap()
        .unwrap()
        .id;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let resp = warp::test::request()
        .method("PUT")
        .path(&format!("/api/users/{}", plain_id))
        .header("authorization", bearer(&admin_token))
        .json(&serde_json::json!({"metadata": {"locale": "fr"}}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["metadata"]["locale"], "fr");
    assert_eq!(body["roles"], serde_json::json!(["user"]));
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let ctx = context().await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let admin_id = ctx
        .store
        .find_by_username("admin")
        .await
        .unwrap()
        .unwrap()
        .id;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let resp = warp::test::request()
        .method("PUT")
        .path(&format!("/api/users/{}", admin_id))
        .header("authorization", bearer(&admin_token))
        .json(&serde_json::json!({}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivation_locks_out_existing_tokens() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let user_token = token_for(&ctx, "plain", "plain-password-1").await;
    let plain_id = ctx
        .store
        .find_by_username("plain")
        .await
        .unwrap()
        .unwrap()
        .id;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let removed = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/users/{}", plain_id))
        .header("authorization", bearer(&admin_token))
        .reply(&api)
        .await;
    assert_eq!(removed.status(), StatusCode::OK);

    // The still-unexpired token is refused because the gate re-checks
    // the active flag against the store.
    let after = warp::test::request()
        .path("/api/users/me")
        .header("authorization", bearer(&user_token))
        .reply(&api)
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivating_unknown_user_is_not_found() {
    let ctx = context().await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let resp = warp::test::request()
        .method("DELETE")
        .path("/api/users/no-such-id")
        .header("authorization", bearer(&admin_token))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_revokes_the_presented_token() {
    let ctx = context().await;
    let token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    let logout = warp::test::request()
        .method("POST")
        .path("/api/auth/logout")
        .header("authorization", bearer(&token))
        .reply(&api)
        .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after = warp::test::request()
        .path("/api/users/me")
        .header("authorization", bearer(&token))
        .reply(&api)
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_system_routes_use_distinct_permissions() {
    let ctx = context().await;
    seed_user(&ctx, "manager", "manager-password", vec![Role::Manager]).await;
    let admin_token = token_for(&ctx, "admin", ADMIN_PASSWORD).await;
    let manager_token = token_for(&ctx, "manager", "manager-password").await;
    let api = handlers::routes(ctx).recover(gate::handle_rejection);

    // view_system: manager inherits it
    let status = warp::test::request()
        .path("/api/system/status")
        .header("authorization", bearer(&manager_token))
        .reply(&api)
        .await;
    assert_eq!(status.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(status.body()).unwrap();
    assert_eq!(body["status"], "healthy");

    // manage_system: admin only
    let denied = warp::test::request()
        .method("POST")
        .path("/api/system/maintenance")
        .header("authorization", bearer(&manager_token))
        .reply(&api)
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = warp::test::request()
        .method("POST")
        .path("/api/system/maintenance")
        .header("authorization", bearer(&admin_token))
        .reply(&api)
        .await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_gate_composes_over_any_permission() {
    let ctx = context().await;
    seed_user(&ctx, "plain", "plain-password-1", vec![Role::User]).await;
    seed_user(&ctx, "visitor", "visitor-password", vec![Role::Guest]).await;
    let user_token = token_for(&ctx, "plain", "plain-password-1").await;
    let guest_token = token_for(&ctx, "visitor", "visitor-password").await;

    // A feature endpoint declares exactly one permission and composes
    // the gate into its registration, the way vendor-facing routes do.
    let assistant = warp::path!("api" / "assistant" / "command")
        .and(warp::post())
        .and(gate::require_permission(&ctx, Permission::UseAi))
        .map(|_principal| warp::reply::json(&serde_json::json!({"status": "accepted"})));
    let api = assistant.recover(gate::handle_rejection);

    let allowed = warp::test::request()
        .method("POST")
        .path("/api/assistant/command")
        .header("authorization", bearer(&user_token))
        .reply(&api)
        .await;
    assert_eq!(allowed.status(), StatusCode::OK);

    let denied = warp::test::request()
        .method("POST")
        .path("/api/assistant/command")
        .header("authorization", bearer(&guest_token))
        .reply(&api)
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_slice(denied.body()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("use_ai"));
}
