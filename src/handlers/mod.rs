//! Request handlers and route composition

pub mod auth;
pub mod gate;
pub mod system;
pub mod users;

use warp::{Filter, Rejection, Reply};

use crate::auth::role::Permission;
use crate::handlers::gate::{require_authenticated, require_permission, with_context, AppContext};

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(16 * 1024).and(warp::body::json())
}

/// Assemble the full API route tree.
///
/// Callers append `.recover(gate::handle_rejection)` so denials render
/// as the JSON replies the API promises.
pub fn routes(ctx: AppContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let register = warp::path!("api" / "auth" / "register")
        .and(warp::post())
        .and(require_permission(&ctx, Permission::ManageUsers))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(auth::register);

    let login = warp::path!("api" / "auth" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(auth::login);

    let logout = warp::path!("api" / "auth" / "logout")
        .and(warp::post())
        .and(require_authenticated(&ctx))
        .and(with_context(ctx.clone()))
        .and_then(auth::logout);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(require_authenticated(&ctx))
        .and_then(users::me);

    let list_users = warp::path!("api" / "users")
        .and(warp::get())
        .and(require_permission(&ctx, Permission::ViewUsers))
        .and(warp::query::<users::ListUsersQuery>())
        .and(with_context(ctx.clone()))
        .and_then(users::list);

    let update_user = warp::path!("api" / "users" / String)
        .and(warp::put())
        .and(require_permission(&ctx, Permission::ManageUsers))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(users::update);

    let deactivate_user = warp::path!("api" / "users" / String)
        .and(warp::delete())
        .and(require_permission(&ctx, Permission::ManageUsers))
        .and(with_context(ctx.clone()))
        .and_then(users::deactivate);

    let system_status = warp::path!("api" / "system" / "status")
        .and(warp::get())
        .and(require_permission(&ctx, Permission::ViewSystem))
        .and_then(system::status);

    let system_maintenance = warp::path!("api" / "system" / "maintenance")
        .and(warp::post())
        .and(require_permission(&ctx, Permission::ManageSystem))
        .and(with_context(ctx.clone()))
        .and_then(system::maintenance);

    let health = warp::path!("health").and(warp::get()).map(|| "OK");

    register
        .or(login)
        .or(logout)
        .or(me)
        .or(list_users)
        .or(update_user)
        .or(deactivate_user)
        .or(system_status)
        .or(system_maintenance)
        .or(health)
}
