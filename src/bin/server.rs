use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use aide_backend::auth::authenticator::Authenticator;
use aide_backend::auth::role::RoleRegistry;
use aide_backend::auth::token::TokenManager;
use aide_backend::audit::AuditLog;
use aide_backend::bootstrap::ensure_admin;
use aide_backend::config::ServerConfig;
use aide_backend::handlers::{self, gate};
use aide_backend::storage::memory::create_memory_user_store;
use aide_backend::storage::revocation::{MemoryTokenRevocationStore, SharedTokenRevocationStore};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    // Immutable role hierarchy, shared without synchronization
    let registry = Arc::new(RoleRegistry::builtin());
    let store = create_memory_user_store(registry);
    let tokens = Arc::new(TokenManager::new(&config.jwt_secret));
    let audit = Arc::new(AuditLog::new());

    let revocation_store = Arc::new(MemoryTokenRevocationStore::new());
    revocation_store.clone().start_cleanup_task();
    let revocations: SharedTokenRevocationStore = revocation_store;

    let authenticator = Arc::new(Authenticator::new(
        store.clone(),
        tokens.clone(),
        audit.clone(),
        config.token_ttl_hours,
    ));

    // Provision the first admin on a fresh deployment
    if let Err(e) = ensure_admin(&store, &audit, &config).await {
        error!("Failed to provision bootstrap admin: {}", e);
        std::process::exit(1);
    }

    let ctx = gate::AppContext {
        store,
        tokens,
        revocations,
        audit,
        authenticator,
    };

    let routes = handlers::routes(ctx).recover(gate::handle_rejection);

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting aide backend on {}", addr);

    if config.enable_tls {
        // Config validation guarantees both paths are present
        let cert_path = config.tls_cert_path.clone().unwrap_or_default();
        let key_path = config.tls_key_path.clone().unwrap_or_default();
        warp::serve(routes)
            .tls()
            .cert_path(cert_path)
            .key_path(key_path)
            .run(addr)
            .await;
    } else {
        warp::serve(routes).run(addr).await;
    }
}
