//! In-memory user store for development, testing, and single-node
//! deployments
//!
//! All user state lives behind one `RwLock` so that a role change and
//! its permission recompute land in a single atomic update.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::role::{Role, RoleRegistry};
use crate::auth::user::User;
use crate::error::{AideError, Result};
use crate::storage::traits::{NewUser, SharedUserStore, UserStore};

// TODO: wire a persistent backend (sea-orm or sqlx) behind UserStore
// once deployments outgrow a single process.

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    by_username: HashMap<String, String>,
    by_email: HashMap<String, String>,
    /// Creation order, for deterministic listing
    insertion_order: Vec<String>,
}

/// In-memory user store
pub struct MemoryUserStore {
    state: RwLock<MemoryState>,
    registry: Arc<RoleRegistry>,
}

impl MemoryUserStore {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            registry,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.by_username.contains_key(&new_user.username) {
            return Err(AideError::Conflict(format!(
                "username {} already exists",
                new_user.username
            )));
        }
        if state.by_email.contains_key(&new_user.email) {
            return Err(AideError::Conflict(format!(
                "email {} already exists",
                new_user.email
            )));
        }

        let permissions = self.registry.resolve(&new_user.roles);
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            roles: new_user.roles,
            permissions,
            active: true,
            created_at: Utc::now(),
            last_login: None,
            metadata: HashMap::new(),
        };

        state
            .by_username
            .insert(user.username.clone(), user.id.clone());
        state.by_email.insert(user.email.clone(), user.id.clone());
        state.insertion_order.push(user.id.clone());
        state.users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        if let Some(id) = state.by_username.get(username) {
            Ok(state.users.get(id).cloned())
        } else {
            Ok(None)
        }
    }

    async fn update_roles(&self, id: &str, roles: Vec<Role>) -> Result<User> {
        // Permissions are recomputed under the same write lock as the
        // role change; no reader can observe one without the other.
        let permissions = self.registry.resolve(&roles);

        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AideError::NotFound(format!("user {}", id)))?;

        user.roles = roles;
        user.permissions = permissions;
        Ok(user.clone())
    }

    async fn update_metadata(
        &self,
        id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AideError::NotFound(format!("user {}", id)))?;

        user.metadata = metadata;
        Ok(user.clone())
    }

    async fn deactivate(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AideError::NotFound(format!("user {}", id)))?;

        user.active = false;
        Ok(())
    }

    async fn list_users(
        &self,
        skip: usize,
        limit: usize,
        role: Option<Role>,
    ) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let users = state
            .insertion_order
            .iter()
            .filter_map(|id| state.users.get(id))
            .filter(|user| role.map_or(true, |r| user.roles.contains(&r)))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();
        Ok(users)
    }

    async fn record_login(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AideError::NotFound(format!("user {}", id)))?;

        user.last_login = Some(Utc::now());
        Ok(())
    }
}

/// Create a new memory-backed user store
pub fn create_memory_user_store(registry: Arc<RoleRegistry>) -> SharedUserStore {
    Arc::new(MemoryUserStore::new(registry))
}
