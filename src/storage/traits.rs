//! Abstract storage interfaces for pluggable backends
//!
//! The credential store is the one stateful collaborator of the access
//! control core; everything else treats user records as opaque values
//! behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::role::Role;
use crate::auth::user::User;
use crate::error::Result;

/// Input for creating a user account.
///
/// Callers hash the password before constructing this; the store never
/// sees plaintext credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// User credential storage interface.
///
/// Implementations must support concurrent reads and keep each user's
/// role list and derived permission snapshot consistent: a reader must
/// never observe new roles with stale permissions or vice versa.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user; `Conflict` when the username or email is taken.
    /// The permission snapshot is derived from the roles at creation.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Get user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Get user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Replace a user's roles, recomputing the permission snapshot in
    /// the same atomic update
    async fn update_roles(&self, id: &str, roles: Vec<Role>) -> Result<User>;

    /// Replace a user's metadata; roles and permissions are untouched
    async fn update_metadata(
        &self,
        id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<User>;

    /// Soft-delete: marks the account inactive, preserving the record
    /// for audit history
    async fn deactivate(&self, id: &str) -> Result<()>;

    /// List users with offset pagination, optionally filtered to those
    /// holding a role. Ordering is insertion (creation) order.
    async fn list_users(&self, skip: usize, limit: usize, role: Option<Role>)
        -> Result<Vec<User>>;

    /// Update the last-login timestamp after a successful authentication
    async fn record_login(&self, id: &str) -> Result<()>;
}

/// Shared reference to a user store
pub type SharedUserStore = Arc<dyn UserStore>;
