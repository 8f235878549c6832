//! User identity records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::role::{Permission, Role};

/// A persisted user account.
///
/// The `permissions` field is a cached snapshot derived from `roles`;
/// the store recomputes it with every role change and it is never
/// edited independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier assigned by the store
    pub id: String,
    pub username: String,
    pub email: String,
    /// Salted one-way hash; plaintext is never stored or logged
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Wire representation of the account, with the password hash
    /// stripped. Every API response goes through this.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            active: self.active,
            created_at: self.created_at,
            last_login: self.last_login,
            metadata: self.metadata.clone(),
        }
    }
}

/// User account as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            username: "casey".to_string(),
            email: "casey@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            roles: vec![Role::User],
            permissions: vec![Permission::UseAi, Permission::ReadData],
            active: true,
            created_at: Utc::now(),
            last_login: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_has_permission() {
        let user = sample_user();
        assert!(user.has_permission(Permission::UseAi));
        assert!(!user.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = sample_user();
        let encoded = serde_json::to_value(user.profile()).unwrap();
        assert!(encoded.get("password_hash").is_none());
        assert_eq!(encoded["username"], "casey");
    }
}
