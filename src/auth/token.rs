use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::role::{Permission, Role};
use crate::auth::user::User;
use crate::error::{AideError, Result};

/// JWT Claims structure.
///
/// Roles and permissions are a snapshot taken at issuance; grants made
/// after issuance only show up in tokens issued later. This staleness
/// window is deliberate and bounded by the token TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Roles held at issuance
    pub roles: Vec<Role>,
    /// Derived permissions at issuance
    pub permissions: Vec<Permission>,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    pub iat: usize,
    /// Not before (as UTC timestamp)
    pub nbf: usize,
}

impl Claims {
    /// Creates claims for a user with the given lifetime
    pub fn for_user(user: &User, ttl_hours: usize) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs() as usize;

        Self {
            sub: user.id.clone(),
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
            exp: now + ttl_hours * 3600,
            iat: now,
            nbf: now,
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs() as usize;

        now > self.exp
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Manages session token operations.
///
/// The signing key is process-wide configuration; rotating it
/// invalidates every outstanding token.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenManager {
    /// Creates a new token manager with a secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Signs the given claims into a bearer token
    pub fn issue(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AideError::AuthError(format!("Failed to generate token: {}", e)))
    }

    /// Validates a token and returns its claims.
    ///
    /// Purely CPU-bound; never consults the store, so embedded claims
    /// are trusted as issued.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AideError::TokenExpired),
                _ => Err(AideError::InvalidToken),
            },
        }
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_user() -> User {
        User {
            id: "user123".to_string(),
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password_hash: String::new(),
            roles: vec![Role::User],
            permissions: vec![Permission::UseAi, Permission::ReadData],
            active: true,
            created_at: Utc::now(),
            last_login: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let manager = TokenManager::new("test-signing-key");
        let claims = Claims::for_user(&sample_user(), 24);

        let token = manager.issue(&claims).unwrap();
        assert!(!token.is_empty());

        let decoded = manager.validate(&token).unwrap();
        assert_eq!(decoded.sub, "user123");
        assert_eq!(decoded.roles, vec![Role::User]);
        assert!(decoded.has_permission(Permission::UseAi));
        assert!(!decoded.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let manager = TokenManager::new("test-signing-key");
        let result = manager.validate("invalid.token.here");
        assert!(matches!(result, Err(AideError::InvalidToken)));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let manager = TokenManager::new("test-signing-key");
        let other = TokenManager::new("different-signing-key");

        let claims = Claims::for_user(&sample_user(), 24);
        let token = manager.issue(&claims).unwrap();

        assert!(matches!(other.validate(&token), Err(AideError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let manager = TokenManager::new("test-signing-key");

        let mut claims = Claims::for_user(&sample_user(), 24);
        claims.exp = claims.iat - 7200; // 2 hours ago, beyond validation leeway
        assert!(claims.is_expired());

        let token = manager.issue(&claims).unwrap();
        assert!(matches!(manager.validate(&token), Err(AideError::TokenExpired)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token("Bearer abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token(""), None);
    }
}
