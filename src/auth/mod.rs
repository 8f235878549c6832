//! Authentication and authorization module

pub mod authenticator;
pub mod password;
pub mod role;
pub mod token;
pub mod user;

// Re-export main components
pub use authenticator::Authenticator;
pub use password::{hash_password, verify_password};
pub use role::{Permission, Role, RoleDefinition, RoleRegistry};
pub use token::{extract_bearer_token, Claims, TokenManager};
pub use user::{User, UserProfile};
