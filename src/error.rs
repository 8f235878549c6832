use std::error::Error;
use std::fmt;

use crate::auth::role::Permission;

#[derive(Debug)]
pub enum AideError {
    // Store errors
    Conflict(String),
    NotFound(String),
    StorageError(String),

    // Auth errors
    AuthError(String),
    Unauthorized,
    TokenExpired,
    InvalidToken,
    InactiveAccount,
    Forbidden(Permission),

    // Validation errors
    ValidationError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for AideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(what) => write!(f, "Conflict: {}", what),
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::InactiveAccount => write!(f, "Account is inactive"),
            Self::Forbidden(permission) => {
                write!(f, "Forbidden: permission {} required", permission)
            }
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for AideError {}

// Generic result type for the backend
pub type Result<T> = std::result::Result<T, AideError>;
