//! Server configuration module
//! Handles dynamic configuration parameters for the assistant backend

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOKEN_TTL_HOURS};
use crate::error::{AideError, Result};
use std::env;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for session token signing/validation.
    /// Rotating this invalidates every outstanding token.
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub token_ttl_hours: usize,
    /// Username for the bootstrap admin account
    pub admin_username: String,
    /// Email for the bootstrap admin account
    pub admin_email: String,
    /// Password for the bootstrap admin account; a random one is
    /// generated when unset and an admin must be provisioned
    pub admin_password: Option<String>,
    /// TLS configuration
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// Enable TLS
    pub enable_tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: Only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: "test-jwt-1-only-for-unit-suites-never-in-production".to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            admin_username: "admin".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: None,
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }

    /// Validate that the JWT secret meets security requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(AideError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "INSECURE-DEFAULT-FOR-TESTING-ONLY",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(AideError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        // Ensure some complexity
        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AideError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols) for security".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("AIDE_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("AIDE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let jwt_secret = env::var("AIDE_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                AideError::ConfigError(
                    "JWT_SECRET environment variable is required for security. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;

        let token_ttl_hours = env::var("AIDE_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        let admin_username =
            env::var("AIDE_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_email =
            env::var("AIDE_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let admin_password = env::var("AIDE_ADMIN_PASSWORD").ok();

        // TLS configuration
        let enable_tls = env::var("AIDE_ENABLE_TLS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let tls_cert_path = env::var("AIDE_TLS_CERT_PATH").ok();
        let tls_key_path = env::var("AIDE_TLS_KEY_PATH").ok();

        // Validate TLS configuration if enabled
        if enable_tls {
            if tls_cert_path.is_none() || tls_key_path.is_none() {
                return Err(AideError::ConfigError(
                    "TLS is enabled but AIDE_TLS_CERT_PATH or AIDE_TLS_KEY_PATH is not set"
                        .to_string(),
                ));
            }

            if let (Some(ref cert_path), Some(ref key_path)) = (&tls_cert_path, &tls_key_path) {
                if !std::path::Path::new(cert_path).exists() {
                    return Err(AideError::ConfigError(format!(
                        "TLS certificate file does not exist: {}",
                        cert_path
                    )));
                }
                if !std::path::Path::new(key_path).exists() {
                    return Err(AideError::ConfigError(format!(
                        "TLS private key file does not exist: {}",
                        key_path
                    )));
                }
            }
        }

        Self::validate_jwt_secret(&jwt_secret)?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            admin_username,
            admin_email,
            admin_password,
            tls_cert_path,
            tls_key_path,
            enable_tls,
        })
    }
}
