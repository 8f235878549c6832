// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

// Session token configuration constants
pub const DEFAULT_TOKEN_TTL_HOURS: usize = 24;
pub const MAX_TOKEN_LENGTH: usize = 1000;

// Authentication timing floor (milliseconds)
pub const MIN_AUTH_DURATION_MS: u64 = 100;

// User listing pagination default
pub const DEFAULT_LIST_LIMIT: usize = 100;

// Revocation list maintenance interval (seconds)
pub const REVOCATION_CLEANUP_INTERVAL_SECS: u64 = 3600;
