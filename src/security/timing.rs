//! Timing attack protection utilities
//!
//! Authentication outcomes must not be distinguishable by response
//! time; these helpers enforce a minimum duration on the auth path.

use std::time::{Duration, Instant};

use crate::constants::MIN_AUTH_DURATION_MS;

/// Add artificial delay to prevent timing analysis
/// This ensures authentication failures take a minimum amount of time
pub async fn add_auth_delay(start_time: Instant, min_duration: Duration) {
    let elapsed = start_time.elapsed();
    if elapsed < min_duration {
        tokio::time::sleep(min_duration - elapsed).await;
    }
}

/// Authentication timing helper
pub struct AuthTimer {
    start: Instant,
    min_duration: Duration,
}

impl AuthTimer {
    /// Create a new auth timer with minimum duration
    pub fn new(min_duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            min_duration,
        }
    }

    /// Create with the configured minimum auth duration
    pub fn standard() -> Self {
        Self::new(Duration::from_millis(MIN_AUTH_DURATION_MS))
    }

    /// Wait until minimum duration has elapsed
    pub async fn wait(self) {
        add_auth_delay(self.start, self.min_duration).await;
    }
}
