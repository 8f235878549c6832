//! Security utilities for the authentication path

pub mod timing;

pub use timing::{add_auth_delay, AuthTimer};
