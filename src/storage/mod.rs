//! Storage backends for user credentials and token revocations

pub mod memory;
pub mod revocation;
pub mod traits;

pub use memory::{create_memory_user_store, MemoryUserStore};
pub use revocation::{
    create_memory_revocation_store, token_digest, MemoryTokenRevocationStore, RevocationReason,
    RevokedToken, SharedTokenRevocationStore, TokenRevocationStore,
};
pub use traits::{NewUser, SharedUserStore, UserStore};
