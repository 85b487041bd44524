//! # aegis_core
//!
//! Core domain logic for Aegis: session/token lifecycle and revocation,
//! cache-aside profile reads, and counter-based rate limiting. All state
//! lives in the injected credential store and cache; this crate holds no
//! module-level mutable state.

pub mod cache;
pub mod clock;
pub mod error;
pub mod migrate;
pub mod models;
pub mod password;
pub mod profile;
pub mod ratelimit;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
