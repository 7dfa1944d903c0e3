//! OAuth client credentials.
//!
//! The client identity is built once from configuration and shared read-only.

mod identity;

pub use identity::ClientIdentity;
