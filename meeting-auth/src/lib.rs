//! # meeting-auth
//!
//! OAuth 2.0 foundation for attaching video meetings to office-hours sessions:
//! - Client identity and HTTP Basic client authentication
//! - OAuth provider trait and the Zoom token endpoint client
//! - Token types, storage seam and a per-user refresh manager
//! - CSRF state management for the consent redirect
//! - Authenticated HTTP client building with retry middleware
//!
//! ## Architecture
//!
//! This crate never persists anything itself. The `domain` crate implements
//! [`oauth::token::Storage`] over the user profile store and drives the flows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_auth::{
//!     credentials::ClientIdentity,
//!     oauth::{providers::zoom, token::{Manager, Storage}},
//!     http::AuthenticatedClientBuilder,
//! };
//! ```

pub mod credentials;
pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
