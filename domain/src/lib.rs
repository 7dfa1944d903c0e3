//! Zoom integration for office-hours scheduling.
//!
//! Built on `meeting-auth`: this crate stores credentials in user profiles, runs
//! the consent callback, talks to the Zoom REST API and provisions meetings for
//! assignments. `web` depends on this crate only, never on `meeting-auth` directly.

pub mod credential;
pub mod error;
pub mod gateway;
pub mod meeting;
pub mod oauth_token_storage;
pub mod profile;
pub mod zoom_connection;

pub use profile::{Id, UserRef};
pub use secrecy::{ExposeSecret, SecretString};
