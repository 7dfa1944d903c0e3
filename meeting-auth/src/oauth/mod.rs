//! OAuth 2.0 authentication infrastructure.
//!
//! Provides OAuth 2.0 authorization code flows for video meeting platforms.

mod provider;
mod state;

pub mod providers;
pub mod token;

pub use provider::{Provider, ProviderKind};
pub use state::{StateData, StateManager};
