//! OAuth token management with storage and refresh capabilities.

mod manager;
mod storage;
mod tokens;

pub use manager::Manager;
pub use storage::Storage;
pub use tokens::{RefreshResult, TokenPair, Tokens};
