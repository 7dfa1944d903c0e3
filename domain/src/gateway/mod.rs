//! Clients for third-party meeting APIs.

pub mod zoom;
