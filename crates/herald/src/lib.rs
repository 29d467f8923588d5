//! Herald relay backend library.
//!
//! The broker at the heart of Herald: authenticated WebSocket connections
//! bound to stable identities, ephemeral code-addressed rooms, and direct
//! command dispatch to a single agent.

pub mod api;
pub mod auth;
pub mod broker;
pub mod ws;
