//! Canonical wire types for the Herald relay protocol.
//!
//! This crate defines the message formats spoken on a relay WebSocket:
//!
//! ```text
//! Web client / Agent <--[WS: client frames / server frames]--> Herald broker
//! ```
//!
//! Agents and web clients send [`ClientFrame`]s; the broker answers with
//! [`ServerFrame`]s. Commands pushed through the direct-dispatch HTTP seam
//! are forwarded verbatim as raw JSON, so the server side of the protocol
//! is serialize-only: consumers parse frames as plain JSON values.

pub mod frames;

pub use frames::{ClientFrame, Delivery, ServerFrame};
