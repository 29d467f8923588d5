//! WebSocket entry point for agent and web-client connections.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Web clients / Agent processes                │
//! │  - One WebSocket connection per identity                     │
//! │  - Send ClientFrame (join_room, broadcast)                   │
//! │  - Receive ServerFrame (broadcasts, acks, dispatched cmds)   │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ WebSocket (credential at upgrade)
//! ┌───────────────────────────▼──────────────────────────────────┐
//! │                          Broker                              │
//! │  - identity -> connection registry (one entry per identity)  │
//! │  - room code -> member set directory                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod handler;

pub use handler::ws_handler;
