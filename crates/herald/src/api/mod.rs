//! HTTP API module.
//!
//! The broker's outward seams: the WebSocket upgrade, the direct-dispatch
//! endpoint the command path consumes, and read-only diagnostics.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
