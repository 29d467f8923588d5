//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::broker::Broker;

/// Application state shared across handlers.
///
/// The broker is the single shared mutable component; one instance per
/// server, injected here rather than living in any global.
#[derive(Clone)]
pub struct AppState {
    /// The connection broker.
    pub broker: Arc<Broker>,
    /// Authentication state.
    pub auth: AuthState,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, auth: AuthState) -> Self {
        Self { broker, auth }
    }
}
