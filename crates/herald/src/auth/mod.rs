//! Authentication module.
//!
//! Validates the bearer credential presented at connection time and binds
//! the connection to a stable identity. Verification is JWT with a shared
//! HS256 secret; every failure collapses into [`AuthError`] and refuses the
//! connection — there are no partial trust states.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware};
