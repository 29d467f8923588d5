//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum length for an HS256 secret before we complain.
const MIN_SECRET_LEN: usize = 32;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("auth.jwt_secret is not configured")]
    MissingJwtSecret,

    #[error("auth.jwt_secret references {0}, which is not set")]
    UnresolvedEnvVar(String),

    #[error("auth.jwt_secret is too short ({0} chars, need at least {MIN_SECRET_LEN})")]
    SecretTooShort(usize),
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret for token verification. Supports `env:VAR_NAME`
    /// indirection so the secret itself stays out of the config file.
    pub jwt_secret: Option<String>,

    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl AuthConfig {
    /// Resolve `env:VAR_NAME` syntax in the configured secret.
    ///
    /// Returns the resolved secret, or `None` when no indirection is used.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        let Some(ref secret) = self.jwt_secret else {
            return Ok(None);
        };
        let Some(var_name) = secret.strip_prefix("env:") else {
            return Ok(None);
        };
        std::env::var(var_name)
            .map(Some)
            .map_err(|_| ConfigValidationError::UnresolvedEnvVar(var_name.to_string()))
    }

    /// Check the configuration is usable for serving.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = match self.resolve_jwt_secret()? {
            Some(resolved) => resolved,
            None => self
                .jwt_secret
                .clone()
                .ok_or(ConfigValidationError::MissingJwtSecret)?,
        };

        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::SecretTooShort(secret.len()));
        }

        Ok(())
    }
}
