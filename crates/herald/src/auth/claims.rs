//! JWT claims.

use serde::{Deserialize, Serialize};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// User's email.
    #[serde(default)]
    pub email: Option<String>,

    /// User's name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Claims {
    /// The stable identity string a connection is keyed by.
    ///
    /// Agent installations register under the account email when the token
    /// carries one; `sub` is the fallback for tokens minted without it.
    pub fn identity(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.sub)
    }

    /// Display name for log lines.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_claims() -> Claims {
        Claims {
            sub: "usr_1".to_string(),
            exp: 0,
            iat: None,
            email: None,
            name: None,
        }
    }

    #[test]
    fn test_identity_prefers_email() {
        let claims = Claims {
            email: Some("alice@example.com".to_string()),
            ..base_claims()
        };
        assert_eq!(claims.identity(), "alice@example.com");
    }

    #[test]
    fn test_identity_falls_back_to_sub() {
        assert_eq!(base_claims().identity(), "usr_1");
    }

    #[test]
    fn test_display_name_precedence() {
        let claims = Claims {
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
            ..base_claims()
        };
        assert_eq!(claims.display_name(), "Alice");

        let claims = Claims {
            email: Some("alice@example.com".to_string()),
            ..base_claims()
        };
        assert_eq!(claims.display_name(), "alice@example.com");

        assert_eq!(base_claims().display_name(), "usr_1");
    }
}
