use serde::{Deserialize, Serialize};

/// Signed token payload. Only the account email is embedded; `iat`/`exp` are
/// unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// The caller behind a validated bearer token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    #[serde(default)]
    pub expires_at: i64,
}

impl From<Claims> for Principal {
    fn from(c: Claims) -> Self {
        Principal { email: c.email, expires_at: c.exp }
    }
}
