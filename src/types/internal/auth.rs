use serde::{Deserialize, Serialize};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,

    /// Role name checked against the permission oracle
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID
    #[serde(default)]
    pub jti: Option<String>,
}
