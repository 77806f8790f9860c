use chrono::{DateTime, Utc};
use poem_openapi::Object;

use crate::services::IssuedCsrfToken;

/// A freshly issued anti-forgery token
#[derive(Object, Debug)]
pub struct CsrfTokenResponse {
    /// Send back in the `X-CSRF-Token` header on the next state-changing request
    pub token: String,

    /// Seconds until the token expires
    pub expires_in: i64,

    pub expires_at: DateTime<Utc>,
}

impl From<IssuedCsrfToken> for CsrfTokenResponse {
    fn from(issued: IssuedCsrfToken) -> Self {
        Self {
            token: issued.token,
            expires_in: issued.expires_in,
            expires_at: issued.expires_at,
        }
    }
}
