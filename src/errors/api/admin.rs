use crate::errors::internal::{AuditError, InternalError};
use poem_openapi::{ApiResponse, Object, payload::Json};
use std::fmt;

/// Standardized error response for admin endpoints
#[derive(Object, Debug)]
pub struct AdminErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Offending input field, for validation failures
    #[oai(skip_serializing_if_is_none)]
    pub field: Option<String>,

    /// HTTP status code
    pub status_code: u16,
}

/// Admin operation error types
#[derive(ApiResponse, Debug)]
pub enum AdminError {
    /// Malformed filter, date, enum or body field
    #[oai(status = 400)]
    ValidationFailed(Json<AdminErrorResponse>),

    /// Missing, invalid or expired bearer token
    #[oai(status = 401)]
    Unauthorized(Json<AdminErrorResponse>),

    /// Authenticated actor lacks the required permission
    #[oai(status = 403)]
    PermissionDenied(Json<AdminErrorResponse>),

    /// A security guard (CSRF, IP allowlist) rejected the request
    #[oai(status = 403)]
    SecurityDenied(Json<AdminErrorResponse>),

    /// Requested record does not exist
    #[oai(status = 404)]
    NotFound(Json<AdminErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<AdminErrorResponse>),
}

impl AdminError {
    fn body(error: &str, message: String, field: Option<String>, status_code: u16) -> Json<AdminErrorResponse> {
        Json(AdminErrorResponse {
            error: error.to_string(),
            message,
            field,
            status_code,
        })
    }

    /// Create a ValidationFailed error naming the offending field
    pub fn validation_failed(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Invalid {}: {}", field, message.into());
        AdminError::ValidationFailed(Self::body("validation_failed", message, Some(field), 400))
    }

    /// Create an Unauthorized error
    pub fn unauthorized() -> Self {
        AdminError::Unauthorized(Self::body(
            "unauthorized",
            "Valid bearer token required".to_string(),
            None,
            401,
        ))
    }

    /// Create a PermissionDenied error for the named permission
    pub fn permission_denied(permission: &str) -> Self {
        AdminError::PermissionDenied(Self::body(
            "permission_denied",
            format!("Permission required: {}", permission),
            None,
            403,
        ))
    }

    /// Create a SecurityDenied error for a missing, spent or foreign CSRF token
    pub fn csrf_rejected() -> Self {
        AdminError::SecurityDenied(Self::body(
            "csrf_rejected",
            "Missing or invalid CSRF token".to_string(),
            None,
            403,
        ))
    }

    /// Create a SecurityDenied error for a source address outside the allowlist
    pub fn ip_not_allowed() -> Self {
        AdminError::SecurityDenied(Self::body(
            "ip_not_allowed",
            "Source address is not on the admin allowlist".to_string(),
            None,
            403,
        ))
    }

    /// Create a NotFound error
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        AdminError::NotFound(Self::body(
            "not_found",
            format!("{} not found: {}", resource, id),
            None,
            404,
        ))
    }

    /// Create a generic internal server error
    pub fn internal_server_error() -> Self {
        AdminError::InternalError(Self::body(
            "internal_error",
            "An internal error occurred".to_string(),
            None,
            500,
        ))
    }

    /// Convert InternalError to AdminError
    ///
    /// This is the explicit conversion point from internal errors to API errors.
    /// Internal error details are logged but not exposed to clients.
    pub fn from_internal_error(err: InternalError) -> Self {
        match &err {
            InternalError::Validation { field, message } => {
                Self::validation_failed(field.clone(), message.clone())
            }
            InternalError::Database(_) => {
                tracing::error!("Database error: {}", err);
                Self::internal_server_error()
            }
            InternalError::Parse { value_type, .. } => {
                tracing::error!("Parse error for {}: {}", value_type, err);
                Self::internal_server_error()
            }
            InternalError::Crypto { operation, .. } => {
                tracing::error!("Crypto error in {}: {}", operation, err);
                Self::internal_server_error()
            }
            InternalError::Audit(AuditError::ExportFailed(_)) => {
                tracing::error!("Audit export aborted: {}", err);
                Self::internal_server_error()
            }
            InternalError::Audit(_) => {
                tracing::error!("Audit error: {}", err);
                Self::internal_server_error()
            }
        }
    }

    fn response(&self) -> &AdminErrorResponse {
        match self {
            AdminError::ValidationFailed(json)
            | AdminError::Unauthorized(json)
            | AdminError::PermissionDenied(json)
            | AdminError::SecurityDenied(json)
            | AdminError::NotFound(json)
            | AdminError::InternalError(json) => &json.0,
        }
    }

    /// Human-readable message carried by this error
    pub fn message(&self) -> &str {
        &self.response().message
    }

    /// HTTP status code carried by this error
    pub fn status_code(&self) -> u16 {
        self.response().status_code
    }
}

impl From<InternalError> for AdminError {
    fn from(err: InternalError) -> Self {
        Self::from_internal_error(err)
    }
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.status_code())
    }
}
