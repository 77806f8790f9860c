use chrono::Utc;
use poem_openapi::{OpenApi, Tags, payload::Json};
use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::types::dto::common::HealthResponse;

/// Health check API
pub struct HealthApi {
    audit_recorder: Arc<AuditRecorder>,
}

impl HealthApi {
    pub fn new(audit_recorder: Arc<AuditRecorder>) -> Self {
        Self { audit_recorder }
    }
}

/// API tags for health endpoints
#[derive(Tags)]
enum ApiTags {
    /// Health check endpoints
    Health,
}

#[OpenApi]
impl HealthApi {
    /// Health check endpoint
    ///
    /// Returns the current status of the API service
    #[oai(path = "/health", method = "get", tag = "ApiTags::Health")]
    async fn health(&self) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            dropped_audit_events: self.audit_recorder.failed_writes(),
        })
    }
}
