use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::{Binary, Json};
use poem_openapi::{ApiResponse, OpenApi, Tags};
use serde_json::json;
use std::sync::Arc;

use crate::api::helpers::{AdminGuard, BearerAuth};
use crate::audit::{AuditQueryService, AuditRecorder, ExportFormat, InvestigationService};
use crate::errors::AdminError;
use crate::services::Permission;
use crate::types::dto::audit::{
    AuditSearchQuery, AuditSearchResponse, AuditStatisticsResponse, InvestigationResponse,
};
use crate::types::internal::audit::{AuditAction, EntityType, NewAuditEvent};

/// Audit log read endpoints
pub struct AuditApi {
    guard: Arc<AdminGuard>,
    audit_query: Arc<AuditQueryService>,
    investigation: Arc<InvestigationService>,
    audit_recorder: Arc<AuditRecorder>,
}

impl AuditApi {
    pub fn new(
        guard: Arc<AdminGuard>,
        audit_query: Arc<AuditQueryService>,
        investigation: Arc<InvestigationService>,
        audit_recorder: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            guard,
            audit_query,
            investigation,
            audit_recorder,
        }
    }
}

#[derive(Tags)]
enum AuditTags {
    /// Audit log search, export and investigation
    Audit,
}

/// Raw file download
#[derive(ApiResponse, Debug)]
pub enum ExportResponse {
    #[oai(status = 200)]
    File(
        Binary<Vec<u8>>,
        #[oai(header = "Content-Type")] String,
        #[oai(header = "Content-Disposition")] String,
    ),
}

#[OpenApi]
impl AuditApi {
    /// Search audit events, newest first
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/admin/audit", method = "get", tag = "AuditTags::Audit")]
    async fn search(
        &self,
        req: &Request,
        auth: BearerAuth,
        actor_id: Query<Option<String>>,
        action: Query<Option<String>>,
        entity_type: Query<Option<String>>,
        ip: Query<Option<String>>,
        q: Query<Option<String>>,
        start: Query<Option<String>>,
        end: Query<Option<String>>,
        range: Query<Option<String>>,
        page: Query<Option<u64>>,
        page_size: Query<Option<u64>>,
    ) -> Result<Json<AuditSearchResponse>, AdminError> {
        self.guard.authorize(req, &auth, Permission::AuditView).await?;

        let filters = AuditSearchQuery {
            actor_id: actor_id.0,
            action: action.0,
            entity_type: entity_type.0,
            ip: ip.0,
            q: q.0,
            start: start.0,
            end: end.0,
            range: range.0,
            page: page.0,
            page_size: page_size.0,
        }
        .into_filters()?;

        let result = self.audit_query.search(&filters).await?;
        Ok(Json(AuditSearchResponse::new(
            result.events,
            result.total_count,
            &filters.page,
        )))
    }

    /// Download every matching event as CSV or JSON
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/admin/audit/export", method = "get", tag = "AuditTags::Audit")]
    async fn export(
        &self,
        req: &Request,
        auth: BearerAuth,
        actor_id: Query<Option<String>>,
        action: Query<Option<String>>,
        entity_type: Query<Option<String>>,
        ip: Query<Option<String>>,
        q: Query<Option<String>>,
        start: Query<Option<String>>,
        end: Query<Option<String>>,
        range: Query<Option<String>>,
        format: Query<Option<String>>,
    ) -> Result<ExportResponse, AdminError> {
        let ctx = self.guard.authorize(req, &auth, Permission::AuditExport).await?;

        let format = match format.0.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(value) => value.parse::<ExportFormat>()?,
            None => ExportFormat::default(),
        };
        let filters = AuditSearchQuery {
            actor_id: actor_id.0,
            action: action.0,
            entity_type: entity_type.0,
            ip: ip.0,
            q: q.0,
            start: start.0,
            end: end.0,
            range: range.0,
            ..Default::default()
        }
        .into_filters()?;

        let file = self.audit_query.export(&filters, format).await?;

        self.audit_recorder.record_detached(
            ctx,
            NewAuditEvent::new(AuditAction::Export, EntityType::AuditLog).with_payload(json!({
                "format": format.extension(),
                "rows": file.row_count,
                "filename": file.filename,
            })),
        );

        let disposition = format!("attachment; filename=\"{}\"", file.filename);
        Ok(ExportResponse::File(
            Binary(file.body),
            file.content_type.to_string(),
            disposition,
        ))
    }

    /// Aggregate counts for dashboards
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/admin/audit/stats", method = "get", tag = "AuditTags::Audit")]
    async fn statistics(
        &self,
        req: &Request,
        auth: BearerAuth,
        actor_id: Query<Option<String>>,
        action: Query<Option<String>>,
        entity_type: Query<Option<String>>,
        ip: Query<Option<String>>,
        q: Query<Option<String>>,
        start: Query<Option<String>>,
        end: Query<Option<String>>,
        range: Query<Option<String>>,
    ) -> Result<Json<AuditStatisticsResponse>, AdminError> {
        self.guard.authorize(req, &auth, Permission::AuditView).await?;

        let filters = AuditSearchQuery {
            actor_id: actor_id.0,
            action: action.0,
            entity_type: entity_type.0,
            ip: ip.0,
            q: q.0,
            start: start.0,
            end: end.0,
            range: range.0,
            ..Default::default()
        }
        .into_filters()?;

        let stats = self.audit_query.statistics(&filters).await?;
        Ok(Json(stats.into()))
    }

    /// Events correlated with one event by actor, IP and entity
    #[oai(path = "/admin/audit/:id/investigation", method = "get", tag = "AuditTags::Audit")]
    async fn investigation(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i64>,
    ) -> Result<Json<InvestigationResponse>, AdminError> {
        self.guard.authorize(req, &auth, Permission::AuditView).await?;

        match self.investigation.investigation_context(id.0).await? {
            Some(context) => Ok(Json(context.into())),
            None => Err(AdminError::not_found("Audit event", id.0)),
        }
    }
}
