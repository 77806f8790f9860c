use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use poem_openapi::Object;
use std::net::IpAddr;

use crate::audit::{AuditStatistics, InvestigationContext};
use crate::errors::InternalError;
use crate::types::internal::audit::{AuditAction, AuditEvent, EntityType};
use crate::types::internal::audit_filter::{AuditFilters, PageRequest, QuickRange, TimeWindow};

/// Raw audit filter parameters as received on the query string
#[derive(Debug, Clone, Default)]
pub struct AuditSearchQuery {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub ip: Option<String>,
    pub q: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub range: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl AuditSearchQuery {
    /// Validate every parameter into typed filters
    ///
    /// Blank parameters count as absent. Dates accept RFC 3339 or a plain
    /// `YYYY-MM-DD`, which covers the whole day.
    pub fn into_filters(self) -> Result<AuditFilters, InternalError> {
        let action = non_blank(self.action)
            .map(|a| a.parse::<AuditAction>())
            .transpose()?;
        let entity_type = non_blank(self.entity_type)
            .map(|e| e.parse::<EntityType>())
            .transpose()?;
        let ip_address = non_blank(self.ip)
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .map(|parsed| parsed.to_canonical().to_string())
                    .map_err(|_| InternalError::validation("ip", format!("'{}' is not an IP address", ip)))
            })
            .transpose()?;
        let quick = non_blank(self.range)
            .map(|r| r.parse::<QuickRange>())
            .transpose()?;
        let start = non_blank(self.start)
            .map(|s| parse_bound("start", &s, NaiveTime::MIN))
            .transpose()?;
        let end = non_blank(self.end)
            .map(|s| parse_bound("end", &s, end_of_day()))
            .transpose()?;

        Ok(AuditFilters {
            actor_id: non_blank(self.actor_id),
            action,
            entity_type,
            ip_address,
            text: non_blank(self.q),
            window: TimeWindow::resolve(quick, start, end)?,
            page: PageRequest::new(self.page, self.page_size)?,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(field: &str, value: &str, date_only_time: NaiveTime) -> Result<DateTime<Utc>, InternalError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(date_only_time).and_utc())
        .map_err(|_| {
            InternalError::validation(
                field,
                format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", value),
            )
        })
}

#[derive(Object, Debug, Clone)]
pub struct AuditEventDto {
    pub id: i64,
    pub actor_user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Structured before/after payload
    pub changes: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEvent> for AuditEventDto {
    fn from(event: AuditEvent) -> Self {
        Self {
            id: event.id,
            actor_user_id: event.actor_user_id,
            action: event.action.as_str().to_string(),
            entity_type: event.entity_type.as_str().to_string(),
            entity_id: event.entity_id,
            changes: event.changes,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            created_at: event.created_at,
        }
    }
}

fn to_dtos(events: Vec<AuditEvent>) -> Vec<AuditEventDto> {
    events.into_iter().map(AuditEventDto::from).collect()
}

/// One page of audit search results
#[derive(Object, Debug)]
pub struct AuditSearchResponse {
    pub events: Vec<AuditEventDto>,
    /// Matches before pagination
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl AuditSearchResponse {
    pub fn new(events: Vec<AuditEvent>, total_count: u64, page: &PageRequest) -> Self {
        Self {
            events: to_dtos(events),
            total_count,
            page: page.page(),
            page_size: page.page_size(),
        }
    }
}

#[derive(Object, Debug)]
pub struct CountDto {
    pub name: String,
    pub count: u64,
}

#[derive(Object, Debug)]
pub struct TimeBucketDto {
    pub start: DateTime<Utc>,
    pub count: u64,
}

#[derive(Object, Debug)]
pub struct AuditStatisticsResponse {
    pub total_events: u64,
    pub unique_actors: u64,
    pub by_action: Vec<CountDto>,
    pub by_entity_type: Vec<CountDto>,
    /// `hour` or `day`
    pub bucket_size: String,
    pub timeline: Vec<TimeBucketDto>,
}

impl From<AuditStatistics> for AuditStatisticsResponse {
    fn from(stats: AuditStatistics) -> Self {
        let counts = |pairs: Vec<(String, u64)>| {
            pairs
                .into_iter()
                .map(|(name, count)| CountDto { name, count })
                .collect()
        };
        Self {
            total_events: stats.total_events,
            unique_actors: stats.unique_actors,
            by_action: counts(stats.by_action),
            by_entity_type: counts(stats.by_entity_type),
            bucket_size: match stats.bucket_size {
                crate::audit::BucketSize::Hour => "hour".to_string(),
                crate::audit::BucketSize::Day => "day".to_string(),
            },
            timeline: stats
                .timeline
                .into_iter()
                .map(|b| TimeBucketDto {
                    start: b.start,
                    count: b.count,
                })
                .collect(),
        }
    }
}

/// An event and its correlated events
#[derive(Object, Debug)]
pub struct InvestigationResponse {
    pub event: AuditEventDto,
    /// Same actor within ±30 minutes
    pub same_actor: Vec<AuditEventDto>,
    /// Same client IP within ±30 minutes
    pub same_ip: Vec<AuditEventDto>,
    /// Same entity, any time
    pub same_entity: Vec<AuditEventDto>,
}

impl From<InvestigationContext> for InvestigationResponse {
    fn from(context: InvestigationContext) -> Self {
        Self {
            event: context.event.into(),
            same_actor: to_dtos(context.same_actor),
            same_ip: to_dtos(context.same_ip),
            same_entity: to_dtos(context.same_entity),
        }
    }
}
