use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::errors::InternalError;
use crate::errors::internal::AuditError;
use crate::types::db::audit_event::{self, Column, Entity as AuditEventEntity};
use crate::types::internal::audit::{EntityType, NewAuditEvent};
use crate::types::internal::audit_filter::AuditFilters;
use crate::types::internal::context::RequestContext;

/// Repository for audit event storage operations
///
/// Insert-only on the write side: there is no update or delete path.
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    /// Create a new AuditStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Write an audit event to the database
    ///
    /// Actor, IP address and user agent are taken from the request context;
    /// `created_at` is assigned here from the server clock.
    ///
    /// # Returns
    /// * `Ok(i64)` - id of the inserted row
    /// * `Err(InternalError)` - serialization or database insert failed
    pub async fn write_event(
        &self,
        ctx: &RequestContext,
        event: &NewAuditEvent,
    ) -> Result<i64, InternalError> {
        let changes = event
            .changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| {
                AuditError::LogWriteFailed(format!("Failed to serialize audit changes: {}", e))
            })?;

        let audit_event = audit_event::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            actor_user_id: Set(ctx.actor_id.clone()),
            action: Set(event.action.as_str().to_string()),
            entity_type: Set(event.entity_type.as_str().to_string()),
            entity_id: Set(event.entity_id.clone()),
            changes: Set(changes),
            ip_address: Set(ctx.ip_address.map(|ip| ip.to_string())),
            user_agent: Set(ctx.user_agent.clone()),
            created_at: Set(Utc::now().timestamp_millis()),
        };

        let inserted = audit_event
            .insert(&self.db)
            .await
            .map_err(|e| InternalError::database("write_audit_event", e))?;

        Ok(inserted.id)
    }

    /// Search events matching the filters, newest first
    ///
    /// # Returns
    /// * `Ok((rows, total))` - the requested page and the unpaginated match count
    pub async fn search(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
    ) -> Result<(Vec<audit_event::Model>, u64), InternalError> {
        let query = Self::filtered(filters, now);

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| InternalError::database("count_audit_events", e))?;

        let rows = Self::newest_first(query)
            .offset(filters.page.offset())
            .limit(filters.page.page_size())
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("search_audit_events", e))?;

        Ok((rows, total))
    }

    /// Look up a single event by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<audit_event::Model>, InternalError> {
        AuditEventEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_audit_event", e))
    }

    /// Events by one actor with `created_at` in `[start_ms, end_ms]`
    pub async fn find_by_actor_between(
        &self,
        actor_user_id: &str,
        start_ms: i64,
        end_ms: i64,
        limit: u64,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        let condition = Condition::all()
            .add(Column::ActorUserId.eq(actor_user_id))
            .add(Column::CreatedAt.between(start_ms, end_ms));
        self.find_matching(condition, limit, "find_audit_events_by_actor").await
    }

    /// Events from one IP address with `created_at` in `[start_ms, end_ms]`
    pub async fn find_by_ip_between(
        &self,
        ip_address: &str,
        start_ms: i64,
        end_ms: i64,
        limit: u64,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        let condition = Condition::all()
            .add(Column::IpAddress.eq(ip_address))
            .add(Column::CreatedAt.between(start_ms, end_ms));
        self.find_matching(condition, limit, "find_audit_events_by_ip").await
    }

    /// Every event on one (entity type, entity id), regardless of time
    pub async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        limit: u64,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        let condition = Condition::all()
            .add(Column::EntityType.eq(entity_type.as_str()))
            .add(Column::EntityId.eq(entity_id));
        self.find_matching(condition, limit, "find_audit_events_by_entity").await
    }

    /// Matching event counts grouped by action
    pub async fn count_by_action(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, InternalError> {
        self.count_grouped(filters, now, Column::Action, "count_audit_events_by_action")
            .await
    }

    /// Matching event counts grouped by entity type
    pub async fn count_by_entity_type(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, InternalError> {
        self.count_grouped(filters, now, Column::EntityType, "count_audit_events_by_entity_type")
            .await
    }

    /// Number of matching events and the earliest `created_at` among them
    pub async fn count_and_earliest(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
    ) -> Result<(u64, Option<i64>), InternalError> {
        let row = Self::filtered(filters, now)
            .select_only()
            .column_as(Expr::col(Column::Id).count(), "count")
            .column_as(Expr::col(Column::CreatedAt).min(), "earliest")
            .into_tuple::<(i64, Option<i64>)>()
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("summarize_audit_events", e))?;

        Ok(row.map_or((0, None), |(count, earliest)| (count.max(0) as u64, earliest)))
    }

    /// Matching event counts per `created_at / bucket_ms`, ascending
    ///
    /// Bucket `n` covers `[n * bucket_ms, (n + 1) * bucket_ms)` milliseconds
    /// since the epoch.
    pub async fn count_by_bucket(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
        bucket_ms: i64,
    ) -> Result<Vec<(i64, i64)>, InternalError> {
        let bucket = Expr::col(Column::CreatedAt).div(bucket_ms);

        Self::filtered(filters, now)
            .select_only()
            .column_as(bucket.clone(), "bucket")
            .column_as(Expr::col(Column::Id).count(), "count")
            .group_by(bucket.clone())
            .order_by_asc(bucket)
            .into_tuple::<(i64, i64)>()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("count_audit_events_by_bucket", e))
    }

    /// Number of distinct actors among matching events
    pub async fn count_distinct_actors(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
    ) -> Result<u64, InternalError> {
        let actors = Self::filtered(filters, now)
            .select_only()
            .column(Column::ActorUserId)
            .distinct()
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("count_audit_event_actors", e))?;

        Ok(actors.len() as u64)
    }

    async fn find_matching(
        &self,
        condition: Condition,
        limit: u64,
        operation: &str,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        Self::newest_first(AuditEventEntity::find().filter(condition))
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database(operation, e))
    }

    async fn count_grouped(
        &self,
        filters: &AuditFilters,
        now: DateTime<Utc>,
        column: Column,
        operation: &str,
    ) -> Result<Vec<(String, i64)>, InternalError> {
        Self::filtered(filters, now)
            .select_only()
            .column(column)
            .column_as(Column::Id.count(), "count")
            .group_by(column)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database(operation, e))
    }

    fn newest_first(query: Select<AuditEventEntity>) -> Select<AuditEventEntity> {
        query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
    }

    fn filtered(filters: &AuditFilters, now: DateTime<Utc>) -> Select<AuditEventEntity> {
        let mut condition = Condition::all();

        if let Some(actor_id) = &filters.actor_id {
            condition = condition.add(Column::ActorUserId.eq(actor_id.as_str()));
        }
        if let Some(action) = filters.action {
            condition = condition.add(Column::Action.eq(action.as_str()));
        }
        if let Some(entity_type) = filters.entity_type {
            condition = condition.add(Column::EntityType.eq(entity_type.as_str()));
        }
        if let Some(ip_address) = &filters.ip_address {
            condition = condition.add(Column::IpAddress.eq(ip_address.as_str()));
        }
        if let Some(text) = &filters.text {
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(Column::Action).like(literal_substring(text)))
                    .add(Expr::col(Column::Changes).like(literal_substring(text))),
            );
        }

        let (start, end) = filters.window.bounds(now);
        if let Some(start) = start {
            condition = condition.add(Column::CreatedAt.gte(start.timestamp_millis()));
        }
        if let Some(end) = end {
            condition = condition.add(Column::CreatedAt.lte(end.timestamp_millis()));
        }

        AuditEventEntity::find().filter(condition)
    }
}

/// Escape character for LIKE patterns
const LIKE_ESCAPE: char = '!';

/// `%text%` with LIKE wildcards in `text` matched literally
fn literal_substring(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if matches!(c, LIKE_ESCAPE | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    LikeExpr::new(format!("%{}%", escaped)).escape(LIKE_ESCAPE)
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore")
            .field("db", &"<connection>")
            .finish()
    }
}
