use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::audit::export::{self, ExportFile, ExportFormat};
use crate::errors::InternalError;
use crate::stores::AuditStore;
use crate::types::internal::audit::AuditEvent;
use crate::types::internal::audit_filter::AuditFilters;

/// One page of search results
#[derive(Debug, Clone)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    /// Matches before pagination
    pub total_count: u64,
}

/// Width of a statistics time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketSize {
    Hour,
    Day,
}

impl BucketSize {
    /// Windows up to 48 hours are bucketed hourly, longer ones daily
    pub fn for_span(span: Duration) -> Self {
        if span <= Duration::hours(48) {
            Self::Hour
        } else {
            Self::Day
        }
    }

    fn duration(&self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub start: DateTime<Utc>,
    pub count: u64,
}

/// Dashboard aggregates over the filtered events
#[derive(Debug, Clone)]
pub struct AuditStatistics {
    pub total_events: u64,
    pub unique_actors: u64,
    /// Sorted by descending count, then name
    pub by_action: Vec<(String, u64)>,
    pub by_entity_type: Vec<(String, u64)>,
    pub bucket_size: BucketSize,
    /// Ascending by bucket start; empty buckets are omitted
    pub timeline: Vec<TimeBucket>,
}

/// Read path over the audit log: search, export and statistics
pub struct AuditQueryService {
    audit_store: Arc<AuditStore>,
}

impl AuditQueryService {
    pub fn new(audit_store: Arc<AuditStore>) -> Self {
        Self { audit_store }
    }

    /// Filtered, paginated search ordered newest first
    pub async fn search(&self, filters: &AuditFilters) -> Result<AuditPage, InternalError> {
        let (rows, total_count) = self.audit_store.search(filters, Utc::now()).await?;
        let events = rows
            .into_iter()
            .map(AuditEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuditPage { events, total_count })
    }

    /// Render every match (up to the export cap) as a downloadable file
    ///
    /// Query and conversion errors propagate; a partial file is never produced.
    pub async fn export(&self, filters: &AuditFilters, format: ExportFormat) -> Result<ExportFile, InternalError> {
        let page = self.search(&filters.for_export()).await?;
        if page.total_count > page.events.len() as u64 {
            tracing::warn!(
                total = page.total_count,
                exported = page.events.len(),
                "Audit export truncated at row cap"
            );
        }

        let file = export::render(&page.events, format, Utc::now())?;
        tracing::info!(filename = %file.filename, rows = file.row_count, "Audit export rendered");
        Ok(file)
    }

    /// Counts by action, entity type and time bucket
    pub async fn statistics(&self, filters: &AuditFilters) -> Result<AuditStatistics, InternalError> {
        let now = Utc::now();

        let by_action = sorted_counts(self.audit_store.count_by_action(filters, now).await?);
        let by_entity_type = sorted_counts(self.audit_store.count_by_entity_type(filters, now).await?);
        let unique_actors = self.audit_store.count_distinct_actors(filters, now).await?;
        let (total_events, earliest) = self.audit_store.count_and_earliest(filters, now).await?;

        let (start, end) = filters.window.bounds(now);
        let earliest = earliest.and_then(DateTime::from_timestamp_millis);
        let span_start = start.or(earliest).unwrap_or(now);
        let span_end = end.unwrap_or(now);
        let bucket_size = BucketSize::for_span(span_end - span_start);

        let bucket_ms = bucket_size.duration().num_milliseconds();
        let bucket_counts = self.audit_store.count_by_bucket(filters, now, bucket_ms).await?;

        Ok(AuditStatistics {
            total_events,
            unique_actors,
            by_action,
            by_entity_type,
            bucket_size,
            timeline: timeline(bucket_counts, bucket_ms)?,
        })
    }
}

fn sorted_counts(counts: Vec<(String, i64)>) -> Vec<(String, u64)> {
    let mut counts: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(name, count)| (name, count.max(0) as u64))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn timeline(bucket_counts: Vec<(i64, i64)>, bucket_ms: i64) -> Result<Vec<TimeBucket>, InternalError> {
    bucket_counts
        .into_iter()
        .map(|(bucket, count)| {
            let start = bucket
                .checked_mul(bucket_ms)
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| InternalError::parse("created_at", format!("bucket {} out of range", bucket)))?;
            Ok(TimeBucket {
                start,
                count: count.max(0) as u64,
            })
        })
        .collect()
}

impl std::fmt::Debug for AuditQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditQueryService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{setup_test_audit_db, setup_unmigrated_db};
    use crate::types::internal::audit::{AuditAction, EntityType, NewAuditEvent};
    use crate::types::internal::audit_filter::{PageRequest, QuickRange, TimeWindow};
    use crate::types::internal::context::RequestContext;
    use chrono::TimeZone;

    async fn seeded() -> AuditQueryService {
        let store = Arc::new(AuditStore::new(setup_test_audit_db().await));
        let ctx = RequestContext::new().with_actor_id("admin-1");
        for (action, entity) in [
            (AuditAction::Create, EntityType::Recipe),
            (AuditAction::Update, EntityType::Recipe),
            (AuditAction::Update, EntityType::Tag),
            (AuditAction::Approve, EntityType::Comment),
        ] {
            store.write_event(&ctx, &NewAuditEvent::new(action, entity)).await.unwrap();
        }
        AuditQueryService::new(store)
    }

    #[tokio::test]
    async fn test_search_pages_newest_first() {
        let service = seeded().await;
        let filters = AuditFilters {
            page: PageRequest::new(Some(2), Some(3)).unwrap(),
            ..Default::default()
        };

        let page = service.search(&filters).await.unwrap();
        assert_eq!(page.total_count, 4);
        assert_eq!(page.events.len(), 1);
        // Oldest event lands on the last page
        assert_eq!(page.events[0].action, AuditAction::Create);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let service = seeded().await;
        let filters = AuditFilters {
            page: PageRequest::new(Some(9), None).unwrap(),
            ..Default::default()
        };

        let page = service.search(&filters).await.unwrap();
        assert_eq!(page.total_count, 4);
        assert!(page.events.is_empty());
    }

    #[tokio::test]
    async fn test_export_ignores_paging() {
        let service = seeded().await;
        let filters = AuditFilters {
            page: PageRequest::new(Some(1), Some(1)).unwrap(),
            ..Default::default()
        };

        let file = service.export(&filters, ExportFormat::Csv).await.unwrap();
        assert_eq!(file.row_count, 4);
        assert!(file.filename.ends_with(".csv"));
    }

    #[tokio::test]
    async fn test_export_fails_loudly_on_storage_error() {
        let service = AuditQueryService::new(Arc::new(AuditStore::new(setup_unmigrated_db().await)));
        assert!(service.export(&AuditFilters::default(), ExportFormat::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_statistics() {
        let service = seeded().await;
        let filters = AuditFilters {
            window: TimeWindow::Quick(QuickRange::Last24Hours),
            ..Default::default()
        };

        let stats = service.statistics(&filters).await.unwrap();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.unique_actors, 1);
        assert_eq!(stats.by_action[0], ("UPDATE".to_string(), 2));
        assert_eq!(stats.by_entity_type[0], ("Recipe".to_string(), 2));
        assert_eq!(stats.bucket_size, BucketSize::Hour);
        assert_eq!(stats.timeline.iter().map(|b| b.count).sum::<u64>(), 4);

        let weekly = AuditFilters {
            window: TimeWindow::Quick(QuickRange::Last7Days),
            ..Default::default()
        };
        assert_eq!(service.statistics(&weekly).await.unwrap().bucket_size, BucketSize::Day);
    }

    #[tokio::test]
    async fn test_timeline_buckets_start_on_hour_and_day_boundaries() {
        use crate::types::db::audit_event;
        use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};

        let db = setup_test_audit_db().await;
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        for minutes in [5, 55, 65] {
            audit_event::ActiveModel {
                id: NotSet,
                actor_user_id: Set("admin-1".to_string()),
                action: Set("VIEW".to_string()),
                entity_type: Set("Recipe".to_string()),
                entity_id: Set(None),
                changes: Set(None),
                ip_address: Set(None),
                user_agent: Set(None),
                created_at: Set((base + Duration::minutes(minutes)).timestamp_millis()),
            }
            .insert(&db)
            .await
            .unwrap();
        }
        let service = AuditQueryService::new(Arc::new(AuditStore::new(db)));

        let same_day = AuditFilters {
            window: TimeWindow::Between {
                start: Some(base - Duration::hours(10)),
                end: Some(base + Duration::hours(13)),
            },
            ..Default::default()
        };
        let hourly = service.statistics(&same_day).await.unwrap();
        assert_eq!(hourly.total_events, 3);
        assert_eq!(hourly.bucket_size, BucketSize::Hour);
        assert_eq!(
            hourly.timeline,
            vec![
                TimeBucket { start: base, count: 2 },
                TimeBucket { start: base + Duration::hours(1), count: 1 },
            ]
        );

        let week = AuditFilters {
            window: TimeWindow::Between {
                start: Some(base - Duration::days(3)),
                end: Some(base + Duration::days(3)),
            },
            ..Default::default()
        };
        let daily = service.statistics(&week).await.unwrap();
        assert_eq!(daily.bucket_size, BucketSize::Day);
        assert_eq!(
            daily.timeline,
            vec![TimeBucket {
                start: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
                count: 3,
            }]
        );
    }

    #[test]
    fn test_timeline_maps_bucket_index_to_start() {
        let hour_ms = Duration::hours(1).num_milliseconds();
        let buckets = timeline(vec![(2, 4)], hour_ms).unwrap();
        assert_eq!(buckets[0].start, DateTime::from_timestamp(2 * 3600, 0).unwrap());
        assert_eq!(buckets[0].count, 4);

        assert!(timeline(vec![(i64::MAX, 1)], hour_ms).is_err());
    }
}
