use chrono::Duration;
use std::sync::Arc;

use crate::errors::InternalError;
use crate::stores::AuditStore;
use crate::types::db::audit_event;
use crate::types::internal::audit::AuditEvent;

/// Half-width of the actor and IP correlation window
pub const CORRELATION_WINDOW_MINUTES: i64 = 30;

/// Row cap for each related set
pub const RELATED_LIMIT: u64 = 100;

/// An event and everything correlated with it
#[derive(Debug, Clone)]
pub struct InvestigationContext {
    pub event: AuditEvent,
    /// Same actor within the correlation window
    pub same_actor: Vec<AuditEvent>,
    /// Same client IP within the correlation window; empty when the event has no IP
    pub same_ip: Vec<AuditEvent>,
    /// Same entity regardless of time; empty when the event has no entity id
    pub same_entity: Vec<AuditEvent>,
}

/// Correlates audit events by actor, IP and entity for incident response
pub struct InvestigationService {
    audit_store: Arc<AuditStore>,
}

impl InvestigationService {
    pub fn new(audit_store: Arc<AuditStore>) -> Self {
        Self { audit_store }
    }

    /// Build the investigation context around `event_id`
    ///
    /// # Returns
    /// * `Ok(None)` - no event with that id
    pub async fn investigation_context(&self, event_id: i64) -> Result<Option<InvestigationContext>, InternalError> {
        let Some(target) = self.audit_store.find_by_id(event_id).await? else {
            return Ok(None);
        };

        let window_ms = Duration::minutes(CORRELATION_WINDOW_MINUTES).num_milliseconds();
        let start_ms = target.created_at - window_ms;
        let end_ms = target.created_at + window_ms;

        let same_actor = self
            .audit_store
            .find_by_actor_between(&target.actor_user_id, start_ms, end_ms, RELATED_LIMIT)
            .await?;

        let same_ip = match &target.ip_address {
            Some(ip) => {
                self.audit_store
                    .find_by_ip_between(ip, start_ms, end_ms, RELATED_LIMIT)
                    .await?
            }
            None => Vec::new(),
        };

        let event = AuditEvent::try_from(target)?;

        let same_entity = match &event.entity_id {
            Some(entity_id) => {
                self.audit_store
                    .find_by_entity(event.entity_type, entity_id, RELATED_LIMIT)
                    .await?
            }
            None => Vec::new(),
        };

        tracing::debug!(
            event_id,
            same_actor = same_actor.len(),
            same_ip = same_ip.len(),
            same_entity = same_entity.len(),
            "Investigation context built"
        );

        Ok(Some(InvestigationContext {
            event,
            same_actor: convert(same_actor)?,
            same_ip: convert(same_ip)?,
            same_entity: convert(same_entity)?,
        }))
    }
}

fn convert(rows: Vec<audit_event::Model>) -> Result<Vec<AuditEvent>, InternalError> {
    rows.into_iter().map(AuditEvent::try_from).collect()
}

impl std::fmt::Debug for InvestigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::setup_test_audit_db;
    use crate::types::internal::audit::{AuditAction, EntityType, NewAuditEvent};
    use crate::types::internal::context::RequestContext;

    #[tokio::test]
    async fn test_unknown_event_is_none() {
        let service = InvestigationService::new(Arc::new(AuditStore::new(setup_test_audit_db().await)));
        assert!(service.investigation_context(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_event_without_ip_or_entity_has_empty_sets() {
        let store = Arc::new(AuditStore::new(setup_test_audit_db().await));
        let id = store
            .write_event(
                &RequestContext::for_cli("owner"),
                &NewAuditEvent::new(AuditAction::SettingsChange, EntityType::SystemSetting),
            )
            .await
            .unwrap();

        let context = InvestigationService::new(store)
            .investigation_context(id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(context.event.id, id);
        assert_eq!(context.same_actor.len(), 1);
        assert!(context.same_ip.is_empty());
        assert!(context.same_entity.is_empty());
    }

    #[tokio::test]
    async fn test_other_actors_and_entities_are_excluded() {
        let store = Arc::new(AuditStore::new(setup_test_audit_db().await));
        let alice = RequestContext::new()
            .with_actor_id("alice")
            .with_ip_address("203.0.113.5".parse().unwrap());
        let bob = RequestContext::new()
            .with_actor_id("bob")
            .with_ip_address("203.0.113.5".parse().unwrap());

        let target = store
            .write_event(&alice, &NewAuditEvent::new(AuditAction::Delete, EntityType::Comment).with_entity_id("7"))
            .await
            .unwrap();
        store
            .write_event(&bob, &NewAuditEvent::new(AuditAction::Delete, EntityType::Comment).with_entity_id("8"))
            .await
            .unwrap();

        let context = InvestigationService::new(store)
            .investigation_context(target)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(context.same_actor.len(), 1);
        assert_eq!(context.same_ip.len(), 2);
        assert_eq!(context.same_entity.len(), 1);
    }

    async fn insert_at(
        db: &sea_orm::DatabaseConnection,
        actor: &str,
        ip: Option<&str>,
        entity_id: &str,
        created_at: i64,
    ) -> i64 {
        use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};

        audit_event::ActiveModel {
            id: NotSet,
            actor_user_id: Set(actor.to_string()),
            action: Set("UPDATE".to_string()),
            entity_type: Set("Recipe".to_string()),
            entity_id: Set(Some(entity_id.to_string())),
            changes: Set(None),
            ip_address: Set(ip.map(str::to_string)),
            user_agent: Set(None),
            created_at: Set(created_at),
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_actor_and_ip_sets_respect_window_but_entity_does_not() {
        let db = setup_test_audit_db().await;
        let target_at = 1_740_000_000_000;
        let minute = 60_000;
        let ip = Some("203.0.113.5");

        let target = insert_at(&db, "alice", ip, "42", target_at).await;

        let mut actor_inside = Vec::new();
        let mut ip_inside = Vec::new();
        let mut outside = Vec::new();
        for offset in [-29 * minute, 29 * minute] {
            actor_inside.push(insert_at(&db, "alice", None, "1", target_at + offset).await);
            ip_inside.push(insert_at(&db, "bob", ip, "2", target_at + offset).await);
        }
        for offset in [-31 * minute, 31 * minute] {
            outside.push(insert_at(&db, "alice", None, "1", target_at + offset).await);
            outside.push(insert_at(&db, "bob", ip, "2", target_at + offset).await);
        }
        let old_same_entity = insert_at(&db, "carol", None, "42", target_at - 2 * 24 * 60 * minute).await;

        let context = InvestigationService::new(Arc::new(AuditStore::new(db)))
            .investigation_context(target)
            .await
            .unwrap()
            .unwrap();

        let ids = |events: &[AuditEvent]| events.iter().map(|e| e.id).collect::<Vec<_>>();
        let same_actor = ids(&context.same_actor);
        let same_ip = ids(&context.same_ip);
        let same_entity = ids(&context.same_entity);

        assert_eq!(same_actor.len(), 3);
        assert!(same_actor.contains(&target));
        assert!(actor_inside.iter().all(|id| same_actor.contains(id)));

        assert_eq!(same_ip.len(), 3);
        assert!(same_ip.contains(&target));
        assert!(ip_inside.iter().all(|id| same_ip.contains(id)));

        assert!(outside.iter().all(|id| !same_actor.contains(id) && !same_ip.contains(id)));

        assert_eq!(same_entity, vec![target, old_same_entity]);
    }
}
