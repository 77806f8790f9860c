mod common;

use admin_trust_backend::config::{ConfigError, SecretManager};
use admin_trust_backend::services::password_history_service::HISTORY_DEPTH;
use admin_trust_backend::types::internal::audit::{AuditAction, EntityType};
use admin_trust_backend::types::internal::audit_filter::AuditFilters;
use chrono::{Duration, Utc};
use std::net::IpAddr;

#[tokio::test]
async fn test_csrf_token_is_single_use_and_owner_bound() {
    let app = common::setup_app_data().await;

    let issued = app.csrf_service.generate("admin-a").await.unwrap();
    assert!(issued.expires_in > 0);

    assert!(!app.csrf_service.verify(&issued.token, "admin-b").await);
    assert!(app.csrf_service.verify(&issued.token, "admin-a").await);
    assert!(!app.csrf_service.verify(&issued.token, "admin-a").await);
}

#[tokio::test]
async fn test_concurrent_csrf_redemption_succeeds_once() {
    let app = common::setup_app_data().await;
    let issued = app.csrf_service.generate("admin-a").await.unwrap();

    let (first, second) = tokio::join!(
        app.csrf_service.verify(&issued.token, "admin-a"),
        app.csrf_service.verify(&issued.token, "admin-a"),
    );

    assert!(first ^ second);
}

#[tokio::test]
async fn test_allowlist_lifecycle_is_audited() {
    let app = common::setup_app_data().await;
    let ctx = common::actor_context("admin-a", "203.0.113.1");
    let ip: IpAddr = "198.51.100.20".parse().unwrap();

    assert!(!app.allowlist_service.is_allowed(ip).await);

    app.allowlist_service
        .add(&ctx, ip, Some("office".to_string()), None)
        .await
        .unwrap();
    assert!(app.allowlist_service.is_allowed(ip).await);

    assert!(app.allowlist_service.remove(&ctx, ip).await.unwrap());
    assert!(!app.allowlist_service.is_allowed(ip).await);
    assert!(!app.allowlist_service.remove(&ctx, ip).await.unwrap());

    let filters = AuditFilters {
        entity_type: Some(EntityType::IpAllowlist),
        ..AuditFilters::default()
    };
    let page = app.audit_query.search(&filters).await.unwrap();
    let actions: Vec<AuditAction> = page.events.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::AllowlistRemove, AuditAction::AllowlistAdd]);
    assert!(page.events.iter().all(|e| e.entity_id.as_deref() == Some("198.51.100.20")));
}

#[tokio::test]
async fn test_expired_allowlist_entry_stops_matching() {
    let app = common::setup_app_data().await;
    let ip: IpAddr = "198.51.100.21".parse().unwrap();
    let past = (Utc::now() - Duration::minutes(5)).timestamp();

    app.ip_allowlist_store
        .upsert(&ip.to_string(), None, "seed", Some(past), past - 60)
        .await
        .unwrap();

    assert!(!app.allowlist_service.is_allowed(ip).await);
    assert_eq!(app.allowlist_service.cleanup_expired().await, 1);
    assert!(app.allowlist_service.list(false).await.unwrap().is_empty());
    assert_eq!(app.allowlist_service.list(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_password_history_window() {
    let app = common::setup_app_data().await;
    let history = &app.password_history_service;

    for i in 0..=HISTORY_DEPTH {
        history.record("user-1", &format!("P@ss{}", i)).await.unwrap();
    }

    // The oldest password has rotated out of the window
    assert!(!history.was_recently_used("user-1", "P@ss0").await.unwrap());
    for i in 1..=HISTORY_DEPTH {
        assert!(history.was_recently_used("user-1", &format!("P@ss{}", i)).await.unwrap());
    }
    assert!(!history.was_recently_used("user-2", "P@ss3").await.unwrap());
}

#[test]
fn test_secret_manager_reads_process_environment() {
    let _lock = common::ENV_TEST_MUTEX.lock().unwrap();
    let _guard = common::EnvGuard::new(vec!["JWT_SECRET", "PASSWORD_PEPPER"]);

    unsafe {
        std::env::set_var("JWT_SECRET", common::TEST_JWT_SECRET);
        std::env::set_var("PASSWORD_PEPPER", common::TEST_PEPPER);
    }

    let secrets = SecretManager::init().unwrap();
    assert_eq!(secrets.jwt_secret(), common::TEST_JWT_SECRET);
    assert!(!format!("{:?}", secrets).contains(common::TEST_PEPPER));
}

#[test]
fn test_secret_manager_rejects_missing_pepper() {
    let _lock = common::ENV_TEST_MUTEX.lock().unwrap();
    let _guard = common::EnvGuard::new(vec!["JWT_SECRET", "PASSWORD_PEPPER"]);

    unsafe {
        std::env::set_var("JWT_SECRET", common::TEST_JWT_SECRET);
    }

    match SecretManager::init() {
        Err(ConfigError::MissingSecret { name }) => assert_eq!(name, "PASSWORD_PEPPER"),
        other => panic!("expected MissingSecret, got {:?}", other),
    }
}
