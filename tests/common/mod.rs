// Common test utilities for integration tests
#![allow(dead_code)]

use admin_trust_backend::app_data::{AppData, GuardPolicy};
use admin_trust_backend::config::{DatabaseConnections, SecretManager};
use admin_trust_backend::types::internal::context::RequestContext;
use migration::{AuditMigrator, AuthMigrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

pub const TEST_JWT_SECRET: &str = "integration-secret-key-with-32-characters";
pub const TEST_PEPPER: &str = "integration-pepper-16";

/// Creates a test auth database with migrations applied
pub async fn setup_test_auth_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    AuthMigrator::up(&db, None)
        .await
        .expect("Failed to run auth migrations");

    db
}

/// Creates a test audit database with migrations applied
pub async fn setup_test_audit_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create audit database");

    AuditMigrator::up(&db, None)
        .await
        .expect("Failed to run audit migrations");

    db
}

/// Fully wired application on fresh in-memory databases
pub async fn setup_app_data() -> AppData {
    let connections = DatabaseConnections {
        auth: setup_test_auth_db().await,
        audit: setup_test_audit_db().await,
    };
    let secret_manager = Arc::new(SecretManager::from_values(TEST_JWT_SECRET, TEST_PEPPER));
    let policy = GuardPolicy {
        allowlist_trust_private: false,
        ..GuardPolicy::default()
    };

    AppData::init(connections, secret_manager, policy)
}

/// Authenticated-looking context for `actor` calling from `ip`
pub fn actor_context(actor: &str, ip: &str) -> RequestContext {
    let ip: IpAddr = ip.parse().expect("valid test ip");
    RequestContext::new()
        .with_actor_id(actor)
        .with_ip_address(ip)
        .with_user_agent("integration-test/1.0")
}

/// Helper to manage environment variables in tests
///
/// Cleans up specified environment variables on creation and drop,
/// ensuring test isolation when dealing with global environment state.
pub struct EnvGuard {
    vars: Vec<String>,
}

impl EnvGuard {
    pub fn new(vars: Vec<&str>) -> Self {
        for var in &vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
        Self {
            vars: vars.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }
}

/// Global mutex for tests that modify environment variables
pub static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());
