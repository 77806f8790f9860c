pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_audit_events;
mod m20250301_000002_create_csrf_tokens;
mod m20250301_000003_create_ip_allowlist;
mod m20250301_000004_create_password_history;

/// Migrations for the guard tables (CSRF tokens, IP allowlist, password history)
pub struct AuthMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AuthMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000002_create_csrf_tokens::Migration),
            Box::new(m20250301_000003_create_ip_allowlist::Migration),
            Box::new(m20250301_000004_create_password_history::Migration),
        ]
    }
}

/// Migrations for the append-only audit database
pub struct AuditMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AuditMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_create_audit_events::Migration)]
    }
}
