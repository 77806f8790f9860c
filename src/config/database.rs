use migration::{AuditMigrator, AuthMigrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::config::BootstrapSettings;
use crate::errors::InternalError;

/// Connections to the auth database (CSRF tokens, allowlist, password
/// history) and the separate audit database
pub struct DatabaseConnections {
    pub auth: DatabaseConnection,
    pub audit: DatabaseConnection,
}

impl DatabaseConnections {
    /// Connect to both databases
    ///
    /// Does NOT run migrations - call `migrate()` separately.
    pub async fn init(bootstrap_settings: &BootstrapSettings) -> Result<Self, InternalError> {
        let auth = connect(bootstrap_settings.database_url(), "connect_database").await?;
        let audit = connect(bootstrap_settings.audit_database_url(), "connect_audit_database").await?;

        Ok(Self { auth, audit })
    }

    pub async fn migrate(&self) -> Result<(), InternalError> {
        migrate_auth_database(&self.auth).await?;
        migrate_audit_database(&self.audit).await?;

        Ok(())
    }
}

async fn connect(url: &str, operation: &str) -> Result<DatabaseConnection, InternalError> {
    let db = Database::connect(url)
        .await
        .map_err(|e| InternalError::database(operation, e))?;

    tracing::debug!("Connected to database: {}", url);

    Ok(db)
}

/// Run pending migrations on the auth database
pub async fn migrate_auth_database(db: &DatabaseConnection) -> Result<(), InternalError> {
    AuthMigrator::up(db, None)
        .await
        .map_err(|e| InternalError::database("run_migrations", e))?;

    tracing::debug!("Auth database migrations completed");

    Ok(())
}

/// Run pending migrations on the audit database
pub async fn migrate_audit_database(audit_db: &DatabaseConnection) -> Result<(), InternalError> {
    AuditMigrator::up(audit_db, None)
        .await
        .map_err(|e| InternalError::database("run_audit_migrations", e))?;

    tracing::debug!("Audit database migrations completed");

    Ok(())
}
