mod bootstrap_settings;
mod database;
mod env_provider;
mod errors;
mod logging;
mod secret_manager;

pub use bootstrap_settings::BootstrapSettings;
pub use database::{DatabaseConnections, migrate_audit_database, migrate_auth_database};
#[cfg(test)]
pub use env_provider::MockEnvironment;
pub use env_provider::{EnvironmentProvider, SystemEnvironment};
pub use errors::ConfigError;
pub use logging::{LoggingConfig, LoggingError, init_logging};
pub use secret_manager::SecretManager;
