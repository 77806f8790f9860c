use crate::config::{BootstrapSettings, DatabaseConnections};

/// Connect to both databases and run all pending migrations
///
/// Does not build the full AppData.
pub async fn run_migrations(settings: &BootstrapSettings) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Running database migrations...");

    let connections = DatabaseConnections::init(settings).await?;
    connections.migrate().await?;

    tracing::info!("All migrations completed successfully");
    println!("Migrations applied to auth and audit databases");

    Ok(())
}
