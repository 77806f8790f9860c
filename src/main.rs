use clap::Parser;
use poem::{Server, listener::TcpListener};
use std::sync::Arc;

use admin_trust_backend::api::build_routes;
use admin_trust_backend::app_data::{AppData, GuardPolicy};
use admin_trust_backend::cli::{self, Cli, Commands};
use admin_trust_backend::config::{BootstrapSettings, DatabaseConnections, SecretManager, init_logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging()?;

    let cli = Cli::parse();
    let settings = BootstrapSettings::from_env()?;
    tracing::debug!(?settings, "Bootstrap settings loaded");

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::Migrate = command {
        return cli::migrate::run_migrations(&settings).await;
    }

    let secret_manager = Arc::new(SecretManager::init()?);
    let connections = DatabaseConnections::init(&settings).await?;
    connections.migrate().await?;

    let app_data = AppData::init(connections, secret_manager, GuardPolicy::from(&settings));

    match command {
        Commands::Serve => serve(&app_data, &settings).await?,
        other => cli::execute_command(other, &app_data).await?,
    }

    Ok(())
}

async fn serve(app_data: &AppData, settings: &BootstrapSettings) -> Result<(), std::io::Error> {
    let address = settings.server_address();
    let server_url = format!("http://{}/api", address);
    let app = build_routes(app_data, &server_url);

    tracing::info!("Starting server on http://{}", address);
    tracing::info!("Swagger UI available at http://{}/swagger", address);
    tracing::info!(
        policy = %app_data.allowlist_service.policy(),
        "Admin allowlist error policy"
    );

    Server::new(TcpListener::bind(address)).run(app).await
}
