// CLI module for administrative operations requiring server access

pub mod allowlist;
pub mod cleanup;
pub mod migrate;

use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};

use crate::app_data::AppData;

/// Admin trust backend CLI
#[derive(Parser, Debug)]
#[command(name = "admin-trust-backend")]
#[command(about = "Administrative audit log and access guard service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Run pending migrations on the auth and audit databases
    Migrate,

    /// Delete expired CSRF tokens and deactivate expired allowlist entries
    Cleanup,

    /// IP allowlist management
    #[command(subcommand)]
    Allowlist(AllowlistCommands),
}

#[derive(Subcommand, Debug)]
pub enum AllowlistCommands {
    /// Add or reactivate an address
    Add {
        ip: String,

        #[arg(long)]
        description: Option<String>,

        /// RFC 3339 expiry; omit for a permanent entry
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,

        /// Recorded as the actor in the audit log
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Deactivate an address
    Remove {
        ip: String,

        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Show entries
    List {
        #[arg(long)]
        include_inactive: bool,
    },
}

/// Execute a CLI command other than `serve` and `migrate`
///
/// # Returns
/// * `Ok(())` - Command executed successfully
/// * `Err(...)` - Command execution failed
pub async fn execute_command(
    command: Commands,
    app_data: &AppData,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve | Commands::Migrate => {
            return Err("serve and migrate are dispatched by main".into());
        }
        Commands::Cleanup => {
            cleanup::run_cleanup(app_data).await;
        }
        Commands::Allowlist(allowlist_cmd) => match allowlist_cmd {
            AllowlistCommands::Add {
                ip,
                description,
                expires_at,
                actor,
            } => {
                allowlist::add_entry(&app_data.allowlist_service, &actor, &ip, description, expires_at).await?;
            }
            AllowlistCommands::Remove { ip, actor } => {
                allowlist::remove_entry(&app_data.allowlist_service, &actor, &ip).await?;
            }
            AllowlistCommands::List { include_inactive } => {
                allowlist::list_entries(&app_data.allowlist_service, include_inactive).await?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["admin-trust-backend"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_allowlist_add_parses_expiry() {
        let cli = Cli::try_parse_from([
            "admin-trust-backend",
            "allowlist",
            "add",
            "203.0.113.5",
            "--description",
            "office",
            "--expires-at",
            "2030-01-01T00:00:00Z",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Allowlist(AllowlistCommands::Add { ip, description, expires_at, actor })) => {
                assert_eq!(ip, "203.0.113.5");
                assert_eq!(description.as_deref(), Some("office"));
                assert!(expires_at.is_some());
                assert_eq!(actor, "cli");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bad_expiry_is_rejected() {
        assert!(Cli::try_parse_from(["admin-trust-backend", "allowlist", "add", "1.2.3.4", "--expires-at", "soon"]).is_err());
    }
}
