//! portalsync CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use portalsync::{
    commands::{
        cmd_init, cmd_run, cmd_status, cmd_sync, cmd_tenant_add, cmd_tenant_list,
        cmd_tenant_set_enabled, cmd_tenant_set_folder, print_status, print_sync_stats,
        print_tenants,
    },
    config::Config,
    db::NewTenant,
    error::Result,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "portalsync")]
#[command(version, about = "Multi-tenant content sync service", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize portalsync configuration and database
    Init {
        /// Base directory for config and database (default ~/.portalsync)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the sync service until interrupted
    Run,

    /// Run one sync cycle and exit
    Sync {
        /// Only sync this tenant
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Manage tenants
    Tenants {
        #[command(subcommand)]
        action: TenantAction,
    },

    /// Show service status and recent activity
    Status,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Register a new tenant with the default folder set
    Add {
        /// Unique tenant key (e.g. 'springfield')
        key: String,

        /// Display name (e.g. 'City of Springfield')
        name: String,

        /// Directory where fragments are written
        #[arg(long)]
        output_dir: String,

        /// Website domain
        #[arg(long)]
        domain: Option<String>,

        /// Opaque credential reference passed to the content source
        #[arg(long)]
        credential_ref: Option<String>,
    },

    /// List registered tenants
    List {
        /// Only show tenants with sync enabled
        #[arg(long)]
        enabled_only: bool,
    },

    /// Enable sync for a tenant
    Enable { key: String },

    /// Disable sync for a tenant
    Disable { key: String },

    /// Point one of a tenant's folders at an external source folder
    SetFolder {
        key: String,
        folder: String,
        source_folder_id: String,

        /// Leave the folder disabled after setting the source
        #[arg(long)]
        disabled: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { base_dir, force } => {
            let config = cmd_init(base_dir, force).await?;
            if cli.json {
                println!(
                    r#"{{"status": "ok", "base_dir": "{}"}}"#,
                    config.paths.base_dir.display()
                );
            } else {
                println!("✓ Initialized at {}", config.paths.base_dir.display());
                println!("\nNext steps:");
                println!("  1. Register tenants with 'portalsync tenants add'");
                println!("  2. Point folders at source ids with 'portalsync tenants set-folder'");
                println!("  3. Start the service with 'portalsync run'");
            }
        }

        Commands::Run => {
            let config = load_config(cli.config.as_deref())?;
            cmd_run(&config).await?;
        }

        Commands::Sync { tenant } => {
            let config = load_config(cli.config.as_deref())?;
            let stats = cmd_sync(&config, tenant.as_deref()).await?;
            if cli.json {
                println!(
                    r#"{{"tenants": {}, "success": {}, "error": {}}}"#,
                    stats.tenants, stats.success, stats.error
                );
            } else {
                print_sync_stats(&stats);
            }
        }

        Commands::Tenants { action } => {
            let config = load_config(cli.config.as_deref())?;
            handle_tenants(&config, action, cli.json).await?;
        }

        Commands::Status => {
            let config = load_config(cli.config.as_deref())?;
            let report = cmd_status(&config).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn handle_tenants(config: &Config, action: TenantAction, json: bool) -> Result<()> {
    match action {
        TenantAction::Add {
            key,
            name,
            output_dir,
            domain,
            credential_ref,
        } => {
            let tenant = cmd_tenant_add(
                config,
                &NewTenant {
                    tenant_key: key,
                    name,
                    output_dir,
                    domain,
                    credential_ref,
                    metadata: None,
                },
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&tenant)?);
            } else {
                println!("✓ Registered tenant '{}' ({})", tenant.tenant_key, tenant.name);
                println!("  Default folders initialized; point them at source ids with:");
                println!(
                    "  portalsync tenants set-folder {} <folder> <source-folder-id>",
                    tenant.tenant_key
                );
            }
        }

        TenantAction::List { enabled_only } => {
            let tenants = cmd_tenant_list(config, enabled_only).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tenants)?);
            } else {
                print_tenants(&tenants);
            }
        }

        TenantAction::Enable { key } => {
            cmd_tenant_set_enabled(config, &key, true).await?;
            println!("✓ Sync enabled for '{}'", key);
        }

        TenantAction::Disable { key } => {
            cmd_tenant_set_enabled(config, &key, false).await?;
            println!("✓ Sync disabled for '{}'", key);
        }

        TenantAction::SetFolder {
            key,
            folder,
            source_folder_id,
            disabled,
        } => {
            cmd_tenant_set_folder(config, &key, &folder, &source_folder_id, !disabled).await?;
            println!("✓ Folder '{}' now tracks source folder '{}'", folder, source_folder_id);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'portalsync init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
