use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockyard::cli::{AdminCommands, run_info, run_init, run_seed_invites};
use stockyard::config;
use stockyard::server::{AppState, create_router};
use stockyard::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "stockyard")]
#[command(about = "Multi-tenant inventory and accounting server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (overrides stockyard.toml)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides stockyard.toml)
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and stockyard.toml
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://app.example.com").
        /// Used for magic links. If not set, URLs are derived from request headers.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stockyard=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
                superadmin_email,
                company,
            } => {
                run_init(data_dir, non_interactive, superadmin_email, company)?;
            }
            AdminCommands::SeedInvites {
                data_dir,
                emails,
                company,
                ttl_hours,
                json,
            } => {
                run_seed_invites(data_dir, emails, company, ttl_hours, json)?;
            }
            AdminCommands::Info { data_dir, json } => {
                run_info(data_dir, json)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let mut config = config::load(&PathBuf::from(data_dir))?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if public_base_url.is_some() {
                config.public_base_url = public_base_url;
            }

            let db_path = config.db_path();
            if !db_path.exists() {
                bail!(
                    "Server not initialized. Run 'stockyard admin init' first to create the database."
                );
            }

            let store = SqliteStore::new(&db_path)?;
            store.initialize()?;

            let addr = config.socket_addr()?;
            let state = Arc::new(AppState::new(Arc::new(store), config));
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
