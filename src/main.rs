//! # WaSender CLI
//!
//! Bulk and single WhatsApp sender with a throttled dispatch scheduler.
//!
//! Usage:
//!   wasender serve                     # Start the session and the HTTP API
//!   wasender serve --backend dry-run   # Rehearse without a paired phone
//!   wasender info                      # Show system info
//!   wasender config show               # Show configuration
//!   wasender config init               # Write a default config file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wasender_core::SenderConfig;
use wasender_core::types::ConnectionState;
use wasender_gateway::AppState;

#[derive(Parser)]
#[command(
    name = "wasender",
    version,
    about = "📨 WaSender — bulk and single WhatsApp sender",
    long_about = "Pairs a WhatsApp Web session through a bridge and exposes an HTTP API\nfor single sends and throttled, personalized bulk dispatch."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the messaging session and the HTTP API
    Serve {
        /// Override listening port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override session backend (bridge | dry-run)
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "wasender=debug,wasender_core=debug,wasender_channels=debug,wasender_scheduler=debug,wasender_gateway=debug,tower_http=debug"
    } else {
        "wasender=info,wasender_core=info,wasender_channels=info,wasender_scheduler=info,wasender_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref().map(PathBuf::from);

    match cli.command {
        Commands::Serve { port, backend } => {
            let mut config = load_config(config_path.as_deref())?;
            if let Some(p) = port {
                config.gateway.port = p;
            }
            if let Some(b) = backend {
                config.session.backend = b;
            }
            serve(config).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(config_path.as_deref())?;
                let content = toml::to_string_pretty(&config)?;
                println!("{content}");
            }
            ConfigAction::Init { force } => {
                let path = config_path.unwrap_or_else(SenderConfig::default_path);
                if path.exists() && !force {
                    println!("⚠️  Config already exists: {} (use --force to overwrite)", path.display());
                    return Ok(());
                }
                SenderConfig::default().save_to(&path)?;
                println!("✅ Config saved to: {}", path.display());
            }
        },

        Commands::Info => {
            let config = load_config(config_path.as_deref())?;
            println!("📨 WaSender v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            let shown = config_path.unwrap_or_else(SenderConfig::default_path);
            println!("   Config: {}", shown.display());
            println!("   Backend: {}", config.session.backend);
            if config.session.backend == "bridge" {
                println!("   Bridge: {}", config.session.bridge_url);
            }
            println!("   Auth dir: {}", config.auth_dir().display());
            println!("   API: http://{}:{}", config.gateway.host, config.gateway.port);
            println!("   Country code: +{}", config.dispatch.country_code);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<SenderConfig> {
    Ok(match path {
        Some(p) => SenderConfig::load_from(p)?,
        None => SenderConfig::load()?,
    })
}

async fn serve(config: SenderConfig) -> Result<()> {
    println!("📨 WaSender v{}", env!("CARGO_PKG_VERSION"));
    println!("   Backend: {} | API: http://{}:{}", config.session.backend, config.gateway.host, config.gateway.port);

    let session = wasender_channels::open_session(&config.session)?;
    tracing::info!("Session client: {}", session.client_name());

    // Surface pairing and connection changes in the log.
    let mut updates = session.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match snapshot.state {
                ConnectionState::PairingPending => {
                    tracing::info!("📱 QR code ready, scan it from GET /api/status");
                }
                ConnectionState::Authenticated => tracing::info!("🔑 Authenticated"),
                ConnectionState::Ready => tracing::info!("✅ WhatsApp ready"),
                ConnectionState::Disconnected => tracing::warn!(
                    "WhatsApp disconnected: {}",
                    snapshot.last_error.as_deref().unwrap_or("unknown reason")
                ),
                ConnectionState::Uninitialized => tracing::info!("Initializing session..."),
            }
        }
    });

    if let Err(e) = session.start().await {
        tracing::warn!("Session did not start ({e}); POST /api/restart to retry");
    }

    let state = Arc::new(AppState::new(&config, Arc::clone(&session)));
    let scheduler = state.scheduler.clone();

    wasender_gateway::start_server(state, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown requested");
    })
    .await?;

    let cancelled = scheduler.cancel_all().await;
    if cancelled > 0 {
        tracing::warn!("Cancelled {cancelled} running job(s)");
    }
    session.shutdown().await;
    println!("\n👋 WaSender stopped.");
    Ok(())
}
