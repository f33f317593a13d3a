//! Barcode Cache server - answers barcode lookups from a local database,
//! falling back to a remote catalogue

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use barcode_cache::config::{self, CacheConfig};
use barcode_cache::source::{AlmaSource, DataSource, RandomSource};
use barcode_cache::{server, storage, CacheCoordinator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "barcode-cache")]
#[command(version)]
#[command(about = "Local network cache for barcode lookups")]
#[command(long_about = r#"
Barcode Cache answers GET /api/v1/barcode/{barcode} from a local database
(SQLite, PostgreSQL or MySQL). On a miss it asks the Alma catalogue (or a
random-data stand-in when no API key is given) and stores the answer locally.

Example usage:
  barcode-cache --db-type sqlite --port 8080
  barcode-cache --db-type postgres --db-host db.internal --key $ALMA_KEY
  barcode-cache init-config
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Command-line values that take precedence over the config file
#[derive(Args)]
struct Overrides {
    /// Alma API key (without one, random records are served)
    #[arg(long)]
    key: Option<String>,

    /// Service name
    #[arg(long)]
    name: Option<String>,

    /// Listening port (0 = any free port)
    #[arg(long)]
    port: Option<u16>,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long)]
    wait: Option<u64>,

    /// Database type: sqlite, mysql or postgres
    #[arg(long)]
    db_type: Option<String>,

    /// Database name
    #[arg(long)]
    db_name: Option<String>,

    /// Database user name
    #[arg(long)]
    db_user: Option<String>,

    /// Database user password
    #[arg(long)]
    db_pass: Option<String>,

    /// Database host
    #[arg(long)]
    db_host: Option<String>,

    /// Database port
    #[arg(long)]
    db_port: Option<u16>,
}

impl Overrides {
    fn apply(self, config: &mut CacheConfig) {
        if let Some(key) = self.key.filter(|k| !k.is_empty()) {
            config.remote.api_key = Some(key);
        }
        if let Some(name) = self.name {
            config.server.name = name;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(wait) = self.wait {
            config.server.wait_secs = wait;
        }

        let db = &mut config.database;
        if let Some(kind) = self.db_type {
            db.kind = kind;
        }
        if let Some(name) = self.db_name {
            db.name = name;
        }
        if let Some(user) = self.db_user {
            db.user = user;
        }
        if let Some(password) = self.db_pass {
            db.password = password;
        }
        if let Some(host) = self.db_host {
            db.host = host;
        }
        if self.db_port.is_some() {
            db.port = self.db_port;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cache server (default)
    Serve,

    /// Write a config file with default settings
    InitConfig {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::InitConfig { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &CacheConfig::default(), force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Serve => {
            let mut config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
            cli.overrides.apply(&mut config);
            serve(config).await
        }
    }
}

async fn serve(config: CacheConfig) -> anyhow::Result<()> {
    // Startup failures here are configuration errors: abort, don't retry
    let dialect = config.database.dialect()?;
    let params = config.database.connection_params()?;
    let local = storage::open_backend(dialect, &params, config.database.pool_size).await?;

    let remote: Arc<dyn DataSource> = match config.remote.api_key() {
        Some(api_key) => {
            let mut alma = AlmaSource::new(config.remote.endpoint.as_str(), config.remote.timeout())?;
            alma.initialize(api_key).await?;
            Arc::new(alma)
        }
        None => {
            tracing::info!("No API key given; serving random records on a local miss");
            Arc::new(RandomSource::new())
        }
    };

    let coordinator = CacheCoordinator::new(Some(local.clone()), Some(remote.clone()));

    let listener = server::bind(config.server.port).await?;
    let addr = listener.local_addr()?;
    tracing::info!(
        name = %config.server.name,
        port = addr.port(),
        "Service ready: {} on {}",
        config.server.name,
        addr
    );

    let result = server::start_server(listener, coordinator, shutdown_signal(config.server.wait())).await;

    on_shutdown("remote data source", remote.shutdown()).await;
    on_shutdown("local database", local.shutdown()).await;
    result
}

async fn on_shutdown(what: &str, cleanup: impl std::future::Future<Output = ()>) {
    tracing::info!("Shutting down {} ...", what);
    cleanup.await;
    tracing::info!("{} shut down", what);
}

/// Resolves on Ctrl-C, SIGTERM, or after `wait` if one is set
async fn shutdown_signal(wait: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let timeout = async {
        match wait {
            Some(wait) => tokio::time::sleep(wait).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Interrupted"),
        _ = terminate => tracing::info!("Terminated"),
        _ = timeout => tracing::info!("Timeout reached"),
    }
    tracing::info!("Shutting down.");
}
