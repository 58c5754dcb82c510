use clap::Parser;
use repo_introspector::cache::{MemoryReportStore, ReportStore, SqliteReportStore};
use repo_introspector::{create_app, logging, Config, IntrospectService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Repository analytics service
#[derive(Debug, Parser)]
#[command(name = "repo-introspector", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite report database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Keep reports in memory instead of SQLite
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(db) = args.db {
        config.server.database_path = db;
    }
    if let Some(level) = args.log_level {
        config.server.log_level = level;
    }

    logging::init(&config.server.log_level)?;
    config.validate()?;

    if config.github_token().is_err() {
        warn!("GITHUB_TOKEN not set, requests are unauthenticated and heavily rate limited");
    }

    let store: Arc<dyn ReportStore> = if args.in_memory {
        info!("using in-memory report store");
        Arc::new(MemoryReportStore::new())
    } else {
        Arc::new(SqliteReportStore::open(&config.server.database_path)?)
    };

    let bind_addr = config.server.bind_addr.clone();
    let service = Arc::new(IntrospectService::new(config, store)?);
    let app = create_app(service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
