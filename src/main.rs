use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamlyze_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use streamlyze_server::user::UserAuthTokenStore;
use streamlyze_server::{HistoryStore, SqliteHistoryStore, SqliteUserStore, UserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (user.db and history.db).
    #[clap(value_parser = parse_path)]
    pub db_dir: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Inclusive upload size ceiling in MiB.
    #[clap(long, default_value_t = 250)]
    pub max_upload_mb: u64,

    /// Days a session token may stay unused before it is pruned.
    /// Set to 0 to disable pruning.
    #[clap(long, default_value_t = 90)]
    pub token_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if token_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    if !cli_args.db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", cli_args.db_dir);
    }

    let user_db_path = cli_args.db_dir.join("user.db");
    let history_db_path = cli_args.db_dir.join("history.db");

    info!("Opening SQLite user database at {:?}...", user_db_path);
    let user_store = Arc::new(SqliteUserStore::new(&user_db_path)?);

    info!("Opening SQLite history database at {:?}...", history_db_path);
    let history_store = Arc::new(SqliteHistoryStore::new(&history_db_path)?);

    // Spawn background task for session token pruning if enabled
    if cli_args.token_retention_days > 0 {
        let retention_days = cli_args.token_retention_days;
        let interval_hours = cli_args.prune_interval_hours;
        let pruning_user_store = user_store.clone();

        info!(
            "Token pruning enabled: retaining {} days, pruning every {} hours",
            retention_days, interval_hours
        );

        tokio::spawn(async move {
            let interval = Duration::from_secs(interval_hours * 60 * 60);
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match pruning_user_store.prune_unused_auth_tokens(retention_days) {
                    Ok(count) => {
                        if count > 0 {
                            info!("Pruned {} unused session tokens", count);
                        }
                    }
                    Err(e) => {
                        error!("Failed to prune session tokens: {}", e);
                    }
                }
            }
        });
    }

    let config = ServerConfig {
        requests_logging_level: cli_args.logging_level,
        port: cli_args.port,
        frontend_dir_path: cli_args.frontend_dir_path,
        max_upload_bytes: cli_args.max_upload_mb * 1024 * 1024,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(
        user_store as Arc<dyn UserStore>,
        history_store as Arc<dyn HistoryStore>,
        config,
    )
    .await
}
