use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use taskbot::commands::CommandEnvelope;
use taskbot::config::BotConfig;
use taskbot::health::start_health_server;
use taskbot::observability::setup_logging;
use taskbot::store::{MemoryStore, NotionStore, TaskStore};
use taskbot::AppContext;

#[derive(Parser)]
#[command(
    name = "taskbot",
    about = "Chat-command task bot synchronized with an external document store",
    version
)]
struct Args {
    /// Data directory holding config.toml
    #[arg(long, env = "TASKBOT_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Base URL of the external document store API
    #[arg(long, env = "TASKBOT_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Bearer token for the external store (omit to run against the
    /// in-memory store)
    #[arg(long, env = "TASKBOT_TOKEN")]
    token: Option<String>,

    /// Database id holding the task pages
    #[arg(long, env = "TASKBOT_DATABASE_ID")]
    database_id: Option<String>,

    /// Command prefix (default: $)
    #[arg(long, env = "TASKBOT_PREFIX")]
    prefix: Option<String>,

    /// Keep-alive HTTP endpoint port
    #[arg(long, env = "TASKBOT_HEALTH_PORT")]
    health_port: Option<u16>,

    /// Bind address for the keep-alive endpoint (default: 127.0.0.1)
    #[arg(long, env = "TASKBOT_BIND")]
    bind_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKBOT_LOG")]
    log: Option<String>,

    /// Display name used by listMyTasks on the local gateway
    #[arg(long, env = "TASKBOT_AUTHOR", default_value = "operator")]
    author: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(BotConfig::new(
        args.data_dir.as_deref(),
        args.api_base_url,
        args.token,
        args.database_id,
        args.prefix,
        args.health_port,
        args.bind_address,
        args.log,
    ));

    let _log_guard = setup_logging(
        &config.log_level,
        config.log_file.as_deref(),
        &config.log_format,
    );

    let store: Arc<dyn TaskStore> = if config.store_configured() {
        let token = config.store_token.clone().unwrap_or_default();
        let database_id = config.database_id.clone().unwrap_or_default();
        info!(base_url = %config.api_base_url, "using external document store");
        Arc::new(NotionStore::new(&config.api_base_url, token, database_id)?)
    } else {
        warn!("no store token configured — using the in-memory store");
        Arc::new(MemoryStore::new())
    };

    let ctx = Arc::new(AppContext::new(config, store));

    // Keep-alive endpoint runs for the lifetime of the process.
    let health_ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_ctx).await {
            warn!(error = %e, "health server exited");
        }
    });

    run_gateway(&ctx, &args.author).await
}

/// Local command gateway: one command line in, one reply out, strictly in
/// sequence. A chat-platform gateway would feed the dispatcher the same
/// envelopes.
async fn run_gateway(ctx: &AppContext, author: &str) -> Result<()> {
    info!(prefix = %ctx.config.command_prefix, "taskbot ready — reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let envelope = CommandEnvelope {
            author: author.to_string(),
            line,
        };
        if let Some(reply) = ctx.dispatcher.handle(&envelope).await {
            println!("{reply}");
        }
    }
    info!("input closed — shutting down");
    Ok(())
}
