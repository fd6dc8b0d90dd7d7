//!
//! workroom server binary
//! -----------------------
//! Command-line entry point for the workroom HTTP API. Configuration comes from
//! environment variables; `--port` and `--db-uri` override them.

use anyhow::Result;
use std::env;

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("workroom Server\n\nUSAGE:\n  workroom_server [--port N] [--db-uri URI]\n\nOPTIONS:\n  --port N        HTTP port (env: PORT, default 8000)\n  --db-uri URI    memory:// or a data directory (env: DB_URI, default memory://)\n\nENVIRONMENT:\n  ACCESS_TOKEN_SECRET   token signing secret (required)\n  DB_NAME               database name (default todo-web)\n  ALLOWED_ORIGINS       comma separated CORS allow-list\n  STRIPE_SECRET_KEY, MAIL_USER, MAIL_PASS   collaborator credentials\n");
        return Ok(());
    }

    let mut config = workroom::config::Config::from_env()?;
    config.apply_args(&args)?;
    tracing::debug!(?config, "configuration loaded");

    workroom::server::run(config).await
}
