use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt};

use refgate::api::AppState;
use refgate::config::Config;
use refgate::transport::HttpServerApp;

#[derive(Parser)]
#[command(author, version, about = "HTTP API for policy-checked git reference updates", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Config file (defaults to <config dir>/refgate/config.toml)
        #[arg(short, long, env = "REFGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Address to bind the HTTP server to (overrides `listen`)
        #[arg(short, long)]
        listen: Option<String>,

        /// Directory holding `{owner}/{repo}.git` repositories (overrides `repositories-root`)
        #[arg(short, long, env = "REFGATE_REPOSITORIES_ROOT")]
        repositories_root: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            repositories_root,
            debug,
        } => run_http_server(config, listen, repositories_root, debug).await,
    }
}

async fn run_http_server(
    config_path: Option<PathBuf>,
    listen: Option<String>,
    repositories_root: Option<PathBuf>,
    debug: bool,
) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(listen) = listen {
        config.listen = listen;
    }
    if let Some(root) = repositories_root {
        config.repositories_root = Some(root);
    }

    let addr = config.listen_addr()?;
    let repositories = config.repository_manager()?;
    let protection = config.protection_store()?;

    tracing::info!(
        "Serving repositories from {}",
        repositories.repositories_root().display()
    );
    tracing::info!(
        "{} protected tag rule(s), {} protected branch(es)",
        config.protected_tags.len(),
        config.protected_branches.len()
    );

    let state = AppState {
        repositories,
        protection: Arc::new(protection),
        noreply_domain: config.noreply_domain.clone(),
    };

    HttpServerApp::new(addr, state).serve().await
}
