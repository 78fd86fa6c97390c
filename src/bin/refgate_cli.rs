use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{self, EnvFilter};

use refgate::config::Config;
use refgate::git::repository_manager::open_local_repository;
use refgate::git::{RefStore, RepositoryHandle};
use refgate::policy::name::expand_path;
use refgate::policy::{Principal, ReferenceName};
use refgate::services::{self, MutationContext, RefOutcome};

#[derive(Parser)]
#[command(author, version, about = "Inspect and change git references through refgate's policy checks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path of the repository to operate on
    #[arg(short = 'C', long, global = true, default_value = ".")]
    repository: PathBuf,

    /// Repository name used to match protection rules and render URLs
    #[arg(short, long, global = true, default_value = "local/repository")]
    name: String,

    /// Config file supplying protection rules
    #[arg(short, long, global = true, env = "REFGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Acting user
    #[arg(short, long, global = true, env = "USER", default_value = "refgate")]
    user: String,

    /// Teams of the acting user
    #[arg(short, long, global = true, value_delimiter = ',')]
    teams: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List references, optionally only those below a prefix
    ListRefs {
        /// Prefix such as `heads/` or `refs/tags/v1`
        #[arg(default_value = "")]
        filter: String,
    },
    /// Create a reference
    CreateRef {
        /// Fully qualified reference name, e.g. `refs/heads/feature`
        ref_name: String,
        /// Commit-ish the reference should point at
        target: String,
        /// Message; creates an annotated tag in the tag namespace
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Point an existing reference at a new target
    UpdateRef {
        /// Reference name, with or without `refs/`
        ref_name: String,
        /// New target; empty deletes the reference
        target: String,
    },
    /// Delete a reference
    DeleteRef {
        /// Reference name, with or without `refs/`
        ref_name: String,
    },
    /// Check whether a reference name would be accepted
    CheckName {
        ref_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let protection = config.protection_store()?;
    let api_url = format!(
        "{}/repos/{}",
        config.api_base_url.trim_end_matches('/'),
        cli.name
    );

    let repository = open_local_repository(
        cli.repository.clone(),
        &cli.name,
        &api_url,
        Some(config.git_binary.clone()),
    )
    .with_context(|| format!("cannot open {}", cli.repository.display()))?;

    let principal = Principal::new(cli.user.clone()).with_teams(cli.teams.clone());
    let ctx = MutationContext {
        repository: &repository,
        protection: &protection,
        principal: &principal,
        noreply_domain: &config.noreply_domain,
    };

    match cli.command {
        Commands::ListRefs { filter } => {
            let listing = services::list_refs(&repository, &filter).await?;
            print_json(&listing)
        }
        Commands::CreateRef {
            ref_name,
            target,
            message,
        } => {
            let outcome = services::create_ref(&ctx, &ref_name, &target, message.as_deref()).await?;
            print_outcome(outcome)
        }
        Commands::UpdateRef { ref_name, target } => {
            let outcome = services::update_ref(&ctx, &expand_path(&ref_name), &target).await?;
            print_outcome(outcome)
        }
        Commands::DeleteRef { ref_name } => {
            let outcome = services::delete_ref(&ctx, &expand_path(&ref_name)).await?;
            print_outcome(outcome)
        }
        Commands::CheckName { ref_name } => check_name(&repository, &ref_name).await,
    }
}

async fn check_name(repository: &RepositoryHandle, ref_name: &str) -> Result<()> {
    let name = ReferenceName::parse(ref_name)?;
    if !repository.store.is_valid_ref_name(name.as_str()).await? {
        anyhow::bail!("'{}' is not a valid reference name", name);
    }
    println!("{} ({})", name, name.namespace());
    Ok(())
}

fn print_outcome(outcome: RefOutcome) -> Result<()> {
    match outcome.record() {
        Some(record) => print_json(record),
        None => {
            eprintln!("Deleted.");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
