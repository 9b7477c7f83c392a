use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

use smm_console::api::ApiClient;
use smm_console::config;
use smm_console::notify::{self, Notifier};
use smm_console::services::Services;
use smm_console::session::SessionStore;

mod handlers;

#[derive(Debug, Parser)]
#[command(author, version, about = "Admin console for the social-media management backend")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: handlers::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let client = ApiClient::from_config(&cfg)?;
    debug!(?client, "api client ready");

    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let services = Services::new(
        Arc::new(client),
        notifier,
        Arc::new(handlers::TerminalConfirmer {
            assume_yes: args.yes,
        }),
    );
    let console = handlers::Console {
        session: SessionStore::new(cfg.session_path()),
        cfg,
        services,
    };

    let result = handlers::run(&console, args.command).await;

    for notice in notify::drain(&mut notices) {
        eprintln!("[{}] {}", notice.level, notice.message);
    }
    if let Err(err) = &result {
        error!(?err, "command failed");
    }
    result
}
