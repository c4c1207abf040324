use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use famcal_core::{AppError, Config};
use famcal_widgets::{
    FamilyEventsProvider, NextEventProvider, RefreshContext, TimelineEntry, TimelineProvider,
    WidgetHost,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "famcal")]
#[command(about = "Refresh family calendar widgets and print their timeline entries as JSON")]
struct Cli {
    /// Config file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next upcoming event
    Next {
        /// Only this member's events (shared calendar events still win)
        #[arg(short, long)]
        member: Option<String>,
    },
    /// Show upcoming family events grouped by day and month
    List,
    /// Keep refreshing both widgets until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    famcal_core::init()?;
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let ctx = RefreshContext::from_config(&config);

    match cli.command {
        Commands::Next { member } => {
            let target = member.or_else(|| config.widgets.target_member.clone());
            let provider = NextEventProvider::new(target);
            report(&refresh_once(provider, ctx).await?)
        }
        Commands::List => report(&refresh_once(FamilyEventsProvider, ctx).await?),
        Commands::Watch => watch(&config, ctx).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::load_validated()?.0);
    };

    let config = Config::load_from(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let validation = config.validate();
    if !validation.is_valid() {
        anyhow::bail!(
            "Configuration validation failed: {}",
            validation.error_summary()
        );
    }
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }
    Ok(config)
}

/// Refreshes block on SQLite, so they run off the async workers.
async fn refresh_once<P>(provider: P, ctx: RefreshContext) -> Result<TimelineEntry>
where
    P: TimelineProvider + 'static,
{
    tokio::task::spawn_blocking(move || provider.refresh(&ctx, Utc::now()))
        .await
        .context("Refresh task failed")
}

fn print_entry(entry: &TimelineEntry) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(entry)?);
    Ok(())
}

/// Print a one-shot refresh. A broken setup fails the command; empty states do not.
fn report(entry: &TimelineEntry) -> Result<()> {
    print_entry(entry)?;
    match entry.error() {
        Some(error) if !error.is_empty_state() => Err(AppError::from(error.clone()).into()),
        _ => Ok(()),
    }
}

async fn watch(config: &Config, ctx: RefreshContext) -> Result<()> {
    let host = WidgetHost::new(ctx)
        .with_provider(NextEventProvider::new(config.widgets.target_member.clone()))
        .with_provider(FamilyEventsProvider);

    let (tx, mut rx) = mpsc::channel(host.len().max(1));
    let cancel = CancellationToken::new();
    let host_task = tokio::spawn(host.run(tx, cancel.clone()));

    loop {
        tokio::select! {
            entry = rx.recv() => match entry {
                Some(entry) => print_entry(&entry)?,
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, stopping");
                cancel.cancel();
                break;
            }
        }
    }

    host_task.await.context("Widget host task failed")?;
    Ok(())
}
