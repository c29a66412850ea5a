//! Briefing Publisher CLI
//!
//! Generates today's briefing and pushes it to the hosting repository.
//! Runs with no arguments; the flags only override defaults.

use std::path::PathBuf;

use clap::Parser;

use briefing_publisher::{ProjectPaths, Publisher, PublisherConfig, Result};

#[derive(Parser)]
#[command(name = "briefing-publisher")]
#[command(version)]
#[command(about = "Generate the daily briefing and publish it")]
struct Cli {
    /// Config file (default: briefing.toml in the project root, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project root (default: parent of the directory holding this binary)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Commit the briefing but do not push it
    #[arg(long)]
    no_push: bool,

    /// Print the run report as JSON after the status lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "publish failed");
        eprintln!("Publish failed: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut paths = ProjectPaths::discover()?;
    if let Some(root) = &cli.project_root {
        paths = paths.with_project_root(root)?;
    }

    let mut config = PublisherConfig::load(cli.config.as_deref(), &paths.project_root)?;
    if cli.project_root.is_none() {
        if let Some(root) = &config.project_root {
            paths = paths.with_project_root(root)?;
        }
    }
    if cli.no_push {
        config.git.push = false;
    }

    tracing::debug!(
        tool_dir = ?paths.tool_dir,
        project_root = ?paths.project_root,
        "resolved paths"
    );

    let publisher = Publisher::prepare(config, paths.project_root)?;
    let mut stdout = std::io::stdout();
    let report = publisher.run(&mut stdout).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
