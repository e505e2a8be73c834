//! pilot-run - Publish every due post once

use clap::Parser;
use libpostpilot::logging::{LogFormat, LoggingConfig};
use libpostpilot::{Config, Orchestrator, PilotError, PostStatus, Result, RunReport};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "pilot-run")]
#[command(version)]
#[command(about = "Publish scheduled posts from Notion to Facebook, Instagram and Threads")]
#[command(long_about = "\
pilot-run - Publish scheduled posts

DESCRIPTION:
    Reads every post whose status is pending and whose publish date has
    passed, publishes it to its target platforms, writes the outcome back
    to the database and sends a LINE notification. Intended to be run from
    cron or a systemd timer.

CONFIGURATION:
    Configuration file: ~/.config/postpilot/config.toml
    Override the location with POSTPILOT_CONFIG or --config.
    NOTION_API_KEY, LINE_CHANNEL_ACCESS_TOKEN and the other deployment
    variables override file values.

EXIT CODES:
    0 - Run completed or skipped (individual post failures are reported)
    1 - Run failed
    2 - Configuration error
    3 - Invalid input
")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Report format: text or json
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Log format on stderr: text, json or pretty (overrides the config file)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<String>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load()?,
    };

    let mut logging = LoggingConfig::from_settings(&config.logging, cli.verbose);
    if let Some(format) = &cli.log_format {
        let format: LogFormat = format.parse().map_err(PilotError::InvalidInput)?;
        logging = logging.with_format(format);
    }
    if let Err(e) = logging.init() {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    let report = orchestrator.run().await?;

    if cli.format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Could not serialize run report: {}", e),
        }
    } else {
        print_text(&report);
    }

    Ok(())
}

fn print_text(report: &RunReport) {
    if report.skipped {
        println!("Run {} skipped: another run is in progress", report.run_id);
        return;
    }
    if report.posts.is_empty() {
        println!("Run {}: no pending posts", report.run_id);
        return;
    }

    for post in &report.posts {
        let mut line = format!("{} | {} | {}", post.post_id, post.title, post.status);
        if !post.outcome.succeeded.is_empty() {
            line.push_str(&format!(" | ok: {}", post.outcome.succeeded.join(", ")));
        }
        if let Some(error) = &post.outcome.error {
            line.push_str(&format!(" | {}", error));
        }
        println!("{}", line);
    }
    println!(
        "Run {}: {} published, {} partially published, {} failed",
        report.run_id,
        report.count(PostStatus::Published),
        report.count(PostStatus::PartiallyPublished),
        report.count(PostStatus::PublishFailed)
    );
}
