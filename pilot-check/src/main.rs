//! pilot-check - Report configuration and service reachability

use clap::Parser;
use libpostpilot::check::{probe_services, ServiceCheck};
use libpostpilot::config::ConfigSummary;
use libpostpilot::logging::LoggingConfig;
use libpostpilot::transport::ReqwestTransport;
use libpostpilot::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "pilot-check")]
#[command(version)]
#[command(about = "Show the effective configuration and check service credentials")]
#[command(long_about = "\
pilot-check - Show configuration and check services

DESCRIPTION:
    Prints the effective configuration with every credential redacted and
    which services are configured. With --probe it also queries the Notion
    database, fetches each configured platform account and the LINE bot
    profile. Nothing is published.

EXIT CODES:
    0 - Success (all probed services answered)
    1 - A probed service failed
    2 - Configuration error
")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Contact every configured service
    #[arg(long)]
    probe: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct CheckReport {
    config: ConfigSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<ServiceCheck>>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Returns whether every probed service answered.
async fn run(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load()?,
    };

    if let Err(e) = LoggingConfig::from_settings(&config.logging, cli.verbose).init() {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let services = if cli.probe {
        let transport = Arc::new(ReqwestTransport::new(config.publishing.request_timeout())?);
        Some(probe_services(&config, transport).await)
    } else {
        None
    };
    let all_ok = services
        .as_ref()
        .map_or(true, |checks| checks.iter().all(|c| c.ok));

    let report = CheckReport {
        config: config.redacted_summary(),
        services,
    };

    if cli.format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Could not serialize check report: {}", e),
        }
    } else {
        print_text(&report);
    }

    Ok(all_ok)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn print_text(report: &CheckReport) {
    let c = &report.config;
    println!("Configuration valid: {}", yes_no(c.config_valid));
    println!(
        "Source configured:   {} (database {})",
        yes_no(c.source_configured),
        c.source_database_id.as_deref().unwrap_or("-")
    );
    println!("Notifier configured: {}", yes_no(c.notifier_configured));
    println!("Facebook configured: {}", yes_no(c.facebook_configured));
    println!("Instagram configured: {}", yes_no(c.instagram_configured));
    println!("Threads configured:  {}", yes_no(c.threads_configured));
    println!("Media directory:     {}", c.temp_media_dir);
    println!(
        "Size caps:           image {} MB, video {} MB",
        c.max_image_size_mb, c.max_video_size_mb
    );
    println!(
        "Public media URL:    {}",
        c.public_base_url.as_deref().unwrap_or("- (local file URLs)")
    );
    println!("Log level:           {}", c.log_level);

    if let Some(services) = &report.services {
        println!();
        for check in services {
            let mark = if check.ok { "✓" } else { "✗" };
            println!("{} {}: {}", mark, check.service, check.message);
        }
    }
}
