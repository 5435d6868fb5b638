//! `wxalert` binary entrypoint.
//!
//! Runs one notification cycle (or a verification pass) and exits. Meant to
//! be scheduled from cron or a CI workflow.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};

use wxalert_service::config::{self, AppConfig, ConfigError};
use wxalert_service::ingest::drk7::Drk7Feed;
use wxalert_service::logging::{self, LogFormat};
use wxalert_service::model::{DeliveryError, FetchError};
use wxalert_service::notify::slack::SlackWebhook;
use wxalert_service::runner::{RunError, RunOptions, Runner};
use wxalert_service::verify;

#[derive(Debug, Parser)]
#[command(name = "wxalert", version, about = "Weather forecast alerts to Slack")]
struct Cli {
    /// Path to the TOML settings file
    #[arg(long, env = "WXALERT_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Evaluate alerts and print messages without sending or recording them
    #[arg(long)]
    dry_run: bool,

    /// Ignore today's notification history
    #[arg(long)]
    force: bool,

    /// Check every location against the live feed instead of notifying
    #[arg(long)]
    verify: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build feed client: {0}")]
    FeedClient(FetchError),
    #[error("failed to build webhook client: {0}")]
    WebhookClient(DeliveryError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("no configured location is reachable")]
    VerificationFailed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "wxalert failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config::load_config(&cli.config)?;
    info!(
        locations = config.locations.len(),
        rain = config.rain_notify.enabled,
        weather = config.weather_notify.enabled,
        "configuration loaded"
    );

    let feed = Drk7Feed::new(config.http.timeout(), config.http.retry_policy())
        .map_err(CliError::FeedClient)?;

    if cli.verify {
        return run_verify(&config, &feed);
    }

    let notifier = SlackWebhook::new(
        config.slack_webhook_url.clone(),
        config.http.timeout(),
        config.http.retry_policy(),
    )
    .map_err(CliError::WebhookClient)?;

    let options = RunOptions::new(cli.dry_run, cli.force);
    if options.dry_run {
        info!("dry run: notifications will be printed, not sent");
    }

    let summary = Runner::new(&config, &feed, &notifier).run_cycle(&options)?;
    info!(
        sent = summary.sent,
        suppressed = summary.suppressed,
        skipped = summary.skipped_locations,
        previews = summary.previews,
        "done"
    );
    Ok(())
}

fn run_verify(config: &AppConfig, feed: &Drk7Feed) -> Result<(), CliError> {
    let report = verify::run_verification(config, feed);
    verify::print_summary(&report);

    if report.summary.working == 0 {
        return Err(CliError::VerificationFailed);
    }
    Ok(())
}
