//! Profile-Throttle main entry point
//!
//! This is the command-line interface for scrapers that cannot link the
//! library directly: each subcommand runs one coordinator operation against
//! the shared state and exits.

use anyhow::Context;
use clap::{Parser, Subcommand};
use profile_throttle::config::load_config_or_default;
use profile_throttle::{AccountKey, Admission, Coordinator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Profile-Throttle: pacing for expensive profile fetches
///
/// Enforces minimum spacing, rate-limit backoff, and a daily cap per account,
/// with state shared across every run that points at the same store.
#[derive(Parser, Debug)]
#[command(name = "profile-throttle")]
#[command(version = "1.0.0")]
#[command(about = "Rate-limit coordinator for profile scraping", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Session file identifying the account
    #[arg(long, value_name = "PATH", conflicts_with = "account", global = true)]
    session: Option<PathBuf>,

    /// Explicit account name
    #[arg(long, value_name = "NAME", global = true)]
    account: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's counters, backoff, and degradation mode
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Block until backoff and spacing allow the next operation
    ///
    /// Exits 0 if the caller may proceed, 2 if it should not start today.
    Wait {
        /// Override the configured minimum spacing (seconds)
        #[arg(long, value_name = "SECONDS")]
        min_delay: Option<u64>,
    },

    /// Record that a profile operation has started
    RecordStart,

    /// Record that the remote service signalled a rate limit
    RecordRateLimit {
        /// Wait suggested by the remote service (seconds)
        #[arg(long, value_name = "SECONDS")]
        wait_seconds: Option<u64>,

        /// Endpoint label for the log line
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_config_or_default(cli.config.as_deref()).with_context(|| {
        format!(
            "failed to load configuration from {}",
            cli.config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<defaults>".to_string())
        )
    })?;
    let coordinator =
        Coordinator::from_config(&config).context("failed to open rate-limit store")?;

    let account = match (&cli.session, &cli.account) {
        (_, Some(name)) => AccountKey::named(name.as_str()),
        (session, None) => AccountKey::for_session(session.as_deref()),
    };
    tracing::debug!("Using account {}", account.short());

    match cli.command {
        Command::Status { json } => handle_status(&coordinator, &account, json),
        Command::Wait { min_delay } => handle_wait(&coordinator, &account, min_delay).await,
        Command::RecordStart => {
            coordinator.record_operation_started(&account);
            println!(
                "Recorded (remaining today: {})",
                coordinator.daily_cap_remaining(&account)
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::RecordRateLimit {
            wait_seconds,
            endpoint,
        } => {
            let outcome = coordinator.record_rate_limit(
                &account,
                wait_seconds.map(Duration::from_secs),
                endpoint.as_deref(),
            );
            println!(
                "Mode: {} (backoff until {})",
                outcome.mode,
                outcome.backoff_until.to_rfc3339()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("profile_throttle=info,warn"),
            1 => EnvFilter::new("profile_throttle=debug,info"),
            2 => EnvFilter::new("profile_throttle=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `status`: prints the account's current pacing state
fn handle_status(
    coordinator: &Coordinator,
    account: &AccountKey,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let state = coordinator.state(account);
    let metrics = state.metrics();
    let backoff = coordinator.backoff_remaining(account);
    let remaining = coordinator.daily_cap_remaining(account);

    if json {
        let report = serde_json::json!({
            "account": account.as_str(),
            "metrics": metrics,
            "backoff_remaining_seconds": backoff.as_secs(),
            "daily_cap_remaining": remaining,
            "state": state,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Account: {}", account.short());
    println!("  Profiles today: {}", metrics.profiles_today);
    println!("  Daily cap remaining: {}", remaining);
    println!(
        "  Rate limits today: {} (lifetime {})",
        metrics.rate_limit_count_today, state.rate_limit_count
    );
    println!("  Degradation mode: {}", metrics.degradation_mode);
    if backoff.is_zero() {
        println!("  Backoff: none");
    } else {
        println!("  Backoff: {}s remaining", backoff.as_secs());
    }

    Ok(ExitCode::SUCCESS)
}

/// Handles `wait`: blocks until allowed, then reports the admission verdict
async fn handle_wait(
    coordinator: &Coordinator,
    account: &AccountKey,
    min_delay: Option<u64>,
) -> anyhow::Result<ExitCode> {
    let min_delay = min_delay
        .map(Duration::from_secs)
        .unwrap_or_else(|| coordinator.config().min_delay());

    tokio::select! {
        waited = coordinator.wait_if_needed_with(account, min_delay) => {
            tracing::info!("Waited {:.1}s", waited.as_secs_f64());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted while waiting; nothing recorded");
            return Ok(ExitCode::from(130));
        }
    }

    match coordinator.admission(account) {
        Admission::Proceed(mode) => {
            println!("proceed {}", mode);
            Ok(ExitCode::SUCCESS)
        }
        Admission::Backoff(remaining) => {
            println!("backoff {}", remaining.as_secs());
            Ok(ExitCode::from(2))
        }
        Admission::Stopped => {
            println!("stopped");
            Ok(ExitCode::from(2))
        }
        Admission::DailyCapReached => {
            println!("daily-cap-reached");
            Ok(ExitCode::from(2))
        }
    }
}
