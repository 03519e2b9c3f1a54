//! HostPulse - one-shot host health check with iMessage alerts
//!
//! Modes:
//! - default: run one monitor cycle (always exits 0 once configured)
//! - `--test`: send a canned message, exit 1 if it cannot be delivered
//! - `--install`: print scheduling instructions, no monitoring

use anyhow::{Context, Result};
use clap::Parser;
use hostpulse_agent::alerts::CooldownStore;
use hostpulse_agent::config::{ConfigLoad, Settings};
use hostpulse_agent::monitor::{self, Monitor, TestAlertOutcome};
use hostpulse_agent::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "hostpulse", author, version, about = "Host health checks with deduplicated alerts")]
struct Args {
    /// Send a test alert to the configured recipient and exit
    #[arg(long, conflicts_with = "install")]
    test: bool,

    /// Print crontab/launchd scheduling instructions and exit
    #[arg(long)]
    install: bool,

    /// Config file (default: $HOSTPULSE_CONFIG, then the OS config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: OS local data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_file = args.log_file.clone().or_else(logging::default_log_path);
    logging::init(log_file.as_deref());

    info!("🩺 HostPulse v{} starting...", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Settings::config_file_path().context("Failed to resolve config location")?,
    };

    if args.install {
        let executable = std::env::current_exe()
            .context("Failed to locate the hostpulse executable")?;
        let platform_default = Settings::platform_config_file_path().ok();
        let config = monitor::scheduled_config_arg(&config_path, platform_default.as_deref());
        println!("{}", monitor::install_instructions(&executable, config));
        return Ok(ExitCode::SUCCESS);
    }

    let settings = match Settings::load_or_bootstrap(&config_path)
        .await
        .context("Failed to load configuration")?
    {
        ConfigLoad::Loaded(settings) => settings,
        ConfigLoad::Created(path) => {
            println!("Created default settings file: {}", path.display());
            println!("Edit 'recipient' in {} to enable iMessage alerts.", path.display());
            return Ok(monitor::bootstrap_status(args.test).into());
        }
    };

    let state_path = settings
        .state_path()
        .context("Failed to resolve cooldown state location")?;
    let monitor = Monitor::new(settings, CooldownStore::new(state_path));
    info!("Monitoring host {} (config: {})", monitor.host(), config_path.display());

    if args.test {
        let outcome = monitor.send_test_alert().await;
        match &outcome {
            TestAlertOutcome::Sent => println!("Test message sent successfully."),
            TestAlertOutcome::NoRecipient => println!(
                "Error: Set 'recipient' in {} before testing.",
                config_path.display()
            ),
            TestAlertOutcome::Failed { diagnostic } => {
                if let Some(diagnostic) = diagnostic {
                    error!("Test alert failed: {}", diagnostic);
                }
                println!("Failed to send test message. Check logs.");
            }
        }
        return Ok(outcome.status().into());
    }

    let report = monitor.run_cycle().await;
    info!("Cycle finished: {:?}", report.outcome);
    Ok(report.status().into())
}
