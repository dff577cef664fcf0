use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{error, info, warn};
use modem_restart::{
    config::{AppConfig, ApplianceConfig},
    restart_client::{CommandRestartDriver, restart_and_settle},
    services::{
        connectivity::LayeredCheck,
        monitor::{ConnectivityMonitor, MonitorOutcome},
        notification::DesktopNotifier,
    },
};
use std::{io::Write, process::ExitCode};

const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(outcome) => exit_code(&outcome),
        Err(e) => {
            error!("application error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<MonitorOutcome> {
    initialize();

    let config = AppConfig::load().context("failed to load configuration")?;
    log::debug!("configuration: {config:?}");

    restart_appliance(&config.appliance).await?;

    let check =
        LayeredCheck::from_config(&config.probe).context("failed to create connectivity check")?;
    let notifier = DesktopNotifier::new(&config.notification.icon, config.notification.timeout);
    let monitor = ConnectivityMonitor::new(check, notifier, config.poll.clone());

    let outcome = monitor
        .wait_for_internet_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for ctrl-c: {e:#}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(outcome)
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!(
        "module version: {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_SHORT_REV")
    );
}

async fn restart_appliance(appliance: &ApplianceConfig) -> Result<()> {
    let Some(command_line) = &appliance.restart_command else {
        warn!("RESTART_COMMAND not set, skipping modem restart");
        return Ok(());
    };

    let driver = CommandRestartDriver::new(command_line, appliance.clone())?;
    restart_and_settle(&driver, appliance.settle_delay).await
}

fn exit_code(outcome: &MonitorOutcome) -> ExitCode {
    if outcome.restored() {
        ExitCode::SUCCESS
    } else if outcome.cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else {
        ExitCode::FAILURE
    }
}
