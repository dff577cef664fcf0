//! Modem restart driver
//!
//! Navigating the modem web console is left to an external command (usually a
//! browser automation script). This module only runs it with the console
//! credentials exported and enforces the console timeout.

use crate::{common::bounded, config::ApplianceConfig};
use anyhow::{Context, Result, bail, ensure};
use log::info;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::process::Command;
use trait_variant::make;

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait RestartDriver {
    /// Submit the restart; `Ok` means the modem accepted it
    async fn restart(&self) -> Result<()>;
}

/// Submit the restart and give the modem time to go down
///
/// A failed restart is returned without waiting and is not retried.
pub async fn restart_and_settle<D>(driver: &D, settle_delay: Duration) -> Result<()>
where
    D: RestartDriver,
{
    driver.restart().await.context("failed to restart modem")?;

    info!("modem will be active again in approximately 1-2 minutes");
    tokio::time::sleep(settle_delay).await;

    Ok(())
}

pub struct CommandRestartDriver {
    program: PathBuf,
    args: Vec<String>,
    appliance: ApplianceConfig,
}

impl CommandRestartDriver {
    /// Create a driver for a whitespace separated command line
    ///
    /// The command is executed directly, not through a shell.
    ///
    /// # Arguments
    /// * `command_line` - Program followed by its arguments
    /// * `appliance` - Modem console settings exported to the command
    pub fn new(command_line: &str, appliance: ApplianceConfig) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .map(PathBuf::from)
            .context("failed to create restart driver: empty restart command")?;

        Ok(Self {
            program,
            args: parts.collect(),
            appliance,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("APPLIANCE_URL", self.appliance.url.as_str())
            .env("APPLIANCE_USERNAME", &self.appliance.username)
            .env("APPLIANCE_PASSWORD", &self.appliance.password)
            .env(
                "APPLIANCE_TIMEOUT_MS",
                self.appliance.timeout.as_millis().to_string(),
            )
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl RestartDriver for CommandRestartDriver {
    async fn restart(&self) -> Result<()> {
        info!("starting modem restart process...");
        info!("target: {}", self.appliance.url);

        let mut child = self
            .command()
            .spawn()
            .context(format!("failed to spawn restart command {:?}", self.program))?;

        let Some(status) = bounded(self.appliance.timeout, child.wait()).await else {
            bail!(
                "restart command timed out after {} ms",
                self.appliance.timeout.as_millis()
            );
        };
        let status = status.context("failed to wait for restart command")?;

        ensure!(status.success(), "restart command failed with {status}");

        info!("modem restart submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    fn appliance() -> ApplianceConfig {
        ApplianceConfig {
            url: Url::parse("http://192.168.1.1/").unwrap(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(5),
            restart_command: None,
            settle_delay: Duration::ZERO,
        }
    }

    mod new {
        use super::*;

        #[test]
        fn splits_program_and_arguments() {
            let driver = CommandRestartDriver::new("node restart.js --headless", appliance())
                .unwrap();

            assert_eq!(driver.program, PathBuf::from("node"));
            assert_eq!(driver.args, vec!["restart.js", "--headless"]);
        }

        #[test]
        fn rejects_empty_command() {
            let result = CommandRestartDriver::new("   ", appliance());
            assert!(result.is_err());
        }
    }

    mod settle {
        use super::*;
        use tokio::time::Instant;

        #[tokio::test(start_paused = true)]
        async fn waits_settle_delay_after_restart() {
            let mut driver = MockRestartDriver::new();
            driver
                .expect_restart()
                .times(1)
                .returning(|| Box::pin(async { Ok(()) }));

            let started = Instant::now();
            restart_and_settle(&driver, Duration::from_secs(5))
                .await
                .unwrap();

            assert_eq!(started.elapsed(), Duration::from_secs(5));
        }

        #[tokio::test(start_paused = true)]
        async fn propagates_failure_without_waiting() {
            let mut driver = MockRestartDriver::new();
            driver
                .expect_restart()
                .times(1)
                .returning(|| Box::pin(async { Err(anyhow::anyhow!("login rejected")) }));

            let started = Instant::now();
            let err = restart_and_settle(&driver, Duration::from_secs(5))
                .await
                .unwrap_err();

            assert!(format!("{err:#}").contains("failed to restart modem: login rejected"));
            assert_eq!(started.elapsed(), Duration::ZERO);
        }
    }

    mod restart {
        use super::*;

        #[tokio::test]
        async fn succeeds_on_zero_exit() {
            let driver = CommandRestartDriver::new("true", appliance()).unwrap();
            assert!(driver.restart().await.is_ok());
        }

        #[tokio::test]
        async fn fails_on_non_zero_exit() {
            let driver = CommandRestartDriver::new("false", appliance()).unwrap();
            let err = driver.restart().await.unwrap_err();

            assert!(err.to_string().contains("restart command failed"));
        }

        #[tokio::test]
        async fn fails_when_program_is_missing() {
            let driver = CommandRestartDriver::new("/nonexistent/restart", appliance()).unwrap();
            assert!(driver.restart().await.is_err());
        }
    }
}
