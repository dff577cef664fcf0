//! Desktop notifications via `notify-send`

use crate::common::bounded;
use anyhow::{Context, Result, ensure};
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use std::{fmt, path::PathBuf, process::Stdio, time::Duration};
use tokio::process::Command;
use trait_variant::make;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
}

impl Notification {
    pub fn restored(elapsed_secs: u64) -> Self {
        Self {
            title: "Internet Connection Restored!".to_string(),
            body: format!("Modem restart completed.\nWait time: {elapsed_secs} seconds"),
            urgency: Urgency::Normal,
        }
    }

    pub fn exhausted(elapsed_secs: u64) -> Self {
        Self {
            title: "No Internet Connection!".to_string(),
            body: format!(
                "Waited {elapsed_secs} seconds but internet did not come back.\nPlease check the modem!"
            ),
            urgency: Urgency::Critical,
        }
    }
}

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait Notifier {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

pub struct DesktopNotifier {
    program: PathBuf,
    icon: String,
    timeout: Duration,
}

impl DesktopNotifier {
    pub fn new(icon: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("notify-send"),
            icon: icon.into(),
            timeout,
        }
    }

    fn command(&self, notification: &Notification) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-u")
            .arg(notification.urgency.as_str())
            .arg("-i")
            .arg(&self.icon)
            .arg(&notification.title)
            .arg(&notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl Notifier for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let mut child = self
            .command(notification)
            .spawn()
            .context(format!("failed to spawn {:?}", self.program))?;

        let status = bounded(self.timeout, child.wait())
            .await
            .context(format!("{:?} timed out after {:?}", self.program, self.timeout))?
            .context(format!("failed to wait for {:?}", self.program))?;

        ensure!(status.success(), "{:?} exited with {status}", self.program);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod notification {
        use super::*;

        #[test]
        fn restored_is_normal_urgency_with_wait_time() {
            let notification = Notification::restored(87);

            assert_eq!(notification.urgency, Urgency::Normal);
            assert!(notification.body.contains("87 seconds"));
        }

        #[test]
        fn exhausted_is_critical_and_asks_for_manual_check() {
            let notification = Notification::exhausted(300);

            assert_eq!(notification.urgency, Urgency::Critical);
            assert!(notification.body.contains("300 seconds"));
            assert!(notification.body.contains("check the modem"));
        }

        #[test]
        fn urgency_renders_notify_send_level() {
            assert_eq!(Urgency::Low.to_string(), "low");
            assert_eq!(Urgency::Normal.to_string(), "normal");
            assert_eq!(Urgency::Critical.to_string(), "critical");
        }
    }

    mod desktop_notifier {
        use super::*;

        fn notifier_with_program(program: &str) -> DesktopNotifier {
            DesktopNotifier {
                program: PathBuf::from(program),
                icon: "network-wireless".to_string(),
                timeout: Duration::from_secs(5),
            }
        }

        #[tokio::test]
        async fn succeeds_on_zero_exit() {
            let result = notifier_with_program("true")
                .notify(&Notification::restored(1))
                .await;

            assert!(result.is_ok());
        }

        #[tokio::test]
        async fn fails_on_non_zero_exit() {
            let result = notifier_with_program("false")
                .notify(&Notification::exhausted(1))
                .await;

            assert!(result.unwrap_err().to_string().contains("exited with"));
        }

        #[tokio::test]
        async fn fails_when_binary_is_missing() {
            let result = notifier_with_program("/nonexistent/notify-send")
                .notify(&Notification::restored(1))
                .await;

            assert!(result.unwrap_err().to_string().contains("failed to spawn"));
        }
    }
}
