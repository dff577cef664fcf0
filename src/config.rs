use crate::services::probe::ProbeKind;
use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde_valid::Validate;
use std::{env, fmt, str::FromStr, time::Duration};

const DEFAULT_TEST_URLS: [&str; 3] = [
    "https://www.google.com",
    "https://cloudflare.com",
    "https://www.example.com",
];

/// Application configuration loaded and validated at startup
///
/// Built once from the environment and passed down by reference; nothing
/// reads the environment while the monitor is polling.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Connectivity probe configuration
    pub probe: ProbeConfig,

    /// Poll schedule of the connectivity monitor
    pub poll: PollPolicy,

    /// Modem web console and restart command
    pub appliance: ApplianceConfig,

    /// Desktop notification settings
    pub notification: NotificationConfig,
}

/// Fixed-interval poll schedule
#[derive(Clone, Debug, PartialEq, Eq, Validate)]
pub struct PollPolicy {
    check_interval: Duration,
    #[validate(minimum = 1)]
    max_attempts: u32,
}

#[derive(Clone, Debug, Validate)]
pub struct ProbeConfig {
    /// Enabled strategies; they always run in priority order
    #[validate(min_items = 1)]
    pub strategies: Vec<ProbeKind>,
    #[validate(min_length = 1)]
    pub ping_host: String,
    pub ping_timeout: Duration,
    #[validate(min_length = 1)]
    pub dns_hostname: String,
    pub dns_timeout: Duration,
    /// Tried in order until one answers
    pub http_urls: Vec<Url>,
    pub http_timeout: Duration,
}

#[derive(Clone)]
pub struct ApplianceConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    /// External command driving the web console; `None` skips the restart
    pub restart_command: Option<String>,
    /// Wait between a submitted restart and the first connectivity check
    pub settle_delay: Duration,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub icon: String,
    pub timeout: Duration,
}

/// Environment lookup with defaults
struct EnvSource<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvSource<'_> {
    fn string(&self, name: &str, default: &str) -> String {
        (self.lookup)(name).unwrap_or_else(|| default.to_string())
    }

    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match (self.lookup)(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("failed to parse {name}: {e}")),
            None => Ok(default),
        }
    }

    fn millis(&self, name: &str, default: u64) -> Result<Duration> {
        self.parse::<u64>(name, default).map(Duration::from_millis)
    }

    fn list(&self, name: &str, default: &[&str]) -> Vec<String> {
        match (self.lookup)(name) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
            None => default.iter().map(|item| item.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Load and validate the configuration from environment variables
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load and validate the configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Returns an error for malformed values (non-numeric or negative numbers,
    /// zero attempts, invalid URLs, unknown probe names)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = EnvSource { lookup: &lookup };

        Ok(Self {
            probe: ProbeConfig::load(&source)?,
            poll: PollPolicy::load(&source)?,
            appliance: ApplianceConfig::load(&source)?,
            notification: NotificationConfig::load(&source)?,
        })
    }
}

impl PollPolicy {
    pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 5000;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

    /// Create a validated poll policy
    ///
    /// A zero interval is allowed and polls back to back.
    pub fn new(check_interval: Duration, max_attempts: u32) -> Result<Self> {
        let policy = Self {
            check_interval,
            max_attempts,
        };
        policy.validate().context("invalid poll policy")?;
        Ok(policy)
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the time spent sleeping between checks
    pub fn time_budget(&self) -> Duration {
        self.check_interval.saturating_mul(self.max_attempts)
    }

    fn load(source: &EnvSource) -> Result<Self> {
        let check_interval = source.millis("CHECK_INTERVAL_MS", Self::DEFAULT_CHECK_INTERVAL_MS)?;
        let max_attempts = source.parse("MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;

        Self::new(check_interval, max_attempts)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(Self::DEFAULT_CHECK_INTERVAL_MS),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ProbeConfig {
    /// Check field constraints that the derive cannot express
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate().context("invalid probe config")?;

        for (name, timeout) in [
            ("ping", self.ping_timeout),
            ("dns", self.dns_timeout),
            ("http", self.http_timeout),
        ] {
            ensure!(!timeout.is_zero(), "invalid probe config: {name} timeout is zero");
        }

        if self.strategies.contains(&ProbeKind::EndpointReachability) {
            ensure!(
                !self.http_urls.is_empty(),
                "invalid probe config: http probe enabled without test urls"
            );
        }

        for url in &self.http_urls {
            ensure!(
                matches!(url.scheme(), "http" | "https"),
                "invalid probe config: unsupported scheme in test url {url}"
            );
        }

        Ok(())
    }

    fn load(source: &EnvSource) -> Result<Self> {
        let strategies = source
            .list("PROBES", &["ping", "dns", "http"])
            .iter()
            .map(|name| name.parse::<ProbeKind>())
            .collect::<Result<Vec<_>>>()
            .context("failed to parse PROBES")?;

        let http_urls = source
            .list("TEST_URLS", &DEFAULT_TEST_URLS)
            .iter()
            .map(|url| Url::parse(url).context(format!("failed to parse test url {url}")))
            .collect::<Result<Vec<_>>>()?;

        let config = Self {
            strategies,
            ping_host: source.string("PING_HOST", "8.8.8.8"),
            ping_timeout: source.millis("PING_TIMEOUT_MS", 2000)?,
            dns_hostname: source.string("DNS_HOSTNAME", "google.com"),
            dns_timeout: source.millis("DNS_TIMEOUT_MS", 5000)?,
            http_urls,
            http_timeout: source.millis("HTTP_TIMEOUT_MS", 5000)?,
        };

        config.ensure_valid()?;
        Ok(config)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategies: ProbeKind::ALL.to_vec(),
            ping_host: "8.8.8.8".to_string(),
            ping_timeout: Duration::from_secs(2),
            dns_hostname: "google.com".to_string(),
            dns_timeout: Duration::from_secs(5),
            http_urls: DEFAULT_TEST_URLS
                .iter()
                .map(|url| Url::parse(url).expect("invalid DEFAULT_TEST_URLS constant"))
                .collect(),
            http_timeout: Duration::from_secs(5),
        }
    }
}

impl ApplianceConfig {
    fn load(source: &EnvSource) -> Result<Self> {
        let url = source.string("APPLIANCE_URL", "http://192.168.1.1/");
        let url = Url::parse(&url).context(format!("failed to parse APPLIANCE_URL {url}"))?;
        let timeout = source.millis("APPLIANCE_TIMEOUT_MS", 30000)?;
        ensure!(!timeout.is_zero(), "APPLIANCE_TIMEOUT_MS must not be zero");

        Ok(Self {
            url,
            username: source.string("APPLIANCE_USERNAME", "admin"),
            password: source.string("APPLIANCE_PASSWORD", "admin"),
            timeout,
            restart_command: source.optional("RESTART_COMMAND"),
            settle_delay: source.millis("RESTART_SETTLE_MS", 5000)?,
        })
    }
}

impl fmt::Debug for ApplianceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplianceConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("restart_command", &self.restart_command)
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}

impl NotificationConfig {
    fn load(source: &EnvSource) -> Result<Self> {
        let timeout = source.millis("NOTIFY_TIMEOUT_MS", 5000)?;
        ensure!(!timeout.is_zero(), "NOTIFY_TIMEOUT_MS must not be zero");

        Ok(Self {
            icon: source.string("NOTIFY_ICON", "network-wireless"),
            timeout,
        })
    }
}
