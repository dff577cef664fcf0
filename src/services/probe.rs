//! Connectivity probes
//!
//! Each probe answers "is the network reachable right now?" through exactly one
//! mechanism and never fails: spawn errors, resolver errors, refused connections
//! and timeouts all turn into `false`.

use crate::{common::bounded, http_client::probe_client};
use anyhow::{Result, bail};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::{Client, StatusCode, Url};
use std::{
    fmt,
    path::PathBuf,
    process::Stdio,
    str::FromStr,
    time::Duration,
};
use tokio::{net::lookup_host, process::Command};
use trait_variant::make;

/// Probe mechanisms in priority order, cheapest and most reliable first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProbeKind {
    Reachability,
    NameResolution,
    EndpointReachability,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 3] = [
        ProbeKind::Reachability,
        ProbeKind::NameResolution,
        ProbeKind::EndpointReachability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Reachability => "ping",
            ProbeKind::NameResolution => "dns",
            ProbeKind::EndpointReachability => "http",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ping" => Ok(ProbeKind::Reachability),
            "dns" => Ok(ProbeKind::NameResolution),
            "http" => Ok(ProbeKind::EndpointReachability),
            other => bail!("unknown probe '{other}': expected one of ping, dns, http"),
        }
    }
}

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait ConnectivityProbe {
    fn kind(&self) -> ProbeKind;
    async fn probe(&self) -> bool;
}

/// ICMP echo to a fixed address via the system `ping` binary
#[derive(Debug)]
pub struct PingProbe {
    program: PathBuf,
    host: String,
    timeout: Duration,
}

impl PingProbe {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("ping"),
            host: host.into(),
            timeout,
        }
    }

    /// `ping -W` only takes whole seconds
    fn wait_secs(&self) -> u64 {
        (self.timeout.as_millis() as u64).div_ceil(1000).max(1)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-c", "1", "-W"])
            .arg(self.wait_secs().to_string())
            .arg(&self.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl ConnectivityProbe for PingProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Reachability
    }

    async fn probe(&self) -> bool {
        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("ping probe: failed to spawn {:?}: {e}", self.program);
                return false;
            }
        };

        // child is killed on drop if it is still running
        match bounded(self.timeout, child.wait()).await {
            Some(Ok(status)) => {
                if !status.success() {
                    debug!("ping probe: {} unreachable ({status})", self.host);
                }
                status.success()
            }
            Some(Err(e)) => {
                debug!("ping probe: failed to wait for ping: {e}");
                false
            }
            None => {
                debug!(
                    "ping probe: no reply from {} within {:?}",
                    self.host, self.timeout
                );
                false
            }
        }
    }
}

/// Name resolution through the system resolver
///
/// The lookup runs `getaddrinfo` on tokio's blocking pool. Hitting the timeout
/// only abandons the result: the resolver thread cannot be interrupted and
/// stays busy until libc gives up on its own.
#[derive(Debug)]
pub struct DnsProbe {
    hostname: String,
    timeout: Duration,
}

impl DnsProbe {
    pub fn new(hostname: impl Into<String>, timeout: Duration) -> Self {
        Self {
            hostname: hostname.into(),
            timeout,
        }
    }
}

impl ConnectivityProbe for DnsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::NameResolution
    }

    async fn probe(&self) -> bool {
        match bounded(self.timeout, lookup_host((self.hostname.as_str(), 0))).await {
            Some(Ok(mut addrs)) => addrs.next().is_some(),
            Some(Err(e)) => {
                debug!("dns probe: failed to resolve {}: {e}", self.hostname);
                false
            }
            None => {
                debug!(
                    "dns probe: resolving {} timed out after {:?}",
                    self.hostname, self.timeout
                );
                false
            }
        }
    }
}

/// HTTP GET against an ordered list of well-known endpoints
#[derive(Debug)]
pub struct HttpProbe {
    client: Client,
    urls: Vec<Url>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(urls: Vec<Url>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: probe_client(timeout)?,
            urls,
            timeout,
        })
    }

    /// Redirects are not followed, so 3xx counts as an answer
    pub fn is_success(status: StatusCode) -> bool {
        (200..400).contains(&status.as_u16())
    }

    async fn probe_url(&self, url: &Url) -> bool {
        match bounded(self.timeout, self.client.get(url.clone()).send()).await {
            Some(Ok(res)) => {
                let status = res.status();
                debug!("http probe: GET {url} returned {status}");
                Self::is_success(status)
            }
            Some(Err(e)) => {
                debug!("http probe: GET {url} failed: {e}");
                false
            }
            None => {
                debug!("http probe: GET {url} timed out after {:?}", self.timeout);
                false
            }
        }
    }
}

impl ConnectivityProbe for HttpProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::EndpointReachability
    }

    async fn probe(&self) -> bool {
        for url in &self.urls {
            if self.probe_url(url).await {
                return true;
            }
        }
        false
    }
}

/// One entry of the ordered strategy list
#[derive(Debug)]
pub enum Probe {
    Ping(PingProbe),
    Dns(DnsProbe),
    Http(HttpProbe),
}

impl ConnectivityProbe for Probe {
    fn kind(&self) -> ProbeKind {
        match self {
            Probe::Ping(probe) => probe.kind(),
            Probe::Dns(probe) => probe.kind(),
            Probe::Http(probe) => probe.kind(),
        }
    }

    async fn probe(&self) -> bool {
        match self {
            Probe::Ping(probe) => probe.probe().await,
            Probe::Dns(probe) => probe.probe().await,
            Probe::Http(probe) => probe.probe().await,
        }
    }
}
