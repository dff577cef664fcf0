//! Layered connectivity check
//!
//! Combines the probe strategies into one decision. Probes run one after
//! another in priority order and the first positive answer wins; later, more
//! expensive probes are not invoked.

use crate::{
    config::ProbeConfig,
    services::probe::{ConnectivityProbe, DnsProbe, HttpProbe, PingProbe, Probe, ProbeKind},
};
use anyhow::{Context, Result};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use std::time::Duration;
use tokio::time::Instant;
use trait_variant::make;

/// Result of a single connectivity check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub reachable: bool,
    /// Probe that confirmed connectivity, `None` if all of them failed
    pub strategy: Option<ProbeKind>,
    pub latency: Duration,
}

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait ConnectivityCheck {
    async fn check(&self) -> ProbeResult;
}

#[derive(Debug)]
pub struct LayeredCheck<P> {
    probes: Vec<P>,
}

impl<P> LayeredCheck<P>
where
    P: ConnectivityProbe + Sync,
{
    pub fn new(probes: Vec<P>) -> Self {
        Self { probes }
    }

    pub fn probes(&self) -> &[P] {
        &self.probes
    }

    pub async fn check_internet(&self) -> bool {
        self.check().await.reachable
    }
}

impl LayeredCheck<Probe> {
    /// Build the probe list for the enabled strategies
    ///
    /// Strategies always run in priority order (ping, dns, http) no matter how
    /// they are listed in the configuration; duplicates are ignored.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, e.g. no strategy is
    /// enabled or a probe timeout is zero
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        config
            .ensure_valid()
            .context("failed to create connectivity check")?;

        let mut kinds = config.strategies.clone();
        kinds.sort();
        kinds.dedup();

        let probes = kinds
            .into_iter()
            .map(|kind| -> Result<Probe> {
                Ok(match kind {
                    ProbeKind::Reachability => {
                        Probe::Ping(PingProbe::new(&config.ping_host, config.ping_timeout))
                    }
                    ProbeKind::NameResolution => {
                        Probe::Dns(DnsProbe::new(&config.dns_hostname, config.dns_timeout))
                    }
                    ProbeKind::EndpointReachability => Probe::Http(HttpProbe::new(
                        config.http_urls.clone(),
                        config.http_timeout,
                    )?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(probes))
    }
}

impl<P> ConnectivityCheck for LayeredCheck<P>
where
    P: ConnectivityProbe + Sync,
{
    async fn check(&self) -> ProbeResult {
        let started = Instant::now();

        for probe in &self.probes {
            let kind = probe.kind();
            if probe.probe().await {
                debug!("{kind} probe succeeded");
                return ProbeResult {
                    reachable: true,
                    strategy: Some(kind),
                    latency: started.elapsed(),
                };
            }
            debug!("{kind} probe failed");
        }

        ProbeResult {
            reachable: false,
            strategy: None,
            latency: started.elapsed(),
        }
    }
}
