use anyhow::{Context, Result};
use reqwest::{Client, redirect::Policy};
use std::time::Duration;

/// Create the HTTP client used by the endpoint probe
///
/// Redirects are not followed: any 2xx or 3xx answer already proves that the
/// endpoint is reachable.
///
/// # Arguments
/// * `timeout` - Ceiling for a single request, connect included
///
/// # Examples
/// ```no_run
/// use modem_restart::http_client::probe_client;
/// use std::time::Duration;
///
/// let client = probe_client(Duration::from_secs(5))
///     .expect("failed to create client");
/// ```
pub fn probe_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to create HTTP probe client")
}
