/// Single reachability check against the watched URL.
use std::time::Duration;

/// Per-request timeout. Probes are bounded by this, not by the poll period.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one reachability check. Produced fresh each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered without an error status.
    Reachable,
    /// The request failed (DNS, connect, timeout, TLS) or the target
    /// answered with an error status. `reason` is for the log only.
    Unreachable { reason: String },
}

impl ProbeOutcome {
    #[allow(dead_code)]
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Reachability prober holding one reusable HTTP client.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Build the prober. Client construction is the only fallible step and
    /// happens once at startup, before the loop.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Issue one GET against `url`.
    ///
    /// Network failures are ordinary outcomes here, never errors: any
    /// transport problem or 4xx/5xx status maps to `Unreachable`, any
    /// completed 2xx/3xx response to `Reachable`.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    ProbeOutcome::Unreachable {
                        reason: format!(
                            "failed to establish connection with {url}: status {status}"
                        ),
                    }
                } else {
                    ProbeOutcome::Reachable
                }
            }
            Err(e) => ProbeOutcome::Unreachable {
                reason: format!("failed to establish connection with {url}: {e}"),
            },
        }
    }
}
