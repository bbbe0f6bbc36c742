//! Broker reachability probe
//!
//! A bare TCP connect with a bounded timeout; no protocol handshake. The
//! probe answers "is anything listening there", which is all the status
//! snapshot claims about broker connectivity.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Outcome of one reachability check
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub connected: bool,
    pub reason: Option<String>,
}

/// Bounded-timeout TCP reachability probe
#[derive(Debug, Clone)]
pub struct BrokerProbe {
    timeout: Duration,
}

impl Default for BrokerProbe {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }
}

impl BrokerProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Attempt a plain connection to `host:port`. Never returns an error;
    /// unreachable endpoints are reported in the result.
    pub async fn check(&self, host: &str, port: u16) -> ProbeResult {
        let addr = format!("{}:{}", host, port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                debug!(addr = %addr, "broker endpoint reachable");
                ProbeResult {
                    connected: true,
                    reason: None,
                }
            }
            Ok(Err(e)) => ProbeResult {
                connected: false,
                reason: Some(format!("connect to {} failed: {}", addr, e)),
            },
            Err(_) => ProbeResult {
                connected: false,
                reason: Some(format!(
                    "connect to {} timed out after {:?}",
                    addr, self.timeout
                )),
            },
        }
    }
}
