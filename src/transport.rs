//! HTTP seam between the client and the network.
//!
//! - `UreqTransport` is the blocking production implementation (one pooled `ureq::Agent`).
//! - Non-2xx statuses are ordinary responses; only connection-level failures are errors.
//! - GETs are retried on transport failure, PUTs are sent exactly once.

use log::{debug, warn};

use crate::client::InfinitiveClientError;

pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Status and body text of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, InfinitiveClientError>;

    fn put_json(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse, InfinitiveClientError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
    max_retries: u32,
}

impl UreqTransport {
    pub fn new(max_retries: u32) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        UreqTransport { agent, max_retries }
    }

    fn get_once(&self, url: &str) -> Result<HttpResponse, ureq::Error> {
        let mut res = self.agent.get(url).header("Accept", "application/json").call()?;
        let status = res.status().as_u16();
        let body = res.body_mut().read_to_string()?;
        Ok(HttpResponse { status, body })
    }
}

/// Failures where a fresh attempt may succeed: the connection could not be made or was lost.
fn is_retryable(e: &ureq::Error) -> bool {
    matches!(
        e,
        ureq::Error::Io(_)
            | ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Protocol(_)
    )
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport::new(DEFAULT_MAX_RETRIES)
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, InfinitiveClientError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url) {
                Ok(res) => return Ok(res),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!("GET {} failed ({}); retry {}/{}", url, e, attempt, self.max_retries);
                }
                Err(e) => return Err(InfinitiveClientError::Transport(e.to_string())),
            }
        }
    }

    fn put_json(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse, InfinitiveClientError> {
        let mut req = self.agent.put(url);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let mut res = req
            .send(body)
            .map_err(|e| InfinitiveClientError::Transport(e.to_string()))?;
        let status = res.status().as_u16();
        debug!("PUT {} {} -> {}", url, String::from_utf8_lossy(body), status);
        let body = res.body_mut().read_to_string().unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}
