//! HTTP transport for CRL and OCSP fetches

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::{
    config::VerifierConfig,
    error::{PkiError, Result as PkiResult},
};

pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Blocking I/O used by the revocation checkers; run it off UI threads
///
/// There is no cancellation token. Each call is bounded by the configured
/// timeout, and an implementation may return `PkiError::Transport` early to
/// abandon a verification in flight.
pub trait RevocationTransport: Send + Sync {
    /// Download a CRL from a distribution point
    fn fetch_crl(&self, url: &str) -> PkiResult<Vec<u8>>;

    /// POST a DER-encoded OCSPRequest and return the raw response body
    fn post_ocsp(&self, url: &str, request_der: &[u8]) -> PkiResult<Vec<u8>>;
}

/// reqwest-backed transport with per-request timeouts
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    ocsp_timeout: Duration,
    crl_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &VerifierConfig) -> PkiResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PkiError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            ocsp_timeout: config.ocsp_timeout(),
            crl_timeout: config.crl_timeout(),
        })
    }

    fn read_body(url: &str, response: reqwest::blocking::Response) -> PkiResult<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            return Err(PkiError::transport(url, format!("HTTP status {status}")));
        }
        let body = response.bytes().map_err(|e| PkiError::transport(url, e))?;
        Ok(body.to_vec())
    }
}

impl RevocationTransport for HttpTransport {
    fn fetch_crl(&self, url: &str) -> PkiResult<Vec<u8>> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PkiError::transport(url, "unsupported URL scheme"));
        }
        tracing::debug!(url, "fetching CRL");
        let response = self
            .client
            .get(url)
            .timeout(self.crl_timeout)
            .send()
            .map_err(|e| PkiError::transport(url, e))?;
        Self::read_body(url, response)
    }

    fn post_ocsp(&self, url: &str, request_der: &[u8]) -> PkiResult<Vec<u8>> {
        tracing::debug!(url, bytes = request_der.len(), "sending OCSP request");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
            .header(ACCEPT, OCSP_RESPONSE_CONTENT_TYPE)
            .timeout(self.ocsp_timeout)
            .body(request_der.to_vec())
            .send()
            .map_err(|e| PkiError::transport(url, e))?;
        Self::read_body(url, response)
    }
}
