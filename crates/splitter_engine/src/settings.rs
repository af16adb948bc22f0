use std::time::Duration;

use url::Url;

use crate::{FailureKind, TransferError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit for submission and download. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub max_upload_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

impl ClientSettings {
    /// Appends a server path (or locator returned by the server) to the base URL.
    pub fn endpoint(&self, locator: &str) -> Result<Url, TransferError> {
        let base = self.base_url.trim().trim_end_matches('/');
        let joined = if locator.starts_with('/') {
            format!("{base}{locator}")
        } else {
            format!("{base}/{locator}")
        };
        Url::parse(&joined).map_err(|err| {
            TransferError::new(FailureKind::InvalidUrl, format!("invalid url {joined}: {err}"))
        })
    }

    /// Streaming connections never get a whole-request timeout.
    pub(crate) fn build_client(&self, streaming: bool) -> Result<reqwest::Client, TransferError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let (false, Some(timeout)) = (streaming, self.request_timeout) {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| TransferError::new(FailureKind::Network, err.to_string()))
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(FailureKind::Timeout, format!("request timed out: {err}"));
    }
    TransferError::new(FailureKind::Network, format!("network error: {err}"))
}
