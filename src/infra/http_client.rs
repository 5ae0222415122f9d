use crate::app::ports::PageSource;
use crate::error::Result;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};

/// Fetches pages with a plain blocking GET. HTTP error statuses fail the fetch.
///
/// The client has no request timeout: a slow server is waited on indefinitely.
pub struct ReqwestPageSource {
    client: Client,
}

impl ReqwestPageSource {
    pub fn new() -> Result<Self> {
        // The blocking client otherwise defaults to a 30 second timeout
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client })
    }
}

impl PageSource for ReqwestPageSource {
    #[instrument(skip(self))]
    fn fetch(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = resp.text()?;
        debug!(
            "Fetched {} bytes (status ok, content-type {})",
            body.len(),
            content_type
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_without_timeout() {
        assert!(ReqwestPageSource::new().is_ok());
    }
}
