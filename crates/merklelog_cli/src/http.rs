//! Blocking HTTP client for remote blob reads.

use merklelog_storage::{HttpClient, HttpResponse, StorageError, StorageResult};
use std::time::Duration;

/// [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with connect and request timeouts.
    pub fn new() -> StorageResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> StorageResult<HttpResponse> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_connect() {
                StorageError::Transport(format!("cannot connect to {url}"))
            } else {
                StorageError::Transport(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| StorageError::Transport(e.to_string()))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }
}
