//! Fetching upload content from a URL.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;

use gdclient_common::{Error, Result};

use crate::provider::{ByteStream, MediaSource};

/// Streams media from plain HTTP(S) URLs. Sends no credentials.
pub struct HttpMediaSource {
    http: Client,
}

impl HttpMediaSource {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn open(&self, url: &str) -> Result<ByteStream> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Failed to fetch {}: {}",
                url,
                response.status()
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("Stream read error: {}", e))));

        Ok(Box::pin(stream))
    }
}
