//! HTTP client that carries the caller's OAuth2 credentials.

use reqwest::Client;
use std::sync::Arc;

use gdclient_common::{Error, Result};

use crate::manager::TokenManager;

const USER_AGENT: &str = concat!("gdclient/", env!("CARGO_PKG_VERSION"));

/// An HTTP client paired with a token manager.
///
/// Cloning is cheap; clones share the connection pool and the tokens.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl AuthorizedClient {
    /// Create a new authorized client.
    pub fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_manager,
        })
    }

    /// Underlying HTTP client.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Token manager backing this client.
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// `Authorization` header value with a non-expired access token.
    pub async fn bearer(&self) -> Result<String> {
        let token = self.token_manager.access_token().await?;
        Ok(format!("Bearer {}", token))
    }
}
