//! Obtaining tokens: cached file first, interactive authorization second.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use gdclient_common::{Error, Result};

use crate::client::AuthorizedClient;
use crate::config::AppConfig;
use crate::manager::{AuthManager, TokenEndpoint, TokenManager};
use crate::token::{TokenStore, Tokens};

/// Presents the authorization URL to the operator and returns the code they paste back.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn authorization_code(&self, auth_url: &str) -> Result<String>;
}

/// Prints the URL to stdout and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl AuthorizationPrompt for ConsolePrompt {
    async fn authorization_code(&self, auth_url: &str) -> Result<String> {
        println!(
            "Go to the following link in your browser then type the authorization code:\n{}",
            auth_url
        );

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| Error::Authentication(format!("Unable to read authorization code: {}", e)))?;

        let code = line.trim().to_string();
        if code.is_empty() {
            return Err(Error::Authentication(
                "Unable to read authorization code: empty input".to_string(),
            ));
        }
        Ok(code)
    }
}

/// Load cached tokens, or run the interactive flow once and cache the result.
///
/// # Postconditions
/// - On success after the interactive path, `store` holds the new tokens
///
/// # Errors
/// - Prompt or code exchange failed
/// - Token cache could not be written
pub async fn obtain_tokens(
    endpoint: &dyn TokenEndpoint,
    store: &TokenStore,
    prompt: &dyn AuthorizationPrompt,
) -> Result<Tokens> {
    match store.load() {
        Ok(tokens) => {
            tracing::debug!(path = %store.path().display(), "Using cached token");
            return Ok(tokens);
        }
        Err(e) => {
            tracing::info!(
                path = %store.path().display(),
                error = %e,
                "No usable cached token, starting authorization"
            );
        }
    }

    let auth_url = endpoint.authorization_url();
    let code = prompt.authorization_code(&auth_url).await?;
    let tokens = endpoint.exchange_code(&code).await?;

    store.save_async(tokens.clone()).await?;
    Ok(tokens)
}

/// Build an [`AuthorizedClient`] for `config`, authorizing interactively if needed.
///
/// Every failure is returned to the caller; nothing here exits the process.
pub async fn get_authenticated_client(
    config: AppConfig,
    store: TokenStore,
    prompt: &dyn AuthorizationPrompt,
) -> Result<AuthorizedClient> {
    let endpoint: Arc<dyn TokenEndpoint> = Arc::new(AuthManager::new(config)?);
    let tokens = obtain_tokens(endpoint.as_ref(), &store, prompt).await?;

    let token_manager = TokenManager::new(endpoint, tokens).with_store(store);
    AuthorizedClient::new(Arc::new(token_manager))
}
