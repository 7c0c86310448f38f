//! OAuth2 code exchange, refresh and in-memory token management.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::sync::Arc;

use gdclient_common::{Error, Result};

use crate::config::AppConfig;
use crate::token::{TokenStore, Tokens};

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// The provider-facing half of the authorization-code flow.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// URL the operator visits to grant offline access.
    fn authorization_url(&self) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<Tokens>;

    /// Obtain a new access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens>;
}

/// OAuth2 authentication manager backed by the configured provider endpoints.
pub struct AuthManager {
    client: ConfiguredClient,
    http: oauth2::reqwest::Client,
    config: AppConfig,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - Endpoint or redirect URLs in `config` do not parse
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone())
                    .map_err(|e| Error::Config(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| Error::Config(format!("Invalid token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| Error::Config(format!("Invalid redirect URL: {}", e)))?,
            );

        // Token endpoint must not follow redirects
        let http = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            config,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn into_tokens(token_result: BasicTokenResponse, fallback_refresh: Option<&str>) -> Result<Tokens> {
        let access_token = token_result.access_token().secret().clone();

        // Refresh responses usually omit the refresh token
        let refresh_token = match (token_result.refresh_token(), fallback_refresh) {
            (Some(token), _) => token.secret().clone(),
            (None, Some(previous)) => previous.to_string(),
            (None, None) => {
                return Err(Error::Authentication(
                    "No refresh token received. Ensure 'offline' access and 'consent' prompt were requested.".to_string(),
                ))
            }
        };

        let expires_in = token_result
            .expires_in()
            .unwrap_or_else(|| std::time::Duration::from_secs(3600));
        let expires_at =
            Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

        Ok(Tokens {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenEndpoint for AuthManager {
    fn authorization_url(&self) -> String {
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (auth_url, _csrf) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        auth_url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.trim().to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Unable to retrieve token from web: {}", e)))?;

        Self::into_tokens(token_result, None)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token refresh failed: {}", e)))?;

        Self::into_tokens(token_result, Some(refresh_token))
    }
}

/// Token manager that refreshes expired tokens and writes them back to the cache.
pub struct TokenManager {
    endpoint: Arc<dyn TokenEndpoint>,
    store: Option<TokenStore>,
    tokens: tokio::sync::RwLock<Tokens>,
}

impl TokenManager {
    /// Create a new token manager with initial tokens.
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, tokens: Tokens) -> Self {
        Self {
            endpoint,
            store: None,
            tokens: tokio::sync::RwLock::new(tokens),
        }
    }

    /// Persist refreshed tokens to `store`.
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// A refreshed token is kept in memory even if the cache cannot be
    /// written.
    ///
    /// # Errors
    /// - Token refresh failed
    pub async fn access_token(&self) -> Result<String> {
        let tokens = self.tokens.read().await;

        if !tokens.is_expired() {
            return Ok(tokens.access_token.clone());
        }

        drop(tokens);

        let mut tokens = self.tokens.write().await;

        // Double-check after acquiring write lock
        if !tokens.is_expired() {
            return Ok(tokens.access_token.clone());
        }

        tracing::info!("Refreshing expired access token");

        let new_tokens = self.endpoint.refresh_token(&tokens.refresh_token).await?;
        *tokens = new_tokens;
        let access_token = tokens.access_token.clone();
        let snapshot = tokens.clone();
        drop(tokens);

        if let Some(store) = &self.store {
            if let Err(e) = store.save_async(snapshot).await {
                tracing::warn!(path = %store.path().display(), error = %e, "Failed to cache refreshed token");
            }
        }

        Ok(access_token)
    }

    /// Get the current tokens.
    pub async fn tokens(&self) -> Tokens {
        self.tokens.read().await.clone()
    }

    /// Update tokens (e.g., after manual refresh).
    pub async fn update_tokens(&self, tokens: Tokens) {
        *self.tokens.write().await = tokens;
    }
}
