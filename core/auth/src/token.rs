//! OAuth2 tokens and their on-disk cache.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

use gdclient_common::{Error, Result};

/// Default token cache path.
pub const TOKEN_FILENAME: &str = "token.json";

/// OAuth2 tokens with expiration tracking.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// When the access token expires.
    #[serde(alias = "expiry")]
    #[zeroize(skip)]
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Check if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// File-backed token cache at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cached tokens.
    ///
    /// No expiry check is done here; an expired token is refreshed on first use.
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Contents do not deserialize into [`Tokens`]
    pub fn load(&self) -> Result<Tokens> {
        let contents = std::fs::read(&self.path)?;
        let tokens = serde_json::from_slice(&contents)?;
        Ok(tokens)
    }

    /// Persist tokens, replacing any previous contents.
    ///
    /// The file is created with owner read/write permissions only.
    pub fn save(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_vec_pretty(tokens)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Unable to cache oauth token at {}: {}", self.path.display(), e),
            ))
        })?;
        file.write_all(&json)?;
        file.sync_all()?;

        tracing::info!(path = %self.path.display(), "Saved credential file");
        Ok(())
    }

    /// [`save`](Self::save) on the blocking pool.
    pub async fn save_async(&self, tokens: Tokens) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save(&tokens))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(TOKEN_FILENAME)
    }
}
