//! OAuth2 client configuration loaded from a credentials artifact.

use serde::{Deserialize, Serialize};
use std::path::Path;

use gdclient_common::{Error, Result};

/// Default credentials artifact path.
pub const CREDENTIALS_FILENAME: &str = "credentials.json";

/// Full Drive scope. Also grants the Sheets access the helpers need.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REDIRECT_URL: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth2 client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

/// Client-secret file as downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<ClientSecretSection>,
    #[serde(default)]
    web: Option<ClientSecretSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl AppConfig {
    /// Load configuration from a client-secret JSON file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not a valid client-secret document
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Unable to read client secret file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from client-secret JSON.
    ///
    /// Accepts both the `installed` and `web` layouts. The first redirect
    /// URI is used.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Unable to parse client secret file: {}", e)))?;

        let section = file.installed.or(file.web).ok_or_else(|| {
            Error::Config("Client secret file has neither 'installed' nor 'web' section".to_string())
        })?;

        if section.client_id.is_empty() {
            return Err(Error::Config("client_id is empty".to_string()));
        }

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_url: section
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            auth_url: section
                .auth_uri
                .unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_url: section
                .token_uri
                .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            scopes: vec![DRIVE_SCOPE.to_string()],
        })
    }

    /// Replace the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "abc.apps.googleusercontent.com",
            "project_id": "demo",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "s3cret",
            "redirect_uris": ["http://localhost", "urn:ietf:wg:oauth:2.0:oob"]
        }
    }"#;

    #[test]
    fn test_parse_installed_layout() {
        let config = AppConfig::from_json(INSTALLED).unwrap();
        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.client_secret, "s3cret");
        assert_eq!(config.redirect_url, "http://localhost");
        assert_eq!(config.token_url, GOOGLE_TOKEN_URL);
        assert_eq!(config.scopes, vec![DRIVE_SCOPE.to_string()]);
    }

    #[test]
    fn test_parse_web_layout_with_defaults() {
        let json = r#"{"web": {"client_id": "id", "client_secret": "secret"}}"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.redirect_url, DEFAULT_REDIRECT_URL);
        assert_eq!(config.auth_url, GOOGLE_AUTH_URL);
    }

    #[test]
    fn test_missing_section_fails() {
        let err = AppConfig::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            AppConfig::from_json("not json").unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INSTALLED.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.client_secret, "s3cret");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(dir.path().join(CREDENTIALS_FILENAME)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_with_scopes() {
        let config = AppConfig::from_json(INSTALLED)
            .unwrap()
            .with_scopes(["https://www.googleapis.com/auth/spreadsheets"]);
        assert_eq!(config.scopes.len(), 1);
        assert!(config.scopes[0].ends_with("spreadsheets"));
    }
}
