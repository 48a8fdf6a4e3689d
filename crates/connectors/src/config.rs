//! Configuration for the Gmail connector
//!
//! Client secrets are loaded from (in order of priority):
//! 1. JSON file (Google Cloud Console format) in the convo config directory
//! 2. Runtime environment variables
//!
//! The connector itself reads them back from the state store, wrapped in a
//! [`GmailConnectorCredential`] together with the API developer key.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConnectorError;

/// Credentials filename in the convo config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Google Cloud Console client secret file
///
/// Holds either a `web` or an `installed` section; `web` wins when both
/// are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmailClientSecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<ClientSecrets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<ClientSecrets>,
}

/// One section of a client secret file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Consent endpoint; replaces the default when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_uri: Option<String>,
    /// Token endpoint; replaces the default when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

impl GmailClientSecrets {
    /// Load client secrets from the config directory or the environment
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let secrets: Self = config::load_json(CREDENTIALS_FILE)?;
            secrets.client()?;
            return Ok(secrets);
        }

        Self::from_env()
    }

    /// Load client secrets from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let secrets: Self = config::load_json_file(path)?;
        secrets.client()?;
        Ok(secrets)
    }

    /// Parse client secrets from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let secrets: Self =
            serde_json::from_str(json).context("Failed to parse client secrets JSON")?;
        secrets.client()?;
        Ok(secrets)
    }

    /// Build a `web` client from GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET and GMAIL_REDIRECT_URI
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;
        let redirect_uris = std::env::var("GMAIL_REDIRECT_URI")
            .map(|uri| vec![uri])
            .unwrap_or_default();

        Ok(Self {
            web: Some(ClientSecrets {
                client_id,
                client_secret,
                redirect_uris,
                auth_uri: None,
                token_uri: None,
            }),
            installed: None,
        })
    }

    /// The active client section
    pub fn client(&self) -> Result<&ClientSecrets> {
        self.web
            .as_ref()
            .or(self.installed.as_ref())
            .context("Client secrets missing 'web' or 'installed' section")
    }

    /// First registered redirect URI; the OAuth callback lands there
    pub fn redirect_uri(&self) -> Result<&str> {
        self.client()?
            .redirect_uris
            .first()
            .map(String::as_str)
            .ok_or_else(|| ConnectorError::MissingRedirectUri.into())
    }

    /// Get the default client secrets path (~/.config/convo/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Read the Gmail API developer key from GMAIL_DEVELOPER_KEY
pub fn developer_key_from_env() -> Option<String> {
    std::env::var("GMAIL_DEVELOPER_KEY")
        .ok()
        .filter(|key| !key.is_empty())
}

/// Per-app Gmail credential kept in the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmailConnectorCredential {
    pub client_secrets: GmailClientSecrets,
    #[serde(default)]
    pub developer_key: String,
}

impl GmailConnectorCredential {
    pub fn new(client_secrets: GmailClientSecrets, developer_key: impl Into<String>) -> Self {
        Self {
            client_secrets,
            developer_key: developer_key.into(),
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).context("Malformed Gmail connector credential")
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Google OAuth and Gmail API endpoints
///
/// Defaults point at Google; tests point them at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for GmailEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
        }
    }
}

impl GmailEndpoints {
    /// Endpoints rooted at a single base URL (`{base}/auth`, `{base}/token`, `{base}/gmail/v1`)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/auth", base),
            token_url: format!("{}/token", base),
            api_base_url: format!("{}/gmail/v1", base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_web_secrets() {
        let json = r#"{
            "web": {
                "client_id": "web-client-id.apps.googleusercontent.com",
                "client_secret": "web-secret",
                "redirect_uris": ["https://app.example.com/oauth/gmail", "http://localhost:8080"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let secrets = GmailClientSecrets::from_json(json).unwrap();
        let client = secrets.client().unwrap();
        assert_eq!(client.client_id, "web-client-id.apps.googleusercontent.com");
        assert_eq!(client.client_secret, "web-secret");
        assert_eq!(
            secrets.redirect_uri().unwrap(),
            "https://app.example.com/oauth/gmail"
        );
        assert_eq!(
            client.auth_uri.as_deref(),
            Some("https://accounts.google.com/o/oauth2/auth")
        );
        assert_eq!(
            client.token_uri.as_deref(),
            Some("https://oauth2.googleapis.com/token")
        );
    }

    #[test]
    fn test_endpoint_uris_survive_storage() {
        let json = r#"{
            "installed": {
                "client_id": "id",
                "client_secret": "secret",
                "auth_uri": "https://login.example.com/auth",
                "token_uri": "https://login.example.com/token"
            }
        }"#;

        let secrets = GmailClientSecrets::from_json(json).unwrap();
        let credential = GmailConnectorCredential::new(secrets, "key");
        let stored = GmailConnectorCredential::from_value(credential.to_value().unwrap()).unwrap();
        let client = stored.client_secrets.client().unwrap();
        assert_eq!(client.auth_uri.as_deref(), Some("https://login.example.com/auth"));
        assert_eq!(client.token_uri.as_deref(), Some("https://login.example.com/token"));
    }

    #[test]
    fn test_parse_installed_secrets() {
        let json = r#"{
            "installed": {
                "client_id": "desktop-id",
                "client_secret": "desktop-secret",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let secrets = GmailClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client().unwrap().client_id, "desktop-id");
        assert_eq!(secrets.redirect_uri().unwrap(), "http://localhost");
    }

    #[test]
    fn test_missing_redirect_uri() {
        let json = r#"{ "web": { "client_id": "id", "client_secret": "secret" } }"#;
        let secrets = GmailClientSecrets::from_json(json).unwrap();
        let err = secrets.redirect_uri().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::MissingRedirectUri)
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(GmailClientSecrets::from_json(r#"{ "other": {} }"#).is_err());
    }

    #[test]
    fn test_connector_credential_from_value() {
        let value = serde_json::json!({
            "client_secrets": {
                "web": { "client_id": "id", "client_secret": "secret", "redirect_uris": ["http://localhost:8080"] }
            },
            "developer_key": "dev-key"
        });

        let credential = GmailConnectorCredential::from_value(value).unwrap();
        assert_eq!(credential.developer_key, "dev-key");
        assert_eq!(credential.client_secrets.client().unwrap().client_id, "id");
    }

    #[test]
    fn test_endpoints_with_base_url() {
        let endpoints = GmailEndpoints::with_base_url("http://127.0.0.1:5000/");
        assert_eq!(endpoints.token_url, "http://127.0.0.1:5000/token");
        assert_eq!(endpoints.api_base_url, "http://127.0.0.1:5000/gmail/v1");
    }
}
