//! Gmail OAuth2 authentication
//!
//! Implements the authorization code flow against Google's OAuth endpoints
//! and refreshes stored credentials. The redirect URI comes from the app's
//! client secrets; receiving the callback is the host's job.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ClientSecrets, GmailClientSecrets, GmailEndpoints};
use crate::error::ConnectorError;

/// Read-only access to the mailbox
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Tokens expiring within this window are treated as expired
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    #[allow(dead_code)]
    token_type: Option<String>,
}

/// Credential stored for an authorized Gmail account
///
/// Field names follow Google's "authorized user" JSON so stored
/// credentials interoperate with other Google client libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUserInfo {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUserInfo {
    /// Parse a credential previously produced by [`AuthorizedUserInfo::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Malformed Gmail account credential")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// True when an access token is present and not about to expire
    pub fn is_valid(&self) -> bool {
        if self.token.is_none() {
            return false;
        }
        match self.expiry {
            Some(expiry) => expiry > Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS),
            None => true,
        }
    }

    /// Get a new access token using the refresh token
    ///
    /// Keeps the current refresh token when Google doesn't rotate it.
    pub fn refresh(&mut self) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .context("Credential has no refresh token")?;

        debug!("Refreshing Gmail access token for client {}", self.client_id);
        let response = ureq::post(&self.token_uri)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| token_error(e, "Failed to refresh access token"))?;

        let token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        self.apply(token);
        Ok(())
    }

    fn from_token_response(token: TokenResponse, client: &ClientSecrets, token_uri: &str) -> Self {
        let mut info = Self {
            token: None,
            refresh_token: None,
            token_uri: token_uri.to_string(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
            expiry: None,
        };
        info.apply(token);
        info
    }

    fn apply(&mut self, token: TokenResponse) {
        self.token = Some(token.access_token);
        if token.refresh_token.is_some() {
            self.refresh_token = token.refresh_token;
        }
        if let Some(scope) = token.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
        self.expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
    }
}

/// Credential handed back to the caller after authorization
///
/// Carries just what a client needs to call the Gmail API directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCredential {
    pub access_token: Option<String>,
    pub client_id: String,
    pub developer_key: String,
}

/// OAuth2 authorization code flow for one app's Gmail client
pub struct GmailOAuth {
    client: ClientSecrets,
    redirect_uri: String,
    endpoints: GmailEndpoints,
}

impl GmailOAuth {
    /// Create a flow that redirects to the first registered redirect URI
    ///
    /// `auth_uri` and `token_uri` from the secrets file take precedence
    /// over `endpoints`.
    pub fn new(secrets: &GmailClientSecrets, mut endpoints: GmailEndpoints) -> Result<Self> {
        let redirect_uri = secrets.redirect_uri()?.to_string();
        let client = secrets.client()?.clone();
        if let Some(auth_uri) = &client.auth_uri {
            endpoints.auth_url = auth_uri.clone();
        }
        if let Some(token_uri) = &client.token_uri {
            endpoints.token_url = token_uri.clone();
        }
        Ok(Self {
            client,
            redirect_uri,
            endpoints,
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build the consent URL the user must visit
    ///
    /// Always forces the consent prompt so Google issues a refresh token.
    pub fn authorization_url(&self) -> Result<String> {
        let url = Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", GMAIL_READONLY_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .with_context(|| format!("Invalid OAuth authorization URL: {}", self.endpoints.auth_url))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens
    pub fn exchange_code(&self, code: &str) -> Result<AuthorizedUserInfo> {
        info!("Exchanging Gmail authorization code for tokens");
        let response = ureq::post(&self.endpoints.token_url)
            .send_form([
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .map_err(|e| token_error(e, "Failed to exchange authorization code"))?;

        let token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse token response")?;

        Ok(AuthorizedUserInfo::from_token_response(
            token,
            &self.client,
            &self.endpoints.token_url,
        ))
    }
}

fn token_error(err: ureq::Error, context: &'static str) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(status) => anyhow::Error::new(ConnectorError::Api {
            status,
            endpoint: "token",
        })
        .context(context),
        other => anyhow::Error::new(other).context(context),
    }
}
