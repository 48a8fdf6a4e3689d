//! Gmail implementation of [`ConversationConnector`]

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use std::sync::Arc;

use super::auth::{AuthorizedUserInfo, ClientCredential, GmailOAuth};
use super::client::GmailClient;
use super::normalize::{ParsedMessage, map_message_to_email, parse_message};
use crate::config::{GmailConnectorCredential, GmailEndpoints};
use crate::connector::ConversationConnector;
use crate::models::{AppConfig, AuthorizationResult, ConnectorId, GetConversationsResponse};
use crate::state_store::StateStore;

/// How far back to look when the caller gives no oldest timestamp
const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Loads an account's Gmail messages as conversation [`Email`](crate::models::Email)s
pub struct GmailConnector {
    config: AppConfig,
    store: Arc<dyn StateStore>,
    endpoints: GmailEndpoints,
}

impl GmailConnector {
    pub fn new(config: AppConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            config,
            store,
            endpoints: GmailEndpoints::default(),
        }
    }

    /// Use non-default OAuth and API endpoints
    pub fn with_endpoints(mut self, endpoints: GmailEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn connector_credential(&self) -> Result<GmailConnectorCredential> {
        let value = self
            .store
            .get_connector_credential(ConnectorId::Gmail, &self.config)?;
        GmailConnectorCredential::from_value(value)
    }

    /// Build the OAuth flow for this app's client secrets
    pub fn oauth(&self) -> Result<GmailOAuth> {
        let credential = self.connector_credential()?;
        GmailOAuth::new(&credential.client_secrets, self.endpoints.clone())
    }

    /// Load the account's credential, refreshing and persisting it if expired
    fn account_credential(&self, account_id: &str) -> Result<AuthorizedUserInfo> {
        let connection = self
            .store
            .load_credentials(&self.config, ConnectorId::Gmail, account_id)?;
        let mut creds = AuthorizedUserInfo::from_json(&connection.credential)?;

        if !creds.is_valid() && creds.refresh_token.is_some() {
            creds.refresh()?;
            self.store.add_connection(
                &connection.config,
                &creds.to_json()?,
                ConnectorId::Gmail,
                account_id,
                serde_json::json!({}),
            )?;
            info!("Refreshed Gmail credential for account {}", account_id);
        }

        Ok(creds)
    }

    /// Fetch and parse a single message
    pub fn get_message(&self, client: &GmailClient, msg_id: &str) -> Result<ParsedMessage> {
        let msg = client.get_message(msg_id)?;
        parse_message(msg)
    }

    /// Fetch messages one by one, skipping any that fail
    pub fn get_messages(&self, client: &GmailClient, msg_ids: &[String]) -> Vec<ParsedMessage> {
        let mut msgs = Vec::with_capacity(msg_ids.len());
        for msg_id in msg_ids {
            match self.get_message(client, msg_id) {
                Ok(msg) => msgs.push(msg),
                Err(e) => warn!("Skipping Gmail message {}: {:#}", msg_id, e),
            }
        }
        msgs
    }
}

impl ConversationConnector for GmailConnector {
    fn connector_id(&self) -> ConnectorId {
        ConnectorId::Gmail
    }

    fn authorize(
        &self,
        account_id: &str,
        auth_code: Option<&str>,
        _metadata: &serde_json::Value,
    ) -> Result<AuthorizationResult> {
        let credential = self.connector_credential()?;
        let oauth = GmailOAuth::new(&credential.client_secrets, self.endpoints.clone())?;

        let Some(code) = auth_code else {
            return Ok(AuthorizationResult::pending(oauth.authorization_url()?));
        };

        let creds = oauth.exchange_code(code)?;
        let mut connection = self.store.add_connection(
            &self.config,
            &creds.to_json()?,
            ConnectorId::Gmail,
            account_id,
            serde_json::json!({}),
        )?;

        // The caller gets a slim credential; the store keeps the refreshable one
        connection.credential = serde_json::to_string(&ClientCredential {
            access_token: creds.token.clone(),
            client_id: creds.client_id.clone(),
            developer_key: credential.developer_key,
        })?;

        info!("Authorized Gmail for account {}", account_id);
        Ok(AuthorizationResult::authorized(connection))
    }

    fn load_messages(
        &self,
        account_id: &str,
        oldest_message_timestamp: Option<&str>,
        page_cursor: Option<&str>,
    ) -> Result<GetConversationsResponse> {
        let creds = self.account_credential(account_id)?;
        let access_token = creds
            .token
            .as_deref()
            .context("Gmail credential has no access token and cannot be refreshed")?;
        let client = GmailClient::new(&self.endpoints.api_base_url, access_token);

        let oldest = lookback_start(oldest_message_timestamp, Utc::now());
        let (msg_ids, next_page_cursor) =
            client.list_message_ids(&oldest, non_empty(page_cursor))?;
        let msgs = self.get_messages(&client, &msg_ids);
        info!(
            "Loaded {} of {} Gmail messages for account {}",
            msgs.len(),
            msg_ids.len(),
            account_id
        );

        Ok(GetConversationsResponse {
            messages: msgs.into_iter().map(map_message_to_email).collect(),
            page_cursor: next_page_cursor,
        })
    }
}

/// Treat an empty string the same as an absent value
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// The `after:` bound in Unix seconds, defaulting to the last 24 hours
fn lookback_start(oldest_message_timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    match non_empty(oldest_message_timestamp) {
        Some(ts) => ts.to_string(),
        None => (now - Duration::hours(DEFAULT_LOOKBACK_HOURS))
            .timestamp()
            .to_string(),
    }
}
