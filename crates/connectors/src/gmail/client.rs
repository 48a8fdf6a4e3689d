//! Gmail API HTTP client
//!
//! Provides methods for listing and fetching messages from the Gmail API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::debug;

use super::api::{GmailMessage, ListMessagesResponse};
use crate::error::ConnectorError;

/// Gmail API client bound to one account's access token
pub struct GmailClient {
    base_url: String,
    access_token: String,
}

impl GmailClient {
    /// Messages requested per list page
    pub const PAGE_SIZE: usize = 100;

    /// Create a client against `base_url` (e.g. https://gmail.googleapis.com/gmail/v1)
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// List one page of messages matching a search query
    ///
    /// # Arguments
    /// * `query` - Gmail search query (e.g. `after:1700000000`)
    /// * `page_token` - Cursor from the previous page, forwarded unchanged
    pub fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let url = format!("{}/users/me/messages", self.base_url);
        debug!("Listing Gmail messages q={:?} page_token={:?}", query, page_token);

        let mut request = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", self.access_token))
            .query("maxResults", Self::PAGE_SIZE.to_string())
            .query("q", query);

        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }

        let mut response = request
            .call()
            .map_err(|e| api_error(e, "messages.list"))?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// List message IDs received after `oldest` (Unix seconds)
    ///
    /// Returns the IDs on this page and the cursor for the next one.
    pub fn list_message_ids(
        &self,
        oldest: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let response = self.list_messages(&format!("after:{}", oldest), page_token)?;

        let ids = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect();

        Ok((ids, response.next_page_token))
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", self.access_token))
            .query("format", "full")
            .call()
            .map_err(|e| api_error(e, "messages.get"))?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse message {}", id))?;

        Ok(message)
    }
}

/// Turn HTTP status failures into [`ConnectorError::Api`]
fn api_error(err: ureq::Error, endpoint: &'static str) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(status) => ConnectorError::Api { status, endpoint }.into(),
        other => anyhow::Error::new(other).context(format!("Failed to send {} request", endpoint)),
    }
}
