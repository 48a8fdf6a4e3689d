//! The contract every conversation connector implements

use anyhow::Result;

use crate::error::ConnectorError;
use crate::models::{AuthorizationResult, ConnectorId, GetConversationsResponse, Section};

/// Adapter from a vendor API to the shared conversation model
///
/// Operations are blocking; hosts that need concurrency run connectors on
/// their own worker threads.
pub trait ConversationConnector: Send + Sync {
    fn connector_id(&self) -> ConnectorId;

    /// Run (or continue) the OAuth handshake for an account
    ///
    /// Without `auth_code` the result carries the URL the user must visit.
    /// With it, the code is exchanged and the resulting connection stored.
    fn authorize(
        &self,
        account_id: &str,
        auth_code: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<AuthorizationResult>;

    /// Authorize with a static API key instead of OAuth
    fn authorize_api_key(&self) -> Result<AuthorizationResult> {
        Err(ConnectorError::Unsupported {
            connector: self.connector_id(),
            operation: "API key authorization",
        }
        .into())
    }

    /// Channels or folders the connector can load from
    fn get_sections(&self) -> Result<Vec<Section>> {
        Ok(Vec::new())
    }

    /// Load one page of messages newer than `oldest_message_timestamp`
    ///
    /// `page_cursor` is the cursor returned by the previous page.
    fn load_messages(
        &self,
        account_id: &str,
        oldest_message_timestamp: Option<&str>,
        page_cursor: Option<&str>,
    ) -> Result<GetConversationsResponse>;
}
