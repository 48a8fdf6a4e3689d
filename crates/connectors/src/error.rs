//! Errors callers of a connector may want to match on
//!
//! Everything else is reported through `anyhow` with context.

use crate::models::ConnectorId;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("{connector} does not support {operation}")]
    Unsupported {
        connector: ConnectorId,
        operation: &'static str,
    },

    #[error("No {connector} credential registered for app {app_id}")]
    MissingConnectorCredential {
        connector: ConnectorId,
        app_id: String,
    },

    #[error("No {connector} connection for account {account_id} in app {app_id}")]
    ConnectionNotFound {
        connector: ConnectorId,
        app_id: String,
        account_id: String,
    },

    #[error("Client secrets contain no redirect URI")]
    MissingRedirectUri,

    #[error("Message {0} has no payload")]
    MissingPayload(String),

    #[error("Message {0} has no From header")]
    MissingSender(String),

    #[error("Gmail API returned HTTP {status} for {endpoint}")]
    Api { status: u16, endpoint: &'static str },
}
