//! Credential and connection storage
//!
//! Connectors never own their secrets. Per-app connector credentials
//! (OAuth client secrets, API keys) and per-account connections are kept
//! behind the [`StateStore`] trait so hosts can plug in their own backend.

mod file;
mod memory;

pub use file::FileStateStore;
pub use memory::InMemoryStateStore;

use anyhow::Result;

use crate::models::{AppConfig, Connection, ConnectorId};

/// Storage backend for connector credentials and connections
pub trait StateStore: Send + Sync {
    /// Register the app-level credential for a connector
    fn set_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
        credential: serde_json::Value,
    ) -> Result<()>;

    /// Get the app-level credential for a connector
    ///
    /// Fails with `ConnectorError::MissingConnectorCredential` when none was registered.
    fn get_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
    ) -> Result<serde_json::Value>;

    /// Create or replace the connection for an account
    fn add_connection(
        &self,
        config: &AppConfig,
        credential: &str,
        connector_id: ConnectorId,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> Result<Connection>;

    /// Load the stored connection for an account
    ///
    /// Fails with `ConnectorError::ConnectionNotFound` when the account never authorized.
    fn load_credentials(
        &self,
        config: &AppConfig,
        connector_id: ConnectorId,
        account_id: &str,
    ) -> Result<Connection>;
}
