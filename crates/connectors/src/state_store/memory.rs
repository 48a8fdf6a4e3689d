//! In-memory state store
//!
//! Used by tests and by hosts that manage persistence themselves.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::RwLock;

use super::StateStore;
use crate::error::ConnectorError;
use crate::models::{AppConfig, Connection, ConnectorId};

/// (app_id, connector)
type CredentialKey = (String, ConnectorId);
/// (app_id, connector, account_id)
type ConnectionKey = (String, ConnectorId, String);

/// HashMaps protected by RwLocks for thread-safe access
#[derive(Default)]
pub struct InMemoryStateStore {
    connector_credentials: RwLock<HashMap<CredentialKey, serde_json::Value>>,
    connections: RwLock<HashMap<ConnectionKey, Connection>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored connections across all apps
    pub fn connection_count(&self) -> usize {
        self.connections.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl StateStore for InMemoryStateStore {
    fn set_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
        credential: serde_json::Value,
    ) -> Result<()> {
        self.connector_credentials
            .write()
            .map_err(|_| anyhow!("Connector credential lock poisoned"))?
            .insert((config.app_id.clone(), connector_id), credential);
        Ok(())
    }

    fn get_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
    ) -> Result<serde_json::Value> {
        let credentials = self
            .connector_credentials
            .read()
            .map_err(|_| anyhow!("Connector credential lock poisoned"))?;

        credentials
            .get(&(config.app_id.clone(), connector_id))
            .cloned()
            .ok_or_else(|| {
                ConnectorError::MissingConnectorCredential {
                    connector: connector_id,
                    app_id: config.app_id.clone(),
                }
                .into()
            })
    }

    fn add_connection(
        &self,
        config: &AppConfig,
        credential: &str,
        connector_id: ConnectorId,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> Result<Connection> {
        let connection = Connection {
            connector_id,
            account_id: account_id.to_string(),
            credential: credential.to_string(),
            metadata,
            config: config.clone(),
        };

        self.connections
            .write()
            .map_err(|_| anyhow!("Connection lock poisoned"))?
            .insert(
                (config.app_id.clone(), connector_id, account_id.to_string()),
                connection.clone(),
            );
        Ok(connection)
    }

    fn load_credentials(
        &self,
        config: &AppConfig,
        connector_id: ConnectorId,
        account_id: &str,
    ) -> Result<Connection> {
        let connections = self
            .connections
            .read()
            .map_err(|_| anyhow!("Connection lock poisoned"))?;

        connections
            .get(&(config.app_id.clone(), connector_id, account_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                ConnectorError::ConnectionNotFound {
                    connector: connector_id,
                    app_id: config.app_id.clone(),
                    account_id: account_id.to_string(),
                }
                .into()
            })
    }
}
