//! JSON file state store
//!
//! Stores everything in one document (~/.config/convo/state.json by
//! default). Each call reads the file, applies the change and writes it
//! back; a mutex serializes writers within the process.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StateStore;
use crate::error::ConnectorError;
use crate::models::{AppConfig, Connection, ConnectorId};

/// State filename in the convo config directory
const STATE_FILE: &str = "state.json";

/// On-disk layout, nested by app id, then connector, then account id
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    connector_credentials: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    connections: BTreeMap<String, BTreeMap<String, BTreeMap<String, Connection>>>,
}

pub struct FileStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Create a store backed by the given file (created on first write)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store at the default location (~/.config/convo/state.json)
    pub fn open_default() -> Result<Self> {
        let path = config::config_path(STATE_FILE).context("Could not determine config directory")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StateDocument> {
        if !self.path.exists() {
            return Ok(StateDocument::default());
        }
        config::load_json_file(&self.path)
    }

    fn update<T>(&self, apply: impl FnOnce(&mut StateDocument) -> T) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("State file lock poisoned"))?;

        let mut document = self.read()?;
        let result = apply(&mut document);
        config::save_json_file(&self.path, &document)?;
        Ok(result)
    }
}

impl StateStore for FileStateStore {
    fn set_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
        credential: serde_json::Value,
    ) -> Result<()> {
        self.update(|doc| {
            doc.connector_credentials
                .entry(config.app_id.clone())
                .or_default()
                .insert(connector_id.to_string(), credential);
        })
    }

    fn get_connector_credential(
        &self,
        connector_id: ConnectorId,
        config: &AppConfig,
    ) -> Result<serde_json::Value> {
        let mut document = self.read()?;
        document
            .connector_credentials
            .get_mut(&config.app_id)
            .and_then(|by_connector| by_connector.remove(connector_id.as_str()))
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

        self.update(|doc| {
            doc.connections
                .entry(config.app_id.clone())
                .or_default()
                .entry(connector_id.to_string())
                .or_default()
                .insert(account_id.to_string(), connection.clone());
        })?;
        Ok(connection)
    }

    fn load_credentials(
        &self,
        config: &AppConfig,
        connector_id: ConnectorId,
        account_id: &str,
    ) -> Result<Connection> {
        let mut document = self.read()?;
        document
            .connections
            .get_mut(&config.app_id)
            .and_then(|by_connector| by_connector.get_mut(connector_id.as_str()))
            .and_then(|by_account| by_account.remove(account_id))
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, FileStateStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_empty_store_reads_without_file() {
        let (_dir, store) = make_store();
        assert!(!store.path().exists());
        assert!(
            store
                .load_credentials(&AppConfig::new("app"), ConnectorId::Gmail, "user")
                .is_err()
        );
    }

    #[test]
    fn test_connection_persists_across_instances() {
        let (dir, store) = make_store();
        let config = AppConfig::new("app");
        store
            .add_connection(&config, "{\"token\":\"t\"}", ConnectorId::Gmail, "user", json!({}))
            .unwrap();

        let reopened = FileStateStore::new(dir.path().join("state.json"));
        let connection = reopened
            .load_credentials(&config, ConnectorId::Gmail, "user")
            .unwrap();
        assert_eq!(connection.credential, "{\"token\":\"t\"}");
        assert_eq!(connection.config, config);
    }

    #[test]
    fn test_ids_containing_slashes_stay_distinct() {
        let (dir, store) = make_store();
        store
            .add_connection(&AppConfig::new("a"), "first", ConnectorId::Gmail, "b/gmail/c", json!({}))
            .unwrap();
        store
            .add_connection(&AppConfig::new("a/gmail/b"), "second", ConnectorId::Gmail, "c", json!({}))
            .unwrap();

        let reopened = FileStateStore::new(dir.path().join("state.json"));
        let first = reopened
            .load_credentials(&AppConfig::new("a"), ConnectorId::Gmail, "b/gmail/c")
            .unwrap();
        assert_eq!(first.credential, "first");
        let second = reopened
            .load_credentials(&AppConfig::new("a/gmail/b"), ConnectorId::Gmail, "c")
            .unwrap();
        assert_eq!(second.credential, "second");
    }

    #[test]
    fn test_credentials_and_connections_coexist() {
        let (_dir, store) = make_store();
        let config = AppConfig::new("app");
        store
            .set_connector_credential(ConnectorId::Gmail, &config, json!({"developer_key": "k"}))
            .unwrap();
        store
            .add_connection(&config, "c", ConnectorId::Gmail, "user", json!({}))
            .unwrap();

        let credential = store
            .get_connector_credential(ConnectorId::Gmail, &config)
            .unwrap();
        assert_eq!(credential["developer_key"], "k");
        assert!(
            store
                .load_credentials(&config, ConnectorId::Gmail, "user")
                .is_ok()
        );
    }
}
