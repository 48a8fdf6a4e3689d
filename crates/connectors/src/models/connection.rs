//! Connection model: a connector authorized for one account

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known conversation connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ConnectorId {
    Gmail,
}

impl ConnectorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorId::Gmail => "gmail",
        }
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The application (tenant) a connection belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_id: String,
}

impl AppConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

/// An authorized link between an app, a connector and an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub connector_id: ConnectorId,
    pub account_id: String,
    /// Connector-specific credential, JSON-serialized
    pub credential: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub config: AppConfig,
}
