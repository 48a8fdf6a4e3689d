//! Results returned by connector operations

use serde::{Deserialize, Serialize};

use super::{Connection, Email};

/// Outcome of an authorization attempt
///
/// Either the user still has to visit `auth_url`, or the handshake
/// completed and `connection` holds the stored connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

impl AuthorizationResult {
    /// The user must visit `auth_url` to grant access
    pub fn pending(auth_url: impl Into<String>) -> Self {
        Self {
            authorized: false,
            auth_url: Some(auth_url.into()),
            connection: None,
        }
    }

    /// Authorization finished and produced a connection
    pub fn authorized(connection: Connection) -> Self {
        Self {
            authorized: true,
            auth_url: None,
            connection: Some(connection),
        }
    }
}

/// One page of messages plus the cursor for the next page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetConversationsResponse {
    pub messages: Vec<Email>,
    /// `None` when this was the last page
    pub page_cursor: Option<String>,
}

/// A channel, folder or other grouping exposed by a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub children: Vec<Section>,
}
