//! Email model produced by mail connectors

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Kind of entity a message was addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRecipientType {
    /// A person (email address, chat user)
    User,
    /// A shared channel or room
    Channel,
}

/// Author of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    /// Vendor identifier of the sender (for email, the raw `From` value)
    pub id: String,
}

impl MessageSender {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One recipient of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecipient {
    pub id: String,
    pub message_recipient_type: MessageRecipientType,
}

impl MessageRecipient {
    /// Create a recipient addressing a single user
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_recipient_type: MessageRecipientType::User,
        }
    }
}

/// A single email normalized into the conversation model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Vendor message ID
    pub id: String,
    pub sender: MessageSender,
    pub recipients: Vec<MessageRecipient>,
    /// Subject line followed by the plain text body
    pub content: String,
    /// Vendor timestamp, milliseconds since the Unix epoch
    pub timestamp: String,
}

impl Email {
    /// Parse `timestamp` into a UTC datetime
    ///
    /// Returns `None` when the vendor value is not a millisecond epoch.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.timestamp.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
