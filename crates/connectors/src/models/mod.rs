//! Domain models shared by every conversation connector

mod connection;
mod email;
mod response;

pub use connection::{AppConfig, Connection, ConnectorId};
pub use email::{Email, MessageRecipient, MessageRecipientType, MessageSender};
pub use response::{AuthorizationResult, GetConversationsResponse, Section};
