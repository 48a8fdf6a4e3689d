//! Connectors crate - Adapters from vendor APIs to the conversation model
//!
//! This crate provides:
//! - Shared domain models (Email, Connection, AuthorizationResult)
//! - The `ConversationConnector` trait every connector implements
//! - The `StateStore` contract for credentials, with memory and file backends
//! - The Gmail connector (OAuth, message listing, normalization)
//!
//! All network calls are blocking and sequential.

pub mod config;
pub mod connector;
pub mod error;
pub mod gmail;
pub mod models;
pub mod state_store;

pub use crate::config::{GmailClientSecrets, GmailConnectorCredential, GmailEndpoints};
pub use connector::ConversationConnector;
pub use error::ConnectorError;
pub use gmail::{AuthorizedUserInfo, ClientCredential, GmailClient, GmailConnector, GmailOAuth};
pub use models::{
    AppConfig, AuthorizationResult, Connection, ConnectorId, Email, GetConversationsResponse,
    MessageRecipient, MessageRecipientType, MessageSender, Section,
};
pub use state_store::{FileStateStore, InMemoryStateStore, StateStore};
