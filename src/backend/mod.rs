//! Backend collaborator seams
//!
//! Everything the compose flow needs from the outside world is expressed
//! as a small capability trait, constructor-injected into the components
//! that use it. The production implementation over HTTP lives in
//! [`http`]; tests substitute in-memory doubles.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewAttachment, Order, SendReceipt, SendRequest, Template};

/// Error from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend rejected the request and supplied a human-readable
    /// reason. Preferred for display over any generic fallback.
    #[error("{message}")]
    Api { message: String },

    /// Transport-level failure (connection, TLS, malformed response).
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl BackendError {
    /// Message to show the operator: the server-supplied reason when there
    /// is one, otherwise the given fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BackendError::Api { message } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Read-only order lookup.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    /// Fetch an order by its server id.
    async fn fetch_order(&self, order_id: i64) -> BackendResult<Order>;
}

/// Remote catalog of message templates.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn list_templates(&self) -> BackendResult<Vec<Template>>;
}

/// Remote store for uploaded attachment files.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Create an attachment record; returns its server id.
    async fn create(&self, attachment: NewAttachment) -> BackendResult<i64>;

    /// Delete an attachment record.
    async fn delete(&self, attachment_id: i64) -> BackendResult<()>;
}

/// The single remote call that delivers the message to the customer.
#[async_trait]
pub trait ReceiptDispatcher: Send + Sync {
    async fn send(&self, request: &SendRequest) -> BackendResult<SendReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_api_reason() {
        let err = BackendError::Api {
            message: "Number is not registered".into(),
        };
        assert_eq!(err.user_message("fallback"), "Number is not registered");
    }

    #[test]
    fn test_user_message_falls_back_for_transport_errors() {
        let err = BackendError::Transport(anyhow::anyhow!("connection refused"));
        assert_eq!(err.user_message("Failed to send."), "Failed to send.");
    }

    #[test]
    fn test_user_message_falls_back_for_empty_api_message() {
        let err = BackendError::Api { message: "".into() };
        assert_eq!(err.user_message("Failed to send."), "Failed to send.");
    }
}
