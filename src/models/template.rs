//! Message template models

use serde::{Deserialize, Serialize};

/// Reusable predefined message body, fetched from the backend catalog.
///
/// Templates are an immutable snapshot per compose session: the form loads
/// them once on open and never refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    /// Canonical message text; selecting the template copies this into the
    /// draft body.
    pub body: String,
}

/// Payload for creating a remote attachment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
    pub name: String,
    pub mimetype: String,
    /// File content, base64-encoded.
    pub payload_b64: String,
    /// Server id of the order the attachment belongs to.
    pub order_id: i64,
}
