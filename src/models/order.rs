//! Order and customer models
//!
//! Orders are owned by the POS backend; this client only reads them to
//! decide whether a receipt can be dispatched and to whom.

use serde::{Deserialize, Serialize};

/// Order identifier.
///
/// Orders created at the till carry a locally-generated placeholder until
/// they are synced; only server-assigned numeric ids can be referenced in
/// remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    /// Persisted server-side id.
    Server(i64),
    /// Unsynced local placeholder (e.g. a session-scoped UID).
    Local(String),
}

impl OrderId {
    /// The numeric server id, if the order has been synced.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            OrderId::Server(id) => Some(*id),
            OrderId::Local(_) => None,
        }
    }
}

/// POS order as read from the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Display name, e.g. "SO001".
    pub name: String,
    pub customer: Option<Customer>,
}

/// Customer record attached to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub mobile: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    /// Preferred dispatch number: mobile first, landline as fallback.
    /// Empty strings count as absent.
    pub fn dispatch_phone(&self) -> Option<&str> {
        non_empty(self.mobile.as_deref()).or_else(|| non_empty(self.phone.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
