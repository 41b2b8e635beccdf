//! Dispatch trigger: precondition gate in front of the compose form
//!
//! Attached to the receipt surface. Checks that the order can actually be
//! messaged before opening the form, and turns every failure into an
//! operator-facing alert.

use std::sync::Arc;

use crate::compose::{ComposeHost, ComposeOutcome, ComposeRequest};
use crate::models::Order;
use crate::notify::Notifier;

const SEND_FALLBACK: &str = "Failed to send the receipt message. Please try again.";

pub struct DispatchTrigger {
    host: Arc<dyn ComposeHost>,
    notifier: Arc<dyn Notifier>,
}

impl DispatchTrigger {
    pub fn new(host: Arc<dyn ComposeHost>, notifier: Arc<dyn Notifier>) -> Self {
        Self { host, notifier }
    }

    /// Validate the order and, if it passes, open the compose form and
    /// wait for it to resolve.
    ///
    /// Preconditions are checked in order; the first failure alerts and
    /// aborts. Returns `None` when the form never opened or the flow
    /// errored out, otherwise the form's outcome.
    pub async fn invoke(&self, order: &Order) -> Option<ComposeOutcome> {
        let Some(order_id) = order.id.server_id() else {
            self.notifier.alert(
                "Unsynced order",
                "This order is not yet synced to server. Make sure it is synced then try again.",
            );
            return None;
        };

        let Some(customer) = &order.customer else {
            self.notifier.alert(
                "Error",
                "No customer is set for this order. Please set a customer to send the receipt.",
            );
            return None;
        };

        let Some(phone) = customer.dispatch_phone() else {
            self.notifier.alert(
                "Error",
                "The customer does not have a phone number. Please add one to send the receipt.",
            );
            return None;
        };

        let request = ComposeRequest {
            order_id,
            order_name: order.name.clone(),
            phone: phone.to_string(),
        };

        match self.host.open(request).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                let message = err.to_string();
                let message = if message.is_empty() {
                    SEND_FALLBACK
                } else {
                    &message
                };
                tracing::warn!("compose flow failed for order {}: {:#}", order.name, err);
                self.notifier.alert("Error", message);
                None
            }
        }
    }
}
