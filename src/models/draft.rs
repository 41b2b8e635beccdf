//! Draft message state for one compose session

use serde::{Deserialize, Serialize};

/// Which receipt report the backend should render when attaching a PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// Branded receipt layout.
    #[default]
    Custom,
    /// Stock POS order report.
    Standard,
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom" => Ok(ReportType::Custom),
            "standard" => Ok(ReportType::Standard),
            other => Err(format!("unknown report type '{}'", other)),
        }
    }
}

/// In-progress, unsent form state for one compose session.
///
/// Created fresh each time the form opens, mutated only by user input or
/// template selection, discarded on close.
#[derive(Debug, Clone)]
pub struct Draft {
    pub phone: String,
    pub body: String,
    /// Selected template, if any. Not cleared when the body is hand-edited
    /// afterwards; the id is sent even if the body has diverged.
    pub template_id: Option<i64>,
    /// Ids of successfully-created remote attachments, in file-selection
    /// order. A failed upload never lands here.
    pub attachment_ids: Vec<i64>,
    pub attach_pdf: bool,
    pub report_type: ReportType,
}

impl Draft {
    /// Seed a draft from the order context supplied by the trigger.
    pub fn new(phone: impl Into<String>, order_name: &str) -> Self {
        Self {
            phone: phone.into(),
            body: default_body(order_name),
            template_id: None,
            attachment_ids: Vec::new(),
            attach_pdf: true,
            report_type: ReportType::default(),
        }
    }
}

/// Default message body seeded into a fresh draft.
pub fn default_body(order_name: &str) -> String {
    format!("Here is your order receipt: {}", order_name)
}

/// Payload of the single dispatch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub order_id: i64,
    pub phone: String,
    pub message: String,
    pub template_id: Option<i64>,
    pub attachment_ids: Vec<i64>,
    pub attach_pdf: bool,
    pub report_type: ReportType,
}

/// Dispatch confirmation returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Human-readable confirmation, surfaced to the operator as-is.
    pub message: String,
}
