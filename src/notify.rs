//! Operator feedback surface
//!
//! The form and trigger never print directly; they report through this
//! seam so any frontend (CLI today, a till screen tomorrow) can render
//! notices its own way.

/// Severity tag for transient notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Danger,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Danger => "danger",
        }
    }
}

/// Feedback sink injected into the trigger and the compose form.
pub trait Notifier: Send + Sync {
    /// Show a transient, tagged notice.
    fn notify(&self, kind: NoticeKind, message: &str);

    /// Show a titled message that blocks until acknowledged.
    fn alert(&self, title: &str, body: &str);
}

/// Notifier for the terminal: notices go to stdout, tagged by severity.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => println!("ok: {}", message),
            NoticeKind::Warning => println!("warning: {}", message),
            NoticeKind::Danger => eprintln!("error: {}", message),
        }
        tracing::debug!("notice [{}] {}", kind.as_str(), message);
    }

    fn alert(&self, title: &str, body: &str) {
        // No modal to block on in a terminal; print and carry on.
        eprintln!("{}: {}", title, body);
        tracing::debug!("alert [{}] {}", title, body);
    }
}
