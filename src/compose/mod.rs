//! Compose form: draft state machine for one receipt message
//!
//! The form is plain data plus operations; it owns the draft for exactly
//! one compose session and talks to the outside world only through the
//! injected backend seams and the notifier. A frontend binds to it by
//! calling the operations and reading the state back.

mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::backend::{AttachmentStore, ReceiptDispatcher, TemplateCatalog};
use crate::models::{default_body, Draft, ReportType, SendRequest, Template};
use crate::notify::{NoticeKind, Notifier};

/// Form lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Template fetch in flight.
    Loading,
    /// Interactive; the operator edits the draft.
    Editing,
    /// Dismissed or sent; terminal.
    Closed,
}

/// Input field holding focus, for frontends that can express it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Phone,
    Message,
}

/// How a compose session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Dispatch succeeded; carries the backend's confirmation text.
    Sent { confirmation: String },
    /// Dismissed without sending.
    Cancelled,
}

/// Order context the trigger hands to the form.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub order_id: i64,
    pub order_name: String,
    pub phone: String,
}

/// Surface that opens a compose form and waits for it to resolve.
///
/// The trigger talks to this instead of constructing the form itself, so
/// a frontend decides how the "modal" is actually presented.
#[async_trait]
pub trait ComposeHost: Send + Sync {
    async fn open(&self, request: ComposeRequest) -> anyhow::Result<ComposeOutcome>;
}

/// One compose session over a single order.
pub struct ComposeForm {
    order_id: i64,
    order_name: String,
    draft: Draft,
    templates: Vec<Template>,
    phase: Phase,
    focus: Option<Field>,
    /// Files picked but not yet uploaded.
    pending_files: Vec<PathBuf>,
    catalog: Arc<dyn TemplateCatalog>,
    attachments: Arc<dyn AttachmentStore>,
    dispatcher: Arc<dyn ReceiptDispatcher>,
    notifier: Arc<dyn Notifier>,
}

impl ComposeForm {
    /// Open a form for the given order context. The draft is seeded with
    /// the supplied phone and the default receipt message; call
    /// [`load_templates`](Self::load_templates) next to leave `Loading`.
    pub fn open(
        request: ComposeRequest,
        catalog: Arc<dyn TemplateCatalog>,
        attachments: Arc<dyn AttachmentStore>,
        dispatcher: Arc<dyn ReceiptDispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            draft: Draft::new(request.phone, &request.order_name),
            order_id: request.order_id,
            order_name: request.order_name,
            templates: Vec::new(),
            phase: Phase::Loading,
            focus: None,
            pending_files: Vec::new(),
            catalog,
            attachments,
            dispatcher,
            notifier,
        }
    }

    /// Fetch the template catalog and enter `Editing`.
    ///
    /// A fetch failure is non-fatal: the operator gets a danger notice,
    /// the list stays empty, and the form remains usable. Focus lands on
    /// the phone field either way.
    pub async fn load_templates(&mut self) {
        match self.catalog.list_templates().await {
            Ok(templates) => self.templates = templates,
            Err(err) => {
                tracing::warn!("template fetch failed: {:#}", err);
                self.notifier
                    .notify(NoticeKind::Danger, "Failed to load message templates.");
            }
        }
        self.phase = Phase::Editing;
        self.focus = Some(Field::Phone);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn focus(&self) -> Option<Field> {
        self.focus
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn pending_files(&self) -> &[PathBuf] {
        &self.pending_files
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.draft.phone = phone.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.draft.body = body.into();
    }

    pub fn set_attach_pdf(&mut self, attach_pdf: bool) {
        self.draft.attach_pdf = attach_pdf;
    }

    pub fn set_report_type(&mut self, report_type: ReportType) {
        self.draft.report_type = report_type;
    }

    /// Apply a template selection.
    ///
    /// A known id overwrites the body with the template's text; `None` or
    /// an unknown id clears the selection and restores the default body.
    /// Later hand-edits of the body do not clear the selection.
    pub fn select_template(&mut self, template_id: Option<i64>) {
        let selected = template_id.and_then(|id| self.templates.iter().find(|t| t.id == id));
        match selected {
            Some(template) => {
                self.draft.template_id = Some(template.id);
                self.draft.body = template.body.clone();
            }
            None => {
                self.draft.template_id = None;
                self.draft.body = default_body(&self.order_name);
            }
        }
    }

    /// Stage local files for the next upload batch.
    pub fn select_files(&mut self, files: Vec<PathBuf>) {
        self.pending_files = files;
    }

    /// Upload the staged files as one batch.
    ///
    /// Every file is read, encoded, and created remotely concurrently. The
    /// batch is atomic: if any upload fails, no id from the batch reaches
    /// the draft and a danger notice is shown. On success the ids land in
    /// `attachment_ids` in selection order and the staging list clears.
    pub async fn upload_selected(&mut self) {
        if self.pending_files.is_empty() {
            return;
        }

        let order_id = self.order_id;
        let uploads: Vec<_> = self
            .pending_files
            .iter()
            .map(|path| {
                let store = Arc::clone(&self.attachments);
                async move {
                    let attachment = upload::encode_file(path, order_id).await?;
                    let id = store.create(attachment).await?;
                    anyhow::Ok(id)
                }
            })
            .collect();

        let batch = try_join_all(uploads).await;
        match batch {
            Ok(ids) => {
                self.draft.attachment_ids.extend(ids);
                self.pending_files.clear();
            }
            Err(err) => {
                tracing::warn!("attachment upload failed: {:#}", err);
                self.notifier
                    .notify(NoticeKind::Danger, "Failed to upload attachments.");
            }
        }
    }

    /// Drop an attachment from the draft.
    ///
    /// The id is removed immediately; the backend delete runs as a
    /// detached task and its outcome is never surfaced.
    pub fn remove_attachment(&mut self, attachment_id: i64) {
        self.draft.attachment_ids.retain(|&id| id != attachment_id);

        let store = Arc::clone(&self.attachments);
        tokio::spawn(async move {
            if let Err(err) = store.delete(attachment_id).await {
                tracing::debug!("attachment {} delete failed: {:#}", attachment_id, err);
            }
        });
    }

    /// Validate the draft and issue the dispatch call.
    ///
    /// Returns `Some(outcome)` when the form closed (send succeeded);
    /// `None` when it stays open for correction or retry.
    pub async fn submit(&mut self) -> Option<ComposeOutcome> {
        if self.draft.phone.trim().is_empty() {
            self.notifier
                .notify(NoticeKind::Warning, "Please enter a phone number.");
            return None;
        }
        if self.draft.body.trim().is_empty() {
            self.notifier
                .notify(NoticeKind::Warning, "Please enter a message.");
            return None;
        }

        let request = SendRequest {
            order_id: self.order_id,
            phone: self.draft.phone.clone(),
            message: self.draft.body.clone(),
            template_id: self.draft.template_id,
            attachment_ids: self.draft.attachment_ids.clone(),
            attach_pdf: self.draft.attach_pdf,
            report_type: self.draft.report_type,
        };

        match self.dispatcher.send(&request).await {
            Ok(receipt) => {
                self.notifier.notify(NoticeKind::Success, &receipt.message);
                self.phase = Phase::Closed;
                Some(ComposeOutcome::Sent {
                    confirmation: receipt.message,
                })
            }
            Err(err) => {
                let message =
                    err.user_message("Failed to send the receipt message. Please try again.");
                tracing::warn!("dispatch failed for order {}: {:#}", self.order_id, err);
                self.notifier.notify(NoticeKind::Danger, &message);
                None
            }
        }
    }

    /// Dismiss without sending.
    pub fn close(&mut self) -> ComposeOutcome {
        self.phase = Phase::Closed;
        ComposeOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendResult};
    use crate::models::{NewAttachment, SendReceipt};
    use std::sync::Mutex;

    // -- In-memory collaborator doubles --

    #[derive(Default)]
    struct FakeCatalog {
        templates: Vec<Template>,
        fail: bool,
    }

    #[async_trait]
    impl TemplateCatalog for FakeCatalog {
        async fn list_templates(&self) -> BackendResult<Vec<Template>> {
            if self.fail {
                return Err(BackendError::Transport(anyhow::anyhow!("catalog down")));
            }
            Ok(self.templates.clone())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        /// Upload of a file whose name contains this marker fails.
        fail_on: Option<String>,
        fail_delete: bool,
        created: Mutex<Vec<String>>,
        deleted: Mutex<Vec<i64>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl AttachmentStore for FakeStore {
        async fn create(&self, attachment: NewAttachment) -> BackendResult<i64> {
            if let Some(marker) = &self.fail_on {
                if attachment.name.contains(marker.as_str()) {
                    return Err(BackendError::Api {
                        message: "upload rejected".into(),
                    });
                }
            }
            self.created.lock().unwrap().push(attachment.name);
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(100 + *next)
        }

        async fn delete(&self, attachment_id: i64) -> BackendResult<()> {
            if self.fail_delete {
                return Err(BackendError::Api {
                    message: "already gone".into(),
                });
            }
            self.deleted.lock().unwrap().push(attachment_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDispatcher {
        fail_with: Option<String>,
        sent: Mutex<Vec<SendRequest>>,
    }

    #[async_trait]
    impl ReceiptDispatcher for FakeDispatcher {
        async fn send(&self, request: &SendRequest) -> BackendResult<SendReceipt> {
            if let Some(message) = &self.fail_with {
                return Err(BackendError::Api {
                    message: message.clone(),
                });
            }
            self.sent.lock().unwrap().push(request.clone());
            Ok(SendReceipt {
                message: "Receipt sent successfully.".into(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<(NoticeKind, String)>>,
    }

    impl RecordingNotifier {
        fn notices(&self) -> Vec<(NoticeKind, String)> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, kind: NoticeKind, message: &str) {
            self.notices.lock().unwrap().push((kind, message.into()));
        }

        fn alert(&self, title: &str, body: &str) {
            self.notices
                .lock()
                .unwrap()
                .push((NoticeKind::Danger, format!("{}: {}", title, body)));
        }
    }

    struct Harness {
        catalog: Arc<FakeCatalog>,
        store: Arc<FakeStore>,
        dispatcher: Arc<FakeDispatcher>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new(catalog: FakeCatalog, store: FakeStore, dispatcher: FakeDispatcher) -> Self {
            Self {
                catalog: Arc::new(catalog),
                store: Arc::new(store),
                dispatcher: Arc::new(dispatcher),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn form(&self) -> ComposeForm {
            ComposeForm::open(
                ComposeRequest {
                    order_id: 42,
                    order_name: "SO001".into(),
                    phone: "555-1234".into(),
                },
                Arc::clone(&self.catalog) as Arc<dyn TemplateCatalog>,
                Arc::clone(&self.store) as Arc<dyn AttachmentStore>,
                Arc::clone(&self.dispatcher) as Arc<dyn ReceiptDispatcher>,
                Arc::clone(&self.notifier) as Arc<dyn Notifier>,
            )
        }
    }

    fn sample_templates() -> Vec<Template> {
        vec![
            Template {
                id: 1,
                name: "Thanks".into(),
                body: "Thank you for your purchase!".into(),
            },
            Template {
                id: 2,
                name: "Invoice".into(),
                body: "Your invoice is attached.".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_open_seeds_default_body_and_loads_templates() {
        let harness = Harness::new(
            FakeCatalog {
                templates: sample_templates(),
                fail: false,
            },
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        assert_eq!(form.phase(), Phase::Loading);
        assert_eq!(form.draft().body, "Here is your order receipt: SO001");

        form.load_templates().await;
        assert_eq!(form.phase(), Phase::Editing);
        assert_eq!(form.templates().len(), 2);
        assert_eq!(form.focus(), Some(Field::Phone));
        assert!(harness.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_template_fetch_failure_is_non_fatal() {
        let harness = Harness::new(
            FakeCatalog {
                templates: vec![],
                fail: true,
            },
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        assert_eq!(form.phase(), Phase::Editing);
        assert!(form.templates().is_empty());
        let notices = harness.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, NoticeKind::Danger);
    }

    #[tokio::test]
    async fn test_select_template_overwrites_body_and_none_restores_default() {
        let harness = Harness::new(
            FakeCatalog {
                templates: sample_templates(),
                fail: false,
            },
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        form.select_template(Some(2));
        assert_eq!(form.draft().template_id, Some(2));
        assert_eq!(form.draft().body, "Your invoice is attached.");

        form.select_template(None);
        assert_eq!(form.draft().template_id, None);
        assert_eq!(form.draft().body, "Here is your order receipt: SO001");
    }

    #[tokio::test]
    async fn test_select_unknown_template_resets_to_default() {
        let harness = Harness::new(
            FakeCatalog {
                templates: sample_templates(),
                fail: false,
            },
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        form.select_template(Some(1));
        form.select_template(Some(999));
        assert_eq!(form.draft().template_id, None);
        assert_eq!(form.draft().body, "Here is your order receipt: SO001");
    }

    #[tokio::test]
    async fn test_body_edit_after_template_keeps_selection() {
        let harness = Harness::new(
            FakeCatalog {
                templates: sample_templates(),
                fail: false,
            },
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        form.select_template(Some(1));
        form.set_body("Edited by hand");
        assert_eq!(form.draft().template_id, Some(1));
        assert_eq!(form.draft().body, "Edited by hand");
    }

    #[tokio::test]
    async fn test_submit_empty_phone_warns_without_dispatch() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;
        form.set_phone("   ");

        assert_eq!(form.submit().await, None);
        assert_eq!(form.phase(), Phase::Editing);
        assert!(harness.dispatcher.sent.lock().unwrap().is_empty());
        let notices = harness.notifier.notices();
        assert_eq!(notices, vec![(NoticeKind::Warning, "Please enter a phone number.".into())]);
    }

    #[tokio::test]
    async fn test_submit_empty_body_warns_without_dispatch() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;
        form.set_body("");

        assert_eq!(form.submit().await, None);
        assert!(harness.dispatcher.sent.lock().unwrap().is_empty());
        let notices = harness.notifier.notices();
        assert_eq!(notices, vec![(NoticeKind::Warning, "Please enter a message.".into())]);
    }

    #[tokio::test]
    async fn test_successful_submit_closes_and_reports_confirmation() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        let outcome = form.submit().await;
        assert_eq!(
            outcome,
            Some(ComposeOutcome::Sent {
                confirmation: "Receipt sent successfully.".into()
            })
        );
        assert_eq!(form.phase(), Phase::Closed);

        let sent = harness.dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, 42);
        assert_eq!(sent[0].phone, "555-1234");

        let notices = harness.notifier.notices();
        assert_eq!(
            notices,
            vec![(NoticeKind::Success, "Receipt sent successfully.".into())]
        );
    }

    #[tokio::test]
    async fn test_failed_submit_stays_open_with_server_message() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher {
                fail_with: Some("Number is not reachable".into()),
                sent: Mutex::new(vec![]),
            },
        );
        let mut form = harness.form();
        form.load_templates().await;

        assert_eq!(form.submit().await, None);
        assert_eq!(form.phase(), Phase::Editing);
        let notices = harness.notifier.notices();
        assert_eq!(
            notices,
            vec![(NoticeKind::Danger, "Number is not reachable".into())]
        );
    }

    #[tokio::test]
    async fn test_upload_batch_appends_ids_in_selection_order() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        let dir = std::env::temp_dir();
        let a = dir.join("receipt_cli_batch_a.txt");
        let b = dir.join("receipt_cli_batch_b.txt");
        tokio::fs::write(&a, b"a").await.unwrap();
        tokio::fs::write(&b, b"b").await.unwrap();

        form.select_files(vec![a.clone(), b.clone()]);
        form.upload_selected().await;

        assert_eq!(form.draft().attachment_ids.len(), 2);
        assert!(form.pending_files().is_empty());
        assert!(harness.notifier.notices().is_empty());

        tokio::fs::remove_file(&a).await.ok();
        tokio::fs::remove_file(&b).await.ok();
    }

    #[tokio::test]
    async fn test_upload_batch_is_atomic_on_failure() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore {
                fail_on: Some("bad".into()),
                ..FakeStore::default()
            },
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        let dir = std::env::temp_dir();
        let good = dir.join("receipt_cli_good.txt");
        let bad = dir.join("receipt_cli_bad.txt");
        tokio::fs::write(&good, b"ok").await.unwrap();
        tokio::fs::write(&bad, b"no").await.unwrap();

        form.select_files(vec![good.clone(), bad.clone()]);
        form.upload_selected().await;

        assert!(form.draft().attachment_ids.is_empty());
        let notices = harness.notifier.notices();
        assert_eq!(
            notices,
            vec![(NoticeKind::Danger, "Failed to upload attachments.".into())]
        );

        tokio::fs::remove_file(&good).await.ok();
        tokio::fs::remove_file(&bad).await.ok();
    }

    #[tokio::test]
    async fn test_remove_attachment_is_optimistic() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore {
                fail_delete: true,
                ..FakeStore::default()
            },
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;
        form.draft.attachment_ids = vec![101, 102, 103];

        form.remove_attachment(102);
        // Dropped immediately, even though the backend delete will fail.
        assert_eq!(form.draft().attachment_ids, vec![101, 103]);
        assert!(harness.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_remove_attachment_requests_backend_delete() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;
        form.draft.attachment_ids = vec![101];

        form.remove_attachment(101);
        // Let the detached delete task run.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(*harness.store.deleted.lock().unwrap(), vec![101]);
    }

    #[tokio::test]
    async fn test_close_cancels_without_dispatch() {
        let harness = Harness::new(
            FakeCatalog::default(),
            FakeStore::default(),
            FakeDispatcher::default(),
        );
        let mut form = harness.form();
        form.load_templates().await;

        assert_eq!(form.close(), ComposeOutcome::Cancelled);
        assert_eq!(form.phase(), Phase::Closed);
        assert!(harness.dispatcher.sent.lock().unwrap().is_empty());
    }
}
