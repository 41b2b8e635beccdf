//! HTTP implementation of the backend seams
//!
//! Wraps reqwest::Client with API-key auth against the POS backend's REST
//! surface. Structured error bodies are mapped to [`BackendError::Api`] so
//! the server's own wording reaches the operator.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;

use super::{
    AttachmentStore, BackendError, BackendResult, OrderDirectory, ReceiptDispatcher,
    TemplateCatalog,
};
use crate::config::Config;
use crate::models::{NewAttachment, Order, SendReceipt, SendRequest, Template};

/// Authenticated client for the POS messaging backend.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    /// Build a client from saved configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = config
            .backend_url
            .clone()
            .context("No backend URL configured. Run 'receipt-cli configure' first.")?;
        let api_key = config
            .api_key
            .clone()
            .context("No API key configured. Run 'receipt-cli configure' first.")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> BackendResult<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> BackendResult<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    async fn delete_req(&self, path: &str) -> BackendResult<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        let resp = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        check_response(resp, &url).await
    }
}

#[async_trait]
impl OrderDirectory for BackendClient {
    async fn fetch_order(&self, order_id: i64) -> BackendResult<Order> {
        let resp = self.get(&format!("/api/pos/orders/{}", order_id)).await?;
        let order = resp
            .json::<Order>()
            .await
            .context("Failed to parse order response")?;
        Ok(order)
    }
}

#[async_trait]
impl TemplateCatalog for BackendClient {
    async fn list_templates(&self) -> BackendResult<Vec<Template>> {
        #[derive(Deserialize)]
        struct TemplatesResponse {
            templates: Vec<Template>,
        }

        let resp = self.get("/api/messaging/templates").await?;
        let body = resp
            .json::<TemplatesResponse>()
            .await
            .context("Failed to parse template catalog response")?;
        Ok(body.templates)
    }
}

#[async_trait]
impl AttachmentStore for BackendClient {
    async fn create(&self, attachment: NewAttachment) -> BackendResult<i64> {
        #[derive(Deserialize)]
        struct CreatedResponse {
            id: i64,
        }

        let body = serde_json::json!({
            "name": attachment.name,
            "mimetype": attachment.mimetype,
            "datas": attachment.payload_b64,
            "res_model": "pos.order",
            "res_id": attachment.order_id,
        });
        let resp = self.post("/api/attachments", &body).await?;
        let created = resp
            .json::<CreatedResponse>()
            .await
            .context("Failed to parse attachment create response")?;
        Ok(created.id)
    }

    async fn delete(&self, attachment_id: i64) -> BackendResult<()> {
        self.delete_req(&format!("/api/attachments/{}", attachment_id))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReceiptDispatcher for BackendClient {
    async fn send(&self, request: &SendRequest) -> BackendResult<SendReceipt> {
        let body = serde_json::to_value(request).context("Failed to encode send request")?;
        let resp = self
            .post(
                &format!("/api/pos/orders/{}/receipt/send", request.order_id),
                &body,
            )
            .await?;
        let receipt = resp
            .json::<SendReceipt>()
            .await
            .context("Failed to parse send response")?;
        Ok(receipt)
    }
}

/// Error body shape the backend uses for rejected requests.
#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Check HTTP response status and map failures to a clear error.
///
/// Non-2xx responses with a structured body become [`BackendError::Api`]
/// carrying the server's message; anything else is a transport error.
async fn check_response(resp: reqwest::Response, url: &str) -> BackendResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(&body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return Err(BackendError::Api { message });
        }
    }
    Err(BackendError::Transport(anyhow!(
        "HTTP {} for {}: {}",
        status.as_u16(),
        url,
        body
    )))
}
