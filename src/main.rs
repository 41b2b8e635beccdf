//! receipt-cli - Send POS order receipts over a messaging channel
//!
//! Command-line frontend for the receipt compose flow.

mod backend;
mod compose;
mod config;
mod models;
mod notify;
mod trigger;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::http::BackendClient;
use backend::{AttachmentStore, OrderDirectory, ReceiptDispatcher, TemplateCatalog};
use compose::{ComposeForm, ComposeHost, ComposeOutcome, ComposeRequest};
use config::Config;
use models::ReportType;
use notify::{ConsoleNotifier, Notifier};
use trigger::DispatchTrigger;

#[derive(Parser)]
#[command(name = "receipt-cli")]
#[command(about = "Send POS order receipts to customers over a messaging channel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store backend connection settings
    Configure {
        /// Base URL of the POS messaging backend
        #[arg(long)]
        url: Option<String>,

        /// API key for the backend
        #[arg(long)]
        api_key: Option<String>,

        /// Default report kind for the PDF receipt: custom, standard
        #[arg(long)]
        report_type: Option<String>,
    },

    /// List available message templates
    Templates,

    /// Send the receipt for an order
    Send {
        /// Server id of the order (from the POS backend)
        order_id: i64,

        /// Override the recipient phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Override the message body
        #[arg(short, long)]
        message: Option<String>,

        /// Template id to use as the message body
        #[arg(short, long)]
        template: Option<i64>,

        /// Attach a local file (repeatable)
        #[arg(short, long = "attach")]
        attach: Vec<PathBuf>,

        /// Do not attach the rendered PDF receipt
        #[arg(long)]
        no_pdf: bool,

        /// Report kind for the PDF receipt: custom, standard
        #[arg(long)]
        report_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Configure {
            url,
            api_key,
            report_type,
        } => {
            configure(url, api_key, report_type)?;
        }
        Commands::Templates => {
            list_templates().await?;
        }
        Commands::Send {
            order_id,
            phone,
            message,
            template,
            attach,
            no_pdf,
            report_type,
        } => {
            let report_type = report_type.map(|s| parse_report_type(&s)).transpose()?;
            let options = SendOptions {
                phone,
                message,
                template,
                attach,
                no_pdf,
                report_type,
            };
            send(order_id, options).await?;
        }
    }

    Ok(())
}

fn parse_report_type(s: &str) -> Result<ReportType> {
    s.parse::<ReportType>().map_err(|e| anyhow::anyhow!(e))
}

fn configure(url: Option<String>, api_key: Option<String>, report_type: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = url {
        config.backend_url = Some(url);
    }
    if let Some(api_key) = api_key {
        config.api_key = Some(api_key);
    }
    if let Some(report_type) = report_type {
        config.default_report_type = Some(parse_report_type(&report_type)?);
    }
    config.save()?;
    println!("Configuration saved.");
    Ok(())
}

async fn list_templates() -> Result<()> {
    let config = Config::load()?;
    let client = BackendClient::from_config(&config)?;

    let templates = client
        .list_templates()
        .await
        .context("Failed to load message templates")?;

    if templates.is_empty() {
        println!("No templates available.");
        return Ok(());
    }
    for template in templates {
        let preview = template.body.lines().next().unwrap_or_default();
        println!("{:>6}  {:<24} {}", template.id, template.name, preview);
    }
    Ok(())
}

/// Per-invocation overrides for the send flow.
struct SendOptions {
    phone: Option<String>,
    message: Option<String>,
    template: Option<i64>,
    attach: Vec<PathBuf>,
    no_pdf: bool,
    report_type: Option<ReportType>,
}

/// Compose host for the terminal: applies the CLI overrides to the form
/// and submits in one pass instead of waiting on interactive edits.
struct CliComposeHost {
    client: Arc<BackendClient>,
    notifier: Arc<dyn Notifier>,
    options: SendOptions,
    default_attach_pdf: bool,
    default_report_type: ReportType,
}

#[async_trait]
impl ComposeHost for CliComposeHost {
    async fn open(&self, request: ComposeRequest) -> Result<ComposeOutcome> {
        let mut form = ComposeForm::open(
            request,
            Arc::clone(&self.client) as Arc<dyn TemplateCatalog>,
            Arc::clone(&self.client) as Arc<dyn AttachmentStore>,
            Arc::clone(&self.client) as Arc<dyn ReceiptDispatcher>,
            Arc::clone(&self.notifier),
        );
        form.load_templates().await;

        form.set_attach_pdf(self.default_attach_pdf && !self.options.no_pdf);
        form.set_report_type(
            self.options
                .report_type
                .unwrap_or(self.default_report_type),
        );

        if let Some(template) = self.options.template {
            form.select_template(Some(template));
            if form.draft().template_id.is_none() {
                anyhow::bail!("Template {} not found", template);
            }
        }
        if let Some(phone) = &self.options.phone {
            form.set_phone(phone);
        }
        if let Some(message) = &self.options.message {
            form.set_body(message);
        }

        if !self.options.attach.is_empty() {
            form.select_files(self.options.attach.clone());
            form.upload_selected().await;
            if !form.pending_files().is_empty() {
                // Batch failed; nothing was attached.
                return Ok(form.close());
            }
        }

        match form.submit().await {
            Some(outcome) => Ok(outcome),
            None => Ok(form.close()),
        }
    }
}

async fn send(order_id: i64, options: SendOptions) -> Result<()> {
    let config = Config::load()?;
    let client = Arc::new(BackendClient::from_config(&config)?);
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let order = client
        .fetch_order(order_id)
        .await
        .with_context(|| format!("Failed to fetch order {}", order_id))?;
    tracing::debug!("fetched order {} ({})", order_id, order.name);

    let host = Arc::new(CliComposeHost {
        client,
        notifier: Arc::clone(&notifier),
        options,
        default_attach_pdf: config.attach_pdf(),
        default_report_type: config.report_type(),
    });
    let trigger = DispatchTrigger::new(host, notifier);

    match trigger.invoke(&order).await {
        Some(ComposeOutcome::Sent { .. }) => Ok(()),
        _ => anyhow::bail!("Receipt was not sent"),
    }
}
