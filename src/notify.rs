//! # Email Notification Module
//!
//! Notifica di fine esecuzione via SMTP (senza autenticazione).
//!
//! ## Responsabilità:
//! - Composizione di oggetto e testo dal `RunReport` (successo o errore)
//! - Allegati: i file di log principale ed errori, se presenti
//! - Qualsiasi errore di invio viene loggato e mai propagato

use crate::config::{Config, SmtpSettings};
use crate::progress::TraversalResult;
use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Message, SmtpTransport, Transport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

const NOTIFY_NOTE: &str = ">> Notifications can be turned off in the config file";
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Summary of a finished run, as sent by email
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub path: PathBuf,
    pub files_compressed: usize,
    pub files_renamed: usize,
    pub saved_mb: f64,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

impl RunReport {
    pub fn from_result(path: &Path, result: &TraversalResult, elapsed: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            files_compressed: result.files_compressed,
            files_renamed: result.files_renamed,
            saved_mb: result.saved_mb(),
            elapsed_secs: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn subject(&self) -> &'static str {
        if self.is_success() {
            "Compression completed successfully"
        } else {
            "Compression execution error"
        }
    }

    pub fn body(&self) -> String {
        let mut text = String::new();
        match &self.error {
            None => text.push_str("Status: Successfully completed\n"),
            Some(error) => {
                text.push_str("Status: Completed with an error\n");
                text.push_str(&format!("Error: {}\n", error));
            }
        }
        text.push_str(&format!("Path: {}\n", self.path.display()));
        text.push_str(&format!("Compressed files: {}\n", self.files_compressed));
        if self.files_renamed > 0 {
            text.push_str(&format!("Renamed files: {}\n", self.files_renamed));
        }
        text.push_str(&format!("Saved size: {} MB\n", self.saved_mb));
        text.push_str(&format!("Time: {} seconds\n\n", self.elapsed_secs));
        text.push_str(NOTIFY_NOTE);
        text
    }
}

/// Sends the run report to the configured recipients
pub struct EmailNotifier {
    smtp: SmtpSettings,
    attachments: Vec<PathBuf>,
}

impl EmailNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            smtp: config.smtp.clone(),
            attachments: vec![config.logger.main_log(), config.logger.error_log()],
        }
    }

    /// Build the message with whatever log files can be read
    pub fn build_message(&self, report: &RunReport) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.smtp.from_email.parse::<Mailbox>()?)
            .subject(report.subject());
        for recipient in &self.smtp.to_email {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(report.body()));
        for path in &self.attachments {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "log.txt".to_string());
                    body = body.singlepart(Attachment::new(filename).body(content, ContentType::TEXT_PLAIN));
                }
                Err(e) => error!("File not found: {} in attachment ({})", path.display(), e),
            }
        }

        Ok(builder.multipart(body)?)
    }

    /// Deliver `report` if notifications are enabled. Never fails.
    pub async fn notify(&self, report: &RunReport) {
        if !self.smtp.enable {
            debug!("Email notifications are disabled");
            return;
        }

        let message = match self.build_message(report) {
            Ok(message) => message,
            Err(e) => {
                error!("send_email error: {}", e);
                return;
            }
        };

        let host = self.smtp.smtp_address.clone();
        let port = self.smtp.smtp_port;
        let delivery = tokio::task::spawn_blocking(move || {
            SmtpTransport::builder_dangerous(host)
                .port(port)
                .timeout(Some(SMTP_TIMEOUT))
                .build()
                .send(&message)
        })
        .await;

        match delivery {
            Ok(Ok(_)) => info!("Notification sent to {}", self.smtp.to_email.join(", ")),
            Ok(Err(e)) => error!("SMTP Error: {}", e),
            Err(e) => error!("send_email error: {}", e),
        }
    }
}
