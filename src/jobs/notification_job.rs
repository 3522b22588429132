//! Notification e-mail job.
//!
//! Services enqueue [`NotificationJob`]s through a [`Notifier`]; the
//! `jobs work` command drains the queue. Without SMTP settings the worker
//! logs each message instead of sending it.

use apalis::prelude::Storage;
use apalis_sql::postgres::PostgresStorage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::AppError;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Notification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    /// Recipient email address
    pub to: String,
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl NotificationJob {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Fire-and-forget delivery of notifications.
///
/// Implementations log failures; a notification never fails the request
/// that produced it.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, job: NotificationJob);
}

/// Pushes jobs onto the apalis Postgres queue.
#[derive(Clone)]
pub struct QueueNotifier {
    storage: PostgresStorage<NotificationJob>,
}

impl QueueNotifier {
    pub fn new(storage: PostgresStorage<NotificationJob>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Notifier for QueueNotifier {
    async fn notify(&self, job: NotificationJob) {
        let mut storage = self.storage.clone();
        let to = job.to.clone();
        if let Err(e) = storage.push(job).await {
            tracing::error!(to = %to, error = %e, "Failed to enqueue notification");
        }
    }
}

/// Used when the job queue is disabled.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, job: NotificationJob) {
        tracing::info!(to = %job.to, subject = %job.subject, "Notification (queue disabled)");
    }
}

struct SmtpSettings {
    host: Option<String>,
    from: String,
}

impl SmtpSettings {
    fn from_env() -> Self {
        Self {
            host: env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@seller-panel.local".to_string()),
        }
    }
}

/// Worker handler for notification jobs
pub async fn notification_job_handler(job: NotificationJob) -> Result<(), AppError> {
    let smtp = SmtpSettings::from_env();

    tracing::info!(
        to = %job.to,
        from = %smtp.from,
        subject = %job.subject,
        "Processing notification job"
    );

    match smtp.host {
        None => {
            tracing::info!(
                "=== NOTIFICATION (not sent) ===\n\
                 From: {}\n\
                 To: {}\n\
                 Subject: {}\n\
                 Body:\n{}\n\
                 ===============================",
                smtp.from,
                job.to,
                job.subject,
                job.body
            );
        }
        Some(host) => {
            // TODO: deliver through an SMTP transport once one is added to the stack
            tracing::warn!(host = %host, to = %job.to, "SMTP delivery not available, notification logged only");
        }
    }

    Ok(())
}
