// ── Notification sinks ──
//
// A sink delivers one item to one viewer's destination. Failure is final
// for that item: the dispatcher decides what happens next, the sink never
// retries on its own. Message wording is the sink's concern.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use panelwatch_api::WebhookClient;

use crate::model::{ChangeEvent, PanelReport, ViewerId};

/// Why a single delivery failed.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination refuses us for good (blocked, deleted, forbidden).
    /// Remaining items for that destination in the batch are dropped.
    #[error("Destination unavailable: {message}")]
    DestinationUnavailable { message: String },

    /// Any other failure. Only this item is lost.
    #[error("Delivery failed: {message}")]
    Failed { message: String },
}

impl SinkError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl From<panelwatch_api::Error> for SinkError {
    fn from(err: panelwatch_api::Error) -> Self {
        if err.is_gone() {
            Self::DestinationUnavailable {
                message: err.to_string(),
            }
        } else {
            Self::Failed {
                message: err.to_string(),
            }
        }
    }
}

/// Delivery seam for change events and report items.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn deliver(&self, viewer: &ViewerId, event: &ChangeEvent) -> Result<(), SinkError>;

    async fn deliver_report(&self, viewer: &ViewerId, report: &PanelReport)
    -> Result<(), SinkError>;
}

// ── LogSink ─────────────────────────────────────────────────────────

/// Writes every item to the log. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, viewer: &ViewerId, event: &ChangeEvent) -> Result<(), SinkError> {
        info!(
            %viewer,
            panel = %event.panel_id,
            panel_name = %event.panel_name,
            client = %event.client_id,
            transition = %event.transition,
            "client status changed"
        );
        Ok(())
    }

    async fn deliver_report(
        &self,
        viewer: &ViewerId,
        report: &PanelReport,
    ) -> Result<(), SinkError> {
        let snap = &report.snapshot;
        info!(
            %viewer,
            panel = %report.panel_id,
            panel_name = %snap.panel_name,
            users = snap.counts.users,
            online = snap.counts.online,
            expiring = snap.counts.expiring,
            expired = snap.counts.expired,
            used_bytes = snap.usage.used_bytes,
            remaining_bytes = ?snap.usage.remaining_bytes,
            unlimited = snap.usage.unlimited,
            "panel report"
        );
        Ok(())
    }
}

// ── WebhookSink ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WebhookPayload<'a> {
    Event {
        viewer: &'a ViewerId,
        sent_at: DateTime<Utc>,
        event: &'a ChangeEvent,
    },
    Report {
        viewer: &'a ViewerId,
        sent_at: DateTime<Utc>,
        report: &'a PanelReport,
    },
}

/// POSTs each item as JSON to one webhook endpoint.
///
/// HTTP 403/404/410 is reported as [`SinkError::DestinationUnavailable`].
pub struct WebhookSink {
    client: WebhookClient,
}

impl WebhookSink {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, viewer: &ViewerId, event: &ChangeEvent) -> Result<(), SinkError> {
        let payload = WebhookPayload::Event {
            viewer,
            sent_at: Utc::now(),
            event,
        };
        self.client.post_json(&payload).await?;
        debug!(%viewer, client = %event.client_id, "webhook event sent");
        Ok(())
    }

    async fn deliver_report(
        &self,
        viewer: &ViewerId,
        report: &PanelReport,
    ) -> Result<(), SinkError> {
        let payload = WebhookPayload::Report {
            viewer,
            sent_at: Utc::now(),
            report,
        };
        self.client.post_json(&payload).await?;
        debug!(%viewer, panel = %report.panel_id, "webhook report sent");
        Ok(())
    }
}
