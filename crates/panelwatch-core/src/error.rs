// ── Core error types ──
//
// Errors surfaced by panelwatch-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<panelwatch_api::Error>`
// impl translates transport-layer errors into domain variants.
//
// Only `Store` and `Scope` abort a viewer's cycle. Source and sink errors
// are isolated per panel and per event by the builder and dispatcher.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Upstream panels ──────────────────────────────────────────────
    #[error("Panel {panel} unavailable: {message}")]
    Source { panel: String, message: String },

    #[error("Panel {panel} did not answer within {timeout_secs}s")]
    Timeout { panel: String, timeout_secs: u64 },

    #[error("Panel {panel} rejected login: {message}")]
    AuthenticationFailed { panel: String, message: String },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Snapshot store unavailable: {message}")]
    Store { message: String },

    // ── Scope resolution ─────────────────────────────────────────────
    #[error("Cannot resolve scope for viewer {viewer}: {message}")]
    Scope { viewer: String, message: String },

    // ── Delivery ─────────────────────────────────────────────────────
    #[error("Notification delivery failed: {message}")]
    Sink { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Store shorthand used by the snapshot store implementations.
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store {
            message: message.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

// Panel-facing variants come out with an empty or host-only `panel` and a
// zero `timeout_secs`; the panel source fills both in.

impl From<panelwatch_api::Error> for CoreError {
    fn from(err: panelwatch_api::Error) -> Self {
        use panelwatch_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed {
                panel: String::new(),
                message,
            },
            Api::SessionExpired => CoreError::AuthenticationFailed {
                panel: String::new(),
                message: "Session expired -- re-authentication required".into(),
            },
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout {
                panel: e
                    .url()
                    .and_then(url::Url::host_str)
                    .unwrap_or_default()
                    .to_owned(),
                timeout_secs: 0,
            },
            Api::Transport(e) => CoreError::Source {
                panel: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Source {
                panel: String::new(),
                message: format!("TLS error: {msg}"),
            },
            Api::Status { status, body } => CoreError::Source {
                panel: String::new(),
                message: format!("HTTP {status}: {body}"),
            },
            Api::PanelApi { message } => CoreError::Source {
                panel: String::new(),
                message,
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::store(err)
    }
}
