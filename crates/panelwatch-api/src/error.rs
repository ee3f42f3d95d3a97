use thiserror::Error;

/// Top-level error type for the `panelwatch-api` crate.
///
/// Covers every failure mode of the panel and webhook clients:
/// authentication, transport, envelope rejection, and payload decoding.
/// `panelwatch-core` maps these into per-panel / per-destination outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, panel refused the session, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session cookie expired or was never issued.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status outside the auth range.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    // ── Panel API ───────────────────────────────────────────────────
    /// The panel answered with `{"success": false, "msg": ...}`.
    #[error("Panel API error: {message}")]
    PanelApi { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the remote end says the destination is gone or
    /// refuses us permanently (403 / 404 / 410).
    pub fn is_gone(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 403 | 404 | 410),
            Self::Transport(e) => e.status().is_some_and(|s| {
                matches!(s.as_u16(), 403 | 404 | 410)
            }),
            _ => false,
        }
    }
}
