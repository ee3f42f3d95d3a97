//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use panelwatch_config::ConfigError;
use panelwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Panels ───────────────────────────────────────────────────────

    #[error("Panel {panel} is unavailable: {message}")]
    #[diagnostic(
        code(panelwatch::panel_unavailable),
        help(
            "Check that the panel is running and reachable, and that its url\n\
             and web_base_path are right in [panels.{panel}]."
        )
    )]
    PanelUnavailable { panel: String, message: String },

    #[error("Panel '{panel}' timed out after {seconds}s")]
    #[diagnostic(
        code(panelwatch::timeout),
        help("Raise [fetch] timeout_secs or check panel responsiveness.")
    )]
    Timeout { panel: String, seconds: u64 },

    #[error("Login to panel '{panel}' failed: {message}")]
    #[diagnostic(
        code(panelwatch::auth_failed),
        help(
            "Verify username and password in [panels.{panel}]\n\
             (password_env, keyring entry panelwatch/panel/{panel}, or password)."
        )
    )]
    AuthFailed { panel: String, message: String },

    #[error("No password configured for panel '{panel}'")]
    #[diagnostic(
        code(panelwatch::no_credentials),
        help(
            "Set password_env or password in [panels.{panel}],\n\
             or store it in the system keyring under service 'panelwatch', entry 'panel/{panel}'."
        )
    )]
    NoCredentials { panel: String },

    // ── Lookups ──────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(panelwatch::not_found),
        help("Run: panelwatch {list_command} to see what is configured")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Cycles ───────────────────────────────────────────────────────

    #[error("Snapshot store failed: {message}")]
    #[diagnostic(
        code(panelwatch::store),
        help("Check that [store] path is writable. A corrupt snapshot file must be removed by hand.")
    )]
    Store { message: String },

    #[error("Cannot resolve scope for viewer {viewer}: {message}")]
    #[diagnostic(code(panelwatch::scope))]
    Scope { viewer: String, message: String },

    #[error("Notification delivery failed: {message}")]
    #[diagnostic(code(panelwatch::delivery))]
    Delivery { message: String },

    #[error("{failed} of {total} viewer cycles failed")]
    #[diagnostic(
        code(panelwatch::cycles_failed),
        help("See the errors above; failed viewers are retried on the next run.")
    )]
    CyclesFailed { failed: usize, total: usize },

    #[error("Internal error: {message}")]
    #[diagnostic(code(panelwatch::internal))]
    Internal { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(panelwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No viewers configured")]
    #[diagnostic(
        code(panelwatch::no_viewers),
        help(
            "Add superadmins = [...] or a [viewers.<id>.panels] table.\n\
             Config file: {path}"
        )
    )]
    NoViewers { path: String },

    #[error(transparent)]
    #[diagnostic(code(panelwatch::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(panelwatch::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PanelUnavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Source { panel, message } => CliError::PanelUnavailable { panel, message },
            CoreError::Timeout {
                panel,
                timeout_secs,
            } => CliError::Timeout {
                panel,
                seconds: timeout_secs,
            },
            CoreError::AuthenticationFailed { panel, message } => {
                CliError::AuthFailed { panel, message }
            }
            CoreError::Store { message } => CliError::Store { message },
            CoreError::Scope { viewer, message } => CliError::Scope { viewer, message },
            CoreError::Sink { message } => CliError::Delivery { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { panel } => CliError::NoCredentials { panel },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Render(e.to_string()),
            ConfigError::Transport(e) => CliError::Validation {
                field: "notify".into(),
                reason: e.to_string(),
            },
        }
    }
}
