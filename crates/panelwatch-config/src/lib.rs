//! Configuration for panelwatch.
//!
//! TOML file + `PANELWATCH_` environment layering, panel credential
//! resolution (env + keyring + plaintext), and translation into the core
//! types: `MonitorConfig`, `PanelRegistry`, `StaticScopeResolver`, the
//! snapshot store and the notification sink. Core never reads files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

use panelwatch_api::{TransportConfig, WebhookClient};
use panelwatch_core::{
    FileStore, LogSink, MemoryStore, MonitorConfig, NotificationSink, Panel, PanelId,
    PanelRegistry, ResourceId, ResourceScope, SnapshotStore, StaticScopeResolver, Thresholds,
    TlsVerification, WebhookSink,
};

const KEYRING_SERVICE: &str = "panelwatch";
const REDACTED: &str = "********";

const DEFAULT_CHECK_INTERVAL_MINUTES: i64 = 8;
const DEFAULT_UTC_OFFSET: &str = "+03:30";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for panel '{panel}'")]
    NoCredentials { panel: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("HTTP client setup failed: {0}")]
    Transport(#[from] panelwatch_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: ThresholdsSection,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub fetch: FetchSection,

    /// Viewers that see every resource on every panel.
    #[serde(default)]
    pub superadmins: Vec<String>,

    /// Registered panels, keyed by panel id.
    #[serde(default)]
    pub panels: BTreeMap<String, PanelSection>,

    /// Scoped viewers, keyed by viewer id.
    #[serde(default)]
    pub viewers: BTreeMap<String, ViewerSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsSection {
    #[serde(default = "default_one")]
    pub expiring_days: u64,
    #[serde(default = "default_one")]
    pub expiring_gb: u64,
}

impl Default for ThresholdsSection {
    fn default() -> Self {
        Self {
            expiring_days: 1,
            expiring_gb: 1,
        }
    }
}

fn default_one() -> u64 {
    1
}

/// Signed so that out-of-range values reach validation instead of
/// failing deserialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleSection {
    #[serde(default = "default_interval")]
    pub check_interval_minutes: i64,
    #[serde(default)]
    pub daily_report_hour: i64,
    #[serde(default)]
    pub daily_report_minute: i64,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
            daily_report_hour: 0,
            daily_report_minute: 0,
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_interval() -> i64 {
    DEFAULT_CHECK_INTERVAL_MINUTES
}
fn default_utc_offset() -> String {
    DEFAULT_UTC_OFFSET.into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,
    /// Snapshot directory; defaults to the platform data dir.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    #[default]
    Log,
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifySection {
    #[serde(default)]
    pub kind: NotifyKind,
    /// Webhook URL (required for `kind = "webhook"`).
    pub url: Option<String>,
    /// Bearer token (plaintext; prefer `token_env`).
    pub token: Option<String>,
    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,
    #[serde(default = "default_send_pace")]
    pub send_pace_ms: u64,
    #[serde(default = "default_report_pace")]
    pub report_pace_ms: u64,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            kind: NotifyKind::Log,
            url: None,
            token: None,
            token_env: None,
            send_pace_ms: default_send_pace(),
            report_pace_ms: default_report_pace(),
            timeout_secs: default_notify_timeout(),
        }
    }
}

fn default_send_pace() -> u64 {
    300
}
fn default_report_pace() -> u64 {
    500
}
fn default_notify_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchSection {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Accept self-signed panel certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,
    /// Custom CA certificate, used when `insecure = false`.
    pub ca_cert: Option<PathBuf>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            insecure: default_insecure(),
            ca_cert: None,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    20
}
fn default_insecure() -> bool {
    true
}

/// One registered panel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelSection {
    /// Display name; defaults to the panel id.
    pub name: Option<String>,
    /// Panel base URL (e.g. "https://panel.example.com:2053").
    pub url: String,
    /// Secret path prefix, if the panel has one.
    #[serde(default)]
    pub web_base_path: String,
    pub username: String,
    /// Plaintext password; keyring or `password_env` take precedence.
    pub password: Option<String>,
    /// Environment variable name containing the password.
    pub password_env: Option<String>,
}

/// A scoped viewer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ViewerSection {
    /// Panel id → `"all"` or a list of resource ids.
    #[serde(default)]
    pub panels: BTreeMap<String, GrantSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GrantSpec {
    Resources(Vec<i64>),
    Keyword(String),
}

impl GrantSpec {
    fn to_scope(&self, viewer: &str, panel: &str) -> Result<ResourceScope, ConfigError> {
        match self {
            Self::Resources(ids) => Ok(ResourceScope::Only(
                ids.iter().copied().map(ResourceId::new).collect(),
            )),
            Self::Keyword(word) if word.eq_ignore_ascii_case("all") => Ok(ResourceScope::All),
            Self::Keyword(other) => Err(invalid(
                format!("viewers.{viewer}.panels.{panel}"),
                format!("expected \"all\" or a list of resource ids, got '{other}'"),
            )),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "panelwatch", "panelwatch")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default snapshot directory.
pub fn default_store_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("snapshots"),
        |dirs| dirs.data_dir().join("snapshots"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("panelwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered provider: defaults → TOML file → `PANELWATCH_*` env
/// (`__` separates nesting, e.g. `PANELWATCH_SCHEDULE__DAILY_REPORT_HOUR`).
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PANELWATCH_").split("__"))
}

/// Load the full Config from `path` (or the default path) + environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Translation into core types ─────────────────────────────────────

impl Config {
    /// Thresholds, schedule and pacing. Out-of-range schedule values fall
    /// back to their defaults with a warning.
    pub fn monitor_config(&self) -> MonitorConfig {
        let schedule = &self.schedule;

        let interval_minutes = if schedule.check_interval_minutes < 1 {
            warn!(
                value = schedule.check_interval_minutes,
                "check_interval_minutes must be at least 1, using {DEFAULT_CHECK_INTERVAL_MINUTES}"
            );
            DEFAULT_CHECK_INTERVAL_MINUTES
        } else {
            schedule.check_interval_minutes
        };

        let hour = u32::try_from(schedule.daily_report_hour)
            .ok()
            .filter(|h| *h < 24)
            .unwrap_or_else(|| {
                warn!(value = schedule.daily_report_hour, "daily_report_hour out of range, using 0");
                0
            });
        let minute = u32::try_from(schedule.daily_report_minute)
            .ok()
            .filter(|m| *m < 60)
            .unwrap_or_else(|| {
                warn!(value = schedule.daily_report_minute, "daily_report_minute out of range, using 0");
                0
            });

        let defaults = MonitorConfig::default();
        let utc_offset = parse_utc_offset(&schedule.utc_offset).unwrap_or_else(|| {
            warn!(value = %schedule.utc_offset, "utc_offset not understood, using {DEFAULT_UTC_OFFSET}");
            defaults.utc_offset
        });

        MonitorConfig {
            thresholds: Thresholds::from_days_and_gib(
                self.thresholds.expiring_days,
                self.thresholds.expiring_gb,
            ),
            check_interval: Duration::from_secs(interval_minutes.unsigned_abs().saturating_mul(60)),
            daily_report_at: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            utc_offset,
            fetch_timeout: Duration::from_secs(self.fetch.timeout_secs.max(1)),
            send_pace: Duration::from_millis(self.notify.send_pace_ms),
            report_pace: Duration::from_millis(self.notify.report_pace_ms),
            tls: self.tls(),
        }
    }

    fn tls(&self) -> TlsVerification {
        if self.fetch.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.fetch.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        }
    }

    /// Every configured panel, with its password resolved.
    pub fn panel_registry(&self) -> Result<PanelRegistry, ConfigError> {
        let registry = PanelRegistry::new();
        for (id, section) in &self.panels {
            registry.upsert(section.to_panel(id)?);
        }
        Ok(registry)
    }

    /// Scope table over `registry`: superadmins plus per-viewer grants.
    pub fn scope_resolver(
        &self,
        registry: Arc<PanelRegistry>,
    ) -> Result<StaticScopeResolver, ConfigError> {
        let mut resolver = StaticScopeResolver::new(registry);
        for admin in &self.superadmins {
            resolver = resolver.with_superadmin(admin.as_str());
        }
        for (viewer, section) in &self.viewers {
            for (panel, grant) in &section.panels {
                let scope = grant.to_scope(viewer, panel)?;
                resolver = resolver.with_grant(viewer.as_str(), panel.as_str(), scope);
            }
        }
        Ok(resolver)
    }

    /// Snapshot store selected by `[store]`.
    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        match self.store.kind {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::new(
                self.store.path.clone().unwrap_or_else(default_store_dir),
            )),
        }
    }

    /// Notification sink selected by `[notify]`.
    pub fn notification_sink(&self) -> Result<Arc<dyn NotificationSink>, ConfigError> {
        match self.notify.kind {
            NotifyKind::Log => Ok(Arc::new(LogSink)),
            NotifyKind::Webhook => {
                let raw = self
                    .notify
                    .url
                    .as_deref()
                    .ok_or_else(|| invalid("notify.url", "required when kind = \"webhook\""))?;
                let url = Url::parse(raw)
                    .map_err(|e| invalid("notify.url", format!("invalid URL '{raw}': {e}")))?;
                let transport = TransportConfig::default()
                    .with_timeout(Duration::from_secs(self.notify.timeout_secs.max(1)));
                let client = WebhookClient::new(url, self.notify_token(), &transport)?;
                Ok(Arc::new(WebhookSink::new(client)))
            }
        }
    }

    fn notify_token(&self) -> Option<SecretString> {
        self.notify
            .token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .or_else(|| self.notify.token.clone())
            .map(SecretString::from)
    }

    /// Copy with every secret replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for panel in copy.panels.values_mut() {
            if panel.password.is_some() {
                panel.password = Some(REDACTED.into());
            }
        }
        if copy.notify.token.is_some() {
            copy.notify.token = Some(REDACTED.into());
        }
        copy
    }

    /// Pretty TOML rendering.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl PanelSection {
    fn to_panel(&self, id: &str) -> Result<Panel, ConfigError> {
        let base_url = Url::parse(&self.url)
            .map_err(|e| invalid(format!("panels.{id}.url"), format!("invalid URL '{}': {e}", self.url)))?;

        Ok(Panel {
            id: PanelId::from(id),
            name: self.name.clone().unwrap_or_else(|| id.to_owned()),
            base_url,
            web_base_path: self.web_base_path.clone(),
            username: self.username.clone(),
            password: resolve_panel_password(self, id)?,
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a panel password: `password_env` → keyring (`panel/<id>`) →
/// plaintext in config.
pub fn resolve_panel_password(
    panel: &PanelSection,
    panel_id: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var named by the panel
    if let Some(ref env_name) = panel.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("panel/{panel_id}")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = panel.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        panel: panel_id.into(),
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Parse `"+03:30"`, `"-0500"`, `"+3"`, `"Z"` or `"UTC"`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at_checked(2)?,
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn from_toml(text: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, text).unwrap();
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap()
    }

    const SAMPLE: &str = r#"
superadmins = ["1001"]

[thresholds]
expiring_days = 3
expiring_gb = 5

[schedule]
check_interval_minutes = 15
daily_report_hour = 9
daily_report_minute = 30
utc_offset = "+01:00"

[store]
kind = "memory"

[panels.de]
name = "Frankfurt"
url = "https://de.example.com:2053"
web_base_path = "/secret"
username = "admin"
password = "hunter2"

[viewers.2002.panels]
de = [1, 2]
"#;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        let monitor = cfg.monitor_config();
        assert_eq!(monitor.check_interval, Duration::from_secs(8 * 60));
        assert_eq!(monitor.daily_report_at, NaiveTime::MIN);
        assert_eq!(monitor.utc_offset, FixedOffset::east_opt(3 * 3600 + 1800).unwrap());
        assert_eq!(monitor.thresholds, Thresholds::from_days_and_gib(1, 1));
        assert_eq!(monitor.send_pace, Duration::from_millis(300));
        assert_eq!(monitor.report_pace, Duration::from_millis(500));
        assert_eq!(cfg.notify.kind, NotifyKind::Log);
    }

    #[test]
    fn sample_translates_to_core_types() {
        let cfg = from_toml(SAMPLE);
        let monitor = cfg.monitor_config();
        assert_eq!(monitor.thresholds, Thresholds::from_days_and_gib(3, 5));
        assert_eq!(monitor.check_interval, Duration::from_secs(15 * 60));
        assert_eq!(monitor.daily_report_at, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(monitor.utc_offset, FixedOffset::east_opt(3600).unwrap());

        let registry = cfg.panel_registry().unwrap();
        let panel = registry.get(&PanelId::from("de")).unwrap();
        assert_eq!(panel.name, "Frankfurt");
        assert_eq!(panel.web_base_path, "/secret");
        assert_eq!(panel.password.expose_secret(), "hunter2");
    }

    #[test]
    fn out_of_range_schedule_falls_back() {
        let cfg = from_toml(
            "[schedule]\ncheck_interval_minutes = 0\ndaily_report_hour = 24\ndaily_report_minute = -1\nutc_offset = \"Mars/Olympus\"\n",
        );
        let monitor = cfg.monitor_config();
        assert_eq!(monitor.check_interval, Duration::from_secs(8 * 60));
        assert_eq!(monitor.daily_report_at, NaiveTime::MIN);
        assert_eq!(monitor.utc_offset, MonitorConfig::default().utc_offset);
    }

    #[test]
    fn huge_interval_saturates() {
        let cfg = from_toml(&format!("[schedule]\ncheck_interval_minutes = {}\n", i64::MAX));
        assert_eq!(
            cfg.monitor_config().check_interval,
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn bad_grant_keyword_is_rejected() {
        let cfg = from_toml("[viewers.7.panels]\nde = \"some\"\n");
        let registry = Arc::new(PanelRegistry::new());
        assert!(matches!(
            cfg.scope_resolver(registry),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn grant_keyword_all() {
        let spec: ViewerSection = toml::from_str("[panels]\nde = \"all\"\nfr = [3]\n").unwrap();
        assert_eq!(spec.panels["de"].to_scope("v", "de").unwrap(), ResourceScope::All);
        assert_eq!(
            spec.panels["fr"].to_scope("v", "fr").unwrap(),
            ResourceScope::Only([ResourceId::new(3)].into_iter().collect())
        );
    }

    #[test]
    fn invalid_panel_url_is_rejected() {
        let cfg = from_toml("[panels.x]\nurl = \"not a url\"\nusername = \"a\"\npassword = \"b\"\n");
        let err = cfg.panel_registry().unwrap_err();
        assert!(err.to_string().contains("panels.x.url"), "got {err}");
    }

    #[test]
    fn webhook_requires_url() {
        let cfg = from_toml("[notify]\nkind = \"webhook\"\n");
        assert!(matches!(
            cfg.notification_sink(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn redaction_hides_secrets() {
        let mut cfg = from_toml(SAMPLE);
        cfg.notify.token = Some("t0k".into());
        let shown = cfg.redacted().to_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("t0k"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn utc_offset_formats() {
        let east = |s| FixedOffset::east_opt(s).unwrap();
        assert_eq!(parse_utc_offset("+03:30"), Some(east(12_600)));
        assert_eq!(parse_utc_offset("-0500"), Some(east(-18_000)));
        assert_eq!(parse_utc_offset("+3"), Some(east(10_800)));
        assert_eq!(parse_utc_offset("UTC"), Some(east(0)));
        assert_eq!(parse_utc_offset("03:30"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
        assert_eq!(parse_utc_offset(""), None);
        assert_eq!(parse_utc_offset("+1é1"), None);
        assert_eq!(parse_utc_offset("+é"), None);
    }
}
