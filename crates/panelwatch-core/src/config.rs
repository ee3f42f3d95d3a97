// ── Runtime monitor configuration ──
//
// These types describe *how* the monitor polls, classifies and paces.
// They never touch disk: panelwatch-config builds a `MonitorConfig`
// and hands it in.

use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};

use crate::classify::Thresholds;

/// Check cadence used when none is configured: eight minutes.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(8 * 60);
/// Per-panel fetch bound.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Minimum gap between two event sends to the same destination.
pub const DEFAULT_SEND_PACE: Duration = Duration::from_millis(300);
/// Minimum gap between two report items to the same destination.
pub const DEFAULT_REPORT_PACE: Duration = Duration::from_millis(500);
/// Daily report offset from UTC, in seconds (+03:30).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

/// TLS verification strategy for panel connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Default: panels are usually self-signed.
    #[default]
    DangerAcceptInvalid,
}

/// Everything the monitor needs to run cycles and schedules.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub thresholds: Thresholds,
    /// Interval between check cycles.
    pub check_interval: Duration,
    /// Wall-clock time of the daily report, in `utc_offset`.
    pub daily_report_at: NaiveTime,
    pub utc_offset: FixedOffset,
    pub fetch_timeout: Duration,
    pub send_pace: Duration,
    pub report_pace: Duration,
    pub tls: TlsVerification,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            daily_report_at: NaiveTime::MIN,
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            send_pace: DEFAULT_SEND_PACE,
            report_pace: DEFAULT_REPORT_PACE,
            tls: TlsVerification::default(),
        }
    }
}
