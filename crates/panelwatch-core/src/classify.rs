// ── Status classification ──
//
// Pure mapping from a normalized client record and "now" to a status.
// Expired is checked first and is terminal; expiring is only considered
// for clients that are not expired. Time and quota are OR-ed.

use crate::coerce::GIB;
use crate::model::{ClientRecord, ClientStatus};

/// Default "expiring soon" window: one day.
pub const DEFAULT_EXPIRING_SECS: u64 = 24 * 3600;
/// Default "almost out of traffic" window: one GiB.
pub const DEFAULT_EXPIRING_BYTES: u64 = GIB;

/// Windows that turn a healthy client into an expiring one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub expiring_secs: u64,
    pub expiring_bytes: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            expiring_secs: DEFAULT_EXPIRING_SECS,
            expiring_bytes: DEFAULT_EXPIRING_BYTES,
        }
    }
}

impl Thresholds {
    /// Build from whole days and whole GiB, as operators configure them.
    pub fn from_days_and_gib(days: u64, gib: u64) -> Self {
        Self {
            expiring_secs: days.saturating_mul(24 * 3600),
            expiring_bytes: gib.saturating_mul(GIB),
        }
    }

    pub fn classify(&self, record: &ClientRecord, now_epoch_secs: i64) -> ClientStatus {
        classify(
            record,
            now_epoch_secs,
            self.expiring_secs,
            self.expiring_bytes,
        )
    }
}

/// Classify one client at `now_epoch_secs`.
///
/// Never fails: the record is already coerced to non-negative integers,
/// and the arithmetic is done in `i128` so no input can overflow.
pub fn classify(
    record: &ClientRecord,
    now_epoch_secs: i64,
    expiring_time_threshold_secs: u64,
    expiring_quota_threshold_bytes: u64,
) -> ClientStatus {
    let remaining = record.remaining_bytes();
    let quota_expired = remaining.is_some_and(|left| left <= 0);

    let has_expiry = record.expiry_epoch_millis > 0;
    // Milliseconds until expiry; compared in ms to keep sub-second precision.
    let millis_left = i128::from(record.expiry_epoch_millis) - i128::from(now_epoch_secs) * 1000;
    let time_expired = has_expiry && millis_left <= 0;

    if quota_expired || time_expired {
        return ClientStatus::Expired;
    }

    let time_window = i128::from(expiring_time_threshold_secs) * 1000;
    let time_expiring = has_expiry && millis_left > 0 && millis_left <= time_window;

    let quota_window = i128::from(expiring_quota_threshold_bytes);
    let quota_expiring = remaining.is_some_and(|left| left > 0 && left <= quota_window);

    if time_expiring || quota_expiring {
        ClientStatus::Expiring
    } else {
        ClientStatus::Normal
    }
}
