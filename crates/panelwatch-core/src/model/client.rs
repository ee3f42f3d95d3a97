// ── Client domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One tracked account on a panel, normalized from whatever shape the
/// panel used. Quota and expiry use `0` for "no limit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Usually an email-like string; unique within a panel.
    pub id: String,
    /// `up + down`.
    pub used_bytes: u64,
    /// Byte ceiling. `0` means unlimited.
    pub quota_bytes: u64,
    /// Expiry as epoch milliseconds. `0` means no time limit.
    pub expiry_epoch_millis: u64,
    /// Present in the panel's online list this cycle.
    pub online: bool,
    pub enabled: bool,
}

impl ClientRecord {
    /// Unlimited, never-expiring, enabled client.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            used_bytes: 0,
            quota_bytes: 0,
            expiry_epoch_millis: 0,
            online: false,
            enabled: true,
        }
    }

    /// Connected right now and allowed to be.
    pub fn is_online(&self) -> bool {
        self.enabled && self.online
    }

    /// Bytes left before the quota is hit, `None` when unlimited.
    /// Negative once the client has overrun its quota.
    pub fn remaining_bytes(&self) -> Option<i128> {
        (self.quota_bytes > 0).then(|| i128::from(self.quota_bytes) - i128::from(self.used_bytes))
    }
}

/// Derived status of a client at one instant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientStatus {
    Normal,
    Expiring,
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_none_when_unlimited() {
        let c = ClientRecord::new("a");
        assert_eq!(c.remaining_bytes(), None);
    }

    #[test]
    fn remaining_goes_negative_on_overrun() {
        let mut c = ClientRecord::new("a");
        c.quota_bytes = 10;
        c.used_bytes = 15;
        assert_eq!(c.remaining_bytes(), Some(-5));
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(ClientStatus::Expiring.to_string(), "expiring");
        assert_eq!("expired".parse::<ClientStatus>().ok(), Some(ClientStatus::Expired));
    }
}
