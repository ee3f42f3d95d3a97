// ── Core identity types ──
//
// ViewerId, PanelId and ResourceId key every snapshot, scope and event.
// Viewer and panel ids are opaque strings; resource ids are the panel's
// numeric inbound ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── ViewerId ────────────────────────────────────────────────────────

/// Identifier of an operator that receives reports and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ViewerId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ViewerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ViewerId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<i64> for ViewerId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

// ── PanelId ─────────────────────────────────────────────────────────

/// Stable identifier of a registered panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PanelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for PanelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PanelId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ── ResourceId ──────────────────────────────────────────────────────

/// Identifier of one resource (inbound) on a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(i64);

impl ResourceId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(n: i64) -> Self {
        Self(n)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn viewer_id_trims_whitespace() {
        let id: ViewerId = "  12345 ".parse().unwrap();
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn viewer_id_from_numeric_chat_id() {
        assert_eq!(ViewerId::from(-100_123_i64).to_string(), "-100123");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PanelId::from("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
        let json = serde_json::to_string(&ResourceId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
