// ── Snapshot domain types ──
//
// A `ViewerSnapshot` is the unit that is persisted and diffed: one
// `PanelSnapshot` per panel the viewer can see. Id lists are `BTreeSet`s
// so they serialize sorted and de-duplicated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{PanelId, ViewerId};

/// Per-panel client counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub users: usize,
    pub online: usize,
    pub expiring: usize,
    pub expired: usize,
}

/// Aggregate traffic usage of the in-scope resources on a panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub used_bytes: u64,
    /// Sum of non-zero resource quotas.
    pub capacity_bytes: u64,
    /// `None` when `unlimited`.
    pub remaining_bytes: Option<u64>,
    /// Set as soon as any in-scope resource has no quota.
    pub unlimited: bool,
}

/// Which id list of a panel snapshot to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListKind {
    Online,
    Expiring,
    Expired,
}

/// Client ids by status. Expiring and expired are mutually exclusive;
/// online overlaps with either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLists {
    #[serde(default)]
    pub online: BTreeSet<String>,
    #[serde(default)]
    pub expiring: BTreeSet<String>,
    #[serde(default)]
    pub expired: BTreeSet<String>,
}

impl StatusLists {
    pub fn get(&self, kind: ListKind) -> &BTreeSet<String> {
        match kind {
            ListKind::Online => &self.online,
            ListKind::Expiring => &self.expiring,
            ListKind::Expired => &self.expired,
        }
    }
}

/// Aggregated, classified state of one panel as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub panel_name: String,
    pub counts: StatusCounts,
    pub usage: Usage,
    pub lists: StatusLists,
    pub timestamp: DateTime<Utc>,
}

impl PanelSnapshot {
    /// Snapshot with no clients, used as the baseline for panels that
    /// were not present in the previous generation.
    pub fn empty(panel_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            panel_name: panel_name.into(),
            counts: StatusCounts::default(),
            usage: Usage::default(),
            lists: StatusLists::default(),
            timestamp,
        }
    }
}

/// Everything one viewer can see, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub viewer: ViewerId,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub panels: BTreeMap<PanelId, PanelSnapshot>,
}

impl ViewerSnapshot {
    pub fn empty(viewer: ViewerId, captured_at: DateTime<Utc>) -> Self {
        Self {
            viewer,
            captured_at,
            panels: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panel(&self, id: &PanelId) -> Option<&PanelSnapshot> {
        self.panels.get(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lists_serialize_sorted() {
        let mut lists = StatusLists::default();
        lists.expiring.insert("zed".into());
        lists.expiring.insert("amy".into());
        lists.expiring.insert("amy".into());

        let json = serde_json::to_value(&lists).unwrap();
        assert_eq!(json["expiring"], serde_json::json!(["amy", "zed"]));
    }

    #[test]
    fn list_kind_selects_list() {
        let mut lists = StatusLists::default();
        lists.online.insert("a".into());
        assert_eq!(lists.get(ListKind::Online).len(), 1);
        assert!(lists.get(ListKind::Expired).is_empty());
        assert_eq!("expiring".parse::<ListKind>().unwrap(), ListKind::Expiring);
    }
}
