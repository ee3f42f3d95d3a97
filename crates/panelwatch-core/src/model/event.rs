// ── Outbound notification payloads ──

use serde::{Deserialize, Serialize};
use strum::Display;

use super::ids::PanelId;
use super::snapshot::PanelSnapshot;

/// The status a client moved into since the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    EnteredExpiring,
    EnteredExpired,
}

/// One status transition of one client. Produced, dispatched, discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub panel_id: PanelId,
    pub panel_name: String,
    pub client_id: String,
    pub transition: Transition,
}

/// One panel of a full report, delivered as its own item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelReport {
    pub panel_id: PanelId,
    pub snapshot: PanelSnapshot,
}
