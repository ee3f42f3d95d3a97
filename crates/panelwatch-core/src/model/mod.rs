// ── Domain model ──
//
// Canonical types shared by every stage of a poll cycle: identifiers,
// normalized client records, per-panel and per-viewer snapshots, and the
// change events derived from diffing them.

pub mod client;
pub mod event;
pub mod ids;
pub mod panel;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────

pub use client::{ClientRecord, ClientStatus};
pub use event::{ChangeEvent, PanelReport, Transition};
pub use ids::{PanelId, ResourceId, ViewerId};
pub use panel::{Panel, RawResource};
pub use snapshot::{ListKind, PanelSnapshot, StatusCounts, StatusLists, Usage, ViewerSnapshot};
