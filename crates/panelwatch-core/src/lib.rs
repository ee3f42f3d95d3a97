// panelwatch-core: snapshot, change-detection and notification engine.
//
// Pipeline per viewer and cycle:
//   PanelSource → extract → classify → SnapshotBuilder
//     → ChangeDetector (SnapshotStore) → Dispatcher (NotificationSink)
// `Monitor` owns the pipeline and the schedule.

pub mod builder;
pub mod classify;
mod coerce;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod monitor;
pub mod scope;
pub mod sink;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use builder::{SnapshotBuilder, aggregate, clients_with_presence};
pub use classify::{Thresholds, classify};
pub use config::{MonitorConfig, TlsVerification};
pub use detect::{ChangeDetector, diff};
pub use dispatch::{DispatchSummary, Dispatcher};
pub use error::CoreError;
pub use extract::extract;
pub use monitor::{CycleOutcome, Monitor, next_daily_run};
pub use scope::{PanelRegistry, ResourceScope, ScopeResolver, StaticScopeResolver, ViewerScope};
pub use sink::{LogSink, NotificationSink, SinkError, WebhookSink};
pub use source::{PanelSource, XuiPanelSource};
pub use store::{FileStore, MemoryStore, SnapshotStore};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ChangeEvent, ClientRecord, ClientStatus, ListKind, Panel, PanelId, PanelReport,
    PanelSnapshot, RawResource, ResourceId, StatusCounts, StatusLists, Transition, Usage,
    ViewerId, ViewerSnapshot,
};
