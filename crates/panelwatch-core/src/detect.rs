// ── Change detection ──
//
// Compares the current snapshot against the previous generation and
// yields transitions into `expiring` and `expired`. The current snapshot
// is committed before any event leaves this module, so delivery outcome
// never holds the state machine back.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{ChangeEvent, PanelId, PanelSnapshot, Transition, ViewerId, ViewerSnapshot};
use crate::store::SnapshotStore;

/// Pure diff of two generations.
///
/// Panels missing from `previous` diff against an empty snapshot. Panels
/// missing from `current` and clients leaving a list produce nothing.
/// Events are ordered by panel id, then transition, then client id.
pub fn diff(previous: &ViewerSnapshot, current: &ViewerSnapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (panel_id, cur) in &current.panels {
        let empty;
        let prev = match previous.panel(panel_id) {
            Some(prev) => prev,
            None => {
                empty = PanelSnapshot::empty(cur.panel_name.clone(), cur.timestamp);
                &empty
            }
        };

        let newly = [
            (
                Transition::EnteredExpiring,
                cur.lists.expiring.difference(&prev.lists.expiring),
            ),
            (
                Transition::EnteredExpired,
                cur.lists.expired.difference(&prev.lists.expired),
            ),
        ];

        for (transition, ids) in newly {
            events.extend(ids.map(|client_id| ChangeEvent {
                panel_id: panel_id.clone(),
                panel_name: cur.panel_name.clone(),
                client_id: client_id.clone(),
                transition,
            }));
        }
    }

    events
}

/// Diffs against the stored generation and advances it.
#[derive(Clone)]
pub struct ChangeDetector {
    store: Arc<dyn SnapshotStore>,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Diff `current` against the stored snapshot, then store `current`.
    ///
    /// The first snapshot ever seen for a viewer is a baseline and yields
    /// no events. A store failure on either side aborts with no events.
    pub async fn detect_and_advance(
        &self,
        viewer: &ViewerId,
        current: &ViewerSnapshot,
    ) -> Result<Vec<ChangeEvent>, CoreError> {
        self.detect_and_advance_retaining(viewer, current, &BTreeSet::new())
            .await
    }

    /// Like [`detect_and_advance`](Self::detect_and_advance), but panels in
    /// `retain` that are missing from `current` keep their previous
    /// generation in the store. Used for panels that were unreachable this
    /// cycle, so their clients do not re-fire once the panel is back.
    pub async fn detect_and_advance_retaining(
        &self,
        viewer: &ViewerId,
        current: &ViewerSnapshot,
        retain: &BTreeSet<PanelId>,
    ) -> Result<Vec<ChangeEvent>, CoreError> {
        let previous = self.store.get(viewer).await?;

        let Some(previous) = previous else {
            info!(%viewer, panels = current.panels.len(), "storing baseline snapshot");
            self.store.put(viewer, current).await?;
            return Ok(Vec::new());
        };

        let events = diff(&previous, current);

        let carried: Vec<_> = retain
            .iter()
            .filter(|id| !current.panels.contains_key(*id))
            .filter_map(|id| previous.panel(id).map(|p| (id.clone(), p.clone())))
            .collect();

        if carried.is_empty() {
            self.store.put(viewer, current).await?;
        } else {
            debug!(%viewer, carried = carried.len(), "keeping previous state of unavailable panels");
            let mut next = current.clone();
            next.panels.extend(carried);
            self.store.put(viewer, &next).await?;
        }

        debug!(%viewer, events = events.len(), "snapshot advanced");
        Ok(events)
    }
}
