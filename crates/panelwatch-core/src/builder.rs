// ── Snapshot builder ──
//
// One build = resolve scope, fetch every scoped panel concurrently (each
// bounded by the fetch timeout), then extract, classify and aggregate.
// A panel that fails or times out is logged, left out and reported as
// unavailable; a panel removed from the registry is silently dropped.
// Neither fails the build.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::classify::Thresholds;
use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::extract::extract;
use crate::model::{
    ClientRecord, ClientStatus, Panel, PanelId, PanelSnapshot, RawResource, StatusCounts,
    StatusLists, Usage, ViewerId, ViewerSnapshot,
};
use crate::scope::{PanelRegistry, ResourceScope, ScopeResolver};
use crate::source::PanelSource;

/// Result of one build: the snapshot plus the scoped panels that failed
/// or timed out. Panels removed from the registry appear in neither.
#[derive(Debug, Clone)]
pub struct Built {
    pub snapshot: ViewerSnapshot,
    pub unavailable: BTreeSet<PanelId>,
}

enum PanelOutcome {
    Built(PanelSnapshot),
    Unavailable,
    Gone,
}

/// Builds [`ViewerSnapshot`]s from live panel data.
#[derive(Clone)]
pub struct SnapshotBuilder {
    resolver: Arc<dyn ScopeResolver>,
    registry: Arc<PanelRegistry>,
    source: Arc<dyn PanelSource>,
    thresholds: Thresholds,
    fetch_timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(
        resolver: Arc<dyn ScopeResolver>,
        registry: Arc<PanelRegistry>,
        source: Arc<dyn PanelSource>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            resolver,
            registry,
            source,
            thresholds: config.thresholds,
            fetch_timeout: config.fetch_timeout,
        }
    }

    pub fn resolver(&self) -> &Arc<dyn ScopeResolver> {
        &self.resolver
    }

    /// Build the current snapshot of `viewer`.
    pub async fn build(&self, viewer: &ViewerId) -> Result<ViewerSnapshot, CoreError> {
        self.build_at(viewer, Utc::now()).await
    }

    /// Build with an explicit "now" used for classification and timestamps.
    ///
    /// Only scope resolution can fail; panel failures shrink the result.
    pub async fn build_at(
        &self,
        viewer: &ViewerId,
        now: DateTime<Utc>,
    ) -> Result<ViewerSnapshot, CoreError> {
        Ok(self.build_detailed(viewer, now).await?.snapshot)
    }

    /// Like [`build_at`](Self::build_at), but also reports which scoped
    /// panels could not be fetched this time.
    pub async fn build_detailed(
        &self,
        viewer: &ViewerId,
        now: DateTime<Utc>,
    ) -> Result<Built, CoreError> {
        let scope = self.resolver.resolve_scope(viewer).await?;
        if scope.is_empty() {
            debug!(%viewer, "empty scope");
            return Ok(Built {
                snapshot: ViewerSnapshot::empty(viewer.clone(), now),
                unavailable: BTreeSet::new(),
            });
        }

        let fetches = scope
            .iter()
            .map(|(panel_id, grant)| self.build_panel(panel_id, grant, now));

        let mut panels = BTreeMap::new();
        let mut unavailable = BTreeSet::new();
        for (panel_id, outcome) in join_all(fetches).await {
            match outcome {
                PanelOutcome::Built(snapshot) => {
                    panels.insert(panel_id, snapshot);
                }
                PanelOutcome::Unavailable => {
                    unavailable.insert(panel_id);
                }
                PanelOutcome::Gone => {}
            }
        }

        debug!(
            %viewer,
            scoped = scope.len(),
            built = panels.len(),
            unavailable = unavailable.len(),
            "snapshot built"
        );

        Ok(Built {
            snapshot: ViewerSnapshot {
                viewer: viewer.clone(),
                captured_at: now,
                panels,
            },
            unavailable,
        })
    }

    async fn build_panel(
        &self,
        panel_id: &PanelId,
        grant: &ResourceScope,
        now: DateTime<Utc>,
    ) -> (PanelId, PanelOutcome) {
        let Some(panel) = self.registry.get(panel_id) else {
            debug!(panel = %panel_id, "panel removed before fetch, skipping");
            return (panel_id.clone(), PanelOutcome::Gone);
        };

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.fetch(&panel)).await {
            Ok(Ok((resources, online))) => PanelOutcome::Built(aggregate(
                &panel.name,
                &resources,
                grant,
                &online,
                now,
                self.thresholds,
            )),
            Ok(Err(e)) => {
                warn!(panel = %panel.id, error = %e, "panel fetch failed, skipping");
                PanelOutcome::Unavailable
            }
            Err(_) => {
                warn!(
                    panel = %panel.id,
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "panel fetch timed out, skipping"
                );
                PanelOutcome::Unavailable
            }
        };
        (panel.id, outcome)
    }

    async fn fetch(&self, panel: &Panel) -> Result<(Vec<RawResource>, BTreeSet<String>), CoreError> {
        let resources = self.source.fetch_resources(panel).await?;
        let online = self.source.fetch_online_ids(panel).await?;
        Ok((resources, online))
    }
}

/// Extract the clients of `resource` with `online` set from the panel's
/// online id set.
pub fn clients_with_presence(
    resource: &RawResource,
    online_ids: &BTreeSet<String>,
) -> Vec<ClientRecord> {
    let mut clients = extract(resource);
    for client in &mut clients {
        client.online = online_ids.contains(&client.id);
    }
    clients
}

/// Aggregate one panel's in-scope resources into a snapshot.
///
/// A client id that appears in several resources is counted once and
/// takes its most severe status.
pub fn aggregate(
    panel_name: &str,
    resources: &[RawResource],
    grant: &ResourceScope,
    online_ids: &BTreeSet<String>,
    now: DateTime<Utc>,
    thresholds: Thresholds,
) -> PanelSnapshot {
    let now_secs = now.timestamp();

    let mut usage = Usage::default();
    let mut statuses: BTreeMap<String, ClientStatus> = BTreeMap::new();
    let mut lists = StatusLists::default();

    for resource in resources.iter().filter(|r| grant.contains(r.id())) {
        usage.used_bytes = usage.used_bytes.saturating_add(resource.used_bytes());
        match resource.quota_bytes() {
            0 => usage.unlimited = true,
            quota => usage.capacity_bytes = usage.capacity_bytes.saturating_add(quota),
        }

        for client in clients_with_presence(resource, online_ids) {
            let status = thresholds.classify(&client, now_secs);
            if client.is_online() {
                lists.online.insert(client.id.clone());
            }
            statuses
                .entry(client.id)
                .and_modify(|s| *s = (*s).max(status))
                .or_insert(status);
        }
    }

    for (id, status) in &statuses {
        match status {
            ClientStatus::Expired => {
                lists.expired.insert(id.clone());
            }
            ClientStatus::Expiring => {
                lists.expiring.insert(id.clone());
            }
            ClientStatus::Normal => {}
        }
    }

    usage.remaining_bytes =
        (!usage.unlimited).then(|| usage.capacity_bytes.saturating_sub(usage.used_bytes));

    PanelSnapshot {
        panel_name: panel_name.to_owned(),
        counts: StatusCounts {
            users: statuses.len(),
            online: lists.online.len(),
            expiring: lists.expiring.len(),
            expired: lists.expired.len(),
        },
        usage,
        lists,
        timestamp: now,
    }
}
