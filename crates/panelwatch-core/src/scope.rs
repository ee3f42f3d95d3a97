// ── Panel registry and viewer scope ──
//
// The registry is the live set of panels. Scopes reference panels by id
// and are resolved against the registry on every cycle, so a panel that
// was deleted since the assignment was written simply drops out.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Panel, PanelId, ResourceId, ViewerId};

// ── PanelRegistry ───────────────────────────────────────────────────

/// Concurrent panel directory keyed by panel id.
#[derive(Debug, Default)]
pub struct PanelRegistry {
    panels: DashMap<PanelId, Panel>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a panel. Returns the previous entry.
    pub fn upsert(&self, panel: Panel) -> Option<Panel> {
        self.panels.insert(panel.id.clone(), panel)
    }

    pub fn remove(&self, id: &PanelId) -> Option<Panel> {
        self.panels.remove(id).map(|(_, panel)| panel)
    }

    /// Owned copy of a panel, `None` once it has been removed.
    pub fn get(&self, id: &PanelId) -> Option<Panel> {
        self.panels.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &PanelId) -> bool {
        self.panels.contains_key(id)
    }

    /// Registered panel ids, sorted.
    pub fn ids(&self) -> BTreeSet<PanelId> {
        self.panels.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

impl FromIterator<Panel> for PanelRegistry {
    fn from_iter<I: IntoIterator<Item = Panel>>(iter: I) -> Self {
        let registry = Self::new();
        for panel in iter {
            registry.upsert(panel);
        }
        registry
    }
}

// ── Scope types ─────────────────────────────────────────────────────

/// Which resources of one panel a viewer may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// Every resource, including ones created later.
    All,
    /// Exactly these resource ids.
    Only(BTreeSet<ResourceId>),
}

impl ResourceScope {
    pub fn contains(&self, id: Option<ResourceId>) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => id.is_some_and(|id| ids.contains(&id)),
        }
    }

    /// `Only` with no ids grants nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(ids) if ids.is_empty())
    }

    /// Union of two grants on the same panel.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Only(mut a), Self::Only(b)) => {
                a.extend(b);
                Self::Only(a)
            }
        }
    }
}

/// Panel id → resource grant, for one viewer.
pub type ViewerScope = BTreeMap<PanelId, ResourceScope>;

// ── Resolver ────────────────────────────────────────────────────────

/// Maps a viewer to the resources it may see.
#[async_trait]
pub trait ScopeResolver: Send + Sync {
    /// Current scope of `viewer`. An unknown viewer has an empty scope.
    async fn resolve_scope(&self, viewer: &ViewerId) -> Result<ViewerScope, CoreError>;

    /// Every viewer that should be visited by scheduled runs.
    async fn viewers(&self) -> Result<Vec<ViewerId>, CoreError>;
}

/// Resolver backed by a fixed assignment table and a set of privileged
/// viewers, evaluated against the live panel registry.
#[derive(Debug)]
pub struct StaticScopeResolver {
    registry: Arc<PanelRegistry>,
    superadmins: BTreeSet<ViewerId>,
    assignments: BTreeMap<ViewerId, ViewerScope>,
}

impl StaticScopeResolver {
    pub fn new(registry: Arc<PanelRegistry>) -> Self {
        Self {
            registry,
            superadmins: BTreeSet::new(),
            assignments: BTreeMap::new(),
        }
    }

    /// Grant `viewer` every resource on every registered panel.
    #[must_use]
    pub fn with_superadmin(mut self, viewer: impl Into<ViewerId>) -> Self {
        self.superadmins.insert(viewer.into());
        self
    }

    /// Grant `viewer` access to resources on one panel. Repeated grants
    /// for the same panel are merged.
    #[must_use]
    pub fn with_grant(
        mut self,
        viewer: impl Into<ViewerId>,
        panel: impl Into<PanelId>,
        scope: ResourceScope,
    ) -> Self {
        let panels = self.assignments.entry(viewer.into()).or_default();
        let panel = panel.into();
        let merged = match panels.remove(&panel) {
            Some(existing) => existing.merge(scope),
            None => scope,
        };
        panels.insert(panel, merged);
        self
    }

    pub fn registry(&self) -> &Arc<PanelRegistry> {
        &self.registry
    }

    pub fn is_superadmin(&self, viewer: &ViewerId) -> bool {
        self.superadmins.contains(viewer)
    }
}

#[async_trait]
impl ScopeResolver for StaticScopeResolver {
    async fn resolve_scope(&self, viewer: &ViewerId) -> Result<ViewerScope, CoreError> {
        if self.is_superadmin(viewer) {
            return Ok(self
                .registry
                .ids()
                .into_iter()
                .map(|id| (id, ResourceScope::All))
                .collect());
        }

        let Some(assigned) = self.assignments.get(viewer) else {
            return Ok(ViewerScope::new());
        };

        let mut scope = ViewerScope::new();
        for (panel, grant) in assigned {
            if !self.registry.contains(panel) {
                debug!(%viewer, %panel, "dropping grant on unregistered panel");
                continue;
            }
            if grant.is_empty() {
                continue;
            }
            scope.insert(panel.clone(), grant.clone());
        }
        Ok(scope)
    }

    async fn viewers(&self) -> Result<Vec<ViewerId>, CoreError> {
        let all: BTreeSet<&ViewerId> = self
            .superadmins
            .iter()
            .chain(self.assignments.keys())
            .collect();
        Ok(all.into_iter().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn panel(id: &str) -> Panel {
        Panel {
            id: PanelId::from(id),
            name: format!("Panel {id}"),
            base_url: Url::parse("https://panel.example").unwrap(),
            web_base_path: String::new(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
        }
    }

    fn only(ids: &[i64]) -> ResourceScope {
        ResourceScope::Only(ids.iter().copied().map(ResourceId::new).collect())
    }

    #[tokio::test]
    async fn superadmin_sees_every_registered_panel() {
        let registry = Arc::new(PanelRegistry::from_iter([panel("a"), panel("b")]));
        let resolver = StaticScopeResolver::new(Arc::clone(&registry)).with_superadmin("root");

        let scope = resolver.resolve_scope(&ViewerId::from("root")).await.unwrap();
        assert_eq!(scope.len(), 2);
        assert!(scope.values().all(|s| *s == ResourceScope::All));

        registry.upsert(panel("c"));
        let scope = resolver.resolve_scope(&ViewerId::from("root")).await.unwrap();
        assert_eq!(scope.len(), 3);
    }

    #[tokio::test]
    async fn stale_panel_references_are_dropped() {
        let registry = Arc::new(PanelRegistry::from_iter([panel("a")]));
        let resolver = StaticScopeResolver::new(Arc::clone(&registry))
            .with_grant("op", "a", only(&[1]))
            .with_grant("op", "gone", only(&[2]));

        let scope = resolver.resolve_scope(&ViewerId::from("op")).await.unwrap();
        assert_eq!(scope.keys().map(ToString::to_string).collect::<Vec<_>>(), vec!["a"]);

        registry.remove(&PanelId::from("a"));
        let scope = resolver.resolve_scope(&ViewerId::from("op")).await.unwrap();
        assert!(scope.is_empty());
    }

    #[tokio::test]
    async fn grants_on_same_panel_merge() {
        let registry = Arc::new(PanelRegistry::from_iter([panel("a")]));
        let resolver = StaticScopeResolver::new(registry)
            .with_grant("op", "a", only(&[1]))
            .with_grant("op", "a", only(&[2]));

        let scope = resolver.resolve_scope(&ViewerId::from("op")).await.unwrap();
        assert_eq!(scope[&PanelId::from("a")], only(&[1, 2]));
    }

    #[tokio::test]
    async fn unknown_viewer_has_empty_scope() {
        let resolver = StaticScopeResolver::new(Arc::new(PanelRegistry::new()));
        assert!(resolver.resolve_scope(&ViewerId::from("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn viewers_are_deduplicated() {
        let resolver = StaticScopeResolver::new(Arc::new(PanelRegistry::new()))
            .with_superadmin("root")
            .with_grant("root", "a", ResourceScope::All)
            .with_grant("op", "a", ResourceScope::All);
        let viewers = resolver.viewers().await.unwrap();
        assert_eq!(viewers, vec![ViewerId::from("op"), ViewerId::from("root")]);
    }

    #[test]
    fn resource_scope_membership() {
        assert!(ResourceScope::All.contains(None));
        assert!(only(&[3]).contains(Some(ResourceId::new(3))));
        assert!(!only(&[3]).contains(Some(ResourceId::new(4))));
        assert!(!only(&[3]).contains(None));
        assert!(only(&[]).is_empty());
    }
}
