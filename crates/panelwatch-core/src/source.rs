// ── Panel source adapter ──
//
// `PanelSource` is the seam between the engine and upstream panels. The
// builder only sees raw resources and online ids; how they are fetched
// (and how sessions are kept alive) is the adapter's business.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use panelwatch_api::transport::{TlsMode, TransportConfig};
use panelwatch_api::PanelClient;

use crate::config::{MonitorConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{Panel, PanelId, RawResource};

/// Fetches raw data from one panel. Any error means "no data from this
/// panel this cycle".
#[async_trait]
pub trait PanelSource: Send + Sync {
    async fn fetch_resources(&self, panel: &Panel) -> Result<Vec<RawResource>, CoreError>;

    async fn fetch_online_ids(&self, panel: &Panel) -> Result<BTreeSet<String>, CoreError>;
}

// ── XuiPanelSource ──────────────────────────────────────────────────

/// [`PanelSource`] for 3x-ui style panels.
///
/// Keeps one logged-in [`PanelClient`] per panel across cycles. When a
/// request comes back as an auth failure the cached session is dropped and
/// the request is retried once after a fresh login.
pub struct XuiPanelSource {
    transport: TransportConfig,
    sessions: DashMap<PanelId, Arc<PanelClient>>,
}

impl XuiPanelSource {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            sessions: DashMap::new(),
        }
    }

    /// Transport derived from the monitor's TLS mode and fetch timeout.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(build_transport(config))
    }

    /// Forget the cached session of `panel`.
    pub fn invalidate(&self, panel: &PanelId) {
        self.sessions.remove(panel);
    }

    async fn session(&self, panel: &Panel) -> Result<Arc<PanelClient>, CoreError> {
        if let Some(client) = self.sessions.get(&panel.id) {
            return Ok(Arc::clone(client.value()));
        }

        let client = PanelClient::new(panel.base_url.clone(), &panel.web_base_path, &self.transport)
            .map_err(|e| self.tag(panel, e))?;
        client
            .login(&panel.username, &panel.password)
            .await
            .map_err(|e| self.tag(panel, e))?;
        info!(panel = %panel.id, "logged in to panel");

        let client = Arc::new(client);
        self.sessions.insert(panel.id.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// Attach `panel` and the configured timeout to a transport error.
    fn tag(&self, panel: &Panel, err: panelwatch_api::Error) -> CoreError {
        let id = panel.id.to_string();
        match CoreError::from(err) {
            CoreError::Source { message, .. } => CoreError::Source { panel: id, message },
            CoreError::Timeout { .. } => CoreError::Timeout {
                panel: id,
                timeout_secs: self.transport.timeout.as_secs(),
            },
            CoreError::AuthenticationFailed { message, .. } => {
                CoreError::AuthenticationFailed { panel: id, message }
            }
            other => other,
        }
    }
}

#[async_trait]
impl PanelSource for XuiPanelSource {
    async fn fetch_resources(&self, panel: &Panel) -> Result<Vec<RawResource>, CoreError> {
        let client = self.session(panel).await?;
        let inbounds = match client.list_inbounds().await {
            Err(e) if e.is_auth_expired() => {
                debug!(panel = %panel.id, "session rejected, logging in again");
                self.invalidate(&panel.id);
                let client = self.session(panel).await?;
                client.list_inbounds().await
            }
            other => other,
        }
        .map_err(|e| self.tag(panel, e))?;

        Ok(inbounds.into_iter().map(RawResource::new).collect())
    }

    async fn fetch_online_ids(&self, panel: &Panel) -> Result<BTreeSet<String>, CoreError> {
        let client = self.session(panel).await?;
        let ids = match client.online_clients().await {
            Err(e) if e.is_auth_expired() => {
                debug!(panel = %panel.id, "session rejected, logging in again");
                self.invalidate(&panel.id);
                let client = self.session(panel).await?;
                client.online_clients().await
            }
            other => other,
        }
        .map_err(|e| self.tag(panel, e))?;

        Ok(ids.into_iter().collect())
    }
}

fn build_transport(config: &MonitorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.fetch_timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
