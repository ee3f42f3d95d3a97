// HTTP transport settings.
//
// One `TransportConfig` produces two kinds of `reqwest::Client`: a session
// client for panels, which keeps the login cookie, and a stateless delivery
// client for webhooks, which never follows redirects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;

use crate::error::Error;

const USER_AGENT: &str = concat!("panelwatch/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate. Panels are almost always self-signed.
    #[default]
    DangerAcceptInvalid,
}

impl TlsMode {
    fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder, Error> {
        Ok(match self {
            Self::System => builder,
            Self::CustomCa(path) => builder.add_root_certificate(load_ca(path)?),
            Self::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}

fn load_ca(path: &Path) -> Result<reqwest::Certificate, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA cert {}: {e}", path.display())))?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| Error::Tls(format!("invalid CA cert {}: {e}", path.display())))
}

/// TLS mode and per-request timeout shared by every outbound client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Client for a logged-in panel session. Cookies set by the panel land
    /// in `jar` and are sent back on every later request.
    pub fn session_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, Error> {
        finish(self.base()?.cookie_provider(jar))
    }

    /// Client for webhook delivery. A redirect comes back as the 3xx
    /// response itself instead of being followed.
    pub fn delivery_client(&self) -> Result<reqwest::Client, Error> {
        finish(self.base()?.redirect(Policy::none()))
    }

    fn base(&self) -> Result<ClientBuilder, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);
        self.tls.apply(builder)
    }
}

fn finish(builder: ClientBuilder) -> Result<reqwest::Client, Error> {
    builder
        .build()
        .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_file_is_a_tls_error() {
        let transport = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/panelwatch-ca.pem")),
            ..TransportConfig::default()
        };

        for result in [
            transport.delivery_client(),
            transport.session_client(Arc::new(Jar::default())),
        ] {
            match result {
                Err(Error::Tls(message)) => assert!(message.contains("panelwatch-ca.pem")),
                other => panic!("expected TLS error, got {other:?}"),
            }
        }
    }

    #[test]
    fn default_modes_build() {
        assert!(TransportConfig::default().delivery_client().is_ok());
        let system = TransportConfig {
            tls: TlsMode::System,
            timeout: Duration::from_secs(1),
        };
        assert!(system.session_client(Arc::new(Jar::default())).is_ok());
    }
}
