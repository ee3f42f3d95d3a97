// Panel API HTTP client
//
// Wraps `reqwest::Client` with X-UI specific URL construction, cookie
// session login, and `{success, msg, obj}` envelope unwrapping.

use std::sync::Arc;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{PanelResponse, parse_online_ids};
use crate::transport::TransportConfig;

const LOGIN_PATH: &str = "login";
const INBOUNDS_PATH: &str = "panel/api/inbounds/list";
const ONLINES_PATH: &str = "panel/api/inbounds/onlines";

/// Raw HTTP client for one X-UI style panel.
///
/// Authentication is cookie based: [`login`](Self::login) stores the
/// session cookie in the client's jar and every later request reuses it.
/// All read methods return the unwrapped `obj` payload.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
    web_base_path: String,
}

impl PanelClient {
    /// Create a new panel client from a `TransportConfig`.
    ///
    /// Each client gets its own cookie jar, so one panel's session never
    /// leaks into another's. `web_base_path` is the optional secret path
    /// prefix some panels are deployed under.
    pub fn new(
        base_url: Url,
        web_base_path: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.session_client(Arc::new(Jar::default()))?;
        Ok(Self::with_client(http, base_url, web_base_path))
    }

    /// Create a panel client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, web_base_path: &str) -> Self {
        Self {
            http,
            base_url,
            web_base_path: normalize_base_path(web_base_path),
        }
    }

    /// The panel base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The normalized web base path (`""` or `"/secret"`).
    pub fn web_base_path(&self) -> &str {
        &self.web_base_path
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}{web_base_path}/{path}`.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.web_base_path,
            path
        );
        Ok(Url::parse(&full)?)
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Authenticate with username/password.
    ///
    /// `POST {base}{path}/login` with a JSON body. The panel answers 200
    /// with `{"success": true}` and a session cookie on success.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self.http.post(url).json(&body).send().await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {}", truncate(&body)),
            });
        }

        let text = resp.text().await?;
        let envelope: PanelResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        if !envelope.success {
            return Err(Error::Authentication {
                message: envelope.message(),
            });
        }

        debug!("login successful");
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// List every inbound on the panel as raw JSON objects.
    ///
    /// `GET {base}{path}/panel/api/inbounds/list`
    pub async fn list_inbounds(&self) -> Result<Vec<Value>, Error> {
        let url = self.endpoint(INBOUNDS_PATH)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        match self.parse_envelope(resp).await? {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(Error::Deserialization {
                message: "inbound list payload is not an array".into(),
                body: other.to_string(),
            }),
        }
    }

    /// Identifiers of clients the panel currently reports as online.
    ///
    /// `POST {base}{path}/panel/api/inbounds/onlines`
    pub async fn online_clients(&self) -> Result<Vec<String>, Error> {
        let url = self.endpoint(ONLINES_PATH)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).send().await?;
        let obj = self.parse_envelope(resp).await?;
        Ok(parse_online_ids(obj.as_ref()))
    }

    /// Unwrap the `{success, msg, obj}` envelope.
    ///
    /// An HTML answer (the login page) or 401/403 means the session is
    /// gone; `success: false` becomes [`Error::PanelApi`].
    async fn parse_envelope(&self, resp: reqwest::Response) -> Result<Option<Value>, Error> {
        let status = resp.status();

        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Err(Error::SessionExpired);
        }

        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        if body.trim_start().starts_with('<') {
            return Err(Error::SessionExpired);
        }

        let envelope: PanelResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if envelope.success {
            Ok(envelope.obj)
        } else {
            Err(Error::PanelApi {
                message: envelope.message(),
            })
        }
    }
}

/// `"secret/"` → `"/secret"`, `""` → `""`.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
