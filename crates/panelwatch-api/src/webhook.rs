// Generic JSON webhook client
//
// POSTs notification payloads to a single configured URL. Any non-2xx
// answer is surfaced as `Error::Status` so callers can tell a gone
// destination (403/404/410) from a transient one.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client bound to one webhook endpoint.
pub struct WebhookClient {
    http: reqwest::Client,
    url: Url,
    bearer: Option<SecretString>,
}

impl WebhookClient {
    pub fn new(
        url: Url,
        bearer: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.delivery_client()?;
        Ok(Self { http, url, bearer })
    }

    pub fn with_client(http: reqwest::Client, url: Url, bearer: Option<SecretString>) -> Self {
        Self { http, url, bearer }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one JSON payload.
    pub async fn post_json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), Error> {
        debug!("POST {}", self.url);

        let mut request = self.http.post(self.url.clone()).json(payload);
        if let Some(ref token) = self.bearer {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}
