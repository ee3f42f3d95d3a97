// ── Panel and raw resource types ──

use secrecy::SecretString;
use serde_json::Value;
use url::Url;

use super::ids::{PanelId, ResourceId};
use crate::coerce;

/// A registered upstream panel. Credentials are carried through to the
/// panel source untouched.
#[derive(Debug, Clone)]
pub struct Panel {
    pub id: PanelId,
    pub name: String,
    pub base_url: Url,
    /// Optional secret path prefix (`""` when the panel sits at the root).
    pub web_base_path: String,
    pub username: String,
    pub password: SecretString,
}

/// One resource (inbound) exactly as the panel returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource(Value);

impl RawResource {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Resource id, `None` when absent or not an integer.
    pub fn id(&self) -> Option<ResourceId> {
        self.0.get("id").and_then(coerce::int).map(ResourceId::new)
    }

    /// Resource-level `up + down`.
    pub fn used_bytes(&self) -> u64 {
        coerce::bytes(self.0.get("up")).saturating_add(coerce::bytes(self.0.get("down")))
    }

    /// Resource-level quota in bytes, `0` for unlimited.
    pub fn quota_bytes(&self) -> u64 {
        coerce::bytes(self.0.get("total"))
    }
}

impl From<Value> for RawResource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
