// ── Client extraction ──
//
// Panels disagree on where an inbound keeps its clients. Extraction walks
// a closed, ordered list of locations and takes the first one that yields
// a non-empty list. Unknown shapes produce no clients, never an error.

use serde_json::Value;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::debug;

use crate::coerce;
use crate::model::{ClientRecord, RawResource};

/// A location inside an inbound object that may hold a client list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Strategy {
    /// `clientStats: [...]` (traffic counters, 3x-ui).
    #[strum(serialize = "clientStats")]
    ClientStats,
    /// `settings.clients`, where `settings` is an object or JSON text.
    #[strum(serialize = "settings.clients")]
    SettingsClients,
    /// `clients: [...]`.
    #[strum(serialize = "clients")]
    Clients,
    /// `client_list: [...]`.
    #[strum(serialize = "client_list")]
    ClientList,
}

impl Strategy {
    /// Raw client objects at this location. Non-object entries are dropped.
    fn locate(self, inbound: &Value) -> Vec<Value> {
        let list = match self {
            Self::ClientStats => inbound.get("clientStats").cloned(),
            Self::SettingsClients => settings_clients(inbound.get("settings")),
            Self::Clients => inbound.get("clients").cloned(),
            Self::ClientList => inbound.get("client_list").cloned(),
        };

        match list {
            Some(Value::Array(items)) => items.into_iter().filter(Value::is_object).collect(),
            _ => Vec::new(),
        }
    }
}

fn settings_clients(settings: Option<&Value>) -> Option<Value> {
    match settings? {
        Value::Object(map) => map.get("clients").cloned(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed.get("clients").cloned(),
            Err(e) => {
                debug!(error = %e, "settings is not valid JSON");
                None
            }
        },
        _ => None,
    }
}

/// Normalize every client of one resource.
pub fn extract(raw: &RawResource) -> Vec<ClientRecord> {
    let inbound = raw.value();
    if !inbound.is_object() {
        return Vec::new();
    }

    for strategy in Strategy::iter() {
        let found = strategy.locate(inbound);
        if found.is_empty() {
            continue;
        }
        let records: Vec<ClientRecord> = found.iter().filter_map(normalize).collect();
        debug!(
            resource = ?raw.id(),
            %strategy,
            found = found.len(),
            kept = records.len(),
            "extracted clients"
        );
        return records;
    }

    Vec::new()
}

/// One raw client object into a record. `None` when it has no usable id.
pub fn normalize(client: &Value) -> Option<ClientRecord> {
    let id = coerce::non_empty_str(client.get("email"))?;

    let used = coerce::bytes(client.get("up")).saturating_add(coerce::bytes(client.get("down")));

    Some(ClientRecord {
        id: id.to_owned(),
        used_bytes: used,
        quota_bytes: quota_bytes(client),
        expiry_epoch_millis: expiry_millis(client),
        // Presence comes from the panel's online list, not the record.
        online: false,
        enabled: coerce::flag(client.get("enable").or_else(|| client.get("enabled")), true),
    })
}

/// `totalGB` (GiB) wins over `total` (bytes), which wins over `limit` (GiB).
fn quota_bytes(client: &Value) -> u64 {
    let from_gb = coerce::gigabytes(client.get("totalGB"));
    if from_gb > 0 {
        return from_gb;
    }
    let from_bytes = coerce::bytes(client.get("total"));
    if from_bytes > 0 {
        return from_bytes;
    }
    coerce::gigabytes(client.get("limit"))
}

/// First positive of `expiryTime`, `expire`, `expiry`.
fn expiry_millis(client: &Value) -> u64 {
    ["expiryTime", "expire", "expiry"]
        .iter()
        .map(|key| coerce::bytes(client.get(*key)))
        .find(|ms| *ms > 0)
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::coerce::GIB;

    fn ids(records: &[ClientRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn client_stats_is_preferred() {
        let raw = RawResource::new(json!({
            "clientStats": [{"email": "a", "up": 1, "down": 2}],
            "clients": [{"email": "b"}]
        }));
        let records = extract(&raw);
        assert_eq!(ids(&records), vec!["a"]);
        assert_eq!(records[0].used_bytes, 3);
    }

    #[test]
    fn settings_as_json_text() {
        let raw = RawResource::new(json!({
            "settings": "{\"clients\": [{\"email\": \"x@y\", \"totalGB\": 2}]}"
        }));
        let records = extract(&raw);
        assert_eq!(ids(&records), vec!["x@y"]);
        assert_eq!(records[0].quota_bytes, 2 * GIB);
    }

    #[test]
    fn settings_as_object() {
        let raw = RawResource::new(json!({"settings": {"clients": [{"email": "s"}]}}));
        assert_eq!(ids(&extract(&raw)), vec!["s"]);
    }

    #[test]
    fn empty_client_stats_falls_through() {
        let raw = RawResource::new(json!({
            "clientStats": [],
            "settings": "not json",
            "client_list": [{"email": "late"}]
        }));
        assert_eq!(ids(&extract(&raw)), vec!["late"]);
    }

    #[test]
    fn entries_without_id_are_dropped() {
        let raw = RawResource::new(json!({
            "clients": [{"email": ""}, {"up": 5}, "junk", 4, {"email": "  ok  "}]
        }));
        assert_eq!(ids(&extract(&raw)), vec!["ok"]);
    }

    #[test]
    fn unknown_shapes_are_empty() {
        assert!(extract(&RawResource::new(json!([1, 2]))).is_empty());
        assert!(extract(&RawResource::new(json!({"clients": "nope"}))).is_empty());
        assert!(extract(&RawResource::new(json!({"settings": 7}))).is_empty());
        assert!(extract(&RawResource::new(Value::Null)).is_empty());
    }

    #[test]
    fn quota_precedence() {
        let both = normalize(&json!({"email": "a", "totalGB": 1, "total": 5})).unwrap();
        assert_eq!(both.quota_bytes, GIB);

        let bytes = normalize(&json!({"email": "a", "totalGB": 0, "total": 5})).unwrap();
        assert_eq!(bytes.quota_bytes, 5);

        let limit = normalize(&json!({"email": "a", "limit": "3"})).unwrap();
        assert_eq!(limit.quota_bytes, 3 * GIB);

        let none = normalize(&json!({"email": "a", "total": -10})).unwrap();
        assert_eq!(none.quota_bytes, 0);
    }

    #[test]
    fn expiry_fallback_keys() {
        let c = normalize(&json!({"email": "a", "expiryTime": 0, "expire": 1234})).unwrap();
        assert_eq!(c.expiry_epoch_millis, 1234);

        let c = normalize(&json!({"email": "a", "expiry": "99"})).unwrap();
        assert_eq!(c.expiry_epoch_millis, 99);

        let c = normalize(&json!({"email": "a", "expiryTime": -86400000})).unwrap();
        assert_eq!(c.expiry_epoch_millis, 0);
    }

    #[test]
    fn enabled_defaults_to_true() {
        assert!(normalize(&json!({"email": "a"})).unwrap().enabled);
        assert!(!normalize(&json!({"email": "a", "enable": false})).unwrap().enabled);
    }
}
