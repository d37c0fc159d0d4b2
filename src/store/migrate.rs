//! Store schema migrations.
//!
//! | Version | Layout                                                        |
//! |---------|---------------------------------------------------------------|
//! | 0       | Flat map of device-local keys, values JSON-encoded as strings |
//! | 1       | Structured document; stages lack `builtin` and `outcome`      |
//! | 2       | Current                                                       |
//!
//! Version 0 keys: `theme`, `sidebarOpen`, `language`, `funnelStages`,
//! `tasks`, `tour_<name>` and `deletedLeads_<user>`. A document without a
//! `schema_version` field is treated as version 0.

use std::collections::BTreeMap;

use leadsflow_common::{StageOutcome, default_stages};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::{SCHEMA_VERSION, StoreData};
use crate::errors::StoreError;

const TOUR_PREFIX: &str = "tour_";
const DELETED_PREFIX: &str = "deletedLeads_";

/// Upgrade any supported layout to the current `StoreData`.
pub fn migrate(value: Value) -> Result<StoreData, StoreError> {
    let version = match value.get("schema_version") {
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| StoreError::Migration {
                key: "schema_version".to_string(),
                message: format!("expected a non-negative integer, got {}", v),
            })?,
        None => 0,
    };

    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    let mut value = value;
    if version == 0 {
        value = from_v0(value)?;
        info!("Migrated legacy store to schema version 1");
    }
    if version <= 1 {
        value = from_v1(value);
        debug!("Migrated store to schema version 2");
    }

    serde_json::from_value(value).map_err(|e| StoreError::Migration {
        key: "store".to_string(),
        message: e.to_string(),
    })
}

/// Legacy values were written with `JSON.stringify`, except plain strings
/// like the theme which were stored raw.
fn decode_legacy<T: DeserializeOwned>(key: &str, raw: &Value) -> Result<T, StoreError> {
    let decoded = match raw {
        Value::String(s) => {
            serde_json::from_str(s).or_else(|_| serde_json::from_value(Value::String(s.clone())))
        }
        other => serde_json::from_value(other.clone()),
    };
    decoded.map_err(|e| StoreError::Migration {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn from_v0(value: Value) -> Result<Value, StoreError> {
    let Value::Object(entries) = value else {
        return Err(StoreError::Migration {
            key: "store".to_string(),
            message: "legacy store is not a key/value object".to_string(),
        });
    };

    let mut preferences = Map::new();
    let mut stages = Value::Array(Vec::new());
    let mut tasks = Value::Array(Vec::new());
    let mut tours = BTreeMap::new();
    let mut deleted: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (key, raw) in &entries {
        match key.as_str() {
            "theme" => {
                let theme: String = decode_legacy(key, raw)?;
                preferences.insert("theme".into(), Value::String(theme.to_ascii_lowercase()));
            }
            "sidebarOpen" => {
                let open: bool = decode_legacy(key, raw)?;
                preferences.insert("sidebar_open".into(), Value::Bool(open));
            }
            "language" => {
                let language: String = decode_legacy(key, raw)?;
                preferences.insert("language".into(), Value::String(language));
            }
            "funnelStages" => stages = decode_legacy::<Value>(key, raw)?,
            "tasks" => tasks = decode_legacy::<Value>(key, raw)?,
            _ => {
                if let Some(name) = key.strip_prefix(TOUR_PREFIX) {
                    let done = match decode_legacy::<Value>(key, raw)? {
                        Value::Bool(b) => b,
                        Value::String(s) => matches!(s.as_str(), "true" | "completed" | "done"),
                        _ => false,
                    };
                    tours.insert(name.to_string(), done);
                } else if let Some(user) = key.strip_prefix(DELETED_PREFIX) {
                    let ids: Vec<Value> = decode_legacy(key, raw)?;
                    let ids = ids
                        .into_iter()
                        .filter_map(|id| match id {
                            Value::String(s) => Some(s),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                        .collect();
                    deleted.insert(user.to_string(), ids);
                } else {
                    warn!(key = %key, "Ignoring unknown legacy store key");
                }
            }
        }
    }

    Ok(json!({
        "schema_version": 1,
        "preferences": preferences,
        "funnel_stages": stages,
        "tasks": tasks,
        "tours": tours,
        "deleted_leads": deleted,
    }))
}

/// Fill in `builtin` and `outcome` on stages. Stages whose id matches a
/// default stage inherit its flags; the rest are custom and open.
fn from_v1(mut value: Value) -> Value {
    let defaults = default_stages();
    if let Some(stages) = value.get_mut("funnel_stages").and_then(Value::as_array_mut) {
        for stage in stages.iter_mut().filter_map(Value::as_object_mut) {
            let known = stage
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| defaults.iter().find(|d| d.id == id));
            if !stage.contains_key("builtin") {
                stage.insert("builtin".into(), Value::Bool(known.is_some()));
            }
            if !stage.contains_key("outcome") {
                let outcome = known.map(|d| d.outcome).unwrap_or(StageOutcome::Open);
                stage.insert("outcome".into(), Value::String(outcome.as_str().into()));
            }
        }
    }
    if let Some(obj) = value.as_object_mut() {
        obj.insert("schema_version".into(), json!(SCHEMA_VERSION));
    }
    value
}
