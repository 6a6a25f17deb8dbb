//! CLI command implementations.

pub mod inspect;
pub mod migrate;
pub mod safe_interval;
pub mod token;
pub mod validate;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use vitrine_core::Dashboard;

/// Organization assumed for dashboards read from disk.
const FILE_ORG_ID: i64 = 1;

/// Load a dashboard from a JSON file.
///
/// Accepts the model itself or an export of the form `{"dashboard": {...}}`.
/// The uid comes from the model, else from the file stem.
pub fn load_dashboard(path: &Path) -> anyhow::Result<Dashboard> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dashboard file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dashboard JSON: {}", path.display()))?;
    Ok(dashboard_from_value(value, path))
}

fn dashboard_from_value(value: Value, path: &Path) -> Dashboard {
    let model = match value {
        Value::Object(mut map) if map.get("dashboard").is_some_and(Value::is_object) => {
            map.remove("dashboard").unwrap_or_default()
        }
        other => other,
    };

    let uid = model
        .get("uid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let id = model.get("id").and_then(Value::as_i64).unwrap_or_default();

    Dashboard::new(uid, FILE_ORG_ID, model).with_id(id)
}
