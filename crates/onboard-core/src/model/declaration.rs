// ── Declarations and config trees ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::classes::is_singleton;

/// Class tag → class body, for one tenant.
///
/// Singleton classes map straight to their property object; named classes
/// map to `{ objectName: properties }`. `serde_json::Map` is ordered, so
/// serialized trees are byte-stable.
pub type ClassMap = serde_json::Map<String, Value>;

/// Tenant → classes. Used for parsed declarations, the current and original
/// device config, the effective config, and both halves of a change set.
pub type ConfigTree = BTreeMap<String, ClassMap>;

/// Execution flags carried alongside a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Controls {
    /// Return immediately with 202 and run in the background.
    #[serde(rename = "async")]
    pub run_async: bool,
    /// Compute and report the change set without touching the device.
    pub dry_run: bool,
    /// Include the diff trace in the task result.
    pub trace: bool,
    /// Include the effective and current config in the task result.
    pub trace_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Controls {
    /// Read the controls from a raw submission without fully parsing it.
    ///
    /// The engine needs the `async` flag before the parser runs, since the
    /// parser may be slow or fail and async submissions must still return
    /// 202 with a task id.
    pub fn from_raw(raw: &Value) -> Self {
        let device = unwrap_envelope(raw);
        let mut controls = device
            .get("controls")
            .cloned()
            .and_then(|c| serde_json::from_value::<Controls>(c).ok())
            .unwrap_or_default();
        let top_level_async = [raw, device]
            .iter()
            .any(|v| v.get("async").and_then(Value::as_bool) == Some(true));
        if top_level_async {
            controls.run_async = true;
        }
        controls
    }
}

/// Strip the optional `{ "class": "DO", "declaration": {...} }` envelope.
pub(crate) fn unwrap_envelope(raw: &Value) -> &Value {
    if raw.get("class").and_then(Value::as_str) == Some("DO") {
        raw.get("declaration").unwrap_or(raw)
    } else {
        raw
    }
}

/// Output of a `DeclarationParser`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDeclaration {
    pub controls: Controls,
    /// Tenant → class → body. A tenant may also carry a plain `hostname`
    /// string, the legacy alias for `System.hostname`.
    pub tenants: ConfigTree,
    pub parsed: bool,
}

/// Number of objects declared per class, summed across tenants.
///
/// Singletons count as one object.
pub fn class_counts(tree: &ConfigTree) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for classes in tree.values() {
        for (class, body) in classes {
            let n = match body {
                Value::Object(objects) if !is_singleton(class) => objects.len(),
                Value::Object(_) => 1,
                _ => continue,
            };
            *counts.entry(class.clone()).or_insert(0) += n;
        }
    }
    counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn controls_from_nested_block() {
        let raw = json!({
            "class": "Device",
            "controls": { "dryRun": true, "trace": true, "userAgent": "ci/1.0" }
        });
        let controls = Controls::from_raw(&raw);
        assert!(controls.dry_run);
        assert!(controls.trace);
        assert!(!controls.run_async);
        assert_eq!(controls.user_agent.as_deref(), Some("ci/1.0"));
    }

    #[test]
    fn controls_async_from_top_level_and_envelope() {
        let raw = json!({ "class": "Device", "async": true });
        assert!(Controls::from_raw(&raw).run_async);

        let wrapped = json!({
            "class": "DO",
            "declaration": { "class": "Device", "async": true }
        });
        assert!(Controls::from_raw(&wrapped).run_async);
    }

    #[test]
    fn malformed_controls_fall_back_to_defaults() {
        let raw = json!({ "class": "Device", "controls": "yes" });
        assert_eq!(Controls::from_raw(&raw), Controls::default());
    }

    #[test]
    fn class_counts_treat_singletons_as_one() {
        let mut tree = ConfigTree::new();
        tree.insert(
            "Common".into(),
            json!({
                "System": { "hostname": "a.example.com", "cliInactivityTimeout": 1200 },
                "VLAN": { "external": { "tag": 4094 }, "internal": { "tag": 4093 } }
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let counts = class_counts(&tree);
        assert_eq!(counts["System"], 1);
        assert_eq!(counts["VLAN"], 2);
    }
}
