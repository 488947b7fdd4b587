// ── Change sets ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::declaration::ConfigTree;

/// Kind of a single trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    /// Present only in the effective config.
    #[serde(rename = "N")]
    New,
    /// Present only in the current config.
    #[serde(rename = "D")]
    Deleted,
    /// Present on both sides with different values.
    #[serde(rename = "E")]
    Edited,
    /// Array whose length changed.
    #[serde(rename = "A")]
    Array,
}

/// One leaf-level difference between current (`lhs`) and effective (`rhs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    /// Path segments from the tenant down; array indices are stringified.
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lhs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs: Option<Value>,
}

/// What has to change on the device to move from current to effective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Objects to create or update, holding their effective bodies.
    pub to_update: ConfigTree,
    /// Named objects to remove, holding their current bodies.
    pub to_delete: ConfigTree,
    /// Flat deep-diff trace.
    pub trace: Vec<DiffEntry>,
}

impl ChangeSet {
    /// `true` when nothing would be sent to the device.
    pub fn is_empty(&self) -> bool {
        self.to_update.values().all(serde_json::Map::is_empty)
            && self.to_delete.values().all(serde_json::Map::is_empty)
    }

    /// `true` when `class` has pending updates in any tenant.
    pub fn updates_class(&self, class: &str) -> bool {
        self.to_update.values().any(|c| c.contains_key(class))
    }
}
