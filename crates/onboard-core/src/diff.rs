// ── Change set computation ──
//
// Compares the effective config with the current config. Singleton
// classes are compared as one value and never deleted; named classes are
// compared object by object. Equality is exact after normalization, so
// a second run of the same declaration yields an empty change set.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::model::{ChangeSet, ClassMap, ConfigTree, DiffEntry, DiffKind};
use crate::normalize::classes::is_singleton;

/// Compute what must change to move the device from `current` to
/// `effective`.
pub fn diff(effective: &ConfigTree, current: &ConfigTree) -> ChangeSet {
    let empty = ClassMap::new();
    let mut change_set = ChangeSet::default();

    let tenants: BTreeSet<&String> = effective.keys().chain(current.keys()).collect();
    for tenant in tenants {
        let desired = effective.get(tenant).unwrap_or(&empty);
        let existing = current.get(tenant).unwrap_or(&empty);
        let (updates, deletes) = diff_tenant(desired, existing);
        if !updates.is_empty() {
            change_set.to_update.insert(tenant.clone(), updates);
        }
        if !deletes.is_empty() {
            change_set.to_delete.insert(tenant.clone(), deletes);
        }
    }

    change_set.trace = trace(effective, current);
    change_set
}

fn diff_tenant(desired: &ClassMap, existing: &ClassMap) -> (ClassMap, ClassMap) {
    let mut updates = ClassMap::new();
    let mut deletes = ClassMap::new();

    let classes: BTreeSet<&String> = desired.keys().chain(existing.keys()).collect();
    for class in classes {
        let singleton = is_singleton(class);
        match (desired.get(class), existing.get(class)) {
            (Some(Value::Object(want)), have) if !singleton => {
                let have = have.and_then(Value::as_object);
                let changed: Map<String, Value> = want
                    .iter()
                    .filter(|(name, body)| have.and_then(|h| h.get(*name)) != Some(*body))
                    .map(|(name, body)| (name.clone(), body.clone()))
                    .collect();
                if !changed.is_empty() {
                    updates.insert(class.clone(), Value::Object(changed));
                }
                let removed: Map<String, Value> = have
                    .into_iter()
                    .flatten()
                    .filter(|(name, _)| !want.contains_key(*name))
                    .map(|(name, body)| (name.clone(), body.clone()))
                    .collect();
                if !removed.is_empty() {
                    deletes.insert(class.clone(), Value::Object(removed));
                }
            }
            (Some(want), have) => {
                if have != Some(want) {
                    updates.insert(class.clone(), want.clone());
                }
            }
            (None, Some(Value::Object(have))) if !singleton && !have.is_empty() => {
                deletes.insert(class.clone(), Value::Object(have.clone()));
            }
            _ => {}
        }
    }

    (updates, deletes)
}

// ── Trace ───────────────────────────────────────────────────────────

fn tree_value(tree: &ConfigTree) -> Value {
    Value::Object(
        tree.iter()
            .map(|(tenant, classes)| (tenant.clone(), Value::Object(classes.clone())))
            .collect(),
    )
}

/// Flat deep diff of `current` (lhs) against `effective` (rhs).
pub fn trace(effective: &ConfigTree, current: &ConfigTree) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(
        &mut path,
        Some(&tree_value(current)),
        Some(&tree_value(effective)),
        &mut out,
    );
    out
}

fn entry(kind: DiffKind, path: &[String], lhs: Option<&Value>, rhs: Option<&Value>) -> DiffEntry {
    DiffEntry {
        kind,
        path: path.to_vec(),
        lhs: lhs.cloned(),
        rhs: rhs.cloned(),
    }
}

fn walk(path: &mut Vec<String>, lhs: Option<&Value>, rhs: Option<&Value>, out: &mut Vec<DiffEntry>) {
    match (lhs, rhs) {
        (None, None) => {}
        (Some(l), None) => out.push(entry(DiffKind::Deleted, path, Some(l), None)),
        (None, Some(r)) => out.push(entry(DiffKind::New, path, None, Some(r))),
        (Some(Value::Object(l)), Some(Value::Object(r))) => {
            let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
            for key in keys {
                path.push(key.clone());
                walk(path, l.get(key), r.get(key), out);
                path.pop();
            }
        }
        (Some(Value::Array(l)), Some(Value::Array(r))) if l.len() == r.len() => {
            for (i, (a, b)) in l.iter().zip(r).enumerate() {
                path.push(i.to_string());
                walk(path, Some(a), Some(b), out);
                path.pop();
            }
        }
        (Some(l @ Value::Array(_)), Some(r @ Value::Array(_))) => {
            out.push(entry(DiffKind::Array, path, Some(l), Some(r)));
        }
        (Some(l), Some(r)) => {
            if l != r {
                out.push(entry(DiffKind::Edited, path, Some(l), Some(r)));
            }
        }
    }
}
