// ── Tree-level normalization steps ──
//
// Small, independent passes over one tenant's class map. Each is pure
// over its inputs so it can be tested without the rest of the pipeline.

use serde_json::{Map, Value};

use crate::model::ClassMap;

/// Fill `declared` with every listed class it lacks, copied verbatim from
/// `baseline`.
///
/// Precedence is declared, then baseline, then absent. A class the
/// declaration names is kept wholesale and never merged into, so leaving
/// an object out of a declared class still deletes it.
pub fn merge_defaults(declared: &mut ClassMap, baseline: &ClassMap, classes: &[String]) {
    for class in classes {
        if declared.contains_key(class) {
            continue;
        }
        if let Some(body) = baseline.get(class) {
            declared.insert(class.clone(), body.clone());
        }
    }
}

/// Move the tenant-level `hostname` alias into `System.hostname`.
///
/// A hostname given inside `System` itself wins over the alias.
pub fn fold_hostname(classes: &mut ClassMap, system_hostname_declared: bool) {
    let Some(Value::String(hostname)) = classes.remove("hostname") else {
        return;
    };
    if system_hostname_declared {
        return;
    }
    let system = classes
        .entry("System")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(system) = system {
        system.insert("hostname".into(), Value::String(hostname));
    }
}

/// Drop classes whose body is an empty object.
pub fn prune_empty(classes: &mut ClassMap) {
    classes.retain(|_, body| !matches!(body, Value::Object(m) if m.is_empty()));
}

/// Remove `fields` from every object at any depth.
pub fn strip_volatile(value: &mut Value, fields: &[String]) {
    match value {
        Value::Object(map) => {
            for field in fields {
                map.remove(field);
            }
            for child in map.values_mut() {
                strip_volatile(child, fields);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_volatile(item, fields);
            }
        }
        _ => {}
    }
}
