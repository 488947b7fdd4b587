// ── RouteDomain ──
//
// The device has exactly one default route domain (id 0) and it always
// exists once any VLAN does. Declarations may name it anything, or
// declare several id-0 domains; the effective config keys it as "0".
// VLAN membership is resolved to fully qualified names and any VLAN no
// other domain claims lands in the default domain.
//
// References resolve against the VLANs that exist once the run completes.
// A VLAN that is only on the device today is deleted by the same run, so a
// reference to it would dangle.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value, json};

use super::{FixupContext, qualify};
use crate::error::CoreError;

/// Effective key of the default route domain.
pub(crate) const DEFAULT_DOMAIN: &str = "0";

fn is_default_domain(body: &Map<String, Value>) -> bool {
    match body.get("id") {
        Some(Value::Number(n)) => n.as_u64() == Some(0),
        Some(Value::String(s)) => s == "0",
        _ => false,
    }
}

fn object_names(class: Option<&Value>) -> BTreeSet<String> {
    class
        .and_then(Value::as_object)
        .map(|objects| objects.keys().cloned().collect())
        .unwrap_or_default()
}

/// Last path segment of a reference like `/Common/external`.
fn leaf(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

struct VlanResolver<'a> {
    tenant: &'a str,
    known: BTreeSet<String>,
}

impl VlanResolver<'_> {
    /// Qualified names of the VLAN references that exist, sorted. Unknown
    /// references are dropped.
    fn resolve(&self, refs: &[Value]) -> BTreeSet<String> {
        refs.iter()
            .filter_map(Value::as_str)
            .map(leaf)
            .filter(|name| self.known.contains(*name))
            .map(|name| qualify(self.tenant, name))
            .collect()
    }
}

pub(crate) fn canonicalize(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let tenant = ctx.tenant;
    let effective_vlans = object_names(ctx.classes.get("VLAN"));
    if !ctx.classes.contains_key("RouteDomain") && effective_vlans.is_empty() {
        return Ok(());
    }

    let declared = match ctx.classes.remove("RouteDomain") {
        Some(Value::Object(domains)) => domains,
        _ => Map::new(),
    };

    // Declared name → effective key. Every id-0 domain maps to "0"; the
    // first one in key order supplies the body.
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    let mut domains = Map::new();
    let mut default_domain: Option<Map<String, Value>> = None;
    for (name, body) in declared {
        let Value::Object(body) = body else {
            continue;
        };
        if is_default_domain(&body) {
            renames.insert(name, DEFAULT_DOMAIN.to_owned());
            default_domain.get_or_insert(body);
        } else {
            renames.insert(name.clone(), name.clone());
            domains.insert(name, Value::Object(body));
        }
    }

    let mut default_domain = default_domain
        .or_else(|| {
            ctx.current
                .get("RouteDomain")
                .and_then(|d| d.get(DEFAULT_DOMAIN))
                .and_then(Value::as_object)
                .cloned()
        })
        .unwrap_or_default();
    default_domain.insert("id".into(), json!(0));

    let resolver = VlanResolver {
        tenant,
        known: effective_vlans.clone(),
    };

    let mut claimed = BTreeSet::new();
    for body in domains.values_mut().filter_map(Value::as_object_mut) {
        if let Some(Value::Array(vlans)) = body.get("vlans") {
            let resolved = resolver.resolve(vlans);
            claimed.extend(resolved.iter().cloned());
            body.insert("vlans".into(), json!(resolved));
        }
    }

    let mut default_vlans = match default_domain.get("vlans") {
        Some(Value::Array(vlans)) => resolver.resolve(vlans),
        _ => BTreeSet::new(),
    };
    default_vlans.extend(effective_vlans.iter().map(|v| qualify(tenant, v)));
    default_vlans.retain(|v| !claimed.contains(v));
    default_domain.insert("vlans".into(), json!(default_vlans));
    domains.insert(DEFAULT_DOMAIN.to_owned(), Value::Object(default_domain));

    for body in domains.values_mut().filter_map(Value::as_object_mut) {
        let Some(parent) = body.get("parent").and_then(Value::as_str) else {
            continue;
        };
        let name = leaf(parent);
        let canonical = renames.get(name).map_or(name, String::as_str);
        let qualified = qualify(tenant, canonical);
        body.insert("parent".into(), Value::String(qualified));
    }

    ctx.classes
        .insert("RouteDomain".into(), Value::Object(domains));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::ClassMap;

    fn run(classes: Value, current: Value) -> ClassMap {
        let mut classes = classes.as_object().unwrap().clone();
        let current = current.as_object().unwrap().clone();
        canonicalize(&mut FixupContext {
            tenant: "Common",
            classes: &mut classes,
            current: &current,
        })
        .unwrap();
        classes
    }

    #[test]
    fn duplicate_default_domains_collapse() {
        let out = run(
            json!({
                "RouteDomain": {
                    "rd0": { "id": 0 },
                    "rd0_2": { "id": 0 },
                    "rd1": { "id": 1 }
                }
            }),
            json!({}),
        );
        let domains = out["RouteDomain"].as_object().unwrap();
        assert_eq!(domains.keys().collect::<Vec<_>>(), vec!["0", "rd1"]);
        assert_eq!(domains["0"], json!({ "id": 0, "vlans": [] }));
    }

    #[test]
    fn unclaimed_vlans_join_default_domain() {
        let out = run(
            json!({
                "VLAN": { "external": {}, "internal": {}, "tenant1": {} },
                "RouteDomain": {
                    "rd1": { "id": 1, "vlans": ["tenant1", "/Common/ghost"] }
                }
            }),
            json!({}),
        );
        assert_eq!(
            out["RouteDomain"],
            json!({
                "0": { "id": 0, "vlans": ["/Common/external", "/Common/internal"] },
                "rd1": { "id": 1, "vlans": ["/Common/tenant1"] }
            })
        );
    }

    #[test]
    fn default_domain_seeded_from_device_when_only_vlans_declared() {
        let out = run(
            json!({ "VLAN": { "external": {} } }),
            json!({
                "RouteDomain": {
                    "0": { "id": 0, "strict": true, "vlans": ["/Common/http-tunnel"] }
                },
                "VLAN": { "http-tunnel": {} }
            }),
        );
        assert_eq!(
            out["RouteDomain"]["0"],
            json!({ "id": 0, "strict": true, "vlans": ["/Common/external"] })
        );
    }

    #[test]
    fn parents_are_rewritten_to_effective_keys() {
        let out = run(
            json!({
                "RouteDomain": {
                    "rd0_alias": { "id": 0 },
                    "rd2": { "id": 2, "parent": "rd0_alias" },
                    "rd3": { "id": 3, "parent": "/Common/rd2" }
                }
            }),
            json!({}),
        );
        assert_eq!(out["RouteDomain"]["rd2"]["parent"], "/Common/0");
        assert_eq!(out["RouteDomain"]["rd3"]["parent"], "/Common/rd2");
    }

    #[test]
    fn nothing_to_do_without_domains_or_vlans() {
        let out = run(json!({ "DNS": { "nameServers": [] } }), json!({}));
        assert!(!out.contains_key("RouteDomain"));
    }
}
