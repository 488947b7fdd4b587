// ── RoutingBGP ──
//
// Address families are expanded to an explicit `ipv4` + `ipv6` pair with
// device defaults filled in, and every list is put in the order the
// device reports it: families by name, redistribution by protocol,
// neighbors by address, peer groups by name. Route map references are
// qualified with the tenant.

use std::cmp::Ordering;
use std::net::IpAddr;

use serde_json::{Map, Value, json};

use super::{FixupContext, qualify};
use crate::error::CoreError;

const FAMILIES: [&str; 2] = ["ipv4", "ipv6"];

fn router_family_defaults() -> Map<String, Value> {
    json_object(json!({ "redistribute": [] }))
}

fn neighbor_family_defaults() -> Map<String, Value> {
    json_object(json!({ "asOverride": false }))
}

fn peer_group_family_defaults() -> Map<String, Value> {
    json_object(json!({
        "asOverride": false,
        "routeMap": {},
        "softReconfigurationInbound": false
    }))
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Turn a declared family array into exactly `[ipv4, ipv6]`.
///
/// An `all` entry stands for both families; an explicit family entry wins
/// over it. Missing keys are filled from `defaults`.
fn expand_families(declared: &[Value], defaults: &Map<String, Value>) -> Vec<Value> {
    let by_name = |name: &str| {
        declared
            .iter()
            .filter_map(Value::as_object)
            .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
    };
    let all = by_name("all");

    FAMILIES
        .iter()
        .map(|family| {
            let mut entry = by_name(*family).or(all).cloned().unwrap_or_default();
            entry.insert("name".into(), Value::String((*family).to_owned()));
            for (key, value) in defaults {
                entry.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Value::Object(entry)
        })
        .collect()
}

fn qualify_route_map(value: &mut Value, tenant: &str) {
    if let Value::String(name) = value {
        if !name.is_empty() {
            *name = qualify(tenant, name);
        }
    }
}

fn canonicalize_family(family: &mut Value, tenant: &str) {
    let Some(family) = family.as_object_mut() else {
        return;
    };
    if let Some(Value::Array(redistribute)) = family.get_mut("redistribute") {
        for entry in redistribute.iter_mut() {
            if let Some(route_map) = entry.get_mut("routeMap") {
                qualify_route_map(route_map, tenant);
            }
        }
        redistribute
            .sort_by(|a, b| str_field(a, "routingProtocol").cmp(str_field(b, "routingProtocol")));
    }
    if let Some(Value::Object(route_map)) = family.get_mut("routeMap") {
        for direction in route_map.values_mut() {
            qualify_route_map(direction, tenant);
        }
    }
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Neighbor addresses may carry a `%<route domain>` suffix.
fn neighbor_ip(value: &Value) -> Option<IpAddr> {
    let raw = str_field(value, "address");
    raw.split('%').next()?.parse().ok()
}

fn compare_neighbors(a: &Value, b: &Value) -> Ordering {
    match (neighbor_ip(a), neighbor_ip(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => str_field(a, "address").cmp(str_field(b, "address")),
    }
}

/// Expand and canonicalize the `addressFamily` array of `obj`, if any.
///
/// With `always` set a missing array is synthesized from defaults.
fn families_of(
    obj: &mut Map<String, Value>,
    defaults: &Map<String, Value>,
    tenant: &str,
    always: bool,
) {
    let declared = match obj.get("addressFamily") {
        Some(Value::Array(families)) => families.clone(),
        _ if always => Vec::new(),
        _ => return,
    };
    let mut expanded = expand_families(&declared, defaults);
    for family in &mut expanded {
        canonicalize_family(family, tenant);
    }
    obj.insert("addressFamily".into(), Value::Array(expanded));
}

fn canonicalize_router(router: &mut Map<String, Value>, tenant: &str) {
    families_of(router, &router_family_defaults(), tenant, true);

    if let Some(Value::Array(neighbors)) = router.get_mut("neighbors") {
        for neighbor in neighbors.iter_mut().filter_map(Value::as_object_mut) {
            families_of(neighbor, &neighbor_family_defaults(), tenant, false);
        }
        neighbors.sort_by(compare_neighbors);
    }

    if let Some(Value::Array(groups)) = router.get_mut("peerGroups") {
        for group in groups.iter_mut().filter_map(Value::as_object_mut) {
            families_of(group, &peer_group_family_defaults(), tenant, false);
        }
        groups.sort_by(|a, b| str_field(a, "name").cmp(str_field(b, "name")));
    }
}

pub(crate) fn canonicalize(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let Some(Value::Object(routers)) = ctx.classes.get_mut("RoutingBGP") else {
        return Ok(());
    };
    for router in routers.values_mut().filter_map(Value::as_object_mut) {
        canonicalize_router(router, ctx.tenant);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::ClassMap;

    fn run(router: Value) -> Value {
        let mut classes = json!({ "RoutingBGP": { "bgp1": router } })
            .as_object()
            .unwrap()
            .clone();
        let current = ClassMap::new();
        canonicalize(&mut FixupContext {
            tenant: "Common",
            classes: &mut classes,
            current: &current,
        })
        .unwrap();
        classes["RoutingBGP"]["bgp1"].clone()
    }

    #[test]
    fn all_family_splits_in_two() {
        let out = run(json!({
            "localAS": 65010,
            "addressFamily": [{
                "name": "all",
                "redistribute": [{ "routingProtocol": "static", "routeMap": "rm1" }]
            }]
        }));
        assert_eq!(
            out["addressFamily"],
            json!([
                {
                    "name": "ipv4",
                    "redistribute": [{ "routingProtocol": "static", "routeMap": "/Common/rm1" }]
                },
                {
                    "name": "ipv6",
                    "redistribute": [{ "routingProtocol": "static", "routeMap": "/Common/rm1" }]
                }
            ])
        );
    }

    #[test]
    fn missing_families_are_synthesized() {
        let out = run(json!({ "localAS": 65010 }));
        assert_eq!(
            out["addressFamily"],
            json!([
                { "name": "ipv4", "redistribute": [] },
                { "name": "ipv6", "redistribute": [] }
            ])
        );
    }

    #[test]
    fn explicit_family_wins_over_all() {
        let out = run(json!({
            "addressFamily": [
                { "name": "all", "redistribute": [{ "routingProtocol": "static" }] },
                { "name": "ipv6", "redistribute": [{ "routingProtocol": "kernel" }] }
            ]
        }));
        assert_eq!(out["addressFamily"][0]["redistribute"][0]["routingProtocol"], "static");
        assert_eq!(out["addressFamily"][1]["redistribute"][0]["routingProtocol"], "kernel");
    }

    #[test]
    fn redistribution_sorted_by_protocol() {
        let out = run(json!({
            "addressFamily": [{
                "name": "ipv4",
                "redistribute": [
                    { "routingProtocol": "static" },
                    { "routingProtocol": "kernel" },
                    { "routingProtocol": "connected" }
                ]
            }]
        }));
        let protocols: Vec<&str> = out["addressFamily"][0]["redistribute"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["routingProtocol"].as_str().unwrap())
            .collect();
        assert_eq!(protocols, vec!["connected", "kernel", "static"]);
    }

    #[test]
    fn neighbors_sorted_numerically_v4_first() {
        let out = run(json!({
            "neighbors": [
                { "address": "2001:db8::1", "peerGroup": "pg" },
                { "address": "10.1.1.10", "peerGroup": "pg" },
                { "address": "10.1.1.9", "peerGroup": "pg" }
            ]
        }));
        let addresses: Vec<&str> = out["neighbors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["address"].as_str().unwrap())
            .collect();
        assert_eq!(addresses, vec!["10.1.1.9", "10.1.1.10", "2001:db8::1"]);
        assert!(out["neighbors"][0].get("addressFamily").is_none());
    }

    #[test]
    fn neighbor_families_get_defaults() {
        let out = run(json!({
            "neighbors": [{
                "address": "10.1.1.1",
                "addressFamily": [{ "name": "ipv4", "asOverride": true }]
            }]
        }));
        assert_eq!(
            out["neighbors"][0]["addressFamily"],
            json!([
                { "name": "ipv4", "asOverride": true },
                { "name": "ipv6", "asOverride": false }
            ])
        );
    }

    #[test]
    fn peer_groups_sorted_and_defaulted() {
        let out = run(json!({
            "peerGroups": [
                { "name": "zeta", "remoteAS": 65020 },
                {
                    "name": "alpha",
                    "remoteAS": 65030,
                    "addressFamily": [{
                        "name": "ipv4",
                        "routeMap": { "in": "rmIn", "out": "/Common/rmOut" }
                    }]
                }
            ]
        }));
        assert_eq!(out["peerGroups"][0]["name"], "alpha");
        assert_eq!(out["peerGroups"][1]["name"], "zeta");
        assert_eq!(
            out["peerGroups"][0]["addressFamily"],
            json!([
                {
                    "name": "ipv4",
                    "routeMap": { "in": "/Common/rmIn", "out": "/Common/rmOut" },
                    "asOverride": false,
                    "softReconfigurationInbound": false
                },
                {
                    "name": "ipv6",
                    "asOverride": false,
                    "routeMap": {},
                    "softReconfigurationInbound": false
                }
            ])
        );
    }
}
