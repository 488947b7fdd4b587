// ── Address and port lists ──
//
// The firewall and net flavors of address/port lists live in one device
// namespace. A name declared under one flavor that already exists on the
// device under the other is the same device object, so the existing entry
// is carried forward instead of being deleted and recreated.

use serde_json::{Map, Value};

use super::{FixupContext, sort_values};
use crate::error::CoreError;

/// Array members compared as sets.
const SORTED_MEMBERS: &[&str] = &[
    "addresses",
    "addressLists",
    "fqdns",
    "geo",
    "ports",
    "portLists",
];

pub(crate) fn firewall_address_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    canonicalize(ctx, "FirewallAddressList", "NetAddressList");
    Ok(())
}

pub(crate) fn net_address_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    canonicalize(ctx, "NetAddressList", "FirewallAddressList");
    Ok(())
}

pub(crate) fn firewall_port_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    canonicalize(ctx, "FirewallPortList", "NetPortList");
    Ok(())
}

pub(crate) fn net_port_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    canonicalize(ctx, "NetPortList", "FirewallPortList");
    Ok(())
}

/// Carry `class` names that exist on the device under `sibling`, then sort
/// the members of both flavors.
fn canonicalize(ctx: &mut FixupContext<'_>, class: &str, sibling: &str) {
    let carried: Vec<(String, Value)> = match (
        ctx.classes.get(class).and_then(Value::as_object),
        ctx.current.get(sibling).and_then(Value::as_object),
    ) {
        (Some(declared), Some(on_device)) => declared
            .keys()
            .filter_map(|name| on_device.get(name).map(|obj| (name.clone(), obj.clone())))
            .collect(),
        _ => Vec::new(),
    };

    if !carried.is_empty() {
        let target = ctx
            .classes
            .entry(sibling)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(target) = target {
            for (name, obj) in carried {
                target.entry(name).or_insert(obj);
            }
        }
    }

    sort_members(ctx.classes.get_mut(class));
    sort_members(ctx.classes.get_mut(sibling));
}

fn sort_members(objects: Option<&mut Value>) {
    let Some(Value::Object(objects)) = objects else {
        return;
    };
    for obj in objects.values_mut().filter_map(Value::as_object_mut) {
        for member in SORTED_MEMBERS {
            if let Some(Value::Array(items)) = obj.get_mut(*member) {
                sort_values(items);
            }
        }
    }
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
        let mut ctx = FixupContext {
            tenant: "Common",
            classes: &mut classes,
            current: &current,
        };
        for fixup in [
            firewall_address_lists,
            net_address_lists,
            firewall_port_lists,
            net_port_lists,
        ] {
            fixup(&mut ctx).unwrap();
        }
        classes
    }

    #[test]
    fn members_are_sorted() {
        let out = run(
            json!({
                "FirewallPortList": {
                    "web": { "ports": [8443, 443, "8080-8090", 80] }
                },
                "NetAddressList": {
                    "peers": { "addresses": ["10.2.0.0/16", "10.1.0.0/16"], "addressLists": ["b", "a"] }
                }
            }),
            json!({}),
        );
        assert_eq!(
            out["FirewallPortList"]["web"]["ports"],
            json!([80, 443, 8443, "8080-8090"])
        );
        assert_eq!(
            out["NetAddressList"]["peers"],
            json!({ "addresses": ["10.1.0.0/16", "10.2.0.0/16"], "addressLists": ["a", "b"] })
        );
    }

    #[test]
    fn sibling_entry_on_device_is_carried() {
        let out = run(
            json!({
                "FirewallAddressList": { "shared": { "addresses": ["192.0.2.0/24"] } }
            }),
            json!({
                "NetAddressList": {
                    "shared": { "addresses": ["198.51.100.0/24"] },
                    "other": { "addresses": ["203.0.113.0/24"] }
                }
            }),
        );
        assert_eq!(
            out["NetAddressList"],
            json!({ "shared": { "addresses": ["198.51.100.0/24"] } })
        );
        assert_eq!(
            out["FirewallAddressList"]["shared"]["addresses"],
            json!(["192.0.2.0/24"])
        );
    }

    #[test]
    fn declared_sibling_entry_wins() {
        let out = run(
            json!({
                "FirewallPortList": { "p": { "ports": [22] } },
                "NetPortList": { "p": { "ports": [23] } }
            }),
            json!({ "NetPortList": { "p": { "ports": [24] } } }),
        );
        assert_eq!(out["NetPortList"]["p"]["ports"], json!([23]));
    }
}
