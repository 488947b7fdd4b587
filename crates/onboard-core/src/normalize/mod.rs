// ── Declaration normalizer ──
//
// Turns a parsed declaration plus the device's current and original
// config into the effective config: the exact tree that must exist on the
// device. The pipeline is deterministic and side-effect free, so the same
// inputs always produce the same tree.
//
// Per tenant:
//   1. baseline defaulting for classes of truth
//   2. hostname alias folded into System
//   3. empty classes pruned
//   4. per-class fixups, in registry order
//   5. volatile fields stripped
//   6. omitted classes outside the truth list carried over from current

pub mod classes;
pub mod merge;

mod bgp;
mod failover;
mod httpd;
mod ldap;
mod lists;
mod management_route;
mod route_domain;
mod routing;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{ClassMap, ConfigTree, ParsedDeclaration};

pub use merge::{fold_hostname, merge_defaults, prune_empty, strip_volatile};

// ── Fixup registry ──────────────────────────────────────────────────

/// What a per-class fixup sees: one tenant's class map being built, and
/// the same tenant's current device config.
pub struct FixupContext<'a> {
    pub tenant: &'a str,
    pub classes: &'a mut ClassMap,
    pub current: &'a ClassMap,
}

pub type Fixup = fn(&mut FixupContext<'_>) -> Result<(), CoreError>;

/// Per-class fixups in the order they run. Every fixup runs for every
/// tenant and decides for itself whether its class needs work; some
/// (route domains, DHCP management routes) create their class.
pub const FIXUPS: &[(&str, Fixup)] = &[
    ("FailoverUnicast", failover::canonicalize),
    ("HTTPD", httpd::allow_list),
    ("ManagementRoute", management_route::preserve_dhcp_routes),
    ("RouteDomain", route_domain::canonicalize),
    ("FirewallAddressList", lists::firewall_address_lists),
    ("NetAddressList", lists::net_address_lists),
    ("FirewallPortList", lists::firewall_port_lists),
    ("NetPortList", lists::net_port_lists),
    ("RoutingAccessList", routing::access_lists),
    ("RoutingPrefixList", routing::prefix_lists),
    ("RoutingBGP", bgp::canonicalize),
    ("Authentication", ldap::cert_references),
];

/// Look up the fixup registered for `class`.
pub fn fixup_for(class: &str) -> Option<Fixup> {
    FIXUPS
        .iter()
        .find(|(tag, _)| *tag == class)
        .map(|(_, fixup)| *fixup)
}

// ── Helpers shared by fixups ────────────────────────────────────────

/// `/<tenant>/<name>` unless `name` is already a full path.
pub(crate) fn qualify(tenant: &str, name: &str) -> String {
    if name.starts_with('/') {
        name.to_owned()
    } else {
        format!("/{tenant}/{name}")
    }
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => value_rank(a)
            .cmp(&value_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Total order over JSON values: numbers numerically, then strings, then
/// everything else by serialized form.
pub(crate) fn sort_values(items: &mut [Value]) {
    items.sort_by(compare_values);
}

// ── Normalizer ──────────────────────────────────────────────────────

/// Builds effective configs. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    classes_of_truth: Vec<String>,
    volatile_fields: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            classes_of_truth: config.classes_of_truth.clone(),
            volatile_fields: config.volatile_fields.clone(),
        }
    }

    /// Copy of `tree` with volatile fields removed.
    pub fn canonical_state(&self, tree: &ConfigTree) -> ConfigTree {
        let mut tree = tree.clone();
        for classes in tree.values_mut() {
            for body in classes.values_mut() {
                strip_volatile(body, &self.volatile_fields);
            }
        }
        tree
    }

    /// Compute the effective config.
    ///
    /// Tenants are the union of those declared, those in the original
    /// baseline, and those on the device. A class the declaration omits is
    /// reset to the baseline when it is a class of truth and left as the
    /// device has it otherwise. Fails only on structurally contradictory
    /// input.
    pub fn normalize(
        &self,
        parsed: &ParsedDeclaration,
        current: &ConfigTree,
        original: &ConfigTree,
    ) -> Result<ConfigTree, CoreError> {
        let current = self.canonical_state(current);
        let original = self.canonical_state(original);
        let empty = ClassMap::new();

        let tenants: BTreeSet<&String> = parsed
            .tenants
            .keys()
            .chain(original.keys())
            .chain(current.keys())
            .collect();
        let mut effective = ConfigTree::new();

        for tenant in tenants {
            let mut classes = parsed.tenants.get(tenant).cloned().unwrap_or_default();
            let system_hostname_declared = classes
                .get("System")
                .and_then(|s| s.get("hostname"))
                .is_some();

            merge_defaults(
                &mut classes,
                original.get(tenant).unwrap_or(&empty),
                &self.classes_of_truth,
            );
            fold_hostname(&mut classes, system_hostname_declared);
            prune_empty(&mut classes);

            let mut ctx = FixupContext {
                tenant,
                classes: &mut classes,
                current: current.get(tenant).unwrap_or(&empty),
            };
            for (class, fixup) in FIXUPS {
                trace!(tenant = %tenant, class, "running fixup");
                fixup(&mut ctx)?;
            }

            for body in classes.values_mut() {
                strip_volatile(body, &self.volatile_fields);
            }
            prune_empty(&mut classes);
            self.carry_untracked(&mut classes, current.get(tenant).unwrap_or(&empty));

            debug!(tenant = %tenant, classes = classes.len(), "tenant normalized");
            if !classes.is_empty() {
                effective.insert(tenant.clone(), classes);
            }
        }

        Ok(effective)
    }

    /// Copy every class the tenant lacks and the truth list does not cover
    /// from the device as-is, so the diff neither updates nor deletes it.
    fn carry_untracked(&self, classes: &mut ClassMap, current: &ClassMap) {
        for (class, body) in current {
            if classes.contains_key(class) || self.classes_of_truth.contains(class) {
                continue;
            }
            if matches!(body, Value::Object(m) if m.is_empty()) {
                continue;
            }
            trace!(class, "carrying untracked class from device");
            classes.insert(class.clone(), body.clone());
        }
    }
}
