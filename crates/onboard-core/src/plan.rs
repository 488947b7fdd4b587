// ── Execution planning ──
//
// Slices a change set per applier and fixes the order they run in. The
// base order is static; the analytics module adds one dependency either
// way: analytics config needs `avr` provisioned first, and `avr` can only
// be deprovisioned once analytics config no longer references it.

use crate::applier::{ApplierKind, slice_for, slice_touches_module};
use crate::model::{ChangeSet, ConfigTree};

/// Provisioning module analytics config depends on.
pub const ANALYTICS_MODULE: &str = "avr";

/// One applier invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub kind: ApplierKind,
    pub slice: ConfigTree,
}

/// Ordered applier invocations for one change set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub steps: Vec<PlannedStep>,
}

impl ExecutionPlan {
    pub fn build(change_set: &ChangeSet, current: &ConfigTree) -> Self {
        let mut steps: Vec<PlannedStep> = ApplierKind::BASE_ORDER
            .iter()
            .map(|kind| PlannedStep {
                kind: *kind,
                slice: slice_for(*kind, change_set, current),
            })
            .collect();

        let analytics_pending = !slice_of(&steps, ApplierKind::Analytics).is_empty();
        if analytics_pending {
            if slice_touches_module(slice_of(&steps, ApplierKind::Provision), ANALYTICS_MODULE) {
                move_after(&mut steps, ApplierKind::Analytics, ApplierKind::Provision);
            }
            if slice_touches_module(slice_of(&steps, ApplierKind::Deprovision), ANALYTICS_MODULE) {
                move_after(&mut steps, ApplierKind::Deprovision, ApplierKind::Analytics);
            }
        }

        Self { steps }
    }

    pub fn order(&self) -> Vec<ApplierKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// `true` when no applier has anything to do.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|s| s.slice.is_empty())
    }
}

fn slice_of(steps: &[PlannedStep], kind: ApplierKind) -> &ConfigTree {
    steps
        .iter()
        .find(|s| s.kind == kind)
        .map_or(empty_tree(), |s| &s.slice)
}

fn empty_tree() -> &'static ConfigTree {
    static EMPTY: ConfigTree = ConfigTree::new();
    &EMPTY
}

/// Move `kind` to sit directly after `anchor`.
fn move_after(steps: &mut Vec<PlannedStep>, kind: ApplierKind, anchor: ApplierKind) {
    let Some(from) = steps.iter().position(|s| s.kind == kind) else {
        return;
    };
    let step = steps.remove(from);
    let to = steps
        .iter()
        .position(|s| s.kind == anchor)
        .map_or(steps.len(), |i| i + 1);
    steps.insert(to, step);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    fn tree(value: Value) -> ConfigTree {
        serde_json::from_value(value).unwrap()
    }

    fn plan(to_update: Value, current: Value) -> Vec<ApplierKind> {
        let change_set = ChangeSet {
            to_update: tree(to_update),
            ..ChangeSet::default()
        };
        ExecutionPlan::build(&change_set, &tree(current)).order()
    }

    #[test]
    fn base_order_without_analytics() {
        assert_eq!(
            plan(json!({ "Common": { "VLAN": { "v": {} } } }), json!({})),
            ApplierKind::BASE_ORDER.to_vec()
        );
    }

    #[test]
    fn analytics_runs_after_avr_is_provisioned() {
        let order = plan(
            json!({
                "Common": {
                    "Provision": { "avr": "nominal" },
                    "Analytics": { "interval": 60 }
                }
            }),
            json!({ "Common": { "Provision": { "avr": "none" } } }),
        );
        assert_eq!(
            order,
            vec![
                ApplierKind::Delete,
                ApplierKind::Deprovision,
                ApplierKind::Auth,
                ApplierKind::Dsc,
                ApplierKind::Network,
                ApplierKind::Provision,
                ApplierKind::Analytics,
                ApplierKind::System,
            ]
        );
    }

    #[test]
    fn avr_is_deprovisioned_after_analytics() {
        let order = plan(
            json!({
                "Common": {
                    "Provision": { "avr": "none" },
                    "Analytics": { "interval": 300 }
                }
            }),
            json!({ "Common": { "Provision": { "avr": "nominal" } } }),
        );
        assert_eq!(
            order,
            vec![
                ApplierKind::Delete,
                ApplierKind::Analytics,
                ApplierKind::Deprovision,
                ApplierKind::Auth,
                ApplierKind::Dsc,
                ApplierKind::Network,
                ApplierKind::Provision,
                ApplierKind::System,
            ]
        );
    }

    #[test]
    fn avr_alone_keeps_base_order() {
        let order = plan(
            json!({ "Common": { "Provision": { "avr": "nominal" } } }),
            json!({}),
        );
        assert_eq!(order, ApplierKind::BASE_ORDER.to_vec());
    }
}
