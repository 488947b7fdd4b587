// ── Domain appliers ──
//
// An applier owns one slice of the change set (network objects, auth,
// device clustering, ...) and pushes it to the device. The orchestrator
// only knows the `Applier` trait; concrete appliers are supplied by the
// embedding application.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use onboard_api::DeviceClient;

use crate::error::CoreError;
use crate::model::{ChangeSet, ClassMap, ConfigTree, HandlerResult, RollbackInfo};

/// The eight appliers, in their base execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
    strum::AsRefStr,
)]
pub enum ApplierKind {
    Delete,
    Deprovision,
    Analytics,
    Auth,
    Dsc,
    Network,
    Provision,
    System,
}

impl ApplierKind {
    pub const BASE_ORDER: [ApplierKind; 8] = [
        ApplierKind::Delete,
        ApplierKind::Deprovision,
        ApplierKind::Analytics,
        ApplierKind::Auth,
        ApplierKind::Dsc,
        ApplierKind::Network,
        ApplierKind::Provision,
        ApplierKind::System,
    ];

    /// Applier that owns updates to `class`. Classes nobody claims go to
    /// `System`.
    pub fn owner_of(class: &str) -> Self {
        if ANALYTICS_CLASSES.contains(&class) {
            Self::Analytics
        } else if AUTH_CLASSES.contains(&class) {
            Self::Auth
        } else if DSC_CLASSES.contains(&class) {
            Self::Dsc
        } else if NETWORK_CLASSES.contains(&class) {
            Self::Network
        } else if class == PROVISION_CLASS {
            Self::Provision
        } else {
            Self::System
        }
    }
}

// ── Class ownership ─────────────────────────────────────────────────

const PROVISION_CLASS: &str = "Provision";

/// Level that turns a provisioned module off.
pub const LEVEL_NONE: &str = "none";

const ANALYTICS_CLASSES: &[&str] = &["Analytics", "SecurityAnalytics"];

const AUTH_CLASSES: &[&str] = &["Authentication", "PasswordPolicy", "RemoteAuthRole"];

const DSC_CLASSES: &[&str] = &[
    "ConfigSync",
    "DeviceGroup",
    "DeviceTrust",
    "FailoverMulticast",
    "FailoverUnicast",
    "MirrorIp",
    "TrafficGroup",
];

const NETWORK_CLASSES: &[&str] = &[
    "DagGlobals",
    "FirewallAddressList",
    "FirewallPolicy",
    "FirewallPortList",
    "MAC_Masquerade",
    "ManagementIpFirewall",
    "NetAddressList",
    "NetPortList",
    "Route",
    "RouteDomain",
    "RouteMap",
    "RoutingAccessList",
    "RoutingAsPath",
    "RoutingBGP",
    "RoutingPrefixList",
    "SelfIp",
    "Trunk",
    "Tunnel",
    "VLAN",
];

// ── Applier seam ────────────────────────────────────────────────────

/// Everything an applier gets for one invocation.
pub struct ApplyContext<'a> {
    pub task_id: Uuid,
    pub kind: ApplierKind,
    /// Tenant → class → body owned by this applier. For `Delete` these
    /// are the current bodies of objects to remove.
    pub slice: &'a ConfigTree,
    /// Device config the slice is applied on top of.
    pub current: &'a ConfigTree,
    pub device: &'a dyn DeviceClient,
    /// Set when undoing a failed run; holds the rollback info the appliers
    /// returned before the failure.
    pub rollback: Option<&'a RollbackInfo>,
}

impl ApplyContext<'_> {
    pub fn is_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    /// This applier's own rollback info from the failed run.
    pub fn rollback_info(&self) -> Option<&Value> {
        self.rollback.and_then(|info| info.get(self.kind.as_ref()))
    }
}

#[async_trait]
pub trait Applier: Send + Sync {
    /// Push the slice to the device. `Ok(None)` means nothing to report.
    async fn process(&self, ctx: &ApplyContext<'_>) -> Result<Option<HandlerResult>, CoreError>;
}

/// Applier that accepts every slice without touching the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopApplier;

#[async_trait]
impl Applier for NoopApplier {
    async fn process(&self, _ctx: &ApplyContext<'_>) -> Result<Option<HandlerResult>, CoreError> {
        Ok(None)
    }
}

/// One applier instance per `ApplierKind`.
#[derive(Clone)]
pub struct ApplierSet {
    delete: Arc<dyn Applier>,
    deprovision: Arc<dyn Applier>,
    analytics: Arc<dyn Applier>,
    auth: Arc<dyn Applier>,
    dsc: Arc<dyn Applier>,
    network: Arc<dyn Applier>,
    provision: Arc<dyn Applier>,
    system: Arc<dyn Applier>,
}

impl ApplierSet {
    pub fn from_fn(mut make: impl FnMut(ApplierKind) -> Arc<dyn Applier>) -> Self {
        Self {
            delete: make(ApplierKind::Delete),
            deprovision: make(ApplierKind::Deprovision),
            analytics: make(ApplierKind::Analytics),
            auth: make(ApplierKind::Auth),
            dsc: make(ApplierKind::Dsc),
            network: make(ApplierKind::Network),
            provision: make(ApplierKind::Provision),
            system: make(ApplierKind::System),
        }
    }

    pub fn noop() -> Self {
        let noop: Arc<dyn Applier> = Arc::new(NoopApplier);
        Self::from_fn(|_| Arc::clone(&noop))
    }

    /// Replace the applier for `kind`.
    pub fn with(mut self, kind: ApplierKind, applier: Arc<dyn Applier>) -> Self {
        *self.slot_mut(kind) = applier;
        self
    }

    pub fn get(&self, kind: ApplierKind) -> &Arc<dyn Applier> {
        match kind {
            ApplierKind::Delete => &self.delete,
            ApplierKind::Deprovision => &self.deprovision,
            ApplierKind::Analytics => &self.analytics,
            ApplierKind::Auth => &self.auth,
            ApplierKind::Dsc => &self.dsc,
            ApplierKind::Network => &self.network,
            ApplierKind::Provision => &self.provision,
            ApplierKind::System => &self.system,
        }
    }

    fn slot_mut(&mut self, kind: ApplierKind) -> &mut Arc<dyn Applier> {
        match kind {
            ApplierKind::Delete => &mut self.delete,
            ApplierKind::Deprovision => &mut self.deprovision,
            ApplierKind::Analytics => &mut self.analytics,
            ApplierKind::Auth => &mut self.auth,
            ApplierKind::Dsc => &mut self.dsc,
            ApplierKind::Network => &mut self.network,
            ApplierKind::Provision => &mut self.provision,
            ApplierKind::System => &mut self.system,
        }
    }
}

impl std::fmt::Debug for ApplierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplierSet").finish_non_exhaustive()
    }
}

// ── Slicing ─────────────────────────────────────────────────────────

/// Modules whose level changes, split by whether they are being turned
/// off (`deprovision`) or on/retuned.
fn provision_slice(to_update: &ConfigTree, current: &ConfigTree, deprovision: bool) -> ConfigTree {
    let mut out = ConfigTree::new();
    for (tenant, classes) in to_update {
        let Some(Value::Object(levels)) = classes.get(PROVISION_CLASS) else {
            continue;
        };
        let current_levels = current
            .get(tenant)
            .and_then(|c| c.get(PROVISION_CLASS))
            .and_then(Value::as_object);

        let modules: Map<String, Value> = levels
            .iter()
            .filter(|(module, level)| {
                let was = current_levels.and_then(|c| c.get(*module));
                if was == Some(*level) {
                    return false;
                }
                let turning_off = level.as_str() == Some(LEVEL_NONE);
                if deprovision {
                    turning_off && was.is_some()
                } else {
                    !turning_off
                }
            })
            .map(|(module, level)| (module.clone(), level.clone()))
            .collect();

        if !modules.is_empty() {
            let mut slice = ClassMap::new();
            slice.insert(PROVISION_CLASS.into(), Value::Object(modules));
            out.insert(tenant.clone(), slice);
        }
    }
    out
}

fn owned_slice(to_update: &ConfigTree, kind: ApplierKind) -> ConfigTree {
    to_update
        .iter()
        .filter_map(|(tenant, classes)| {
            let owned: ClassMap = classes
                .iter()
                .filter(|(class, _)| ApplierKind::owner_of(class) == kind)
                .map(|(class, body)| (class.clone(), body.clone()))
                .collect();
            (!owned.is_empty()).then(|| (tenant.clone(), owned))
        })
        .collect()
}

/// The part of `change_set` handed to `kind`.
pub fn slice_for(kind: ApplierKind, change_set: &ChangeSet, current: &ConfigTree) -> ConfigTree {
    match kind {
        ApplierKind::Delete => change_set.to_delete.clone(),
        ApplierKind::Deprovision => provision_slice(&change_set.to_update, current, true),
        ApplierKind::Provision => provision_slice(&change_set.to_update, current, false),
        other => owned_slice(&change_set.to_update, other),
    }
}

/// `true` when a provision or deprovision slice changes `module`.
pub(crate) fn slice_touches_module(slice: &ConfigTree, module: &str) -> bool {
    slice.values().any(|classes| {
        classes
            .get(PROVISION_CLASS)
            .and_then(|p| p.get(module))
            .is_some()
    })
}
