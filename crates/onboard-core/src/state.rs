// ── Device state ──
//
// The two config trees the engine reconciles against. `original` is the
// device as first seen and never changes; `current` is what the last
// successful run left behind. Readers take cheap snapshots; only the
// orchestrator swaps `current`, and only while holding the device lock.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::ConfigTree;

/// Point-in-time view of both trees.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub current: Arc<ConfigTree>,
    pub original: Arc<ConfigTree>,
}

#[derive(Debug)]
pub struct DeviceState {
    current: ArcSwap<ConfigTree>,
    original: Arc<ConfigTree>,
}

impl DeviceState {
    /// State for a device nobody has onboarded yet: current equals original.
    pub fn new(original: ConfigTree) -> Self {
        let original = Arc::new(original);
        Self {
            current: ArcSwap::new(Arc::clone(&original)),
            original,
        }
    }

    /// State restored from a previous session.
    pub fn with_current(original: ConfigTree, current: ConfigTree) -> Self {
        Self {
            current: ArcSwap::from_pointee(current),
            original: Arc::new(original),
        }
    }

    pub fn current(&self) -> Arc<ConfigTree> {
        self.current.load_full()
    }

    pub fn original(&self) -> Arc<ConfigTree> {
        Arc::clone(&self.original)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current: self.current(),
            original: self.original(),
        }
    }

    pub(crate) fn replace_current(&self, tree: ConfigTree) {
        self.current.store(Arc::new(tree));
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(ConfigTree::new())
    }
}
