// onboard-core: declaration reconciliation and rollback engine for appliance onboarding.
//
// A submitted declaration is parsed, normalized against the device's
// current and original config into an effective config, diffed into a
// change set, and pushed to the device by domain appliers in a fixed
// order. A failing applier triggers a rollback to the pre-submission
// snapshot.

pub mod applier;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod plan;
pub mod state;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use applier::{Applier, ApplierKind, ApplierSet, ApplyContext, NoopApplier, slice_for};
pub use config::{DeviceConnection, EngineConfig, TlsVerification};
pub use diff::diff;
pub use engine::Engine;
pub use error::CoreError;
pub use normalize::Normalizer;
pub use orchestrator::{Orchestrator, Prepared};
pub use parser::{DeclarationParser, DefaultParser};
pub use plan::ExecutionPlan;
pub use state::{DeviceState, StateSnapshot};
pub use store::TaskStore;

pub use model::{
    ChangeSet, ClassMap, ConfigTree, Controls, DiffEntry, DiffKind, EngineResponse, HandlerResult,
    ParsedDeclaration, RollbackInfo, StatusCodeMode, Task, TaskResponse, TaskResult, TaskState,
};

// Transport seams appliers and embedders implement against.
pub use onboard_api::{DeviceClient, NoopTelemetry, TelemetrySink};
