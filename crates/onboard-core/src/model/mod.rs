// ── Domain model ──
//
// Plain data shared by the pipeline stages: the parsed declaration and
// config trees, the change set produced by diffing, and the task record
// callers poll.

pub mod change;
pub mod declaration;
pub mod task;

pub use change::{ChangeSet, DiffEntry, DiffKind};
pub use declaration::{ClassMap, ConfigTree, Controls, ParsedDeclaration};
pub use task::{
    EngineResponse, HandlerResult, ResultBody, RollbackInfo, StatusCodeMode, Task, TaskResponse,
    TaskResult, TaskState, Traces,
};
