// ── Task records ──
//
// A `Task` is created when a declaration is submitted and settles exactly
// once, to OK or ERROR. Pollers see it through `TaskResponse`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::change::{ChangeSet, DiffEntry};
use super::declaration::{ConfigTree, Controls};

pub const MESSAGE_SUCCESS: &str = "success";
pub const MESSAGE_PROCESSING: &str = "processing";
pub const MESSAGE_ROLLED_BACK: &str = "invalid config - rolled back";
pub const MESSAGE_ROLLBACK_FAILED: &str = "invalid config - rollback failed";

/// Lifecycle state of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TaskState {
    Running,
    Ok,
    Error,
}

/// How the outer HTTP status of a poll response is chosen.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusCodeMode {
    /// Always 200; the real outcome is in the body.
    #[default]
    Legacy,
    /// Mirror the task's result code.
    Experimental,
}

/// Applier name → opaque data that applier needs to undo itself.
pub type RollbackInfo = BTreeMap<String, Value>;

/// What a single applier reports back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResult {
    pub reboot_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_info: Option<Value>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl HandlerResult {
    pub fn reboot_required() -> Self {
        Self {
            reboot_required: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rollback_info(mut self, info: Value) -> Self {
        self.rollback_info = Some(info);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Aggregate outcome of one orchestrated run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub reboot_required: bool,
    pub rollback_info: RollbackInfo,
    pub warnings: Vec<String>,
    pub dry_run: bool,
    pub change_set: ChangeSet,
    /// The normalized declaration the run converged on.
    pub effective: ConfigTree,
}

impl TaskResult {
    /// Fold one applier's result in: reboot flags OR together, rollback
    /// info is keyed by applier, warnings keep applier order.
    pub fn absorb(&mut self, applier: &str, result: HandlerResult) {
        self.reboot_required |= result.reboot_required;
        if let Some(info) = result.rollback_info {
            self.rollback_info.insert(applier.to_owned(), info);
        }
        self.warnings.extend(result.warnings);
    }
}

/// A submitted declaration and, once settled, its outcome.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub state: TaskState,
    pub code: u16,
    pub message: String,
    pub errors: Vec<String>,
    pub controls: Controls,
    pub declaration: Value,
    /// Device config as it was when the task was submitted.
    pub snapshot: Arc<ConfigTree>,
    /// Device config after the task settled.
    pub current_config: Option<Arc<ConfigTree>>,
    pub result: Option<TaskResult>,
    pub last_update: DateTime<Utc>,
}

impl Task {
    pub fn running(
        id: Uuid,
        declaration: Value,
        controls: Controls,
        snapshot: Arc<ConfigTree>,
    ) -> Self {
        Self {
            id,
            state: TaskState::Running,
            code: 202,
            message: MESSAGE_PROCESSING.into(),
            errors: Vec::new(),
            controls,
            declaration,
            snapshot,
            current_config: None,
            result: None,
            last_update: Utc::now(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state != TaskState::Running
    }

    pub(crate) fn succeed(&mut self, result: TaskResult, current: Arc<ConfigTree>) {
        self.state = TaskState::Ok;
        self.code = 200;
        self.message = MESSAGE_SUCCESS.into();
        self.result = Some(result);
        self.current_config = Some(current);
        self.last_update = Utc::now();
    }

    pub(crate) fn fail(
        &mut self,
        code: u16,
        message: impl Into<String>,
        errors: Vec<String>,
        current: Arc<ConfigTree>,
    ) {
        self.state = TaskState::Error;
        self.code = code;
        self.message = message.into();
        self.errors = errors;
        self.current_config = Some(current);
        self.last_update = Utc::now();
    }

    /// Outer HTTP status a poll of this task answers with.
    pub fn poll_status(&self, mode: StatusCodeMode) -> u16 {
        match mode {
            StatusCodeMode::Legacy => 200,
            StatusCodeMode::Experimental => self.code,
        }
    }

    pub fn to_response(&self) -> TaskResponse {
        let result = self.result.as_ref();
        let dry_run = self.controls.dry_run;

        let traces = if self.controls.trace || self.controls.trace_response || dry_run {
            Some(Traces {
                diff: (self.controls.trace || dry_run)
                    .then(|| result.map(|r| r.change_set.trace.clone()).unwrap_or_default()),
                desired: self
                    .controls
                    .trace_response
                    .then(|| result.map(|r| r.effective.clone()))
                    .flatten(),
                current: self
                    .controls
                    .trace_response
                    .then(|| self.snapshot.as_ref().clone()),
            })
        } else {
            None
        };

        TaskResponse {
            id: self.id,
            result: ResultBody {
                class: "Result".into(),
                code: self.code,
                status: self.state,
                message: self.message.clone(),
                dry_run,
                reboot_required: result.is_some_and(|r| r.reboot_required),
                errors: self.errors.clone(),
                warnings: result.map(|r| r.warnings.clone()).unwrap_or_default(),
            },
            declaration: self.declaration.clone(),
            current_config: self.current_config.as_deref().cloned(),
            traces,
            last_update: self.last_update,
        }
    }
}

// ── Wire responses ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBody {
    pub class: String,
    pub code: u16,
    pub status: TaskState,
    pub message: String,
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reboot_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traces {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Vec<DiffEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<ConfigTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ConfigTree>,
}

/// Body of a submit or poll response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub result: ResultBody,
    pub declaration: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_config: Option<ConfigTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces: Option<Traces>,
    pub last_update: DateTime<Utc>,
}

/// A response body paired with the HTTP status it should go out with.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub http_status: u16,
    pub body: TaskResponse,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn task() -> Task {
        Task::running(
            Uuid::nil(),
            json!({ "class": "Device" }),
            Controls::default(),
            Arc::new(ConfigTree::new()),
        )
    }

    #[test]
    fn absorb_merges_applier_results() {
        let mut result = TaskResult::default();
        result.absorb(
            "System",
            HandlerResult::default().with_warning("ntp server unreachable"),
        );
        result.absorb(
            "Provision",
            HandlerResult::reboot_required().with_rollback_info(json!({ "ltm": "nominal" })),
        );
        result.absorb("Network", HandlerResult::default().with_warning("mtu lowered"));

        assert!(result.reboot_required);
        assert_eq!(result.rollback_info["Provision"], json!({ "ltm": "nominal" }));
        assert_eq!(
            result.warnings,
            vec!["ntp server unreachable".to_string(), "mtu lowered".to_string()]
        );
    }

    #[test]
    fn running_task_reports_processing() {
        let t = task();
        assert_eq!(t.state, TaskState::Running);
        assert_eq!(t.code, 202);
        assert_eq!(t.message, MESSAGE_PROCESSING);
        assert!(!t.is_settled());
    }

    #[test]
    fn poll_status_follows_mode() {
        let mut t = task();
        t.fail(
            422,
            MESSAGE_ROLLED_BACK,
            vec!["bad vlan".into()],
            Arc::new(ConfigTree::new()),
        );
        assert_eq!(t.poll_status(StatusCodeMode::Legacy), 200);
        assert_eq!(t.poll_status(StatusCodeMode::Experimental), 422);
    }

    #[test]
    fn response_shape() {
        let mut t = task();
        t.succeed(TaskResult::default(), Arc::new(ConfigTree::new()));
        let mut body = serde_json::to_value(t.to_response()).unwrap();
        body.as_object_mut().unwrap().remove("lastUpdate");
        pretty_assertions::assert_eq!(
            body,
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "result": {
                    "class": "Result",
                    "code": 200,
                    "status": "OK",
                    "message": "success",
                    "dryRun": false
                },
                "declaration": { "class": "Device" },
                "currentConfig": {}
            })
        );
    }

    #[test]
    fn status_mode_parses_from_str() {
        use std::str::FromStr;
        assert_eq!(
            StatusCodeMode::from_str("experimental").unwrap(),
            StatusCodeMode::Experimental
        );
        assert!(StatusCodeMode::from_str("loud").is_err());
    }
}
