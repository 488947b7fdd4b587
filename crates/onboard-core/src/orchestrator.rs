// ── Orchestrator ──
//
// One run of the pipeline: parse → normalize → diff → plan → apply.
// Appliers run strictly one after another; the first failure stops the
// run and is returned as-is. On success the effective config becomes the
// device's current config.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use onboard_api::{DeviceClient, TelemetrySink, UsageRecord};

use crate::applier::{ApplierSet, ApplyContext};
use crate::diff::diff;
use crate::error::CoreError;
use crate::model::declaration::class_counts;
use crate::model::{ChangeSet, ConfigTree, ParsedDeclaration, RollbackInfo, TaskResult};
use crate::normalize::Normalizer;
use crate::parser::{DeclarationParser, DefaultParser};
use crate::plan::ExecutionPlan;
use crate::state::{DeviceState, StateSnapshot};

/// A declaration resolved against device state, before anything is applied.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub parsed: ParsedDeclaration,
    pub effective: ConfigTree,
    pub change_set: ChangeSet,
}

/// Why a run stopped, plus what the caller needs to undo it.
#[derive(Debug)]
pub(crate) struct RunFailure {
    pub error: CoreError,
    /// Effective config that was being applied. `None` when the run failed
    /// before any applier was invoked.
    pub attempted: Option<ConfigTree>,
    pub rollback_info: RollbackInfo,
}

impl RunFailure {
    fn before_apply(error: CoreError) -> Self {
        Self {
            error,
            attempted: None,
            rollback_info: RollbackInfo::new(),
        }
    }
}

pub struct Orchestrator {
    parser: Arc<dyn DeclarationParser>,
    normalizer: Normalizer,
    appliers: ApplierSet,
    device: Arc<dyn DeviceClient>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl Orchestrator {
    pub fn new(normalizer: Normalizer, appliers: ApplierSet, device: Arc<dyn DeviceClient>) -> Self {
        Self {
            parser: Arc::new(DefaultParser),
            normalizer,
            appliers,
            device,
            telemetry: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DeclarationParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Parse, normalize, and diff without touching the device.
    pub fn prepare(&self, raw: &Value, snapshot: &StateSnapshot) -> Result<Prepared, CoreError> {
        let parsed = self.parser.parse(raw)?;
        let effective = self
            .normalizer
            .normalize(&parsed, &snapshot.current, &snapshot.original)?;
        let current = self.normalizer.canonical_state(&snapshot.current);
        let change_set = diff(&effective, &current);
        Ok(Prepared {
            parsed,
            effective,
            change_set,
        })
    }

    /// Run one declaration to completion.
    pub async fn process(
        &self,
        task_id: Uuid,
        raw: &Value,
        state: &DeviceState,
    ) -> Result<TaskResult, CoreError> {
        self.run(task_id, raw, state).await.map_err(|f| f.error)
    }

    pub(crate) async fn run(
        &self,
        task_id: Uuid,
        raw: &Value,
        state: &DeviceState,
    ) -> Result<TaskResult, RunFailure> {
        let snapshot = state.snapshot();
        let prepared = self
            .prepare(raw, &snapshot)
            .map_err(RunFailure::before_apply)?;

        info!(
            task_id = %task_id,
            updates = prepared.change_set.to_update.len(),
            deletes = prepared.change_set.to_delete.len(),
            dry_run = prepared.parsed.controls.dry_run,
            "declaration normalized"
        );

        if prepared.parsed.controls.dry_run {
            return Ok(TaskResult {
                dry_run: true,
                change_set: prepared.change_set,
                effective: prepared.effective,
                ..TaskResult::default()
            });
        }

        let current = self.normalizer.canonical_state(&snapshot.current);
        let plan = ExecutionPlan::build(&prepared.change_set, &current);
        debug!(task_id = %task_id, order = ?plan.order(), "execution plan built");

        let mut result = TaskResult::default();
        let outcome = self
            .execute(task_id, &plan, &current, None, &mut result)
            .await;
        self.report_usage(task_id, &prepared.parsed, &result, outcome.is_ok())
            .await;

        match outcome {
            Ok(()) => {
                state.replace_current(prepared.effective.clone());
                info!(task_id = %task_id, reboot_required = result.reboot_required, "declaration applied");
                result.change_set = prepared.change_set;
                result.effective = prepared.effective;
                Ok(result)
            }
            Err(error) => Err(RunFailure {
                error,
                attempted: Some(prepared.effective),
                rollback_info: result.rollback_info,
            }),
        }
    }

    /// Drive the device from `attempted` back to `snapshot`, handing every
    /// applier the rollback info gathered before the failure.
    pub async fn rollback(
        &self,
        task_id: Uuid,
        snapshot: &ConfigTree,
        attempted: &ConfigTree,
        rollback_info: &RollbackInfo,
    ) -> Result<(), CoreError> {
        let target = self.normalizer.canonical_state(snapshot);
        let change_set = diff(&target, attempted);
        let plan = ExecutionPlan::build(&change_set, attempted);
        info!(task_id = %task_id, order = ?plan.order(), "rolling back");

        let mut scratch = TaskResult::default();
        self.execute(task_id, &plan, attempted, Some(rollback_info), &mut scratch)
            .await
    }

    async fn execute(
        &self,
        task_id: Uuid,
        plan: &ExecutionPlan,
        current: &ConfigTree,
        rollback: Option<&RollbackInfo>,
        result: &mut TaskResult,
    ) -> Result<(), CoreError> {
        for step in &plan.steps {
            let ctx = ApplyContext {
                task_id,
                kind: step.kind,
                slice: &step.slice,
                current,
                device: self.device.as_ref(),
                rollback,
            };
            debug!(applier = %step.kind, rollback = rollback.is_some(), "invoking applier");
            match self.appliers.get(step.kind).process(&ctx).await {
                Ok(Some(handler_result)) => result.absorb(step.kind.as_ref(), handler_result),
                Ok(None) => {}
                Err(e) => {
                    warn!(applier = %step.kind, error = %e, "applier failed");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Best effort: a failing sink never affects the run.
    async fn report_usage(
        &self,
        task_id: Uuid,
        parsed: &ParsedDeclaration,
        result: &TaskResult,
        succeeded: bool,
    ) {
        let Some(sink) = &self.telemetry else {
            return;
        };
        let record = UsageRecord {
            task_id,
            timestamp: Utc::now(),
            class_counts: class_counts(&parsed.tenants),
            dry_run: parsed.controls.dry_run,
            succeeded,
            reboot_required: result.reboot_required,
            user_agent: parsed.controls.user_agent.clone(),
        };
        if let Err(e) = sink.report(&record).await {
            debug!(task_id = %task_id, error = %e, "usage report dropped");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("normalizer", &self.normalizer)
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}
