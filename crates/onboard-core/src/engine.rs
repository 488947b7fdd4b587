// ── Engine ──
//
// Public entry point. Accepts declarations, enforces one-at-a-time
// processing against the device, tracks each submission as a task, and
// rolls the device back when an applier fails.
//
// Cheaply cloneable via `Arc<EngineInner>`: every run is spawned with a
// clone and the device lock guard, so the lock outlives the caller's
// future and is only released once the task settles.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use onboard_api::DeviceClient;

use crate::applier::ApplierSet;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::task::{MESSAGE_ROLLBACK_FAILED, MESSAGE_ROLLED_BACK};
use crate::model::{ConfigTree, Controls, EngineResponse, StatusCodeMode, Task};
use crate::normalize::Normalizer;
use crate::orchestrator::{Orchestrator, RunFailure};
use crate::state::DeviceState;
use crate::store::TaskStore;

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    orchestrator: Orchestrator,
    state: DeviceState,
    tasks: TaskStore,
    /// Held for the whole life of a running task.
    device_lock: Arc<Mutex<()>>,
}

impl Engine {
    /// Engine with the default parser and no telemetry.
    pub fn new(
        config: EngineConfig,
        state: DeviceState,
        appliers: ApplierSet,
        device: Arc<dyn DeviceClient>,
    ) -> Self {
        let orchestrator = Orchestrator::new(Normalizer::new(&config), appliers, device);
        Self::with_orchestrator(config, state, orchestrator)
    }

    pub fn with_orchestrator(
        config: EngineConfig,
        state: DeviceState,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                orchestrator,
                state,
                tasks: TaskStore::new(),
                device_lock: Arc::new(Mutex::new(())),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn state(&self) -> &DeviceState {
        &self.inner.state
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    pub fn task(&self, id: &Uuid) -> Option<Task> {
        self.inner.tasks.get(id)
    }

    /// `true` while a task holds the device.
    pub fn is_busy(&self) -> bool {
        self.inner.device_lock.try_lock().is_err()
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Submit a declaration.
    ///
    /// Synchronous submissions return once the task settles, with the
    /// task's code as HTTP status. Async submissions return 202 at once.
    /// Either way the run is spawned and keeps the device locked until it
    /// settles, even if the caller stops waiting. A submission while
    /// another task runs fails with `CoreError::Busy`.
    pub async fn submit(&self, declaration: Value) -> Result<EngineResponse, CoreError> {
        let guard = Arc::clone(&self.inner.device_lock)
            .try_lock_owned()
            .map_err(|_| {
                warn!("declaration rejected, another task holds the device");
                CoreError::Busy
            })?;

        let controls = Controls::from_raw(&declaration);
        let id = Uuid::new_v4();
        let run_async = controls.run_async;
        let task = Task::running(
            id,
            declaration.clone(),
            controls,
            self.inner.state.current(),
        );
        let accepted = task.to_response();
        self.inner.tasks.begin(task);
        info!(task_id = %id, run_async, "declaration accepted");

        let engine = self.clone();
        let run = tokio::spawn(async move {
            engine.run_task(id, &declaration, guard).await;
        });

        if run_async {
            return Ok(EngineResponse {
                http_status: 202,
                body: accepted,
            });
        }

        // A dropped handle detaches the run rather than aborting it.
        run.await
            .map_err(|e| CoreError::Internal(format!("task {id} aborted: {e}")))?;
        let task = self.task_or_not_found(&id)?;
        Ok(EngineResponse {
            http_status: task.code,
            body: task.to_response(),
        })
    }

    /// Report a task's state.
    ///
    /// `mode` picks the outer HTTP status; `None` uses the configured
    /// default.
    pub fn poll(
        &self,
        id: &Uuid,
        mode: Option<StatusCodeMode>,
    ) -> Result<EngineResponse, CoreError> {
        let task = self.task_or_not_found(id)?;
        let mode = mode.unwrap_or(self.inner.config.status_code_mode);
        Ok(EngineResponse {
            http_status: task.poll_status(mode),
            body: task.to_response(),
        })
    }

    fn task_or_not_found(&self, id: &Uuid) -> Result<Task, CoreError> {
        self.inner.tasks.get(id).ok_or_else(|| CoreError::TaskNotFound {
            id: id.to_string(),
        })
    }

    // ── Task execution ───────────────────────────────────────────────

    async fn run_task(&self, id: Uuid, declaration: &Value, guard: OwnedMutexGuard<()>) {
        let inner = &self.inner;
        let snapshot = inner.state.current();

        match inner.orchestrator.run(id, declaration, &inner.state).await {
            Ok(result) => {
                let current = inner.state.current();
                inner.tasks.settle(&id, |t| t.succeed(result, current));
            }
            Err(failure) => self.settle_failure(id, &snapshot, failure).await,
        }

        drop(guard);
    }

    async fn settle_failure(&self, id: Uuid, snapshot: &Arc<ConfigTree>, failure: RunFailure) {
        let inner = &self.inner;
        let RunFailure {
            error,
            attempted,
            rollback_info,
        } = failure;
        let message = error.to_string();

        let Some(attempted) = attempted else {
            warn!(task_id = %id, error = %message, "declaration rejected before apply");
            let code = error.status_code();
            inner.tasks.settle(&id, |t| {
                t.fail(code, message.clone(), vec![message], Arc::clone(snapshot));
            });
            return;
        };

        warn!(task_id = %id, error = %message, "apply failed, rolling back");
        let rollback = inner
            .orchestrator
            .rollback(id, snapshot, &attempted, &rollback_info)
            .await;
        let current = inner.state.current();

        match rollback {
            Ok(()) => {
                info!(task_id = %id, "rollback complete");
                inner.tasks.settle(&id, |t| {
                    t.fail(422, MESSAGE_ROLLED_BACK, vec![message], current);
                });
            }
            Err(rollback_error) => {
                error!(task_id = %id, error = %rollback_error, "rollback failed");
                inner.tasks.settle(&id, |t| {
                    t.fail(
                        500,
                        MESSAGE_ROLLBACK_FAILED,
                        vec![message, rollback_error.to_string()],
                        current,
                    );
                });
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("tasks", &self.inner.tasks.len())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}
