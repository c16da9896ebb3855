//! Reset orchestrator — the multi-step state machine that tears down and
//! regenerates the resource world.
//!
//! ```text
//! Idle → Evacuating → Unloading → Deleting → Recreating → Completed → Idle
//!             │            │           │            │
//!             └──── Failed("world unavailable" | "unload failed" |
//!                          "delete failed" | "recreate failed") → Idle
//! ```
//!
//! Everything except storage deletion runs on the caller's (primary) context.
//! [`ResetOrchestrator::begin`] stops at `Deleting` and hands back a
//! [`DeletionJob`]; whoever drives the machine runs it off the primary context
//! and reports the result through [`ResetOrchestrator::finish_deletion`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rwr_core::traits::{HealthSource, WorldManager, WorldRegistry};
use rwr_core::{Result, RwrError, TriggeredBy, WorldHandle, WorldParams};

use crate::notify::{Notice, NotifyRouter};

/// Why a run was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    WorldUnavailable,
    UnloadFailed,
    DeleteFailed,
    RecreateFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::WorldUnavailable => "world unavailable",
            FailureReason::UnloadFailed => "unload failed",
            FailureReason::DeleteFailed => "delete failed",
            FailureReason::RecreateFailed => "recreate failed",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetState {
    Idle,
    Evacuating,
    Unloading,
    Deleting,
    Recreating,
    Completed,
    Failed(FailureReason),
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Completed,
    Failed(FailureReason),
}

impl RunOutcome {
    /// Every outcome re-arms the next cycle except a failed recreation,
    /// which needs an operator before resets resume.
    pub fn rearms_schedule(&self) -> bool {
        !matches!(self, RunOutcome::Failed(FailureReason::RecreateFailed))
    }
}

/// The in-flight run.
#[derive(Debug, Clone)]
struct ResetRun {
    world_name: String,
    triggered_by: TriggeredBy,
    started_at: DateTime<Utc>,
    started: Instant,
    health_before: f64,
    evacuated: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub world_name: String,
    pub triggered_by: TriggeredBy,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub health_before: f64,
    /// Sampled only for completed runs.
    pub health_after: Option<f64>,
    /// Players successfully relocated.
    pub evacuated: usize,
}

/// What the driver must do next after [`ResetOrchestrator::begin`].
pub enum Step {
    /// Run this job off the primary context, then call `finish_deletion`.
    Deleting(DeletionJob),
    /// The run ended without reaching the deletion step.
    Finished(RunReport),
}

/// Storage deletion for an unloaded world. Safe to run on a blocking thread.
pub struct DeletionJob {
    world_name: String,
    manager: Arc<dyn WorldManager>,
}

impl DeletionJob {
    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    /// Delete the world's storage. Returns whether it succeeded.
    pub fn run(self) -> bool {
        tracing::info!("🗑️ Deleting storage for '{}'", self.world_name);
        let deleted = self.manager.delete_storage(&self.world_name);
        if !deleted {
            tracing::error!("❌ Failed to delete storage for '{}'", self.world_name);
        }
        deleted
    }
}

/// Drives one reset run at a time.
pub struct ResetOrchestrator {
    registry: Arc<dyn WorldRegistry>,
    manager: Arc<dyn WorldManager>,
    health: Arc<dyn HealthSource>,
    state: ResetState,
    run: Option<ResetRun>,
    last_report: Option<RunReport>,
}

impl ResetOrchestrator {
    pub fn new(
        registry: Arc<dyn WorldRegistry>,
        manager: Arc<dyn WorldManager>,
        health: Arc<dyn HealthSource>,
    ) -> Self {
        Self {
            registry,
            manager,
            health,
            state: ResetState::Idle,
            run: None,
            last_report: None,
        }
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Create the world if the provider does not know it. Returns whether it exists afterwards.
    pub fn ensure_world(&self, world_name: &str) -> bool {
        if self.manager.world_exists(world_name) {
            tracing::info!("🌍 Resource world exists: {}", world_name);
            return true;
        }
        tracing::info!("🌱 Resource world doesn't exist, creating: {}", world_name);
        let created = self
            .manager
            .create_world(world_name, &WorldParams::resource_world());
        tracing::info!("🌱 Created resource world '{}': success={}", world_name, created);
        created
    }

    /// Start a run: resolve the world, evacuate it, and unload it.
    ///
    /// Rejected with [`RwrError::ResetInProgress`] while another run is in flight.
    pub fn begin(
        &mut self,
        world_name: &str,
        triggered_by: TriggeredBy,
        notices: &mut NotifyRouter,
    ) -> Result<Step> {
        if let Some(run) = &self.run {
            tracing::warn!(
                "⚠️ Reset of '{}' requested ({}) while a run is in progress",
                run.world_name,
                triggered_by
            );
            return Err(RwrError::ResetInProgress(run.world_name.clone()));
        }

        let mut run = ResetRun {
            world_name: world_name.to_string(),
            triggered_by,
            started_at: Utc::now(),
            started: Instant::now(),
            health_before: self.health.sample_or_nominal(),
            evacuated: 0,
        };
        tracing::info!("🔁 Starting {} reset of '{}'", triggered_by, world_name);

        let Some(world) = self.resolve_world(world_name) else {
            return Ok(Step::Finished(
                self.fail(run, FailureReason::WorldUnavailable, notices),
            ));
        };

        self.transition(ResetState::Evacuating);
        notices.broadcast(&Notice::InProgress);
        run.evacuated = self.evacuate(&world, notices);

        self.transition(ResetState::Unloading);
        if !self.manager.unload_world(world_name, false) {
            tracing::warn!(
                "⚠️ Failed to unload world '{}'. Retrying with forced unload.",
                world_name
            );
            if !self.manager.unload_world(world_name, true) {
                return Ok(Step::Finished(
                    self.fail(run, FailureReason::UnloadFailed, notices),
                ));
            }
        }

        self.transition(ResetState::Deleting);
        self.run = Some(run);
        Ok(Step::Deleting(DeletionJob {
            world_name: world_name.to_string(),
            manager: self.manager.clone(),
        }))
    }

    /// Continue a run after its [`DeletionJob`] finished. `None` if no deletion was pending.
    pub fn finish_deletion(&mut self, deleted: bool, notices: &mut NotifyRouter) -> Option<RunReport> {
        if self.state != ResetState::Deleting {
            tracing::warn!("⚠️ Deletion result received in state {:?}, ignoring", self.state);
            return None;
        }
        let run = self.run.take()?;
        if !deleted {
            return Some(self.fail(run, FailureReason::DeleteFailed, notices));
        }

        self.transition(ResetState::Recreating);
        tracing::info!("🌱 World storage deleted, recreating '{}'", run.world_name);
        if !self
            .manager
            .create_world(&run.world_name, &WorldParams::resource_world())
        {
            return Some(self.fail(run, FailureReason::RecreateFailed, notices));
        }
        notices.broadcast(&Notice::Ready);

        let health_after = self.health.sample_or_nominal();
        let report = self.finish(run, RunOutcome::Completed, Some(health_after));
        notices.broadcast(&Notice::Completed {
            elapsed: report.elapsed,
            health_before: report.health_before,
            health_after,
        });
        tracing::info!(
            "✅ Resource world '{}' reset completed in {}ms",
            report.world_name,
            report.elapsed.as_millis()
        );
        Some(report)
    }

    fn resolve_world(&self, world_name: &str) -> Option<WorldHandle> {
        if let Some(world) = self.registry.get_world(world_name) {
            return Some(world);
        }
        tracing::warn!("⚠️ World '{}' not found! Attempting to create it...", world_name);
        self.ensure_world(world_name);
        self.registry.get_world(world_name)
    }

    /// Move every occupant to the default world's spawn. Never fails the run.
    fn evacuate(&self, world: &WorldHandle, notices: &mut NotifyRouter) -> usize {
        let occupants = self.registry.list_occupants(world);
        if occupants.is_empty() {
            return 0;
        }

        let default_world = self.registry.default_world();
        if default_world == *world {
            tracing::warn!(
                "⚠️ '{}' is the default world, {} occupants cannot be evacuated",
                world.name,
                occupants.len()
            );
            return 0;
        }
        let spawn = self.registry.spawn_point(&default_world);

        let mut evacuated = 0;
        for player in &occupants {
            match self.registry.relocate(player, &spawn) {
                Ok(()) => {
                    notices.notify(player, &Notice::Evacuated);
                    tracing::info!("🚶 Teleported {} out of resource world", player.name);
                    evacuated += 1;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to teleport {}: {}", player.name, e);
                }
            }
        }
        evacuated
    }

    fn fail(&mut self, run: ResetRun, reason: FailureReason, notices: &mut NotifyRouter) -> RunReport {
        tracing::error!("❌ Reset of '{}' failed: {}", run.world_name, reason);
        notices.broadcast(&Notice::Failed(reason));
        self.finish(run, RunOutcome::Failed(reason), None)
    }

    /// Enter the terminal state, close the run, return to Idle.
    fn finish(&mut self, run: ResetRun, outcome: RunOutcome, health_after: Option<f64>) -> RunReport {
        self.transition(match outcome {
            RunOutcome::Completed => ResetState::Completed,
            RunOutcome::Failed(reason) => ResetState::Failed(reason),
        });
        let report = RunReport {
            world_name: run.world_name,
            triggered_by: run.triggered_by,
            outcome,
            started_at: run.started_at,
            elapsed: run.started.elapsed(),
            health_before: run.health_before,
            health_after,
            evacuated: run.evacuated,
        };
        self.last_report = Some(report.clone());
        self.transition(ResetState::Idle);
        report
    }

    fn transition(&mut self, to: ResetState) {
        tracing::debug!("🔄 Reset state {:?} → {:?}", self.state, to);
        self.state = to;
    }
}
