//! Reset service — owns the active policy, the timers and the orchestrator, and
//! exposes the operations admin commands and status displays use.
//!
//! All methods run on the host's primary scheduling context. Storage deletion
//! is handed back to the caller as a [`Step::Deleting`] job; see
//! [`crate::runtime`] for the tokio driver.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use rwr_core::traits::{DelayedExecutor, HealthSource, Notifier, WorldManager, WorldRegistry};
use rwr_core::{
    ConfigStore, PolicyChange, ResetConfig, ResetType, Result, TimerEvent, TimerKind,
    TriggeredBy,
};

use crate::notify::{Notice, Notification, NotifyRouter};
use crate::orchestrator::{ResetOrchestrator, ResetState, RunReport, Step};
use crate::policy::NextReset;
use crate::timers::{ResetTimers, ScheduleState};

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local time zone.
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// The host collaborators a service needs.
#[derive(Clone)]
pub struct Host {
    pub registry: Arc<dyn WorldRegistry>,
    pub manager: Arc<dyn WorldManager>,
    pub notifier: Arc<dyn Notifier>,
    pub health: Arc<dyn HealthSource>,
    pub executor: Arc<dyn DelayedExecutor>,
}

/// Point-in-time view for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub policy: ResetConfig,
    pub schedule: ScheduleState,
    pub state: ResetState,
    pub last_run: Option<RunReport>,
    pub recent_notices: Vec<Notification>,
}

pub struct ResetService {
    policy: ResetConfig,
    store: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
    timers: ResetTimers,
    orchestrator: ResetOrchestrator,
    notices: NotifyRouter,
}

impl ResetService {
    /// Build a service with the policy currently persisted in `store`. Nothing is armed yet.
    pub fn new(host: Host, store: Arc<dyn ConfigStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let policy = store.load()?;
        policy.validate()?;
        tracing::info!(
            "📄 Configuration loaded: worldName={}, resetType={}, resetDay={}, restartTime={}, resetWarningTime={}",
            policy.world_name,
            policy.reset_type,
            policy.reset_day,
            policy.restart_time,
            policy.reset_warning_time
        );
        Ok(Self {
            policy,
            store,
            clock,
            timers: ResetTimers::new(host.executor),
            orchestrator: ResetOrchestrator::new(host.registry, host.manager, host.health),
            notices: NotifyRouter::new(host.notifier),
        })
    }

    /// Make sure the resource world exists and arm the first cycle.
    pub fn start(&mut self) -> NextReset {
        self.orchestrator.ensure_world(&self.policy.world_name);
        self.reschedule()
    }

    /// Cancel pending timers.
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        tracing::info!("🛑 Reset schedule stopped");
    }

    /// Re-read the persisted policy, replace the active one, and reschedule.
    pub fn reload(&mut self) -> Result<NextReset> {
        let policy = self.store.load()?;
        policy.validate()?;
        self.policy = policy;
        tracing::info!("🔄 Configuration reloaded");
        Ok(self.reschedule())
    }

    /// Cancel both timers and arm them again for the active policy.
    pub fn reschedule(&mut self) -> NextReset {
        let now = self.clock.now();
        self.timers.reschedule(now, &self.policy)
    }

    pub fn policy(&self) -> &ResetConfig {
        &self.policy
    }

    // ─── Setters ──────────────────────────────────────────────

    pub fn set_world_name(&mut self, name: &str) -> Result<()> {
        self.update(PolicyChange::WorldName(name.to_string()))?;
        self.orchestrator.ensure_world(&self.policy.world_name);
        Ok(())
    }

    /// Switching to weekly clamps a day-of-month above 7 down to Sunday.
    pub fn set_reset_type(&mut self, reset_type: ResetType) -> Result<()> {
        self.update(PolicyChange::ResetType(reset_type))
    }

    pub fn set_reset_day(&mut self, day: u32) -> Result<()> {
        self.update(PolicyChange::ResetDay(day))
    }

    pub fn set_restart_time(&mut self, hour: u32) -> Result<()> {
        self.update(PolicyChange::RestartTime(hour))?;
        tracing::info!("⏰ Restart time set to {}:00", hour);
        Ok(())
    }

    pub fn set_reset_warning_time(&mut self, minutes: u32) -> Result<()> {
        self.update(PolicyChange::ResetWarningTime(minutes))?;
        tracing::info!("⏰ Reset warning time set to {} minutes", minutes);
        Ok(())
    }

    /// Validate, persist, swap in, reschedule. On any error the active policy is untouched.
    fn update(&mut self, change: PolicyChange) -> Result<()> {
        let next = match self.policy.with(change) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("⚠️ Rejected configuration change: {e}");
                return Err(e);
            }
        };
        self.store.save(&next)?;
        self.policy = next;
        self.reschedule();
        Ok(())
    }

    // ─── Resets ───────────────────────────────────────────────

    /// Start a reset now. Manual resets skip the warning broadcast.
    pub fn trigger_reset(&mut self, manual: bool) -> Result<Step> {
        let triggered_by = if manual {
            TriggeredBy::Manual
        } else {
            TriggeredBy::Scheduled
        };
        let world_name = self.policy.world_name.clone();
        let step = self
            .orchestrator
            .begin(&world_name, triggered_by, &mut self.notices)?;
        if let Step::Finished(report) = &step {
            self.after_run(report);
        }
        Ok(step)
    }

    /// Handle a fired timer. Returns the reset's next step when a reset started.
    pub fn on_timer(&mut self, event: TimerEvent) -> Option<Step> {
        if !self.timers.take_fired(event) {
            return None;
        }
        match event.kind {
            TimerKind::Warning => {
                let minutes = self.policy.reset_warning_time;
                self.notices.broadcast(&Notice::Warning { minutes });
                tracing::info!("📢 Broadcast reset warning to players");
                None
            }
            TimerKind::Reset => {
                tracing::info!("🔔 Executing scheduled reset task");
                match self.trigger_reset(false) {
                    Ok(step) => Some(step),
                    Err(e) => {
                        tracing::warn!("⚠️ Scheduled reset skipped: {e}");
                        None
                    }
                }
            }
        }
    }

    /// Resume a run once its deletion job finished.
    pub fn on_storage_deleted(&mut self, deleted: bool) -> Option<RunReport> {
        let report = self.orchestrator.finish_deletion(deleted, &mut self.notices)?;
        self.after_run(&report);
        Some(report)
    }

    fn after_run(&mut self, report: &RunReport) {
        if report.outcome.rearms_schedule() {
            self.reschedule();
        } else {
            self.timers.cancel_all();
            tracing::error!(
                "❌ Automatic resets paused: fix world creation for '{}', then change the schedule or reload",
                report.world_name
            );
        }
    }

    // ─── Introspection ────────────────────────────────────────

    pub fn next_reset_at(&self) -> Option<NaiveDateTime> {
        self.timers.state().next_reset_at
    }

    pub fn next_warning_at(&self) -> Option<NaiveDateTime> {
        self.timers.state().next_warning_at
    }

    pub fn schedule(&self) -> &ScheduleState {
        self.timers.state()
    }

    pub fn state(&self) -> ResetState {
        self.orchestrator.state()
    }

    pub fn is_resetting(&self) -> bool {
        self.orchestrator.is_running()
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.orchestrator.last_report()
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            policy: self.policy.clone(),
            schedule: self.timers.state().clone(),
            state: self.orchestrator.state(),
            last_run: self.orchestrator.last_report().cloned(),
            recent_notices: self.notices.history().cloned().collect(),
        }
    }
}
