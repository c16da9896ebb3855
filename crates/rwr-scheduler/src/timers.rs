//! Timer adapter — keeps exactly one warning timer and one reset timer armed
//! against the host's delayed-execution facility.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use rwr_core::traits::DelayedExecutor;
use rwr_core::{ResetConfig, TimerEvent, TimerHandle, TimerKind};

use crate::policy::{self, NextReset};

/// Current schedule. Instants are local wall-clock time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleState {
    pub next_reset_at: Option<NaiveDateTime>,
    pub next_warning_at: Option<NaiveDateTime>,
    #[serde(skip)]
    warning_handle: Option<TimerHandle>,
    #[serde(skip)]
    reset_handle: Option<TimerHandle>,
}

impl ScheduleState {
    pub fn warning_handle(&self) -> Option<TimerHandle> {
        self.warning_handle
    }

    pub fn reset_handle(&self) -> Option<TimerHandle> {
        self.reset_handle
    }
}

/// Owns the pending timers for the reset cycle.
pub struct ResetTimers {
    executor: Arc<dyn DelayedExecutor>,
    state: ScheduleState,
}

impl ResetTimers {
    pub fn new(executor: Arc<dyn DelayedExecutor>) -> Self {
        Self {
            executor,
            state: ScheduleState::default(),
        }
    }

    /// Cancel whatever is pending, resolve `policy` against `now`, and arm fresh timers.
    pub fn reschedule(&mut self, now: NaiveDateTime, policy: &ResetConfig) -> NextReset {
        self.cancel_all();

        let next = policy::compute_next_reset(now, policy);
        let tps = self.executor.ticks_per_second().max(1);

        if let Some(warning_at) = next.warning_at {
            let ticks = delay_ticks(now, warning_at, tps);
            self.state.warning_handle = Some(self.executor.schedule(ticks, TimerKind::Warning));
            self.state.next_warning_at = Some(warning_at);
            tracing::info!(
                "⏰ Warning scheduled for {} ({} minutes from now)",
                warning_at,
                ticks / u64::from(tps) / 60
            );
        }

        let ticks = delay_ticks(now, next.reset_at, tps);
        self.state.reset_handle = Some(self.executor.schedule(ticks, TimerKind::Reset));
        self.state.next_reset_at = Some(next.reset_at);
        tracing::info!(
            "📅 Scheduled {} reset of '{}' for {} ({} hours from now)",
            policy.reset_type,
            policy.world_name,
            next.reset_at,
            ticks / u64::from(tps) / 3600
        );

        next
    }

    /// Cancel both timers and clear the schedule. Leaves the cycle unarmed.
    pub fn cancel_all(&mut self) {
        if let Some(handle) = self.state.warning_handle.take() {
            self.executor.cancel(handle);
        }
        if let Some(handle) = self.state.reset_handle.take() {
            self.executor.cancel(handle);
        }
        self.state.next_warning_at = None;
        self.state.next_reset_at = None;
    }

    /// Accept a fired timer. Returns `false` for events whose handle is no longer
    /// armed (canceled by a reschedule after the host had already queued them).
    pub fn take_fired(&mut self, event: TimerEvent) -> bool {
        match event.kind {
            TimerKind::Warning if self.state.warning_handle == Some(event.handle) => {
                self.state.warning_handle = None;
                self.state.next_warning_at = None;
                true
            }
            TimerKind::Reset if self.state.reset_handle == Some(event.handle) => {
                self.state.reset_handle = None;
                self.state.next_reset_at = None;
                true
            }
            _ => {
                tracing::debug!("Ignoring stale {:?} timer {:?}", event.kind, event.handle);
                false
            }
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Whether a reset timer is pending.
    pub fn is_armed(&self) -> bool {
        self.state.reset_handle.is_some()
    }
}

/// Delay from `now` to `at` in host ticks, never less than one tick.
///
/// Rounded up: a timer must not fire before `at`, or the re-arm after the run
/// would resolve to the same slot again.
pub fn delay_ticks(now: NaiveDateTime, at: NaiveDateTime, ticks_per_second: u32) -> u64 {
    let nanos = (at - now).num_nanoseconds().unwrap_or(i64::MAX);
    let nanos = u128::try_from(nanos).unwrap_or(0);
    let ticks = (nanos * u128::from(ticks_per_second)).div_ceil(1_000_000_000);
    u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
}
