//! # RWR Scheduler
//!
//! Periodically tears down and regenerates a designated resource world.
//!
//! ## Architecture
//! ```text
//! ResetService (primary context)
//!   ├── policy::compute_next_reset  → next reset + warning instants
//!   ├── ResetTimers                 → one warning timer, one reset timer
//!   │     └── DelayedExecutor (host ticks, 20/s by default)
//!   ├── ResetOrchestrator           → evacuate → unload → delete → recreate
//!   │     └── DeletionJob           → runs off the primary context
//!   └── NotifyRouter                → broadcasts + last 100 notices
//!
//! runtime::spawn_service
//!   └── tokio task owning the service, fed by an mpsc command channel
//! ```

pub mod notify;
pub mod orchestrator;
pub mod policy;
pub mod runtime;
pub mod service;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use notify::{Notice, Notification, NotifyPriority, NotifyRouter};
pub use orchestrator::{
    DeletionJob, FailureReason, ResetOrchestrator, ResetState, RunOutcome, RunReport, Step,
};
pub use policy::{NextReset, compute_next_reset};
pub use runtime::{Command, ResetHandle, TokioTimers, spawn_service};
pub use service::{Clock, Host, LocalClock, ResetService, ServiceStatus};
pub use timers::{ResetTimers, ScheduleState};
