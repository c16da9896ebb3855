//! Host delayed-execution facility.

use crate::types::{TimerHandle, TimerKind};

/// Runs a delayed action on the host's primary scheduling context.
///
/// When a timer fires the host delivers a [`TimerEvent`](crate::types::TimerEvent)
/// carrying the kind and the handle returned here back to the scheduler.
pub trait DelayedExecutor: Send + Sync {
    /// Arm a timer `delay_ticks` ticks from now. `delay_ticks` is at least 1.
    fn schedule(&self, delay_ticks: u64, kind: TimerKind) -> TimerHandle;

    /// Cancel a pending timer. Canceling a fired or already-canceled timer is a no-op.
    fn cancel(&self, handle: TimerHandle);

    /// Timer granularity.
    fn ticks_per_second(&self) -> u32 {
        20
    }
}
