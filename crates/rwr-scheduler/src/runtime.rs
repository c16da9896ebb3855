//! Tokio driver — owns a [`ResetService`] on a single task (the primary
//! context) and feeds it commands, timer events and deletion results over an
//! unbounded mpsc channel.
//!
//! Storage deletion is the only work that leaves the primary task: it runs on
//! the blocking pool and reports back with [`Command::StorageDeleted`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};

use rwr_core::traits::DelayedExecutor;
use rwr_core::{ResetType, Result, RwrError, TimerEvent, TimerHandle, TimerKind};

use crate::orchestrator::{DeletionJob, RunReport, Step};
use crate::policy::NextReset;
use crate::service::{ResetService, ServiceStatus};

type Call = Box<dyn FnOnce(&mut ResetService) + Send>;

/// Messages processed by the service task, in arrival order.
pub enum Command {
    /// Run a closure against the service.
    Call(Call),
    /// Manual reset. The reply is sent once the run reaches a terminal state.
    Trigger(oneshot::Sender<Result<RunReport>>),
    /// A host timer fired.
    Timer(TimerEvent),
    /// A deletion job finished.
    StorageDeleted(bool),
    Shutdown,
}

/// Delayed executor backed by `tokio::time::sleep`. Fired timers are delivered
/// to the service task as [`Command::Timer`].
pub struct TokioTimers {
    tx: mpsc::UnboundedSender<Command>,
    runtime: tokio::runtime::Handle,
    ticks_per_second: u32,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<TimerHandle, AbortHandle>>>,
}

impl TokioTimers {
    pub fn new(
        tx: mpsc::UnboundedSender<Command>,
        runtime: tokio::runtime::Handle,
        ticks_per_second: u32,
    ) -> Self {
        Self {
            tx,
            runtime,
            ticks_per_second: ticks_per_second.max(1),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn tick(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second
    }

    /// Number of timers scheduled and not yet fired or canceled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl DelayedExecutor for TokioTimers {
    fn schedule(&self, delay_ticks: u64, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        let delay = self.tick().saturating_mul(u32::try_from(delay_ticks).unwrap_or(u32::MAX));
        let tx = self.tx.clone();
        let pending = self.pending.clone();

        // Hold the lock across spawn so the task cannot finish before it is registered
        let mut guard = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut pending) = pending.lock() {
                pending.remove(&handle);
            }
            if tx.send(Command::Timer(TimerEvent { kind, handle })).is_err() {
                tracing::debug!("{:?} timer fired after the service stopped", kind);
            }
        });
        guard.insert(handle, task.abort_handle());
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let task = match self.pending.lock() {
            Ok(mut pending) => pending.remove(&handle),
            Err(poisoned) => poisoned.into_inner().remove(&handle),
        };
        if let Some(task) = task {
            task.abort();
        }
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

/// Cloneable front end to a running service.
#[derive(Clone)]
pub struct ResetHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ResetHandle {
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ResetService) -> T + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Call(Box::new(move |service| {
                let _ = reply.send(f(service));
            })))
            .map_err(|_| RwrError::ServiceStopped)?;
        rx.await.map_err(|_| RwrError::ServiceStopped)
    }

    pub async fn set_world_name(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.call(move |s| s.set_world_name(&name)).await?
    }

    pub async fn set_reset_type(&self, reset_type: ResetType) -> Result<()> {
        self.call(move |s| s.set_reset_type(reset_type)).await?
    }

    pub async fn set_reset_day(&self, day: u32) -> Result<()> {
        self.call(move |s| s.set_reset_day(day)).await?
    }

    pub async fn set_restart_time(&self, hour: u32) -> Result<()> {
        self.call(move |s| s.set_restart_time(hour)).await?
    }

    pub async fn set_reset_warning_time(&self, minutes: u32) -> Result<()> {
        self.call(move |s| s.set_reset_warning_time(minutes)).await?
    }

    pub async fn reload(&self) -> Result<NextReset> {
        self.call(|s| s.reload()).await?
    }

    pub async fn reschedule(&self) -> Result<NextReset> {
        self.call(|s| s.reschedule()).await
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        self.call(|s| s.status()).await
    }

    /// Run a manual reset and wait for its outcome.
    pub async fn trigger_reset(&self) -> Result<RunReport> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Trigger(reply))
            .map_err(|_| RwrError::ServiceStopped)?;
        rx.await.map_err(|_| RwrError::ServiceStopped)?
    }

    /// Ask the service task to cancel its timers and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Start `service` on its own task. `tx` must be the sender paired with `rx`
/// (the same one handed to [`TokioTimers`], if used).
pub fn spawn_service(
    mut service: ResetService,
    tx: mpsc::UnboundedSender<Command>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> (ResetHandle, JoinHandle<()>) {
    let handle = ResetHandle { tx: tx.clone() };

    let task = tokio::spawn(async move {
        let next = service.start();
        tracing::info!("⏰ Reset service started, next reset at {}", next.reset_at);

        let mut waiting: Option<oneshot::Sender<Result<RunReport>>> = None;
        let mut stopping = false;

        while let Some(command) = rx.recv().await {
            match command {
                Command::Call(f) => f(&mut service),
                Command::Trigger(reply) => match service.trigger_reset(true) {
                    Ok(Step::Finished(report)) => {
                        let _ = reply.send(Ok(report));
                    }
                    Ok(Step::Deleting(job)) => {
                        waiting = Some(reply);
                        spawn_deletion(job, &tx);
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                },
                Command::Timer(event) => {
                    if let Some(Step::Deleting(job)) = service.on_timer(event) {
                        spawn_deletion(job, &tx);
                    }
                }
                Command::StorageDeleted(deleted) => {
                    if let Some(report) = service.on_storage_deleted(deleted) {
                        if let Some(reply) = waiting.take() {
                            let _ = reply.send(Ok(report));
                        }
                    }
                    if stopping && !service.is_resetting() {
                        break;
                    }
                }
                Command::Shutdown => {
                    // A run past unload must reach recreation before the task exits
                    if !service.is_resetting() {
                        break;
                    }
                    tracing::info!("⏳ Shutdown requested, waiting for the running reset to finish");
                    stopping = true;
                }
            }
        }

        service.stop();
    });

    (handle, task)
}

fn spawn_deletion(job: DeletionJob, tx: &mpsc::UnboundedSender<Command>) {
    let tx = tx.clone();
    tokio::spawn(async move {
        let world_name = job.world_name().to_string();
        let deleted = match tokio::task::spawn_blocking(move || job.run()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!("❌ Deletion of '{}' did not complete: {e}", world_name);
                false
            }
        };
        if tx.send(Command::StorageDeleted(deleted)).is_err() {
            tracing::warn!("⚠️ Service stopped before deletion of '{}' was reported", world_name);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{FailureReason, ResetState, RunOutcome};
    use crate::service::Clock;
    use crate::testing::{FakeHost, FixedClock, ManualExecutor};
    use chrono::NaiveDate;
    use rwr_core::{ConfigStore, MemoryConfigStore, ResetConfig};
    use rwr_core::traits::WorldManager;

    fn start(host: &Arc<FakeHost>) -> (ResetHandle, JoinHandle<()>, Arc<MemoryConfigStore>) {
        let store = Arc::new(MemoryConfigStore::with_config(ResetConfig::default()));
        let now = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        let clock: Arc<dyn Clock> = FixedClock::at(now);
        let service =
            ResetService::new(host.host(ManualExecutor::new()), store.clone(), clock).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let (handle, task) = spawn_service(service, tx, rx);
        (handle, task, store)
    }

    #[tokio::test]
    async fn test_manual_reset_completes() {
        let host = FakeHost::with_world("Resources");
        host.add_player("Alex");
        let (handle, task, _) = start(&host);

        let report = handle.trigger_reset().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.evacuated, 1);
        assert_eq!(*host.delete_calls.lock().unwrap(), 1);

        let status = handle.status().await.unwrap();
        assert_eq!(status.state, ResetState::Idle);
        assert!(status.schedule.next_reset_at.is_some());
        assert!(status.last_run.is_some());

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_manual_reset_reports_delete_failure() {
        let host = FakeHost::with_world("Resources");
        *host.delete_result.lock().unwrap() = Some(false);
        let (handle, task, _) = start(&host);

        let report = handle.trigger_reset().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Failed(FailureReason::DeleteFailed));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_setters_go_through_the_task() {
        let host = FakeHost::with_world("Resources");
        let (handle, task, store) = start(&host);

        handle.set_restart_time(6).await.unwrap();
        assert!(matches!(
            handle.set_restart_time(24).await,
            Err(RwrError::InvalidSetting(_))
        ));
        assert_eq!(store.load().unwrap().restart_time, 6);

        let status = handle.status().await.unwrap();
        assert_eq!(status.policy.restart_time, 6);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_reset() {
        let host = FakeHost::with_world("Resources");
        let store = Arc::new(MemoryConfigStore::with_config(ResetConfig::default()));
        let now = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        let service =
            ResetService::new(host.host(ManualExecutor::new()), store, FixedClock::at(now))
                .unwrap();

        // Both queued before the task starts: the trigger reaches Deleting, then shutdown arrives
        let (tx, rx) = mpsc::unbounded_channel();
        let (reply, report) = oneshot::channel();
        tx.send(Command::Trigger(reply)).unwrap();
        tx.send(Command::Shutdown).unwrap();
        let (_handle, task) = spawn_service(service, tx, rx);
        task.await.unwrap();

        let report = report.await.unwrap().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(*host.delete_calls.lock().unwrap(), 1);
        assert_eq!(*host.create_calls.lock().unwrap(), 1);
        assert!(host.world_exists("Resources"));
    }

    #[tokio::test]
    async fn test_calls_after_shutdown_fail() {
        let host = FakeHost::with_world("Resources");
        let (handle, task, _) = start(&host);
        handle.shutdown();
        task.await.unwrap();

        assert!(matches!(handle.status().await, Err(RwrError::ServiceStopped)));
        assert!(matches!(handle.trigger_reset().await, Err(RwrError::ServiceStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TokioTimers::new(tx, tokio::runtime::Handle::current(), 20);

        let started = tokio::time::Instant::now();
        let handle = timers.schedule(40, TimerKind::Warning);
        assert_eq!(timers.pending_count(), 1);

        match rx.recv().await {
            Some(Command::Timer(event)) => {
                assert_eq!(event.kind, TimerKind::Warning);
                assert_eq!(event.handle, handle);
            }
            _ => panic!("expected a timer event"),
        }
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TokioTimers::new(tx, tokio::runtime::Handle::current(), 20);

        let canceled = timers.schedule(20, TimerKind::Warning);
        let kept = timers.schedule(100, TimerKind::Reset);
        timers.cancel(canceled);

        match rx.recv().await {
            Some(Command::Timer(event)) => {
                assert_eq!(event.handle, kept);
                assert_eq!(event.kind, TimerKind::Reset);
            }
            _ => panic!("expected a timer event"),
        }
    }
}
