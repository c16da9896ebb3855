//! Scriptable collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;

use chrono::NaiveDateTime;

use rwr_core::traits::{DelayedExecutor, HealthSource, Notifier, WorldManager, WorldRegistry};
use rwr_core::{Location, PlayerHandle, TimerEvent, TimerHandle, TimerKind, WorldHandle, WorldParams};

use crate::service::{Clock, Host};

/// Scriptable host: a registry, a world manager, a notifier and a health source in one.
#[derive(Default)]
pub struct FakeHost {
    pub loaded: Mutex<Vec<String>>,
    pub occupants: Mutex<Vec<PlayerHandle>>,
    pub relocations: Mutex<Vec<(String, Location)>>,
    pub unreachable_players: Mutex<Vec<String>>,
    /// Results for successive unload calls; missing entries succeed.
    pub unload_results: Mutex<VecDeque<bool>>,
    pub unload_calls: Mutex<Vec<bool>>,
    pub delete_result: Mutex<Option<bool>>,
    pub delete_calls: Mutex<usize>,
    /// Results for successive create calls; missing entries succeed.
    pub create_results: Mutex<VecDeque<bool>>,
    pub create_calls: Mutex<usize>,
    pub broadcasts: Mutex<Vec<String>>,
    pub personal: Mutex<Vec<(String, String)>>,
    pub health: Mutex<Option<f64>>,
}

impl FakeHost {
    pub fn with_world(name: &str) -> Arc<Self> {
        let host = Self::default();
        host.loaded.lock().unwrap().push(name.to_string());
        Arc::new(host)
    }

    pub fn add_player(&self, name: &str) {
        self.occupants.lock().unwrap().push(PlayerHandle {
            id: format!("id-{name}"),
            name: name.to_string(),
        });
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl WorldRegistry for FakeHost {
    fn get_world(&self, name: &str) -> Option<WorldHandle> {
        self.loaded
            .lock()
            .unwrap()
            .iter()
            .find(|w| *w == name)
            .map(|w| WorldHandle::new(w))
    }

    fn list_occupants(&self, _world: &WorldHandle) -> Vec<PlayerHandle> {
        self.occupants.lock().unwrap().clone()
    }

    fn default_world(&self) -> WorldHandle {
        WorldHandle::new("world")
    }

    fn spawn_point(&self, world: &WorldHandle) -> Location {
        Location {
            world: world.name.clone(),
            x: 0.5,
            y: 64.0,
            z: 0.5,
        }
    }

    fn relocate(&self, player: &PlayerHandle, to: &Location) -> std::result::Result<(), String> {
        if self.unreachable_players.lock().unwrap().contains(&player.name) {
            return Err("player is dead".into());
        }
        self.relocations
            .lock()
            .unwrap()
            .push((player.name.clone(), to.clone()));
        Ok(())
    }
}

impl WorldManager for FakeHost {
    fn world_exists(&self, name: &str) -> bool {
        self.get_world(name).is_some()
    }

    fn create_world(&self, name: &str, params: &WorldParams) -> bool {
        assert_eq!(*params, WorldParams::resource_world());
        *self.create_calls.lock().unwrap() += 1;
        let ok = self.create_results.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            self.loaded.lock().unwrap().push(name.to_string());
        }
        ok
    }

    fn unload_world(&self, name: &str, forced: bool) -> bool {
        self.unload_calls.lock().unwrap().push(forced);
        let ok = self.unload_results.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            self.loaded.lock().unwrap().retain(|w| w != name);
        }
        ok
    }

    fn delete_storage(&self, _name: &str) -> bool {
        *self.delete_calls.lock().unwrap() += 1;
        self.delete_result.lock().unwrap().unwrap_or(true)
    }
}

impl Notifier for FakeHost {
    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().unwrap().push(message.to_string());
    }

    fn notify(&self, player: &PlayerHandle, message: &str) {
        self.personal
            .lock()
            .unwrap()
            .push((player.name.clone(), message.to_string()));
    }
}

impl HealthSource for FakeHost {
    fn sample(&self) -> Option<f64> {
        *self.health.lock().unwrap()
    }
}

impl FakeHost {
    /// Bundle this fake as every collaborator except the timer facility.
    pub fn host(self: &Arc<Self>, executor: Arc<ManualExecutor>) -> Host {
        Host {
            registry: self.clone(),
            manager: self.clone(),
            notifier: self.clone(),
            health: self.clone(),
            executor,
        }
    }
}

/// Timer facility that only fires when a test says so.
#[derive(Default)]
pub struct ManualExecutor {
    next_id: Mutex<u64>,
    pending: Mutex<HashMap<TimerHandle, (TimerKind, u64)>>,
    scheduled: Mutex<usize>,
}

impl ManualExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pending timers as (kind, delay_ticks).
    pub fn pending(&self) -> Vec<(TimerKind, u64)> {
        let mut pending: Vec<_> = self.pending.lock().unwrap().values().copied().collect();
        pending.sort_by_key(|(_, ticks)| *ticks);
        pending
    }

    pub fn pending_count(&self, kind: TimerKind) -> usize {
        self.pending().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn scheduled_count(&self) -> usize {
        *self.scheduled.lock().unwrap()
    }

    /// Fire the pending timer of `kind`, returning the event the host would deliver.
    pub fn fire(&self, kind: TimerKind) -> Option<TimerEvent> {
        let mut pending = self.pending.lock().unwrap();
        let handle = pending
            .iter()
            .find(|(_, (k, _))| *k == kind)
            .map(|(h, _)| *h)?;
        pending.remove(&handle);
        Some(TimerEvent { kind, handle })
    }
}

impl DelayedExecutor for ManualExecutor {
    fn schedule(&self, delay_ticks: u64, kind: TimerKind) -> TimerHandle {
        assert!(delay_ticks >= 1);
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        let handle = TimerHandle(*id);
        self.pending.lock().unwrap().insert(handle, (kind, delay_ticks));
        *self.scheduled.lock().unwrap() += 1;
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending.lock().unwrap().remove(&handle);
    }
}

/// A clock that only moves when told to.
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}
