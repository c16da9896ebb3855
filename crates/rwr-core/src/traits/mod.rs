//! Collaborator traits — everything the scheduler needs from its host.

pub mod health;
pub mod notify;
pub mod timer;
pub mod world;

pub use health::{HealthSource, NOMINAL_HEALTH, NoHealth};
pub use notify::Notifier;
pub use timer::DelayedExecutor;
pub use world::{WorldManager, WorldRegistry};
