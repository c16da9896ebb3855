//! # RWR Core
//!
//! Shared vocabulary for the resource world resetter: the reset policy document,
//! the error type, and the traits through which the scheduler talks to its host.
//!
//! ```text
//! rwr-core
//!   ├── config   ResetConfig (TOML) + ConfigStore
//!   ├── error    RwrError
//!   ├── types    ResetType, WorldHandle, PlayerHandle, Location, TimerEvent
//!   └── traits
//!         ├── world   WorldRegistry, WorldManager
//!         ├── notify  Notifier
//!         ├── health  HealthSource
//!         └── timer   DelayedExecutor
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    ConfigStore, FileConfigStore, MemoryConfigStore, PolicyChange, ResetConfig, is_valid_world_name,
};
pub use error::{Result, RwrError};
pub use types::{
    Location, PlayerHandle, ResetType, TimerEvent, TimerHandle, TimerKind, TriggeredBy,
    WorldHandle, WorldParams,
};
