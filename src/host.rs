//! Directory-backed host for the standalone binary.
//!
//! Worlds are directories under a container path. A world exists when its
//! directory holds a `level.toml` descriptor with the creation parameters.
//! There are no connected players, so evacuation is always a no-op, and
//! broadcasts go to the log.

use std::path::{Path, PathBuf};

use rwr_core::traits::{Notifier, WorldManager, WorldRegistry};
use rwr_core::{Location, PlayerHandle, WorldHandle, WorldParams, is_valid_world_name};

const LEVEL_FILE: &str = "level.toml";
const DEFAULT_WORLD: &str = "world";

pub struct DirectoryHost {
    container: PathBuf,
}

impl DirectoryHost {
    pub fn new(container: &Path) -> Self {
        Self {
            container: container.to_path_buf(),
        }
    }

    /// Directory for `name`, or `None` if it would not be a direct child of the container.
    fn world_dir(&self, name: &str) -> Option<PathBuf> {
        if !is_valid_world_name(name) {
            tracing::error!("❌ Refusing world name '{}': not a plain directory name", name);
            return None;
        }
        let dir = self.container.join(name);
        (dir.parent() == Some(self.container.as_path())).then_some(dir)
    }

    fn write_level(&self, dir: &Path, params: &WorldParams) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let content = toml::to_string_pretty(params).map_err(std::io::Error::other)?;
        std::fs::write(dir.join(LEVEL_FILE), content)
    }
}

impl WorldRegistry for DirectoryHost {
    fn get_world(&self, name: &str) -> Option<WorldHandle> {
        self.world_exists(name).then(|| WorldHandle::new(name))
    }

    fn list_occupants(&self, _world: &WorldHandle) -> Vec<PlayerHandle> {
        Vec::new()
    }

    fn default_world(&self) -> WorldHandle {
        WorldHandle::new(DEFAULT_WORLD)
    }

    fn spawn_point(&self, world: &WorldHandle) -> Location {
        Location {
            world: world.name.clone(),
            x: 0.5,
            y: 64.0,
            z: 0.5,
        }
    }

    fn relocate(&self, player: &PlayerHandle, _to: &Location) -> Result<(), String> {
        Err(format!("{} is not connected", player.name))
    }
}

impl WorldManager for DirectoryHost {
    fn world_exists(&self, name: &str) -> bool {
        self.world_dir(name)
            .is_some_and(|dir| dir.join(LEVEL_FILE).is_file())
    }

    fn create_world(&self, name: &str, params: &WorldParams) -> bool {
        let Some(dir) = self.world_dir(name) else {
            return false;
        };
        match self.write_level(&dir, params) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("❌ Failed to create world '{}': {e}", name);
                false
            }
        }
    }

    fn unload_world(&self, name: &str, forced: bool) -> bool {
        tracing::debug!("Unloading '{}' (forced={})", name, forced);
        true
    }

    fn delete_storage(&self, name: &str) -> bool {
        let Some(dir) = self.world_dir(name) else {
            return false;
        };
        if !dir.exists() {
            return true;
        }
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("❌ Failed to delete {}: {e}", dir.display());
                false
            }
        }
    }
}

/// Sends every notice to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn broadcast(&self, message: &str) {
        tracing::info!("📢 {}", message);
    }

    fn notify(&self, player: &PlayerHandle, message: &str) {
        tracing::info!("💬 @{}: {}", player.name, message);
    }
}
