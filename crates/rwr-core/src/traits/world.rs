//! World registry and world-management provider.
//!
//! Registry calls touch live game state and must only be made from the host's
//! primary scheduling context. `WorldManager::delete_storage` is the one call
//! allowed (and expected) to run on a background thread.

use crate::types::{Location, PlayerHandle, WorldHandle, WorldParams};

/// Read side of the host: which worlds are loaded and who is in them.
pub trait WorldRegistry: Send + Sync {
    /// Look up a loaded world by name.
    fn get_world(&self, name: &str) -> Option<WorldHandle>;

    /// Players currently inside `world`.
    fn list_occupants(&self, world: &WorldHandle) -> Vec<PlayerHandle>;

    /// The server's primary world, used as the evacuation target.
    fn default_world(&self) -> WorldHandle;

    /// Spawn point of `world`.
    fn spawn_point(&self, world: &WorldHandle) -> Location;

    /// Move a player. Errors are reported as a human-readable reason.
    fn relocate(&self, player: &PlayerHandle, to: &Location) -> Result<(), String>;
}

/// Write side of the host: world lifecycle and storage.
///
/// Boolean results mirror the host API: `false` means the operation did not happen.
pub trait WorldManager: Send + Sync {
    /// Whether the provider knows a world with this name.
    fn world_exists(&self, name: &str) -> bool;

    /// Create and load a world.
    fn create_world(&self, name: &str, params: &WorldParams) -> bool;

    /// Unload a world, keeping its storage. `forced` skips the usual preconditions.
    fn unload_world(&self, name: &str, forced: bool) -> bool;

    /// Delete the on-disk storage of an unloaded world. Disk-bound; may be slow.
    fn delete_storage(&self, name: &str) -> bool;
}
