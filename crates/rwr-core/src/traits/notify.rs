//! Notification sink.

use crate::types::PlayerHandle;

/// Delivers chat messages to players.
pub trait Notifier: Send + Sync {
    /// Message every connected player.
    fn broadcast(&self, message: &str);

    /// Message a single player.
    fn notify(&self, player: &PlayerHandle, message: &str);
}
