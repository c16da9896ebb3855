//! Player-facing notices — what gets said, and a short history of what was said.
//! Delivery goes through the host's [`Notifier`]; nothing here can fail a reset.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rwr_core::PlayerHandle;
use rwr_core::traits::Notifier;

use crate::orchestrator::FailureReason;

const PREFIX: &str = "[RWR]";
const HISTORY_LIMIT: usize = 100;

/// Everything the resetter ever tells players.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Advance warning before a scheduled reset.
    Warning { minutes: u32 },
    /// A reset has started.
    InProgress,
    /// Sent to each evacuated player.
    Evacuated,
    /// World recreated and reachable again.
    Ready,
    /// Run finished successfully.
    Completed {
        elapsed: Duration,
        health_before: f64,
        health_after: f64,
    },
    /// Run aborted.
    Failed(FailureReason),
}

impl Notice {
    pub fn priority(&self) -> NotifyPriority {
        match self {
            Notice::Warning { .. } | Notice::InProgress => NotifyPriority::High,
            Notice::Evacuated | Notice::Ready | Notice::Completed { .. } => NotifyPriority::Normal,
            Notice::Failed(_) => NotifyPriority::Urgent,
        }
    }

    /// Rendered chat line, prefixed.
    pub fn message(&self) -> String {
        let body = match self {
            Notice::Warning { minutes } => {
                format!("Resource world will reset in {minutes} minutes!")
            }
            Notice::InProgress => "Resource world reset in progress. \
                Players in that world will be teleported to safety."
                .to_string(),
            Notice::Evacuated => {
                "You have been teleported to safety - the resource world is being reset."
                    .to_string()
            }
            Notice::Ready => "The resource world has been reset and is ready to use!".to_string(),
            Notice::Completed {
                elapsed,
                health_before,
                health_after,
            } => format!(
                "Resource world reset completed in {} seconds (TPS: {:.2} → {:.2}).",
                elapsed.as_secs(),
                health_before,
                health_after
            ),
            Notice::Failed(reason) => match reason {
                FailureReason::WorldUnavailable => {
                    "Resource world reset aborted: the world could not be found or created."
                        .to_string()
                }
                FailureReason::UnloadFailed => {
                    "Failed to reset resource world. Please notify an administrator.".to_string()
                }
                FailureReason::DeleteFailed => {
                    "Resource world reset failed! Check server logs for details.".to_string()
                }
                FailureReason::RecreateFailed => {
                    "Failed to recreate the resource world! Automatic resets are paused."
                        .to_string()
                }
            },
        };
        format!("{PREFIX} {body}")
    }
}

/// Notice priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotifyPriority {
    Normal,
    High,
    Urgent,
}

/// A delivered notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub priority: NotifyPriority,
    /// Player name for personal notices, `None` for broadcasts.
    pub recipient: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Sends notices through the host sink and keeps the last 100 for status display.
pub struct NotifyRouter {
    sink: Arc<dyn Notifier>,
    history: VecDeque<Notification>,
}

impl NotifyRouter {
    pub fn new(sink: Arc<dyn Notifier>) -> Self {
        Self {
            sink,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    /// Broadcast to everyone.
    pub fn broadcast(&mut self, notice: &Notice) {
        let message = notice.message();
        self.sink.broadcast(&message);
        self.record(message, notice.priority(), None);
    }

    /// Message one player.
    pub fn notify(&mut self, player: &PlayerHandle, notice: &Notice) {
        let message = notice.message();
        self.sink.notify(player, &message);
        self.record(message, notice.priority(), Some(player.name.clone()));
    }

    fn record(&mut self, message: String, priority: NotifyPriority, recipient: Option<String>) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(Notification {
            message,
            priority,
            recipient,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Notification> {
        self.history.iter()
    }
}
