//! Value types shared between the scheduler and its host.

use serde::{Deserialize, Serialize};

/// How often the resource world is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ResetType {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ResetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetType::Daily => "daily",
            ResetType::Weekly => "weekly",
            ResetType::Monthly => "monthly",
        }
    }

    /// Parse a reset type name. Case-insensitive; `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(ResetType::Daily),
            "weekly" => Some(ResetType::Weekly),
            "monthly" => Some(ResetType::Monthly),
            _ => None,
        }
    }

    /// Valid range for `resetDay` under this reset type.
    pub fn day_range(&self) -> std::ops::RangeInclusive<u32> {
        match self {
            ResetType::Weekly => 1..=7,
            ResetType::Daily | ResetType::Monthly => 1..=31,
        }
    }
}

// Unknown names in a hand-edited document fall back to daily.
impl From<String> for ResetType {
    fn from(s: String) -> Self {
        ResetType::parse(&s).unwrap_or_else(|| {
            tracing::warn!("⚠️ Unknown reset type '{}', using daily", s);
            ResetType::Daily
        })
    }
}

impl From<ResetType> for String {
    fn from(t: ResetType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ResetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who started a reset run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredBy {
    Manual,
    Scheduled,
}

impl std::fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggeredBy::Manual => write!(f, "manual"),
            TriggeredBy::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// A loaded world as known by the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldHandle {
    pub name: String,
}

impl WorldHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerHandle {
    pub id: String,
    pub name: String,
}

/// A point in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Parameters used when (re)creating the resource world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldParams {
    pub environment: String,
    /// `None` selects the host's default generator.
    pub generator: Option<String>,
    pub world_type: String,
    pub generate_structures: bool,
}

impl WorldParams {
    /// Normal environment, default generator, default world type, structures on.
    pub fn resource_world() -> Self {
        Self {
            environment: "normal".into(),
            generator: None,
            world_type: "default".into(),
            generate_structures: true,
        }
    }
}

/// Which of the two scheduled actions a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    Warning,
    Reset,
}

/// Opaque handle to a pending delayed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// Delivered back to the scheduler when a delayed action fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub kind: TimerKind,
    pub handle: TimerHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_type_parse() {
        assert_eq!(ResetType::parse("Weekly"), Some(ResetType::Weekly));
        assert_eq!(ResetType::parse(" monthly "), Some(ResetType::Monthly));
        assert_eq!(ResetType::parse("hourly"), None);
    }

    #[test]
    fn test_unknown_reset_type_falls_back_to_daily() {
        assert_eq!(ResetType::from("fortnightly".to_string()), ResetType::Daily);
    }

    #[test]
    fn test_day_range() {
        assert!(ResetType::Weekly.day_range().contains(&7));
        assert!(!ResetType::Weekly.day_range().contains(&8));
        assert!(ResetType::Monthly.day_range().contains(&31));
    }
}
