//! RWR configuration system.
//!
//! The reset policy is persisted as a flat TOML document:
//!
//! ```toml
//! worldName = "Resources"
//! resetType = "daily"
//! resetDay = 1
//! restartTime = 3
//! resetWarningTime = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, RwrError};
use crate::types::ResetType;

/// Root configuration: the active reset policy plus host tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfig {
    #[serde(default = "default_world_name")]
    pub world_name: String,
    #[serde(default)]
    pub reset_type: ResetType,
    /// Weekday (1 = Monday) for weekly resets, day of month for monthly resets.
    #[serde(default = "default_reset_day")]
    pub reset_day: u32,
    /// Local hour (0-23) at which the reset runs.
    #[serde(default = "default_restart_time")]
    pub restart_time: u32,
    /// Minutes of advance warning. 0 disables the warning.
    #[serde(default = "default_reset_warning_time")]
    pub reset_warning_time: u32,
    /// Host timer granularity.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    /// Directory holding world folders (directory-backed host only).
    #[serde(default = "default_world_container")]
    pub world_container: String,
}

fn default_world_name() -> String { "Resources".into() }
fn default_reset_day() -> u32 { 1 }
fn default_restart_time() -> u32 { 3 }
fn default_reset_warning_time() -> u32 { 5 }
fn default_ticks_per_second() -> u32 { 20 }
fn default_world_container() -> String { "~/.rwr/worlds".into() }

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            world_name: default_world_name(),
            reset_type: ResetType::default(),
            reset_day: default_reset_day(),
            restart_time: default_restart_time(),
            reset_warning_time: default_reset_warning_time(),
            ticks_per_second: default_ticks_per_second(),
            world_container: default_world_container(),
        }
    }
}

impl ResetConfig {
    /// Load config from the default path (~/.rwr/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RwrError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RwrError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RWR home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rwr")
    }

    /// Check every policy field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.world_name.trim().is_empty() {
            return Err(RwrError::InvalidSetting("worldName must not be empty".into()));
        }
        if !is_valid_world_name(&self.world_name) {
            return Err(RwrError::InvalidSetting(format!(
                "worldName must be a plain directory name, got '{}'",
                self.world_name
            )));
        }
        if self.restart_time > 23 {
            return Err(RwrError::InvalidSetting(format!(
                "restartTime must be 0-23, got {}",
                self.restart_time
            )));
        }
        let days = self.reset_type.day_range();
        if !days.contains(&self.reset_day) {
            return Err(RwrError::InvalidSetting(format!(
                "resetDay must be {}-{} for {} resets, got {}",
                days.start(),
                days.end(),
                self.reset_type,
                self.reset_day
            )));
        }
        if self.ticks_per_second == 0 {
            return Err(RwrError::InvalidSetting("ticksPerSecond must be positive".into()));
        }
        Ok(())
    }
}

/// A single policy edit, as issued by an admin command.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyChange {
    WorldName(String),
    ResetType(ResetType),
    ResetDay(u32),
    RestartTime(u32),
    ResetWarningTime(u32),
}

impl ResetConfig {
    /// Copy of this policy with `change` applied and validated. `self` is never modified.
    ///
    /// Switching to weekly clamps a day-of-month above 7 down to Sunday.
    pub fn with(&self, change: PolicyChange) -> Result<Self> {
        let mut next = self.clone();
        match change {
            PolicyChange::WorldName(name) => next.world_name = name.trim().to_string(),
            PolicyChange::ResetType(reset_type) => {
                next.reset_type = reset_type;
                let days = reset_type.day_range();
                if !days.contains(&next.reset_day) {
                    let clamped = next.reset_day.clamp(*days.start(), *days.end());
                    tracing::info!(
                        "📅 Reset day {} is out of range for {} resets, using {}",
                        next.reset_day,
                        reset_type,
                        clamped
                    );
                    next.reset_day = clamped;
                }
            }
            PolicyChange::ResetDay(day) => next.reset_day = day,
            PolicyChange::RestartTime(hour) => next.restart_time = hour,
            PolicyChange::ResetWarningTime(minutes) => next.reset_warning_time = minutes,
        }
        next.validate()?;
        Ok(next)
    }
}

/// A world name must be a single plain path component: no separators,
/// no `.`/`..`, nothing absolute. Hosts join it onto their world container.
pub fn is_valid_world_name(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Where the active policy is persisted.
pub trait ConfigStore: Send + Sync {
    /// Load the persisted document, or defaults when nothing has been saved yet.
    fn load(&self) -> Result<ResetConfig>;

    /// Persist the document. Must not return before the data is durable.
    fn save(&self, config: &ResetConfig) -> Result<()>;
}

/// TOML file on disk.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<ResetConfig> {
        if !self.path.exists() {
            tracing::info!("📄 No config at {}, using defaults", self.path.display());
            let config = ResetConfig::default();
            config.save_to(&self.path)?;
            return Ok(config);
        }
        ResetConfig::load_from(&self.path)
    }

    fn save(&self, config: &ResetConfig) -> Result<()> {
        config.save_to(&self.path)?;
        tracing::debug!("💾 Saved config to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store, for embedding hosts that persist elsewhere and for tests.
#[derive(Default)]
pub struct MemoryConfigStore {
    config: Mutex<Option<ResetConfig>>,
    saves: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResetConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved document, if any.
    pub fn current(&self) -> Option<ResetConfig> {
        self.config.lock().ok().and_then(|c| c.clone())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<ResetConfig> {
        Ok(self.current().unwrap_or_default())
    }

    fn save(&self, config: &ResetConfig) -> Result<()> {
        let mut slot = self
            .config
            .lock()
            .map_err(|_| RwrError::Config("config store lock poisoned".into()))?;
        *slot = Some(config.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResetConfig::default();
        assert_eq!(config.world_name, "Resources");
        assert_eq!(config.reset_type, ResetType::Daily);
        assert_eq!(config.restart_time, 3);
        assert_eq!(config.reset_warning_time, 5);
        assert_eq!(config.reset_day, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: ResetConfig =
            toml::from_str("worldName = \"Mining\"\nresetType = \"weekly\"\nresetDay = 6\n").unwrap();
        assert_eq!(config.world_name, "Mining");
        assert_eq!(config.reset_type, ResetType::Weekly);
        assert_eq!(config.reset_day, 6);
        assert_eq!(config.restart_time, 3);
    }

    #[test]
    fn test_document_keys() {
        let content = toml::to_string_pretty(&ResetConfig::default()).unwrap();
        assert!(content.contains("worldName = \"Resources\""));
        assert!(content.contains("resetType = \"daily\""));
        assert!(content.contains("restartTime = 3"));
        assert!(content.contains("resetWarningTime = 5"));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = ResetConfig::default();
        config.restart_time = 24;
        assert!(config.validate().is_err());

        let mut config = ResetConfig::default();
        config.reset_type = ResetType::Weekly;
        config.reset_day = 8;
        assert!(config.validate().is_err());

        let mut config = ResetConfig::default();
        config.world_name = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_world_name_must_be_plain() {
        for bad in ["..", ".", "a/b", "/tmp/worlds", "worlds/", "..\\up", "C:\\x"] {
            let config = ResetConfig {
                world_name: bad.into(),
                ..ResetConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(RwrError::InvalidSetting(_))),
                "{bad} accepted"
            );
        }
        assert!(is_valid_world_name("Resources"));
        assert!(is_valid_world_name("mining_2"));
        assert!(is_valid_world_name("world.old"));
    }

    #[test]
    fn test_with_applies_and_validates() {
        let config = ResetConfig::default();

        let next = config.with(PolicyChange::RestartTime(6)).unwrap();
        assert_eq!(next.restart_time, 6);
        assert_eq!(config.restart_time, 3);

        assert!(config.with(PolicyChange::RestartTime(24)).is_err());
        assert!(config.with(PolicyChange::WorldName("..".into())).is_err());

        let monthly = config
            .with(PolicyChange::ResetType(ResetType::Monthly))
            .unwrap()
            .with(PolicyChange::ResetDay(20))
            .unwrap();
        let weekly = monthly.with(PolicyChange::ResetType(ResetType::Weekly)).unwrap();
        assert_eq!(weekly.reset_day, 7);
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = std::env::temp_dir().join("rwr-test-config-store");
        let store = FileConfigStore::new(&dir.join("config.toml"));

        // First load writes defaults
        let loaded = store.load().unwrap();
        assert_eq!(loaded, ResetConfig::default());
        assert!(store.path().exists());

        let mut config = loaded;
        config.reset_type = ResetType::Monthly;
        config.reset_day = 31;
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.load().unwrap(), ResetConfig::default());
        store.save(&ResetConfig::default()).unwrap();
        assert_eq!(store.save_count(), 1);
    }
}
