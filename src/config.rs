use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::address_map::AddressMap;
use crate::errors::{Result, TrackerError};
use crate::snapshot::{ClockDirection, ClockSettings, DEFAULT_FRAMES_PER_SECOND};

// ─── Persisted config ────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub process_name: String,
    pub poll_interval_ms: u64,
    pub frames_per_second: u32,
    pub clock_direction: ClockDirection,
    /// One of off, error, warn, info, debug, trace.
    pub log_level: String,
    /// Relative paths are resolved against the config directory.
    pub run_log_file: String,
    /// Consecutive failed ticks before detaching from the process.
    pub max_failed_ticks: u32,
    pub addresses: AddressMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            process_name: "mhf.exe".into(),
            poll_interval_ms: 33,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            clock_direction: ClockDirection::CountDown,
            log_level: "info".into(),
            run_log_file: "runs.jsonl".into(),
            max_failed_ticks: 30,
            addresses: AddressMap::default(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl AppConfig {
    /// Load `path`, writing a default config there if it does not exist.
    /// A file that fails to parse falls back to defaults and is left alone.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(TrackerError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}, creating default config", path.display());
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("Failed to write default config: {}", e);
                }
                config
            }
            Err(e) => {
                error!("Failed to load {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn clock_settings(&self) -> ClockSettings {
        ClockSettings {
            direction: self.clock_direction,
            frames_per_second: self.frames_per_second,
        }
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level '{}', using info", self.log_level);
            log::LevelFilter::Info
        })
    }

    pub fn run_log_path(&self, config_dir: &Path) -> PathBuf {
        let path = Path::new(&self.run_log_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_dir.join(path)
        }
    }
}
