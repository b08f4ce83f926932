//! Session Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `CSI_CASE_ID=burglary-02`
//! 2. Config file: path given on the command line, else `csi.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! [case]
//! id = "case-001"
//! save_dir = "saves"
//! save_format = "json"
//!
//! [timeline]
//! incident = "2024-03-14T19:30:00"
//! evening_hour = 18
//!
//! [evidence]
//! max_evidence_markers = 50
//! min_distance_between_markers = 0.1
//!
//! [roles]
//! menu_cooldown = 0.3
//! settle_delay = 0.1
//!
//! [logger]
//! batch_size = 20
//! flush_interval = 5.0
//! ```

use crate::bubbles::BubbleConfig;
use chrono::{NaiveDate, NaiveDateTime};
use csi_backend::LoggerConfig;
use csi_evidence::EvidenceConfig;
use csi_gamestate::SaveFormat;
use csi_interaction::InteractionConfig;
use csi_roles::RoleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files tried when no path is given
const DEFAULT_PATHS: &[&str] = &["csi.toml", "config/csi.toml"];

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Case identity and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    pub id: String,
    pub save_dir: PathBuf,
    pub save_format: SaveFormat,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            id: "case-001".to_string(),
            save_dir: PathBuf::from("saves"),
            save_format: SaveFormat::Json,
        }
    }
}

/// Case clock anchoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// When the incident happened. Written as a quoted ISO string in TOML.
    pub incident: NaiveDateTime,
    /// Case times earlier than this hour roll forward into the evening
    pub evening_hour: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            incident: NaiveDate::from_ymd_opt(2024, 3, 14)
                .and_then(|d| d.and_hms_opt(19, 30, 0))
                .unwrap_or_default(),
            evening_hour: csi_core::DEFAULT_EVENING_HOUR,
        }
    }
}

/// Everything a session needs to start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub case: CaseConfig,
    pub timeline: TimelineConfig,
    pub evidence: EvidenceConfig,
    pub roles: RoleConfig,
    pub interaction: InteractionConfig,
    pub logger: LoggerConfig,
    pub bubbles: BubbleConfig,

    /// File the config was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Load from a file (or the default locations), then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let mut loaded = Self::load_from_file(path)?;
                loaded.config_path = Some(path.to_path_buf());
                log::info!("Loaded session config from {}", path.display());
                loaded
            }
            None => Self::load_default_paths(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn load_default_paths() -> Self {
        for path in DEFAULT_PATHS {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(mut loaded) => {
                    loaded.config_path = Some(path.to_path_buf());
                    log::info!("Loaded session config from {}", path.display());
                    return loaded;
                }
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        log::info!("No session config found, using defaults");
        Self::default()
    }

    /// Parse a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CSI_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("CSI_CASE_ID") {
            if !id.is_empty() {
                log::info!("Case id from env: {}", id);
                self.case.id = id;
            }
        }

        if let Some(dir) = lookup("CSI_SAVE_DIR") {
            self.case.save_dir = PathBuf::from(dir);
        }

        if let Some(format) = lookup("CSI_SAVE_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => self.case.save_format = SaveFormat::Json,
                "binary" => self.case.save_format = SaveFormat::Binary,
                other => log::warn!("Ignoring CSI_SAVE_FORMAT={}", other),
            }
        }

        if let Some(incident) = lookup("CSI_INCIDENT") {
            match incident.parse() {
                Ok(time) => self.timeline.incident = time,
                Err(e) => log::warn!("Ignoring CSI_INCIDENT={}: {}", incident, e),
            }
        }

        override_parsed(&lookup, "CSI_EVENING_HOUR", &mut self.timeline.evening_hour);
        override_parsed(&lookup, "CSI_MAX_MARKERS", &mut self.evidence.max_evidence_markers);
        override_parsed(
            &lookup,
            "CSI_MIN_MARKER_DISTANCE",
            &mut self.evidence.min_distance_between_markers,
        );
        override_parsed(&lookup, "CSI_MENU_COOLDOWN", &mut self.roles.menu_cooldown);
        override_parsed(&lookup, "CSI_LOG_BATCH_SIZE", &mut self.logger.batch_size);
    }

    /// Reject values no session can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeline.evening_hour > 23 {
            return Err(ConfigError::Invalid {
                field: "timeline.evening_hour",
                reason: format!("{} is not an hour of the day", self.timeline.evening_hour),
            });
        }
        if self.evidence.max_evidence_markers == 0 {
            return Err(ConfigError::Invalid {
                field: "evidence.max_evidence_markers",
                reason: "must allow at least one marker".to_string(),
            });
        }
        if self.evidence.min_distance_between_markers < 0.0 {
            return Err(ConfigError::Invalid {
                field: "evidence.min_distance_between_markers",
                reason: "must not be negative".to_string(),
            });
        }
        if self.logger.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "logger.batch_size",
                reason: "must send at least one entry per batch".to_string(),
            });
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("Session Configuration:");
        log::info!("  Case: {}", self.case.id);
        log::info!("  Incident: {}", self.timeline.incident);
        log::info!("  Evening hour: {}", self.timeline.evening_hour);
        log::info!(
            "  Markers: {} per kind, {:.2}m apart",
            self.evidence.max_evidence_markers,
            self.evidence.min_distance_between_markers
        );
        log::info!("  Saves: {} ({:?})", self.case.save_dir.display(), self.case.save_format);
        if let Some(path) = &self.config_path {
            log::info!("  Config file: {}", path.display());
        }
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring {}={}", key, raw),
        }
    }
}
