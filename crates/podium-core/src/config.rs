// Configuration loading and parsing (event.toml, console.toml, teams.csv).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::race::session::SessionConfig;
use crate::race::Phase;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub event: EventConfig,
    pub db_path: PathBuf,
    pub clock_tick_ms: u64,
    pub display_tick_ms: u64,
    /// Optional roster seed; present only if `config/teams.csv` exists.
    pub teams_csv: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// event.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct EventFile {
    event: EventSection,
    #[serde(default = "PhaseRules::phase1_default")]
    phase1: PhaseRules,
    #[serde(default = "PhaseRules::phase2_default")]
    phase2: PhaseRules,
}

#[derive(Debug, Clone, Deserialize)]
struct EventSection {
    name: String,
}

#[derive(Debug, Clone)]
pub struct EventConfig {
    pub name: String,
    pub phase1: PhaseRules,
    pub phase2: PhaseRules,
}

impl EventConfig {
    pub fn rules(&self, phase: Phase) -> &PhaseRules {
        match phase {
            Phase::One => &self.phase1,
            Phase::Two => &self.phase2,
        }
    }

    pub fn session_config(&self, phase: Phase) -> SessionConfig {
        let rules = self.rules(phase);
        SessionConfig {
            max_participants: rules
                .max_participants
                .unwrap_or_else(|| phase.max_participants()),
            late_corrections: rules.late_corrections,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        EventConfig {
            name: "Robotics Challenge".into(),
            phase1: PhaseRules::phase1_default(),
            phase2: PhaseRules::phase2_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhaseRules {
    /// Heat size; only meaningful for Phase 1.
    #[serde(default)]
    pub max_participants: Option<usize>,
    #[serde(default)]
    pub late_corrections: bool,
    /// Save the race automatically when the time cap expires.
    #[serde(default)]
    pub auto_save_on_cap: bool,
}

impl PhaseRules {
    fn phase1_default() -> Self {
        PhaseRules {
            max_participants: Some(Phase::One.max_participants()),
            late_corrections: false,
            auto_save_on_cap: false,
        }
    }

    fn phase2_default() -> Self {
        PhaseRules {
            max_participants: None,
            late_corrections: true,
            auto_save_on_cap: false,
        }
    }
}

// ---------------------------------------------------------------------------
// console.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConsoleFile {
    #[serde(default)]
    database: DatabaseSection,
    clock: TickSection,
    display: TickSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TickSection {
    tick_ms: u64,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/event.toml`,
/// `config/console.toml`, and (optionally) `config/teams.csv`, all relative
/// to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- event.toml (required) ---
    let event_path = config_dir.join("event.toml");
    let event_text = read_file(&event_path)?;
    let event_file: EventFile =
        toml::from_str(&event_text).map_err(|e| ConfigError::ParseError {
            path: event_path.clone(),
            source: e,
        })?;

    // --- console.toml (required) ---
    let console_path = config_dir.join("console.toml");
    let console_text = read_file(&console_path)?;
    let console_file: ConsoleFile =
        toml::from_str(&console_text).map_err(|e| ConfigError::ParseError {
            path: console_path.clone(),
            source: e,
        })?;

    // --- teams.csv (optional) ---
    let teams_path = config_dir.join("teams.csv");
    let teams_csv = teams_path.exists().then_some(teams_path);

    let db_path = match console_file.database.path {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => default_db_path(),
    };

    let config = Config {
        event: EventConfig {
            name: event_file.event.name,
            phase1: event_file.phase1,
            phase2: event_file.phase2,
        },
        db_path,
        clock_tick_ms: console_file.clock.tick_ms,
        display_tick_ms: console_file.display.tick_ms,
        teams_csv,
    };

    validate(&config)?;

    Ok(config)
}

/// Platform data directory location, used when console.toml names no
/// database path.
fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "podium")
        .map(|dirs| dirs.data_dir().join("podium.db"))
        .unwrap_or_else(|| PathBuf::from("podium.db"))
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.event.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "event.name".into(),
            message: "must not be empty".into(),
        });
    }

    if let Some(max) = config.event.phase1.max_participants {
        let limit = Phase::One.max_participants();
        if max == 0 || max > limit {
            return Err(ConfigError::ValidationError {
                field: "phase1.max_participants".into(),
                message: format!("must be between 1 and {limit}, got {max}"),
            });
        }
    }

    if let Some(max) = config.event.phase2.max_participants {
        if max != 1 {
            return Err(ConfigError::ValidationError {
                field: "phase2.max_participants".into(),
                message: format!("Phase 2 races are single-team, got {max}"),
            });
        }
    }

    let tick_fields: &[(&str, u64)] = &[
        ("clock.tick_ms", config.clock_tick_ms),
        ("display.tick_ms", config.display_tick_ms),
    ];
    for (name, val) in tick_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
