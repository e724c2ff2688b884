//! Configuration management for optpatch
//!
//! optpatch stores configuration in ~/.optpatch/config.toml

use crate::backup_manager::DEFAULT_MAX_BACKUPS;
use crate::patch::{validate_helper_name, DEFAULT_HELPER};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Target patched when no file is given on the command line
pub const DEFAULT_TARGET: &str = "backend/src/main/java/com/whatsapp/RestServer.java";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

const DEFAULT_CONFIG: &str = r#"# optpatch Configuration File
#
# Values set here can be overridden by command-line flags.
# Edit with: optpatch config

[patch]
# File rewritten when no FILE argument is given (relative to the current directory)
target = "backend/src/main/java/com/whatsapp/RestServer.java"

# Method the inlined OPTIONS handler body is extracted into
helper = "handleOptions"

[backup]
# Custom backup directory (optional, default: ~/.optpatch/backups)
#backup_dir = "/mnt/backups/optpatch"

# Number of backups kept before the oldest are removed (default: 50)
max_backups = 50

[output]
# Context lines shown around changes in --dry-run previews (default: 2, max: 10)
context_lines = 2

# Colored output when writing to a terminal (default: true)
color = true

[logging]
# Write a debug log to ~/.optpatch/optpatch.log (default: false)
debug = false

# Log level: trace, debug, info, warn, or error (default: info)
level = "info"
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub patch: PatchConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    #[serde(default = "default_target")]
    pub target: Option<String>,

    #[serde(default = "default_helper")]
    pub helper: Option<String>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            helper: default_helper(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub backup_dir: Option<String>,

    #[serde(default = "default_max_backups")]
    pub max_backups: Option<usize>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            max_backups: default_max_backups(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: Option<usize>,

    #[serde(default = "default_color")]
    pub color: Option<bool>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default = "default_level")]
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: Some(false),
            level: default_level(),
        }
    }
}

// Default functions for serde
fn default_target() -> Option<String> { Some(DEFAULT_TARGET.to_string()) }
fn default_helper() -> Option<String> { Some(DEFAULT_HELPER.to_string()) }
fn default_max_backups() -> Option<usize> { Some(DEFAULT_MAX_BACKUPS) }
fn default_context_lines() -> Option<usize> { Some(2) }
fn default_color() -> Option<bool> { Some(true) }
fn default_level() -> Option<String> { Some("info".to_string()) }

impl Config {
    pub fn target(&self) -> &str {
        self.patch.target.as_deref().unwrap_or(DEFAULT_TARGET)
    }

    pub fn helper(&self) -> &str {
        self.patch.helper.as_deref().unwrap_or(DEFAULT_HELPER)
    }

    pub fn max_backups(&self) -> usize {
        self.backup.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS)
    }

    pub fn context_lines(&self) -> usize {
        self.output.context_lines.unwrap_or(2)
    }

    pub fn color(&self) -> bool {
        self.output.color.unwrap_or(true)
    }

    pub fn debug(&self) -> bool {
        self.logging.debug.unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }
}

/// ~/.optpatch, holding config, backups and the debug log
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".optpatch"))
}

/// Get the configuration file path, creating its directory if needed
pub fn config_file_path() -> Result<PathBuf> {
    let config_dir = config_dir()?;
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir.join("config.toml"))
}

/// Write the commented default configuration to `path`
pub fn save_default_config(path: &Path) -> Result<()> {
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write default config file: {}", path.display()))
}

/// Load configuration from ~/.optpatch/config.toml, creating it if missing
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file_path()?)
}

/// Load configuration from `path`
///
/// A missing file is created with defaults. A malformed or invalid file is
/// an error and is left alone; callers fall back to `Config::default()`.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        save_default_config(path)?;
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&config_str)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Parse and validate a TOML configuration string
pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str).context("Failed to parse config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Render the effective configuration as TOML
pub fn show_config(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(helper) = &config.patch.helper {
        validate_helper_name(helper)?;
    }

    if let Some(target) = &config.patch.target {
        if target.trim().is_empty() {
            anyhow::bail!("Invalid target: must not be empty");
        }
    }

    if let Some(max_backups) = config.backup.max_backups {
        if max_backups == 0 {
            anyhow::bail!("Invalid max_backups: 0 (min 1)");
        }
    }

    if let Some(context) = config.output.context_lines {
        if context > 10 {
            anyhow::bail!("Invalid context_lines: {} (max 10)", context);
        }
    }

    if let Some(level) = &config.logging.level {
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "Invalid level: {} (must be one of {})",
                level,
                LOG_LEVELS.join(", ")
            );
        }
    }

    Ok(())
}

/// Find the editor to open the config in: $VISUAL, $EDITOR, then nano or vi
fn find_editor() -> Result<PathBuf> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(editor) = std::env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(PathBuf::from(editor));
            }
        }
    }

    which::which("nano")
        .or_else(|_| which::which("vi"))
        .context("No editor found. Set $EDITOR or install nano/vi")
}

/// Open the config file in an editor and keep the edit only if it validates
///
/// The edit happens on a scratch copy; the real file is replaced only when the
/// result parses and passes validation.
pub fn edit_config() -> Result<()> {
    let config_path = config_file_path()?;
    if !config_path.exists() {
        save_default_config(&config_path)?;
    }

    let parent = config_path.parent().unwrap_or(Path::new("."));
    let scratch = tempfile::Builder::new()
        .prefix("config.")
        .suffix(".toml")
        .tempfile_in(parent)
        .context("Failed to create scratch config file")?;

    fs::copy(&config_path, scratch.path())
        .with_context(|| format!("Failed to copy config file: {}", config_path.display()))?;

    let editor = find_editor()?;
    let status = Command::new(&editor)
        .arg(scratch.path())
        .status()
        .with_context(|| format!("Failed to launch editor: {}", editor.display()))?;

    if !status.success() {
        anyhow::bail!("Editor exited with {}; configuration not updated", status);
    }

    let edited = fs::read_to_string(scratch.path()).context("Failed to read edited config")?;
    if let Err(e) = parse_config(&edited) {
        anyhow::bail!("Configuration not updated: {:#}", e);
    }

    scratch
        .persist(&config_path)
        .map_err(|e| anyhow::Error::new(e.error))
        .with_context(|| format!("Failed to save config file: {}", config_path.display()))?;

    println!("Configuration saved: {}", config_path.display());
    Ok(())
}
