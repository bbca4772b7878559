//! Console configuration for serterm.
//!
//! This module provides:
//! - The option sets shown to the user (data mode, display mode, line ending)
//! - TOML configuration file loading from `~/.serterm/config.toml`
//!
//! # Configuration File
//!
//! ```toml
//! # Indices into the option lists below
//! data_mode = 0      # 0 = UTF8, 1 = Hexadecimal
//! display_mode = 0   # 0 = Plain Text, 1 = Hexadecimal
//! line_ending = 3    # 0 = None, 1 = New Line, 2 = Carriage Return, 3 = both
//!
//! echo = true
//! autoscroll = true
//! show_timestamp = false
//! vt100_enabled = true
//!
//! [history]
//! limit = 100
//!
//! [timestamp]
//! format = "%H:%M:%S%.3f"
//! ```
//!
//! Enumerated options are stored as their index into the lists returned by
//! [`data_modes`], [`display_modes`] and [`line_endings`], so a UI can populate
//! a combo box and persist the selected row directly.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of remembered commands unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default `strftime` pattern for line timestamps
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config path")]
    NoHomeDir,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// An index that does not name any entry of an option list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidIndex(pub usize);

impl fmt::Display for InvalidIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option index {} out of range", self.0)
    }
}

/// Interpretation applied to received bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum DataMode {
    #[default]
    Utf8,
    Hex,
}

/// Rendering requested by the UI for already decoded content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum DisplayMode {
    #[default]
    PlainText,
    Hex,
}

/// Terminator appended to every outgoing command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum LineEnding {
    #[default]
    None,
    NewLine,
    CarriageReturn,
    Both,
}

impl LineEnding {
    /// Bytes appended after the command payload
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::None => b"",
            LineEnding::NewLine => b"\n",
            LineEnding::CarriageReturn => b"\r",
            LineEnding::Both => b"\r\n",
        }
    }
}

/// Implements the index <-> variant mapping used for persisted preferences.
macro_rules! option_list {
    ($ty:ident, $labels:ident, [$($variant:ident => $label:literal),+ $(,)?]) => {
        const $labels: &[&str] = &[$($label),+];

        impl $ty {
            const VARIANTS: &'static [$ty] = &[$($ty::$variant),+];

            /// Position of this option in its option list
            pub fn index(self) -> usize {
                Self::VARIANTS
                    .iter()
                    .position(|v| *v == self)
                    .unwrap_or(0)
            }

            /// Option at `index` in the option list
            pub fn from_index(index: usize) -> Option<Self> {
                Self::VARIANTS.get(index).copied()
            }

            /// User-facing label
            pub fn label(self) -> &'static str {
                $labels[self.index()]
            }
        }

        impl TryFrom<usize> for $ty {
            type Error = InvalidIndex;

            fn try_from(index: usize) -> std::result::Result<Self, InvalidIndex> {
                Self::from_index(index).ok_or(InvalidIndex(index))
            }
        }

        impl From<$ty> for usize {
            fn from(value: $ty) -> usize {
                value.index()
            }
        }
    };
}

option_list!(DataMode, DATA_MODE_LABELS, [
    Utf8 => "UTF8",
    Hex => "Hexadecimal",
]);

option_list!(DisplayMode, DISPLAY_MODE_LABELS, [
    PlainText => "Plain Text",
    Hex => "Hexadecimal",
]);

option_list!(LineEnding, LINE_ENDING_LABELS, [
    None => "None",
    NewLine => "New Line",
    CarriageReturn => "Carriage Return",
    Both => "New Line & Carriage Return",
]);

/// Data mode labels, in persisted index order
pub fn data_modes() -> &'static [&'static str] {
    DATA_MODE_LABELS
}

/// Display mode labels, in persisted index order
pub fn display_modes() -> &'static [&'static str] {
    DISPLAY_MODE_LABELS
}

/// Line ending labels, in persisted index order
pub fn line_endings() -> &'static [&'static str] {
    LINE_ENDING_LABELS
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How received bytes are decoded
    pub data_mode: DataMode,
    /// How the UI should render decoded content
    pub display_mode: DisplayMode,
    /// Terminator appended to sent commands
    pub line_ending: LineEnding,
    /// Show sent data as if it was received
    pub echo: bool,
    /// Keep the view pinned to the newest line
    pub autoscroll: bool,
    /// Prefix each line with its capture time
    pub show_timestamp: bool,
    /// Interpret VT100 control sequences
    pub vt100_enabled: bool,
    /// Command history settings
    pub history: HistoryConfig,
    /// Timestamp settings
    pub timestamp: TimestampConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_mode: DataMode::Utf8,
            display_mode: DisplayMode::PlainText,
            line_ending: LineEnding::None,
            echo: false,
            autoscroll: true,
            show_timestamp: false,
            vt100_enabled: false,
            history: HistoryConfig::default(),
            timestamp: TimestampConfig::default(),
        }
    }
}

/// Command history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Timestamp configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    pub format: String, // chrono strftime pattern
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.serterm/config.toml`, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to `~/.serterm/config.toml`
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(ConfigError::NoHomeDir)?;
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.serterm`, created on first use
pub fn data_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".serterm");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_lists() {
        assert_eq!(data_modes(), &["UTF8", "Hexadecimal"]);
        assert_eq!(display_modes(), &["Plain Text", "Hexadecimal"]);
        assert_eq!(
            line_endings(),
            &["None", "New Line", "Carriage Return", "New Line & Carriage Return"]
        );
    }

    #[test]
    fn test_index_mapping() {
        assert_eq!(LineEnding::Both.index(), 3);
        assert_eq!(LineEnding::from_index(2), Some(LineEnding::CarriageReturn));
        assert_eq!(LineEnding::from_index(4), None);
        assert_eq!(DataMode::Hex.label(), "Hexadecimal");
        assert_eq!(DisplayMode::try_from(7usize), Err(InvalidIndex(7)));
    }

    #[test]
    fn test_line_ending_bytes() {
        assert_eq!(LineEnding::None.as_bytes(), b"");
        assert_eq!(LineEnding::NewLine.as_bytes(), b"\n");
        assert_eq!(LineEnding::CarriageReturn.as_bytes(), b"\r");
        assert_eq!(LineEnding::Both.as_bytes(), b"\r\n");
    }

    #[test]
    fn test_parse_indices() {
        let config: Config = toml::from_str(
            "data_mode = 1\nline_ending = 3\necho = true\n[history]\nlimit = 5\n",
        )
        .unwrap();

        assert_eq!(config.data_mode, DataMode::Hex);
        assert_eq!(config.display_mode, DisplayMode::PlainText);
        assert_eq!(config.line_ending, LineEnding::Both);
        assert!(config.echo);
        assert!(config.autoscroll);
        assert_eq!(config.history.limit, 5);
        assert_eq!(config.timestamp.format, DEFAULT_TIMESTAMP_FORMAT);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        assert!(toml::from_str::<Config>("line_ending = 9\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            display_mode: DisplayMode::Hex,
            line_ending: LineEnding::NewLine,
            show_timestamp: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("line_ending = 1"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
