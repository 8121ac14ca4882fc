//! Editor settings
//!
//! Stored as RON in `<config dir>/wld-forge/settings.ron`. A missing file
//! means defaults; a broken one is reported and defaults are used instead.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.ron";

/// Error type for settings I/O
#[derive(Debug)]
pub enum SettingsError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for SettingsError {
    fn from(e: ron::error::SpannedError) -> Self {
        SettingsError::ParseError(e)
    }
}

impl From<ron::Error> for SettingsError {
    fn from(e: ron::Error) -> Self {
        SettingsError::SerializeError(e)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::IoError(e) => write!(f, "IO error: {}", e),
            SettingsError::ParseError(e) => write!(f, "Parse error: {}", e),
            SettingsError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Floor height for regions created without one
    pub default_floor_height: i32,
    /// Ceiling height for regions created without one
    pub default_ceiling_height: i32,
    /// Package used for DMAP export when the map names none
    pub texture_package: Option<PathBuf>,
    /// Recompute depth and portals before every save
    pub assign_portals_on_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info,wld_forge=debug".to_string(),
            default_floor_height: 0,
            default_ceiling_height: 150,
            texture_package: None,
            assign_portals_on_save: true,
        }
    }
}

impl Settings {
    /// Default location of the settings file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wld-forge").join(SETTINGS_FILE))
    }

    /// Load settings from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    pub fn from_ron(contents: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(contents)?)
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                // Logging is not up yet when settings load
                eprintln!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings as pretty RON, creating the parent directory
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        let contents = ron::ser::to_string_pretty(self, config)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = Settings {
            texture_package: Some(PathBuf::from("fpg/walls.fpg")),
            default_ceiling_height: 256,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = Settings::from_ron("(default_floor_height: 32)").unwrap();
        assert_eq!(settings.default_floor_height, 32);
        assert_eq!(settings.default_ceiling_height, 150);
        assert!(settings.assign_portals_on_save);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid ron data (").unwrap();
        assert!(Settings::load(file.path()).is_err());
        assert_eq!(Settings::load_or_default(Some(file.path())), Settings::default());
        assert_eq!(Settings::load_or_default(None), Settings::default());
    }
}
