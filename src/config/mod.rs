// Configuration management for ensemble
// One TOML file per playlist root describing the OSes, formats and where the library lives

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::playlist::{Format, OsProfile, PathStyle};

pub const CONFIG_FILE_NAME: &str = "ensemble.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Local music library; relative paths are resolved against the playlist root
    pub library: PathBuf,
    /// Playlist formats, each named after its file extension
    pub formats: Vec<String>,
    /// Operating systems keyed by identifier
    pub os: BTreeMap<String, OsConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OsConfig {
    pub style: PathStyle,
    /// Where this OS sees the library, e.g. `/media/music` or `C:\Music`
    pub prefix: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config defines no operating systems")]
    NoOperatingSystems,

    #[error("config defines no playlist formats")]
    NoFormats,

    #[error("invalid {kind} identifier '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("format '{0}' is listed more than once")]
    DuplicateFormat(String),

    #[error("operating system '{0}' has an empty path prefix")]
    EmptyPrefix(String),

    #[error("operating system '{0}' has a path prefix that climbs above its root")]
    PrefixEscapes(String),
}

impl Default for Config {
    fn default() -> Self {
        let mut os = BTreeMap::new();
        os.insert(
            "android".to_string(),
            OsConfig {
                style: PathStyle::Posix,
                prefix: "/storage/emulated/0/Music".to_string(),
            },
        );
        os.insert(
            "linux".to_string(),
            OsConfig {
                style: PathStyle::Posix,
                prefix: "/media/music".to_string(),
            },
        );
        os.insert(
            "win".to_string(),
            OsConfig {
                style: PathStyle::Windows,
                prefix: "C:\\Music".to_string(),
            },
        );

        Self {
            library: PathBuf::from("music"),
            formats: vec!["m3u".to_string(), "pls".to_string()],
            os,
        }
    }
}

impl Config {
    /// Load and validate the config; nothing on disk is touched when this fails
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.os.is_empty() {
            return Err(ConfigError::NoOperatingSystems);
        }
        if self.formats.is_empty() {
            return Err(ConfigError::NoFormats);
        }

        for (name, os) in &self.os {
            check_identifier("operating system", name)?;
            // `{os}_{format}` has to split back into exactly one pair
            if name.contains('_') {
                return Err(ConfigError::InvalidIdentifier {
                    kind: "operating system",
                    name: name.clone(),
                });
            }
            if os.prefix.trim().is_empty() {
                return Err(ConfigError::EmptyPrefix(name.clone()));
            }

            let profile = OsProfile::new(name.clone(), os.style, &os.prefix);
            if os.style.segments(profile.prefix()).contains(&"..") {
                return Err(ConfigError::PrefixEscapes(name.clone()));
            }
        }

        for (index, format) in self.formats.iter().enumerate() {
            check_identifier("format", format)?;
            if self.formats[..index].contains(format) {
                return Err(ConfigError::DuplicateFormat(format.clone()));
            }
        }

        Ok(())
    }

    /// Write the config out, refusing to clobber an existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(anyhow::anyhow!("{} already exists", path.display()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// OS profiles in identifier order
    pub fn profiles(&self) -> Vec<OsProfile> {
        self.os
            .iter()
            .map(|(name, os)| OsProfile::new(name.clone(), os.style, &os.prefix))
            .collect()
    }

    pub fn formats(&self) -> Vec<Format> {
        self.formats.iter().map(Format::new).collect()
    }

    pub fn library_root(&self, root: &Path) -> PathBuf {
        if self.library.is_absolute() {
            self.library.clone()
        } else {
            root.join(&self.library)
        }
    }
}

/// Identifiers end up in directory and file names, so keep them to one plain segment
fn check_identifier(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.' || c.is_whitespace() || c.is_control());

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}
