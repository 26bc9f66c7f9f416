// Directory layout under the playlist root:
//   local/             canonical playlists, no extension
//   {os}_{format}/     one directory per OS/format pair

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::playlist::{Format, OsProfile};

pub const CANONICAL_DIR: &str = "local";

/// One OS/format pair and the directory its variant files live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub os: OsProfile,
    pub format: Format,
}

impl Target {
    pub fn new(os: OsProfile, format: Format) -> Self {
        Self { os, format }
    }

    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.os.name(), self.format.name())
    }

    pub fn file_name(&self, playlist: &str) -> String {
        format!("{}.{}", playlist, self.format.extension())
    }

    /// Playlist name for a file in this target's directory, if the extension belongs here
    pub fn playlist_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let (name, extension) = file_name.rsplit_once('.')?;
        if name.is_empty() || extension != self.format.extension() {
            return None;
        }
        Some(name)
    }
}

#[derive(Debug, Clone)]
pub struct FormatLayout {
    root: PathBuf,
    targets: Vec<Target>,
}

impl FormatLayout {
    pub fn new(root: impl Into<PathBuf>, config: &Config) -> Self {
        let formats = config.formats();
        let targets = config
            .profiles()
            .into_iter()
            .flat_map(|os| {
                formats
                    .iter()
                    .map(move |format| Target::new(os.clone(), format.clone()))
            })
            .collect();

        Self {
            root: root.into(),
            targets,
        }
    }

    /// Create the canonical directory and every target directory that's missing
    pub fn ensure_layout(&self) -> Result<()> {
        create_if_missing(&self.canonical_dir())?;

        for target in &self.targets {
            debug!("Playlist format discovered: {}", target.dir_name());
            create_if_missing(&self.target_dir(target))?;
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn canonical_dir(&self) -> PathBuf {
        self.root.join(CANONICAL_DIR)
    }

    pub fn target_dir(&self, target: &Target) -> PathBuf {
        self.root.join(target.dir_name())
    }

    pub fn canonical_path(&self, playlist: &str) -> PathBuf {
        self.canonical_dir().join(playlist)
    }

    pub fn variant_path(&self, target: &Target, playlist: &str) -> PathBuf {
        self.target_dir(target).join(target.file_name(playlist))
    }
}

fn create_if_missing(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    info!("Created directory {}", dir.display());
    Ok(())
}
