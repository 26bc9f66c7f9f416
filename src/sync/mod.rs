// Playlist synchronizer - the newest variant wins, then every variant is rebuilt from it
// A pass: scan every {os}_{format} directory, pull stale playlists into local/, push back out

pub mod files;
pub mod layout;

pub use layout::{FormatLayout, Target, CANONICAL_DIR};

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::playlist::{codec, CanonicalPlaylist, Decoded};

/// What a single pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub scanned: usize,
    pub updated: usize,
    pub up_to_date: usize,
    pub skipped_files: usize,
    pub failed: usize,
    pub dropped_entries: usize,
    /// Playlists pushed out from local/ because their variants had drifted
    pub refreshed: usize,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} playlists scanned: {} updated, {} up to date, {} failed, {} refreshed from {} ({} files ignored, {} entries dropped)",
            self.scanned,
            self.updated,
            self.up_to_date,
            self.failed,
            self.refreshed,
            CANONICAL_DIR,
            self.skipped_files,
            self.dropped_entries
        )
    }
}

pub struct Synchronizer {
    layout: FormatLayout,
    library_root: PathBuf,
}

impl Synchronizer {
    pub fn new(root: impl Into<PathBuf>, config: &Config) -> Self {
        let root = root.into();
        let library_root = config.library_root(&root);
        Self {
            layout: FormatLayout::new(root, config),
            library_root,
        }
    }

    pub fn layout(&self) -> &FormatLayout {
        &self.layout
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    pub fn ensure_layout(&self) -> Result<()> {
        self.layout.ensure_layout()
    }

    /// One full pass over every variant directory, then over local/.
    ///
    /// Per-playlist failures are logged and counted; only a directory that
    /// can't be opened at all aborts the pass.
    pub fn scan_and_update(&self) -> Result<PassReport> {
        let mut report = PassReport::default();

        for target in self.layout.targets() {
            let dir = self.layout.target_dir(target);

            for file_name in list_files(&dir, &mut report)? {
                let Some(name) = target.playlist_name(&file_name) else {
                    debug!(
                        "Found file {} with wrong extension in {}, should be .{}",
                        file_name,
                        target.dir_name(),
                        target.format.extension()
                    );
                    report.skipped_files += 1;
                    continue;
                };

                report.scanned += 1;

                let stale = match self.needs_update(target, &file_name) {
                    Ok(stale) => stale,
                    Err(e) => {
                        error!("Failed to check playlist '{}': {:#}", name, e);
                        report.failed += 1;
                        continue;
                    }
                };

                if !stale {
                    report.up_to_date += 1;
                    continue;
                }

                match self.update_playlist(target, &file_name) {
                    Ok(decoded) => {
                        report.updated += 1;
                        report.dropped_entries += decoded.skipped.len();
                    }
                    Err(e) => {
                        error!("Failed to update playlist '{}': {:#}", name, e);
                        report.failed += 1;
                    }
                }
            }
        }

        // Canonical copies edited or added by hand still have to reach every variant
        for name in list_files(&self.layout.canonical_dir(), &mut report)? {
            if name.starts_with('.') {
                continue;
            }

            let outdated = match self.variants_out_of_date(&name) {
                Ok(outdated) => outdated,
                Err(e) => {
                    error!("Failed to check variants of playlist '{}': {:#}", name, e);
                    report.failed += 1;
                    continue;
                }
            };

            if !outdated {
                continue;
            }

            info!("Refreshing variants of playlist {} from {}", name, CANONICAL_DIR);
            match self.refresh_all_variants(&name) {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    error!("Failed to refresh playlist '{}': {:#}", name, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// True when the variant is strictly newer than the canonical copy, or there is no canonical copy yet
    pub fn needs_update(&self, target: &Target, file_name: &str) -> Result<bool> {
        let name = self.playlist_name(target, file_name)?;
        let canonical = self.layout.canonical_path(name);
        if !canonical.is_file() {
            return Ok(true);
        }

        let variant = files::modified_time(&self.layout.target_dir(target).join(file_name))?;
        let canonical = files::modified_time(&canonical)?;
        Ok(variant > canonical)
    }

    /// Decode a variant file into local/, then regenerate every variant from it
    pub fn update_playlist(&self, target: &Target, file_name: &str) -> Result<Decoded> {
        let name = self.playlist_name(target, file_name)?;
        info!("Updating playlist {} from {}", name, target.dir_name());

        let source = self.layout.target_dir(target).join(file_name);
        let bytes = fs::read(&source).with_context(|| format!("Failed to read {}", source.display()))?;
        let text = String::from_utf8_lossy(&bytes);

        let decoded = codec::decode(&text, &target.format, &target.os, &self.library_root);
        for skipped in &decoded.skipped {
            warn!(
                "Skipping entry '{}' ({}:{}): {}",
                skipped.text,
                source.display(),
                skipped.line,
                skipped.reason
            );
        }
        debug!("Playlist {} has {} entries after decoding", name, decoded.playlist.len());

        files::write_atomically(&self.layout.canonical_path(name), decoded.playlist.to_text().as_bytes())?;
        self.refresh_all_variants(name)?;

        Ok(decoded)
    }

    /// Rewrite every OS/format variant from the canonical copy, then make the canonical copy the newest file
    pub fn refresh_all_variants(&self, name: &str) -> Result<()> {
        let canonical_path = self.layout.canonical_path(name);
        let text = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read {}", canonical_path.display()))?;
        let playlist = CanonicalPlaylist::from_text(&text);

        debug!("Converting all variants for playlist {}", name);
        let mut newest = SystemTime::UNIX_EPOCH;
        for target in self.layout.targets() {
            let path = self.layout.variant_path(target, name);
            let rendered = codec::encode(&playlist, &target.format, &target.os);
            files::write_atomically(&path, rendered.as_bytes())?;
            newest = newest.max(files::modified_time(&path)?);
        }

        // Variants were just written after the canonical copy; don't let them look newer
        files::set_modified_time(&canonical_path, SystemTime::now().max(newest))?;
        Ok(())
    }

    /// True when some variant is missing or no longer matches what the canonical copy encodes to
    pub fn variants_out_of_date(&self, name: &str) -> Result<bool> {
        let canonical_path = self.layout.canonical_path(name);
        let text = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read {}", canonical_path.display()))?;
        let playlist = CanonicalPlaylist::from_text(&text);

        for target in self.layout.targets() {
            let path = self.layout.variant_path(target, name);
            let current = match fs::read(&path) {
                Ok(current) => current,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
                Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
            };

            if current != codec::encode(&playlist, &target.format, &target.os).as_bytes() {
                debug!("{} differs from {}/{}", path.display(), CANONICAL_DIR, name);
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn playlist_name<'a>(&self, target: &Target, file_name: &'a str) -> Result<&'a str> {
        target.playlist_name(file_name).ok_or_else(|| {
            anyhow!(
                "{} is not a .{} playlist",
                file_name,
                target.format.extension()
            )
        })
    }
}

/// UTF-8 names of the regular files directly inside `dir`, sorted.
///
/// Only failing to open `dir` itself is an error; an entry that can't be
/// inspected (dangling symlink, permissions) is logged and counted as skipped.
fn list_files(dir: &Path, report: &mut PassReport) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
            }
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                report.skipped_files += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => {
                warn!("Skipping file with non UTF-8 name in {}: {:?}", dir.display(), entry.file_name());
                report.skipped_files += 1;
            }
        }
    }

    Ok(names)
}
