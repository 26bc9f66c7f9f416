// Playlist model - canonical path lists plus the OS/format pairs they get exported to

pub mod codec;
pub mod path_style;

pub use codec::{Decoded, SkipReason, SkippedEntry};
pub use path_style::PathStyle;

/// How a playlist format wraps its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSyntax {
    /// One path per line (M3U and friends)
    Simple,
    /// `[playlist]` header, numbered `FileN=` entries and an entry count (PLS)
    Enveloped,
}

impl FormatSyntax {
    pub fn for_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("pls") {
            FormatSyntax::Enveloped
        } else {
            FormatSyntax::Simple
        }
    }
}

/// A playlist format; its name doubles as the file extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    name: String,
    syntax: FormatSyntax,
}

impl Format {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let syntax = FormatSyntax::for_extension(&name);
        Self { name, syntax }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.name
    }

    pub fn syntax(&self) -> FormatSyntax {
        self.syntax
    }
}

/// Where a particular OS keeps the music library, and how it spells paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsProfile {
    name: String,
    style: PathStyle,
    prefix: String,
}

impl OsProfile {
    /// The prefix is normalized up front so encoded entries always start with it
    pub fn new(name: impl Into<String>, style: PathStyle, prefix: &str) -> Self {
        Self {
            name: name.into(),
            style,
            prefix: style.normalize(prefix),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// The source of truth for one playlist: library-relative paths using `/`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPlaylist {
    entries: Vec<String>,
}

impl CanonicalPlaylist {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Parse the on-disk form (one path per line)
    pub fn from_text(text: &str) -> Self {
        let entries = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(entry);
            text.push('\n');
        }
        text
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
