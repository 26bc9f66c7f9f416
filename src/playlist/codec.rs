// Playlist codec - turns variant files into canonical lists and back again
// Decoding is forgiving: anything we can't place in the library is dropped and reported

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::{CanonicalPlaylist, Format, FormatSyntax, OsProfile};

const BYTE_ORDER_MARK: char = '\u{feff}';
const ENVELOPE_HEADER: &str = "[playlist]";
const ENTRY_MARKER: &str = "File";
const ENTRY_COUNT_KEY: &str = "NumberOfEntries";

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^File(\d+)=(.*)$").expect("entry pattern is valid"))
}

/// Why an entry didn't make it into the canonical playlist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("malformed playlist entry")]
    MalformedEntry,
    #[error("does not have valid prefix '{prefix}'")]
    PrefixMismatch { prefix: String },
    #[error("points outside the library")]
    EscapesLibrary,
    #[error("does not exist in library")]
    MissingFromLibrary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// 1-based line number in the variant file
    pub line: usize,
    pub text: String,
    pub reason: SkipReason,
}

/// Result of decoding a variant file
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub playlist: CanonicalPlaylist,
    pub skipped: Vec<SkippedEntry>,
}

/// Recover the canonical path list from a variant file's contents.
///
/// Every surviving entry is relative to `library_root` and names a file that
/// exists there right now.
pub fn decode(input: &str, format: &Format, os: &OsProfile, library_root: &Path) -> Decoded {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let line = line.strip_prefix(BYTE_ORDER_MARK).unwrap_or(line);

        // Comments cover #EXTM3U / #EXTINF too
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let mut skip = |reason: SkipReason| {
            skipped.push(SkippedEntry {
                line: index + 1,
                text: line.to_string(),
                reason,
            });
        };

        let location = match format.syntax() {
            FormatSyntax::Simple => line,
            FormatSyntax::Enveloped => {
                if !line.starts_with(ENTRY_MARKER) {
                    // Header, Title/Length keys, NumberOfEntries, Version
                    continue;
                }
                match entry_pattern().captures(line).and_then(|caps| caps.get(2)) {
                    Some(path) => path.as_str(),
                    None => {
                        skip(SkipReason::MalformedEntry);
                        continue;
                    }
                }
            }
        };

        match to_library_path(location, os) {
            Ok(relative) => {
                if library_root.join(&relative).is_file() {
                    entries.push(relative);
                } else {
                    skip(SkipReason::MissingFromLibrary);
                }
            }
            Err(reason) => skip(reason),
        }
    }

    Decoded {
        playlist: CanonicalPlaylist::new(entries),
        skipped,
    }
}

/// Strip the OS prefix off an absolute player path and re-spell the rest with `/`
fn to_library_path(location: &str, os: &OsProfile) -> Result<String, SkipReason> {
    let style = os.style();
    let normalized = style.normalize(location);
    let mismatch = || SkipReason::PrefixMismatch {
        prefix: os.prefix().to_string(),
    };

    let rest = normalized.strip_prefix(os.prefix()).ok_or_else(mismatch)?;
    if !style.is_boundary(os.prefix(), rest) {
        return Err(mismatch());
    }

    let segments = style.segments(rest);
    if segments.contains(&"..") {
        return Err(SkipReason::EscapesLibrary);
    }

    Ok(segments.join("/"))
}

/// Render a canonical playlist as a variant file for one OS/format pair
pub fn encode(playlist: &CanonicalPlaylist, format: &Format, os: &OsProfile) -> String {
    let style = os.style();
    let mut out = String::new();

    if format.syntax() == FormatSyntax::Enveloped {
        out.push_str(ENVELOPE_HEADER);
        out.push('\n');
    }

    let mut count = 0;
    for entry in playlist.entries() {
        let location = style.normalize(&style.join(os.prefix(), entry));
        count += 1;

        match format.syntax() {
            FormatSyntax::Simple => out.push_str(&location),
            FormatSyntax::Enveloped => {
                out.push_str(&format!("{}{}={}", ENTRY_MARKER, count, location));
            }
        }
        out.push('\n');
    }

    if format.syntax() == FormatSyntax::Enveloped {
        out.push_str(&format!("{}={}\n", ENTRY_COUNT_KEY, count));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::PathStyle;
    use std::fs;
    use tempfile::TempDir;

    fn library_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }
        dir
    }

    fn linux() -> OsProfile {
        OsProfile::new("linux", PathStyle::Posix, "/media/music")
    }

    fn win() -> OsProfile {
        OsProfile::new("win", PathStyle::Windows, "C:\\Music")
    }

    fn playlist(entries: &[&str]) -> CanonicalPlaylist {
        CanonicalPlaylist::new(entries.iter().map(|e| e.to_string()).collect())
    }

    #[test]
    fn test_decode_strips_prefix() {
        let library = library_with(&["bar.mp3"]);
        let decoded = decode("/media/music/bar.mp3\n", &Format::new("m3u"), &linux(), library.path());

        assert_eq!(decoded.playlist.entries(), ["bar.mp3"]);
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_decode_rejects_foreign_prefix() {
        let library = library_with(&["bar.mp3"]);
        let other = OsProfile::new("other", PathStyle::Posix, "/other");
        let decoded = decode("/media/music/bar.mp3\n", &Format::new("m3u"), &other, library.path());

        assert!(decoded.playlist.is_empty());
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(
            decoded.skipped[0].reason,
            SkipReason::PrefixMismatch { prefix: "/other".to_string() }
        );
    }

    #[test]
    fn test_decode_prefix_must_end_on_segment() {
        let library = library_with(&["bar.mp3"]);
        let decoded = decode("/media/musical/bar.mp3\n", &Format::new("m3u"), &linux(), library.path());

        assert!(decoded.playlist.is_empty());
        assert!(matches!(decoded.skipped[0].reason, SkipReason::PrefixMismatch { .. }));
    }

    #[test]
    fn test_decode_checks_library() {
        let library = library_with(&[]);
        let format = Format::new("m3u");
        let input = "/media/music/bar.mp3\n";

        let decoded = decode(input, &format, &linux(), library.path());
        assert!(decoded.playlist.is_empty());
        assert_eq!(decoded.skipped[0].reason, SkipReason::MissingFromLibrary);
        assert_eq!(decoded.skipped[0].line, 1);

        fs::write(library.path().join("bar.mp3"), b"").unwrap();
        let decoded = decode(input, &format, &linux(), library.path());
        assert_eq!(decoded.playlist.entries(), ["bar.mp3"]);
    }

    #[test]
    fn test_decode_dotdot_cannot_leave_prefix() {
        let library = library_with(&["bar.mp3"]);
        let decoded = decode("/media/music/../bar.mp3\n", &Format::new("m3u"), &linux(), library.path());

        // Normalizes to /media/bar.mp3, which is no longer under the prefix
        assert!(decoded.playlist.is_empty());
        assert!(matches!(decoded.skipped[0].reason, SkipReason::PrefixMismatch { .. }));
    }

    #[test]
    fn test_decode_rejects_entries_outside_library() {
        let root = library_with(&["secret.mp3", "music/bar.mp3"]);
        let library = root.path().join("music");
        let relative = OsProfile::new("x", PathStyle::Posix, "..");

        let decoded = decode("../../secret.mp3\n", &Format::new("m3u"), &relative, &library);

        assert!(decoded.playlist.is_empty());
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].reason, SkipReason::EscapesLibrary);
    }

    #[test]
    fn test_decode_skips_comments_bom_and_crlf() {
        let library = library_with(&["a.mp3", "b.mp3"]);
        let input = "\u{feff}#EXTM3U\r\n#EXTINF:123,Some Artist - A\r\n/media/music/a.mp3\r\n\r\n/media/music/b.mp3\r\n";
        let decoded = decode(input, &Format::new("m3u"), &linux(), library.path());

        assert_eq!(decoded.playlist.entries(), ["a.mp3", "b.mp3"]);
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_decode_comment_only_input_is_empty() {
        let library = library_with(&[]);
        let decoded = decode("#EXTM3U\n# nothing here\n", &Format::new("m3u"), &linux(), library.path());

        assert!(decoded.playlist.is_empty());
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_decode_preserves_whitespace() {
        let library = library_with(&["foo bar.mp3", "Some Band/ spaced .mp3"]);
        let input = "/media/music/foo bar.mp3\n/media/music/Some Band/ spaced .mp3\n";
        let decoded = decode(input, &Format::new("m3u"), &linux(), library.path());

        assert_eq!(decoded.playlist.entries(), ["foo bar.mp3", "Some Band/ spaced .mp3"]);
    }

    #[test]
    fn test_decode_enveloped() {
        let library = library_with(&["a.mp3", "Rock/b.mp3"]);
        let input = "[playlist]\nFile1=/media/music/a.mp3\nTitle1=A\nFile2=/media/music/Rock/b.mp3\nFileX=/media/music/a.mp3\nNumberOfEntries=2\nVersion=2\n";
        let decoded = decode(input, &Format::new("pls"), &linux(), library.path());

        assert_eq!(decoded.playlist.entries(), ["a.mp3", "Rock/b.mp3"]);
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].reason, SkipReason::MalformedEntry);
        assert_eq!(decoded.skipped[0].line, 5);
    }

    #[test]
    fn test_decode_windows_paths() {
        let library = library_with(&["Rock/b.mp3"]);
        let decoded = decode(
            "C:\\Music\\Rock\\b.mp3\nD:\\Music\\Rock\\b.mp3\n",
            &Format::new("m3u"),
            &win(),
            library.path(),
        );

        assert_eq!(decoded.playlist.entries(), ["Rock/b.mp3"]);
        assert_eq!(decoded.skipped.len(), 1);
    }

    #[test]
    fn test_encode_enveloped() {
        let encoded = encode(&playlist(&["bar.mp3"]), &Format::new("pls"), &linux());
        assert_eq!(encoded, "[playlist]\nFile1=/media/music/bar.mp3\nNumberOfEntries=1\n");
    }

    #[test]
    fn test_encode_simple_and_windows() {
        let entries = playlist(&["a.mp3", "Rock/foo bar.mp3"]);

        let encoded = encode(&entries, &Format::new("m3u"), &linux());
        assert_eq!(encoded, "/media/music/a.mp3\n/media/music/Rock/foo bar.mp3\n");

        let encoded = encode(&entries, &Format::new("m3u"), &win());
        assert_eq!(encoded, "C:\\Music\\a.mp3\nC:\\Music\\Rock\\foo bar.mp3\n");
    }

    #[test]
    fn test_encode_empty() {
        let empty = CanonicalPlaylist::default();
        assert_eq!(encode(&empty, &Format::new("pls"), &linux()), "[playlist]\nNumberOfEntries=0\n");
        assert_eq!(encode(&empty, &Format::new("m3u"), &linux()), "");
    }

    #[test]
    fn test_round_trip() {
        let library = library_with(&["a.mp3", "Rock/foo bar.mp3", "Jazz/Live/c d.flac"]);
        let original = playlist(&["Rock/foo bar.mp3", "a.mp3", "Jazz/Live/c d.flac", "a.mp3"]);

        for os in [linux(), win()] {
            for format in [Format::new("m3u"), Format::new("pls")] {
                let encoded = encode(&original, &format, &os);
                let decoded = decode(&encoded, &format, &os, library.path());
                assert_eq!(decoded.playlist, original, "{} {}", os.name(), format.name());
                assert!(decoded.skipped.is_empty());
            }
        }
    }
}
