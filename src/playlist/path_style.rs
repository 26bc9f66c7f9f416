// Path conventions for the operating systems a playlist gets exported to
// Variant files hold absolute player paths, the canonical copy holds library-relative ones

use serde::{Deserialize, Serialize};

/// How an operating system spells its paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Forward slashes, single root (Linux, Android, macOS)
    #[serde(alias = "nix")]
    Posix,
    /// Backslashes, optional drive letter or UNC share
    #[serde(alias = "win")]
    Windows,
}

impl PathStyle {
    pub fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '\\' || c == '/',
        }
    }

    /// Glue a library-relative path onto an OS prefix
    pub fn join(self, prefix: &str, relative: &str) -> String {
        match prefix.chars().last() {
            None => relative.to_string(),
            Some(last) if self.is_separator(last) => format!("{}{}", prefix, relative),
            Some(_) => format!("{}{}{}", prefix, self.separator(), relative),
        }
    }

    /// Collapse separators, `.` and `..` the way the target OS would
    pub fn normalize(self, path: &str) -> String {
        match self {
            PathStyle::Posix => normalize_posix(path),
            PathStyle::Windows => normalize_windows(path),
        }
    }

    /// Split the part of an entry that follows the prefix into path segments
    pub fn segments(self, text: &str) -> Vec<&str> {
        text.split(|c| self.is_separator(c))
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect()
    }

    /// True when `prefix` ends exactly on a segment boundary of `rest`
    pub fn is_boundary(self, prefix: &str, rest: &str) -> bool {
        rest.is_empty()
            || rest.starts_with(|c| self.is_separator(c))
            || prefix.ends_with(|c| self.is_separator(c))
    }
}

/// Resolve `.`/`..` segments; `..` never climbs above an absolute root
fn collapse<'a>(segments: impl Iterator<Item = &'a str>, rooted: bool) -> Vec<&'a str> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts
}

fn normalize_posix(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    // POSIX leaves the meaning of exactly two leading slashes to the implementation
    let leading = if path.starts_with("//") && !path.starts_with("///") {
        2
    } else if path.starts_with('/') {
        1
    } else {
        0
    };

    let parts = collapse(path.split('/'), leading > 0);
    let normalized = format!("{}{}", "/".repeat(leading), parts.join("/"));

    if normalized.is_empty() {
        ".".to_string()
    } else {
        normalized
    }
}

fn normalize_windows(path: &str) -> String {
    let path = path.replace('/', "\\");
    let (head, rest) = split_drive(&path);

    let rooted = rest.starts_with('\\');
    let parts = collapse(rest.split('\\'), rooted);

    let mut normalized = String::from(head);
    if rooted {
        normalized.push('\\');
    }
    normalized.push_str(&parts.join("\\"));

    if normalized.is_empty() {
        ".".to_string()
    } else {
        normalized
    }
}

/// Split `C:` or `\\server\share` off the front of a backslash-only path
fn split_drive(path: &str) -> (&str, &str) {
    if let Some(unc) = path.strip_prefix("\\\\") {
        if unc.starts_with('\\') {
            return ("", path);
        }
        if let Some(server_end) = unc.find('\\') {
            let share = &unc[server_end + 1..];
            if !share.is_empty() && !share.starts_with('\\') {
                let share_end = share.find('\\').unwrap_or(share.len());
                return path.split_at(2 + server_end + 1 + share_end);
            }
        }
        return ("", path);
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return path.split_at(2);
    }

    ("", path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_normalize() {
        let style = PathStyle::Posix;
        assert_eq!(style.normalize("/media/music/bar.mp3"), "/media/music/bar.mp3");
        assert_eq!(style.normalize("/media//music/./bar.mp3"), "/media/music/bar.mp3");
        assert_eq!(style.normalize("/media/music/../other/bar.mp3"), "/media/other/bar.mp3");
        assert_eq!(style.normalize("/../bar.mp3"), "/bar.mp3");
        assert_eq!(style.normalize("../bar.mp3"), "../bar.mp3");
        assert_eq!(style.normalize("/media/music/"), "/media/music");
        assert_eq!(style.normalize("//share/x"), "//share/x");
        assert_eq!(style.normalize("///x"), "/x");
        assert_eq!(style.normalize(""), ".");
        assert_eq!(style.normalize("a/.."), ".");
    }

    #[test]
    fn test_windows_normalize() {
        let style = PathStyle::Windows;
        assert_eq!(style.normalize("C:\\Music\\bar.mp3"), "C:\\Music\\bar.mp3");
        assert_eq!(style.normalize("C:\\Music/Rock/bar.mp3"), "C:\\Music\\Rock\\bar.mp3");
        assert_eq!(style.normalize("C:\\Music\\\\.\\bar.mp3"), "C:\\Music\\bar.mp3");
        assert_eq!(style.normalize("C:\\Music\\..\\..\\bar.mp3"), "C:\\bar.mp3");
        assert_eq!(style.normalize("C:\\"), "C:\\");
        assert_eq!(style.normalize("\\\\nas\\music\\a\\..\\b.mp3"), "\\\\nas\\music\\b.mp3");
        assert_eq!(style.normalize("Music\\..\\..\\x"), "..\\x");
    }

    #[test]
    fn test_join() {
        assert_eq!(PathStyle::Posix.join("/media/music", "bar.mp3"), "/media/music/bar.mp3");
        assert_eq!(PathStyle::Posix.join("/", "bar.mp3"), "/bar.mp3");
        assert_eq!(PathStyle::Posix.join("", "bar.mp3"), "bar.mp3");
        assert_eq!(PathStyle::Windows.join("C:\\Music", "a/b.mp3"), "C:\\Music\\a/b.mp3");
        assert_eq!(PathStyle::Windows.join("C:\\", "b.mp3"), "C:\\b.mp3");
    }

    #[test]
    fn test_segments_and_boundary() {
        assert_eq!(PathStyle::Posix.segments("/Rock//a b/./c.mp3"), vec!["Rock", "a b", "c.mp3"]);
        assert_eq!(PathStyle::Windows.segments("\\Rock\\c.mp3"), vec!["Rock", "c.mp3"]);
        assert_eq!(PathStyle::Posix.segments("x\\y.mp3"), vec!["x\\y.mp3"]);

        assert!(PathStyle::Posix.is_boundary("/media/music", "/bar.mp3"));
        assert!(PathStyle::Posix.is_boundary("/", "bar.mp3"));
        assert!(!PathStyle::Posix.is_boundary("/media/music", "al/bar.mp3"));
        assert!(PathStyle::Windows.is_boundary("C:\\Music", "\\bar.mp3"));
    }

    #[test]
    fn test_style_names_from_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            style: PathStyle,
        }

        let parsed: Wrapper = toml::from_str("style = \"nix\"").unwrap();
        assert_eq!(parsed.style, PathStyle::Posix);
        let parsed: Wrapper = toml::from_str("style = \"windows\"").unwrap();
        assert_eq!(parsed.style, PathStyle::Windows);
        let parsed: Wrapper = toml::from_str("style = \"win\"").unwrap();
        assert_eq!(parsed.style, PathStyle::Windows);
    }
}
