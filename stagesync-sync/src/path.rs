//! POSIX remote paths.
//!
//! Remote paths are plain `/`-separated strings and never go through
//! `std::path`, so the host OS separator can't leak into them. The one
//! crossing point is [`RemotePosixPath::join_relative`], which re-roots a
//! local relative path component by component.

use std::fmt;
use std::path::{Component, Path};

/// Trim whitespace and strip exactly one trailing `/`.
///
/// The bare root `/` is kept as is so an absolute base never turns relative.
pub fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "/" {
        return trimmed.to_string();
    }
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// POSIX join. An empty base yields `segment` unchanged.
pub fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        return segment.to_string();
    }
    let segment = segment.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{base}{segment}")
    } else {
        format!("{base}/{segment}")
    }
}

/// A `/`-separated remote path, absolute or relative to the session's
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePosixPath(String);

impl RemotePosixPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// A normalized remote base directory.
    pub fn base(raw: &str) -> Self {
        Self(normalize_base(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    pub fn join(&self, segment: &str) -> Self {
        Self(join(&self.0, segment))
    }

    /// Re-root a local relative path under `self`, one component at a time.
    ///
    /// `.` components are dropped; anything else non-normal is rendered
    /// lossily as a plain segment.
    pub fn join_relative(&self, rel: &Path) -> Self {
        let mut out = self.clone();
        for component in rel.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(name) => out = out.join(&name.to_string_lossy()),
                other => out = out.join(&other.as_os_str().to_string_lossy()),
            }
        }
        out
    }

    /// Parent directory, or `None` for a single relative segment and for `/`.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            None => None,
            Some(0) if trimmed.len() > 1 => Some(Self("/".to_string())),
            Some(0) => None,
            Some(i) => Some(Self(trimmed[..i].to_string())),
        }
    }

    /// Final segment.
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Display for RemotePosixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RemotePosixPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RemotePosixPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RemotePosixPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest]
    #[case("/var/www", "app", "/var/www/app")]
    #[case("", "app", "app")]
    #[case("var/www", "app", "var/www/app")]
    #[case("/", "app", "/app")]
    #[case("/var/www", "/app", "/var/www/app")]
    fn join_cases(#[case] base: &str, #[case] segment: &str, #[case] expected: &str) {
        assert_eq!(join(base, segment), expected);
    }

    #[rstest]
    #[case("/var/www/", "/var/www")]
    #[case("  /var/www/html/msclogs/ \n", "/var/www/html/msclogs")]
    #[case("var/www", "var/www")]
    #[case("/var/www//", "/var/www/")]
    #[case("", "")]
    #[case("/", "/")]
    fn normalize_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_base(raw), expected);
    }

    #[test]
    fn normalizing_first_makes_trailing_slash_irrelevant() {
        assert_eq!(
            join(&normalize_base("/var/www/"), "app"),
            join(&normalize_base("/var/www"), "app")
        );
    }

    #[test]
    fn join_relative_uses_posix_separators() {
        let base = RemotePosixPath::new("/srv/app");
        let rel: PathBuf = ["js", "viewer", "main.js"].iter().collect();
        assert_eq!(base.join_relative(&rel).as_str(), "/srv/app/js/viewer/main.js");
        assert_eq!(
            base.join_relative(Path::new("./a.txt")).as_str(),
            "/srv/app/a.txt"
        );
    }

    #[rstest]
    #[case("/a/b/c", Some("/a/b"))]
    #[case("/a", Some("/"))]
    #[case("/", None)]
    #[case("a/b", Some("a"))]
    #[case("a", None)]
    fn parent_cases(#[case] path: &str, #[case] expected: Option<&str>) {
        let parent = RemotePosixPath::new(path).parent();
        assert_eq!(parent.as_ref().map(|p| p.as_str()), expected);
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(RemotePosixPath::new("/a/b.txt").file_name(), Some("b.txt"));
        assert_eq!(RemotePosixPath::new("/").file_name(), None);
    }
}
