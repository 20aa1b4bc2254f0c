//! Destination path normalization.
//!
//! Manifest paths are written by hand and mix `/` and `\` freely. They are
//! reduced to their non-empty segments and rejoined with `/`, which also
//! drops any leading or trailing separators.

use std::fmt;
use std::path::{Path, PathBuf};

/// Separators recognised in manifest destination paths.
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Suffix appended to a destination while its body is being written.
const TEMP_SUFFIX: &str = ".bak";

/// A destination path reduced to its non-empty segments.
///
/// Always holds at least one segment; construct via [`DestinationPath::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    segments: Vec<String>,
}

impl DestinationPath {
    /// Splits `raw` on runs of `/` and `\` and keeps the non-empty segments.
    ///
    /// Returns `None` when nothing but separators (or nothing at all) is left.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let segments: Vec<String> = raw
            .split(SEPARATORS)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Returns the normalized segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true when the destination lives in a subdirectory.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.segments.len() > 1
    }

    /// Resolves the destination beneath `root`.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }

    /// Resolves the temporary download path (`<destination>.bak`) beneath `root`.
    #[must_use]
    pub fn resolve_temp(&self, root: &Path) -> PathBuf {
        let mut path = self.resolve(root).into_os_string();
        path.push(TEMP_SUFFIX);
        PathBuf::from(path)
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
