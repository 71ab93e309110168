use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Ordered list of classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSequence {
    entries: Vec<PathBuf>,
}

impl PathSequence {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn of(entries: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses an OS path string (`a:b` on unix, `a;b` on windows).
    pub fn from_path_string(text: &str) -> Self {
        Self::of(text.split(PATH_SEPARATOR).filter(|s| !s.is_empty()))
    }

    pub fn and(mut self, other: &PathSequence) -> Self {
        self.entries.extend(other.entries.iter().cloned());
        self
    }

    pub fn and_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.entries.push(path.into());
        self
    }

    /// Keeps the first occurrence of each entry.
    pub fn without_duplicates(self) -> Self {
        let mut seen = HashSet::new();
        Self {
            entries: self
                .entries
                .into_iter()
                .filter(|entry| seen.insert(entry.clone()))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    pub fn all_exist(&self) -> bool {
        self.entries.iter().all(|entry| entry.exists())
    }

    pub fn to_path_string(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.display().to_string())
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string())
    }
}

impl fmt::Display for PathSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}

impl FromIterator<PathBuf> for PathSequence {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PathSequence {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_without_duplicates() {
        let a = PathSequence::of(["/a", "/b"]);
        let b = PathSequence::of(["/b", "/c"]);
        let merged = a.and(&b).without_duplicates();
        assert_eq!(merged, PathSequence::of(["/a", "/b", "/c"]));
    }

    #[test]
    fn test_path_string_round_trip() {
        let seq = PathSequence::of(["/a/x.jar", "/b"]);
        assert_eq!(PathSequence::from_path_string(&seq.to_path_string()), seq);
        assert!(PathSequence::from_path_string("").is_empty());
    }

    #[test]
    fn test_all_exist() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let seq = PathSequence::of([temp_dir.path()]);
        assert!(seq.all_exist());
        assert!(!seq.and_path(temp_dir.path().join("missing")).all_exist());
    }
}
