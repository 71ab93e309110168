use crate::constants::{TOOL_GROUP, TOOL_VERSION};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Module coordinate: `group:artifact:version`, optionally with a classifier
/// (`group:artifact:classifier:version`) and a type
/// (`group:artifact:classifier:type:version`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    /// `+` stands for the latest available version.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// File extension of the artifact, `jar` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Coordinate {
    pub fn is_latest(&self) -> bool {
        self.version == "+"
    }

    /// Artifact file name inside its version directory.
    pub fn file_name(&self, version: &str) -> String {
        let classifier = self
            .classifier
            .as_deref()
            .map(|classifier| format!("-{classifier}"))
            .unwrap_or_default();
        let kind = self.kind.as_deref().unwrap_or("jar");
        format!("{}-{version}{classifier}.{kind}", self.artifact)
    }

    fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 5 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(malformed(text));
        }
        let (group, artifact) = (parts[0], parts[1]);
        let (classifier, kind, version) = match parts.as_slice() {
            [_, _] => (None, None, ""),
            [_, _, version] => (None, None, *version),
            [_, _, classifier, version] => (non_blank(classifier), None, *version),
            [_, _, classifier, kind, version] => (non_blank(classifier), non_blank(kind), *version),
            _ => return Err(malformed(text)),
        };
        let version = match version {
            "" if group == TOOL_GROUP => TOOL_VERSION,
            "" => {
                return Err(Error::ParseError(format!(
                    "Coordinate '{text}' has no version. Only {TOOL_GROUP} modules may omit it."
                )));
            }
            version => version,
        };
        let mut coordinate = Self::new(group, artifact, version);
        coordinate.classifier = classifier;
        coordinate.kind = kind;
        Ok(coordinate)
    }

    fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier: None,
            kind: None,
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn malformed(text: &str) -> Error {
    Error::ParseError(format!(
        "Malformed coordinate '{text}', expected group:artifact:version, \
         group:artifact:classifier:version or group:artifact:classifier:type:version"
    ))
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        match (&self.classifier, &self.kind) {
            (classifier, Some(kind)) => write!(f, ":{}:{kind}", classifier.as_deref().unwrap_or(""))?,
            (Some(classifier), None) => write!(f, ":{classifier}")?,
            (None, None) => {}
        }
        write!(f, ":{}", self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dependency {
    Coordinate(Coordinate),
    File(PathBuf),
}

impl Dependency {
    /// Parses a descriptor from the command line, a source directive or a
    /// property. Non-coordinate text is a path relative to `base_dir`.
    pub fn parse(descriptor: &str, base_dir: &Path) -> Result<Self> {
        let descriptor = descriptor.trim();
        if is_coordinate(descriptor) {
            return Coordinate::parse(descriptor).map(Dependency::Coordinate);
        }
        let path = Path::new(descriptor);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        if !path.exists() {
            warn!("Dependency file {} does not exist", path.display());
        }
        Ok(Dependency::File(path))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Coordinate(coordinate) => coordinate.fmt(f),
            Dependency::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_coordinate(text: &str) -> bool {
    if !text.contains(':') || text.contains('/') || text.contains('\\') {
        return false;
    }
    // `C:foo` style drive prefixes are paths
    let bytes = text.as_bytes();
    !(bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() && text.matches(':').count() == 1)
}

/// Ordered set of dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    entries: Vec<Dependency>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dependency: Dependency) {
        if !self.entries.contains(&dependency) {
            self.entries.push(dependency);
        }
    }

    pub fn and(mut self, other: &DependencySet) -> Self {
        for dependency in &other.entries {
            self.add(dependency.clone());
        }
        self
    }

    pub fn entries(&self) -> &[Dependency] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable text used as cache key, one dependency per line.
    pub fn fingerprint(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        let mut set = DependencySet::new();
        for dependency in iter {
            set.add(dependency);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        let dep = Dependency::parse("org.lib:lib:1.0", Path::new("/base")).unwrap();
        assert_eq!(
            dep,
            Dependency::Coordinate(Coordinate::new("org.lib", "lib", "1.0"))
        );
        assert_eq!(dep.to_string(), "org.lib:lib:1.0");
    }

    #[test]
    fn test_tool_group_defaults_to_tool_version() {
        let dep = Dependency::parse("dev.jeka:springboot-plugin", Path::new("/base")).unwrap();
        assert_eq!(dep.to_string(), format!("dev.jeka:springboot-plugin:{TOOL_VERSION}"));
    }

    #[test]
    fn test_missing_version_fails_for_other_groups() {
        let err = Dependency::parse("org.lib:lib", Path::new("/base")).unwrap_err();
        assert!(err.to_string().contains("has no version"));
    }

    #[test]
    fn test_classifier_and_type() {
        let dep = Dependency::parse("org.lib:natives:linux:2.0", Path::new("/base")).unwrap();
        let Dependency::Coordinate(coordinate) = &dep else {
            panic!("unexpected {dep:?}");
        };
        assert_eq!(coordinate.classifier.as_deref(), Some("linux"));
        assert_eq!(coordinate.version, "2.0");
        assert_eq!(coordinate.file_name("2.0"), "natives-2.0-linux.jar");
        assert_eq!(dep.to_string(), "org.lib:natives:linux:2.0");

        let dep = Dependency::parse("org.lib:dist::zip:1.0", Path::new("/base")).unwrap();
        let Dependency::Coordinate(coordinate) = &dep else {
            panic!("unexpected {dep:?}");
        };
        assert_eq!(coordinate.classifier, None);
        assert_eq!(coordinate.file_name("1.0"), "dist-1.0.zip");
        assert_eq!(dep.to_string(), "org.lib:dist::zip:1.0");
    }

    #[test]
    fn test_too_many_parts_names_supported_forms() {
        let err = Dependency::parse("a:b:c:d:e:f", Path::new("/base")).unwrap_err();
        assert!(err.to_string().contains("group:artifact:classifier:type:version"));
    }

    #[test]
    fn test_latest_version() {
        match Dependency::parse("org.lib:lib:+", Path::new("/base")).unwrap() {
            Dependency::Coordinate(c) => assert!(c.is_latest()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_file() {
        let dep = Dependency::parse("libs/a.jar", Path::new("/base")).unwrap();
        assert_eq!(dep, Dependency::File(PathBuf::from("/base/libs/a.jar")));
        let dep = Dependency::parse("/abs/b.jar", Path::new("/base")).unwrap();
        assert_eq!(dep, Dependency::File(PathBuf::from("/abs/b.jar")));
    }

    #[test]
    fn test_fingerprint_is_stable_and_deduplicated() {
        let base = Path::new("/base");
        let set: DependencySet = ["a:b:1", "c:d:2", "a:b:1"]
            .iter()
            .map(|d| Dependency::parse(d, base).unwrap())
            .collect();
        assert_eq!(set.fingerprint(), "a:b:1\nc:d:2");
    }
}
