use super::{Coordinate, Dependency, DependencySet, PathSequence};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Turns a dependency set into classpath entries.
pub trait DependencyResolver {
    fn resolve(&self, dependencies: &DependencySet) -> Result<PathSequence>;
}

/// Resolves coordinates against a local repository laid out as
/// `group/path/artifact/version/artifact-version.jar`. Files resolve to
/// themselves.
#[derive(Debug, Clone)]
pub struct LocalRepoResolver {
    repo_dir: PathBuf,
}

impl LocalRepoResolver {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn resolve_coordinate(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let artifact_dir = self
            .repo_dir
            .join(coordinate.group.replace('.', "/"))
            .join(&coordinate.artifact);
        let version = if coordinate.is_latest() {
            latest_version(&artifact_dir).ok_or_else(|| {
                Error::ResolutionError(format!(
                    "No version of {}:{} found in {}",
                    coordinate.group,
                    coordinate.artifact,
                    self.repo_dir.display()
                ))
            })?
        } else {
            coordinate.version.clone()
        };
        let jar = artifact_dir
            .join(&version)
            .join(coordinate.file_name(&version));
        if !jar.is_file() {
            return Err(Error::ResolutionError(format!(
                "{coordinate} not found: {} does not exist",
                jar.display()
            )));
        }
        Ok(jar)
    }
}

impl DependencyResolver for LocalRepoResolver {
    fn resolve(&self, dependencies: &DependencySet) -> Result<PathSequence> {
        let mut result = PathSequence::new();
        for dependency in dependencies.entries() {
            let path = match dependency {
                Dependency::Coordinate(coordinate) => self.resolve_coordinate(coordinate)?,
                Dependency::File(path) => path.clone(),
            };
            debug!("Resolved {dependency} to {}", path.display());
            result = result.and_path(path);
        }
        Ok(result.without_duplicates())
    }
}

fn latest_version(artifact_dir: &Path) -> Option<String> {
    std::fs::read_dir(artifact_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .max_by(|a, b| compare_versions(a, b))
}

/// Compares dotted versions, numeric segments numerically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| -> Vec<String> {
        v.split(['.', '-']).map(str::to_string).collect()
    };
    let (left, right) = (split(a), split(b));
    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}
