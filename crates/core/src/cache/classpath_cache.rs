use super::{CACHE_VERSION, read_entry, write_entry};
use crate::constants::RESOLVED_CLASSPATH_CACHE;
use crate::deps::{DependencyResolver, DependencySet, PathSequence};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    unresolved: String,
    resolved: PathSequence,
}

/// Resolved classpath keyed by the textual fingerprint of the dependency set.
#[derive(Debug, Clone)]
pub struct ResolvedClasspathCache {
    path: PathBuf,
}

impl ResolvedClasspathCache {
    pub fn in_work_dir(work_dir: &Path) -> Self {
        Self {
            path: work_dir.join(RESOLVED_CLASSPATH_CACHE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached classpath if the fingerprint matches byte for byte and every
    /// entry still exists.
    pub fn get(&self, fingerprint: &str) -> Option<PathSequence> {
        let entry: CacheEntry = read_entry(&self.path)?;
        if entry.version != CACHE_VERSION || entry.unresolved != fingerprint {
            return None;
        }
        if !entry.resolved.all_exist() {
            debug!("Cached classpath references missing files, ignoring it");
            return None;
        }
        Some(entry.resolved)
    }

    pub fn put(&self, fingerprint: &str, resolved: &PathSequence) -> Result<()> {
        write_entry(
            &self.path,
            &CacheEntry {
                version: CACHE_VERSION,
                unresolved: fingerprint.to_string(),
                resolved: resolved.clone(),
            },
        )
    }

    /// Returns the resolved classpath and whether it differs from the one
    /// stored by the previous run. The resolver is only called on a cache miss.
    pub fn resolve(
        &self,
        resolver: &dyn DependencyResolver,
        dependencies: &DependencySet,
    ) -> Result<(PathSequence, bool)> {
        let fingerprint = dependencies.fingerprint();
        if let Some(cached) = self.get(&fingerprint) {
            debug!("Reusing cached classpath from {}", self.path.display());
            return Ok((cached, false));
        }
        let previous = self.previous();
        let resolved = resolver.resolve(dependencies)?;
        self.put(&fingerprint, &resolved)?;
        let changed = previous.as_ref() != Some(&resolved);
        Ok((resolved, changed))
    }

    /// Classpath stored by the previous run, whatever its fingerprint.
    fn previous(&self) -> Option<PathSequence> {
        read_entry::<CacheEntry>(&self.path)
            .filter(|entry| entry.version == CACHE_VERSION)
            .map(|entry| entry.resolved)
    }
}
