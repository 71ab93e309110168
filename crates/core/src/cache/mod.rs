//! Advisory JSON caches stored in a project work directory.
//!
//! A missing, unreadable or outdated file only costs a recomputation.

pub mod classpath_cache;
pub mod kbean_class_cache;

pub use classpath_cache::ResolvedClasspathCache;
pub use kbean_class_cache::KBeanClassCache;

use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Format version written in every cache file.
pub const CACHE_VERSION: u32 = 1;

/// Reads a cache file, treating any failure as a cache miss.
pub(crate) fn read_entry<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return None,
    };
    match serde_json::from_str(&contents) {
        Ok(entry) => Some(entry),
        Err(e) => {
            debug!("Ignoring corrupted cache file {}: {e}", path.display());
            None
        }
    }
}

pub(crate) fn write_entry<T: Serialize>(path: &Path, entry: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(entry)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub(crate) fn delete_entry(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
