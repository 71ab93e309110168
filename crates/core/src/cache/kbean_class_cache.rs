use super::{CACHE_VERSION, read_entry, write_entry};
use crate::constants::KBEAN_CLASSES_CACHE;
use crate::deps::PathSequence;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    classpath: PathSequence,
    classes: Vec<String>,
}

/// KBean class names found on a classpath.
#[derive(Debug, Clone)]
pub struct KBeanClassCache {
    path: PathBuf,
}

impl KBeanClassCache {
    pub fn in_work_dir(work_dir: &Path) -> Self {
        Self {
            path: work_dir.join(KBEAN_CLASSES_CACHE),
        }
    }

    /// Cached names if they were scanned on the same classpath. An empty list
    /// is never reused.
    pub fn get(&self, classpath: &PathSequence) -> Option<Vec<String>> {
        let entry: CacheEntry = read_entry(&self.path)?;
        (entry.version == CACHE_VERSION && &entry.classpath == classpath && !entry.classes.is_empty())
            .then_some(entry.classes)
    }

    pub fn put(&self, classpath: &PathSequence, classes: &[String]) -> Result<()> {
        write_entry(
            &self.path,
            &CacheEntry {
                version: CACHE_VERSION,
                classpath: classpath.clone(),
                classes: classes.to_vec(),
            },
        )
    }
}
