use crate::cache::{CACHE_VERSION, delete_entry, read_entry, write_entry};
use crate::constants::{COMPILE_FLAG_FILE, JEKA_SRC_CLASSES_DIR, JEKA_SRC_DIR, JEKA_WORK_DIR, TOOL_VERSION};
use crate::deps::PathSequence;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;
use walkdir::WalkDir;

/// Snapshot of the source tree taken after a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompileFlag {
    version: u32,
    file_count: usize,
    last_modified_millis: u64,
    tool_version: String,
    classpath_hash: String,
    #[serde(default)]
    extra_classpath: PathSequence,
}

impl CompileFlag {
    fn same_fingerprint(&self, other: &CompileFlag) -> bool {
        self.version == other.version
            && self.file_count == other.file_count
            && self.last_modified_millis == other.last_modified_millis
            && self.tool_version == other.tool_version
            && self.classpath_hash == other.classpath_hash
    }
}

/// Decides whether `jeka-src` must be compiled again.
///
/// A missing flag means the sources were never compiled. A flag that no longer
/// matches the source tree is deleted before recompiling, so an interrupted
/// compilation never leaves a valid-looking flag behind.
pub struct CompilationTracker {
    src_dir: PathBuf,
    classes_dir: PathBuf,
    flag_path: PathBuf,
}

impl CompilationTracker {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            src_dir: base_dir.join(JEKA_SRC_DIR),
            classes_dir: base_dir.join(JEKA_WORK_DIR).join(JEKA_SRC_CLASSES_DIR),
            flag_path: base_dir.join(JEKA_WORK_DIR).join(COMPILE_FLAG_FILE),
        }
    }

    pub fn flag_path(&self) -> &Path {
        &self.flag_path
    }

    pub fn needs_recompile(&self, sources: &[PathBuf], classpath: &PathSequence) -> Result<bool> {
        if let Some(source) = sources.iter().find(|source| !self.has_class_for(source)) {
            debug!("No class compiled for {}, compiling", source.display());
            delete_entry(&self.flag_path)?;
            return Ok(true);
        }
        let Some(stored) = read_entry::<CompileFlag>(&self.flag_path) else {
            debug!("No compile flag found in {}, compiling", self.flag_path.display());
            return Ok(true);
        };
        if stored.same_fingerprint(&self.current_flag(classpath, PathSequence::new())) {
            debug!("Sources of {} are up to date", self.src_dir.display());
            return Ok(false);
        }
        debug!("Sources of {} changed, compiling", self.src_dir.display());
        delete_entry(&self.flag_path)?;
        Ok(true)
    }

    /// Extra classpath recorded by the last successful compilation.
    pub fn stored_extra_classpath(&self) -> PathSequence {
        read_entry::<CompileFlag>(&self.flag_path)
            .map(|flag| flag.extra_classpath)
            .unwrap_or_default()
    }

    pub fn record_success(&self, classpath: &PathSequence, extra_classpath: &PathSequence) -> Result<()> {
        write_entry(&self.flag_path, &self.current_flag(classpath, extra_classpath.clone()))
    }

    pub fn record_failure(&self) -> Result<()> {
        delete_entry(&self.flag_path)
    }

    fn current_flag(&self, classpath: &PathSequence, extra_classpath: PathSequence) -> CompileFlag {
        let (file_count, last_modified_millis) = self.tree_fingerprint();
        CompileFlag {
            version: CACHE_VERSION,
            file_count,
            last_modified_millis,
            tool_version: TOOL_VERSION.to_string(),
            classpath_hash: format!("{:x}", md5::compute(classpath.to_path_string().as_bytes())),
            extra_classpath,
        }
    }

    fn tree_fingerprint(&self) -> (usize, u64) {
        let mut count = 0;
        let mut latest = 0;
        for entry in WalkDir::new(&self.src_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            count += 1;
            let millis = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            latest = latest.max(millis);
        }
        (count, latest)
    }

    fn has_class_for(&self, source: &Path) -> bool {
        let Ok(relative) = source.strip_prefix(&self.src_dir) else {
            return true;
        };
        let class_file = self.classes_dir.join(relative).with_extension("class");
        if class_file.is_file() {
            return true;
        }
        // top-level Kotlin functions land in a `<Name>Kt` class
        let is_kotlin = source.extension().is_some_and(|ext| ext == "kt");
        is_kotlin
            && class_file
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| class_file.with_file_name(format!("{stem}Kt.class")).is_file())
    }
}
