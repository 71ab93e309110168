use crate::bean::BeanCatalog;
use crate::builtins;
use crate::constants::KBEAN_INDEX_EXTENSION;
use crate::deps::PathSequence;
use crate::error::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Finds KBean classes on a classpath.
pub trait ClasspathScanner {
    /// Names of the KBean classes reachable from `classpath`, in classpath
    /// order.
    fn find_kbean_classes(&self, classpath: &PathSequence, catalog: &BeanCatalog) -> Result<Vec<String>>;

    /// True if `class_name` is physically present on `classpath`.
    fn contains_class(&self, classpath: &PathSequence, class_name: &str) -> bool;
}

/// Scans class directories for `.class` files and archives for their
/// `.kbeans` index (one class name per line). Builtin beans ship with the
/// tool and are always found.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    include_builtins: bool,
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self {
            include_builtins: true,
        }
    }

    /// Scanner ignoring the builtin beans, for source output directories.
    pub fn without_builtins() -> Self {
        Self {
            include_builtins: false,
        }
    }

    fn classes_of_entry(entry: &Path) -> Vec<String> {
        if entry.is_dir() {
            return WalkDir::new(entry)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| class_name_of(entry, e.path()))
                .collect();
        }
        match index_file_of(entry) {
            Some(index) => std::fs::read_to_string(&index)
                .map(|text| {
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

impl ClasspathScanner for DirectoryScanner {
    fn find_kbean_classes(&self, classpath: &PathSequence, catalog: &BeanCatalog) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        if self.include_builtins {
            for name in builtins::CLASS_NAMES {
                if seen.insert(name.to_string()) {
                    result.push(name.to_string());
                }
            }
        }
        for entry in classpath.iter() {
            for class_name in Self::classes_of_entry(entry) {
                trace!("Found class {class_name} in {}", entry.display());
                if catalog.contains(&class_name) && seen.insert(class_name.clone()) {
                    result.push(class_name);
                }
            }
        }
        debug!("Found {} KBean classes on {} entries", result.len(), classpath.len());
        Ok(result)
    }

    fn contains_class(&self, classpath: &PathSequence, class_name: &str) -> bool {
        if self.include_builtins && builtins::CLASS_NAMES.contains(&class_name) {
            return true;
        }
        let relative = format!("{}.class", class_name.replace('.', "/"));
        classpath.iter().any(|entry| {
            if entry.is_dir() {
                entry.join(&relative).is_file()
            } else {
                Self::classes_of_entry(entry).iter().any(|name| name == class_name)
            }
        })
    }
}

/// Class name of a `.class` file below `root`.
pub fn class_name_of(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    if relative.extension()? != "class" {
        return None;
    }
    let without_extension = relative.with_extension("");
    let segments: Vec<&str> = without_extension
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(segments.join("."))
}

fn index_file_of(entry: &Path) -> Option<PathBuf> {
    if entry.extension().is_some_and(|ext| ext == KBEAN_INDEX_EXTENSION) {
        return entry.is_file().then(|| entry.to_path_buf());
    }
    let index = entry.with_extension(KBEAN_INDEX_EXTENSION);
    index.is_file().then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{KBean, KBeanDescriptor};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Sample;

    impl KBean for Sample {}

    fn catalog() -> BeanCatalog {
        BeanCatalog::builder()
            .with_bean(KBeanDescriptor::builder::<Sample>("org.acme.BuildKBean").build())
            .with_bean(KBeanDescriptor::builder::<Sample>("org.lib.LibKBean").build())
            .build()
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_class_name_of() {
        let root = Path::new("/out");
        assert_eq!(
            class_name_of(root, Path::new("/out/org/acme/BuildKBean.class")).as_deref(),
            Some("org.acme.BuildKBean")
        );
        assert_eq!(
            class_name_of(root, Path::new("/out/Outer$Inner.class")).as_deref(),
            Some("Outer$Inner")
        );
        assert_eq!(class_name_of(root, Path::new("/out/readme.txt")), None);
    }

    #[test]
    fn test_scan_directories_and_indexes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let classes = temp_dir.path().join("classes");
        touch(&classes.join("org/acme/BuildKBean.class"));
        touch(&classes.join("org/acme/Helper.class"));
        let jar = temp_dir.path().join("lib.jar");
        touch(&jar);
        std::fs::write(temp_dir.path().join("lib.kbeans"), "# index\norg.lib.LibKBean\norg.lib.Unknown\n")?;

        let classpath = PathSequence::of([classes.clone(), jar.clone()]);
        let found = DirectoryScanner::new().find_kbean_classes(&classpath, &catalog())?;
        let mut expected: Vec<String> = builtins::CLASS_NAMES.iter().map(|s| s.to_string()).collect();
        expected.push("org.acme.BuildKBean".to_string());
        expected.push("org.lib.LibKBean".to_string());
        assert_eq!(found, expected);

        let scanner = DirectoryScanner::without_builtins();
        assert_eq!(
            scanner.find_kbean_classes(&PathSequence::of([classes]), &catalog())?,
            vec!["org.acme.BuildKBean"]
        );
        assert!(scanner.contains_class(&classpath, "org.lib.LibKBean"));
        assert!(!scanner.contains_class(&classpath, "org.acme.Missing"));
        Ok(())
    }
}
