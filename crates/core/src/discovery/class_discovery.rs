use super::scanner::{ClasspathScanner, DirectoryScanner};
use crate::bean::naming::describe_candidates;
use crate::bean::{BeanCatalog, KBeanDescriptor, NameResolver};
use crate::cache::KBeanClassCache;
use crate::deps::PathSequence;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// KBean classes visible from one project.
///
/// Dependency classes are scanned once per process and cached on disk, keyed
/// by the KBean classpath. Classes compiled from the project sources are
/// listed on each run.
pub struct ClassDiscovery {
    classpath: PathSequence,
    classes_dir: PathBuf,
    cache: KBeanClassCache,
    use_cache: bool,
    skip_sources: bool,
    scanner: Rc<dyn ClasspathScanner>,
    catalog: Rc<BeanCatalog>,
    dependency_classes: Option<Vec<String>>,
    source_classes: Option<Vec<String>>,
    rescanned: bool,
    resolver: Option<NameResolver>,
}

impl ClassDiscovery {
    pub fn new(
        classpath: PathSequence,
        classes_dir: &Path,
        work_dir: &Path,
        scanner: Rc<dyn ClasspathScanner>,
        catalog: Rc<BeanCatalog>,
    ) -> Self {
        Self {
            classpath,
            classes_dir: classes_dir.to_path_buf(),
            cache: KBeanClassCache::in_work_dir(work_dir),
            use_cache: true,
            skip_sources: false,
            scanner,
            catalog,
            dependency_classes: None,
            source_classes: None,
            rescanned: false,
            resolver: None,
        }
    }

    /// Ignores the stored class list, e.g. after the classpath changed.
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Ignores classes compiled from the project sources.
    pub fn skip_sources(mut self, skip: bool) -> Self {
        self.skip_sources = skip;
        self
    }

    pub fn classpath(&self) -> &PathSequence {
        &self.classpath
    }

    /// KBean classes of the dependency classpath, builtins included.
    pub fn dependency_classes(&mut self) -> Result<Vec<String>> {
        if let Some(classes) = &self.dependency_classes {
            return Ok(classes.clone());
        }
        if self.use_cache {
            if let Some(cached) = self.cache.get(&self.classpath) {
                debug!("Using {} cached KBean classes", cached.len());
                self.dependency_classes = Some(cached.clone());
                return Ok(cached);
            }
        }
        self.rescan()
    }

    /// Scans the dependency classpath again and rewrites the cache.
    pub fn rescan(&mut self) -> Result<Vec<String>> {
        info!("Scanning {} classpath entries for KBeans", self.classpath.len());
        let classes = self.scanner.find_kbean_classes(&self.classpath, &self.catalog)?;
        self.cache.put(&self.classpath, &classes)?;
        self.dependency_classes = Some(classes.clone());
        self.rescanned = true;
        self.resolver = None;
        Ok(classes)
    }

    /// KBean classes compiled from the project sources.
    pub fn source_classes(&mut self) -> Result<Vec<String>> {
        if let Some(classes) = &self.source_classes {
            return Ok(classes.clone());
        }
        let classes = if self.skip_sources || !self.classes_dir.is_dir() {
            Vec::new()
        } else {
            DirectoryScanner::without_builtins()
                .find_kbean_classes(&PathSequence::of([self.classes_dir.clone()]), &self.catalog)?
        };
        self.source_classes = Some(classes.clone());
        Ok(classes)
    }

    /// Source classes that can be selected as default bean: concrete and
    /// documented. Sorted by name.
    pub fn local_classes(&mut self) -> Result<Vec<String>> {
        let mut local: Vec<String> = self
            .source_classes()?
            .into_iter()
            .filter(|name| {
                self.catalog
                    .get(name)
                    .is_some_and(|d| !d.is_abstract() && d.doc().is_some())
            })
            .collect();
        local.sort();
        Ok(local)
    }

    /// Source classes first, then dependency classes.
    pub fn all_classes(&mut self) -> Result<Vec<String>> {
        let mut all = self.source_classes()?;
        for class_name in self.dependency_classes()? {
            if !all.contains(&class_name) {
                all.push(class_name);
            }
        }
        Ok(all)
    }

    /// Class name designated by `name`. A name matching nothing triggers one
    /// rescan, in case the stored list is outdated.
    pub fn resolve_name(&mut self, name: &str) -> Result<String> {
        let mut matches = self.name_resolver()?.matches(name);
        if matches.is_empty() && !self.rescanned {
            debug!("KBean '{name}' matches no known class, rescanning classpath");
            self.rescan()?;
            matches = self.name_resolver()?.matches(name);
        }
        match matches.len() {
            0 => Err(Error::KBeanNotFound {
                name: name.to_string(),
                available: describe_candidates(&self.all_classes()?),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousKBean {
                name: name.to_string(),
                matches,
            }),
        }
    }

    /// Like [`resolve_name`](Self::resolve_name), `None` when nothing matches.
    pub fn try_resolve_name(&mut self, name: &str) -> Result<Option<String>> {
        match self.resolve_name(name) {
            Ok(class_name) => Ok(Some(class_name)),
            Err(Error::KBeanNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn is_loadable(&self, class_name: &str) -> bool {
        if !self.catalog.contains(class_name) {
            return false;
        }
        let search_path = PathSequence::of([self.classes_dir.clone()]).and(&self.classpath);
        BeanCatalog::is_builtin(class_name) || self.scanner.contains_class(&search_path, class_name)
    }

    /// Descriptor of a listed class. A class that cannot be loaded triggers a
    /// rescan so the next run starts from a fresh list, then fails.
    pub fn load(&mut self, class_name: &str) -> Result<Rc<KBeanDescriptor>> {
        if self.is_loadable(class_name) {
            if let Some(descriptor) = self.catalog.get(class_name) {
                return Ok(descriptor);
            }
        }
        if !self.rescanned {
            self.rescan()?;
        }
        Err(Error::StaleClass(class_name.to_string()))
    }

    fn name_resolver(&mut self) -> Result<&mut NameResolver> {
        let resolver = match self.resolver.take() {
            Some(resolver) => resolver,
            None => NameResolver::new(self.all_classes()?),
        };
        Ok(self.resolver.insert(resolver))
    }
}
