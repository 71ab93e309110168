//! Per-project pipeline: classpath setup, compilation gating, KBean
//! resolution and action parsing.

use crate::action::{ActionContainer, ActionParser};
use crate::bean::BeanCatalog;
use crate::builtins::INFO_KBEAN;
use crate::cache::ResolvedClasspathCache;
use crate::compile::{CompilationTracker, CompileSpec, Compiler, ParsedSourceInfo, SourceParser};
use crate::config::{Properties, Settings};
use crate::constants::{
    DEFAULT_KBEAN_PROP, INJECT_CLASSPATH_PROP, JEKA_BOOT_DIR, JEKA_OUTPUT_DIR, JEKA_SRC_CLASSES_DIR,
    JEKA_SRC_DIR, JEKA_WORK_DIR,
};
use crate::deps::{Dependency, DependencyResolver, DependencySet, PathSequence};
use crate::discovery::{ClassDiscovery, ClasspathScanner};
use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// External services the engine delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Rc<dyn DependencyResolver>,
    pub compiler: Rc<dyn Compiler>,
    pub scanner: Rc<dyn ClasspathScanner>,
    pub catalog: Rc<BeanCatalog>,
}

/// Classpaths computed for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClasspathSetupResult {
    /// Resolved dependencies, scanned for KBeans.
    pub kbean_classpath: PathSequence,
    /// KBean classpath plus imported projects and `jeka-boot` jars.
    pub compile_classpath: PathSequence,
    /// Compile classpath plus the compiled classes and their extra entries.
    pub run_classpath: PathSequence,
    pub imported_dirs: Vec<PathBuf>,
    /// The resolved KBean classpath differs from the one cached by the
    /// previous run, or no run cached one.
    pub changed: bool,
    pub compile_failed: bool,
}

/// KBean classes of one project and the beans targeted by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KBeanResolution {
    pub all: Vec<String>,
    pub local: Vec<String>,
    /// Instantiated first, even when no action names it.
    pub init_bean: String,
    /// Target of actions without a `bean:` scope.
    pub default_bean: String,
}

pub struct Engine {
    base_dir: PathBuf,
    properties: Rc<Properties>,
    settings: Settings,
    collaborators: Collaborators,
    cmdline_dependencies: DependencySet,
    sources: Option<ParsedSourceInfo>,
    setup: Option<ClasspathSetupResult>,
    discovery: Option<ClassDiscovery>,
    resolution: Option<KBeanResolution>,
}

impl Engine {
    /// `dependencies` are command-line descriptors, relative to `base_dir`
    /// when they name files.
    pub fn new(
        base_dir: &Path,
        properties: Rc<Properties>,
        settings: &Settings,
        collaborators: &Collaborators,
        dependencies: &[String],
    ) -> Result<Self> {
        let cmdline_dependencies = dependencies
            .iter()
            .map(|descriptor| Dependency::parse(descriptor, base_dir))
            .collect::<Result<DependencySet>>()?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            properties,
            settings: settings.clone(),
            collaborators: collaborators.clone(),
            cmdline_dependencies,
            sources: None,
            setup: None,
            discovery: None,
            resolution: None,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn work_dir(&self) -> PathBuf {
        self.base_dir.join(JEKA_WORK_DIR)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.base_dir.join(JEKA_SRC_DIR)
    }

    pub fn classes_dir(&self) -> PathBuf {
        self.work_dir().join(JEKA_SRC_CLASSES_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(JEKA_OUTPUT_DIR)
    }

    pub fn properties(&self) -> &Rc<Properties> {
        &self.properties
    }

    pub fn catalog(&self) -> &Rc<BeanCatalog> {
        &self.collaborators.catalog
    }

    /// Directives of `jeka-src`, parsed once. Empty when sources are skipped.
    pub fn parse_sources(&mut self) -> Result<&ParsedSourceInfo> {
        if self.sources.is_none() {
            let info = if self.settings.skip_sources {
                ParsedSourceInfo::default()
            } else {
                SourceParser::new(&self.base_dir).parse()?
            };
            self.sources = Some(info);
        }
        Ok(self.sources.get_or_insert_default())
    }

    pub fn classpath_setup(&self) -> Option<&ClasspathSetupResult> {
        self.setup.as_ref()
    }

    pub fn resolution(&self) -> Option<&KBeanResolution> {
        self.resolution.as_ref()
    }

    /// Resolves dependencies and compiles `jeka-src` if needed.
    /// `imported_classpath` gathers the run classpaths of the imported
    /// projects. Only the first call does the work.
    pub fn setup_classpath(&mut self, imported_classpath: &PathSequence) -> Result<ClasspathSetupResult> {
        if let Some(setup) = &self.setup {
            return Ok(setup.clone());
        }
        debug!("Resolving classpath of {}", self.base_dir.display());
        self.clean_dirs()?;
        let sources = self.parse_sources()?.clone();

        let dependencies = self
            .cmdline_dependencies
            .clone()
            .and(&self.injected_dependencies()?)
            .and(&sources.dependencies);
        let cache = ResolvedClasspathCache::in_work_dir(&self.work_dir());
        let (kbean_classpath, changed) = cache
            .resolve(self.collaborators.resolver.as_ref(), &dependencies)
            .with_context(|| format!("Resolving dependencies of {}", self.base_dir.display()))?;

        let compile_classpath = kbean_classpath
            .clone()
            .and(imported_classpath)
            .and(&self.boot_jars())
            .without_duplicates();

        let (success, extra_classpath) = self.compile(&sources, &compile_classpath)?;
        if !success {
            if !self.settings.ignore_compile_failure {
                return Err(Error::CompilationError(self.src_dir()));
            }
            warn!(
                "Compilation of {} failed, continuing with the previous classes",
                self.src_dir().display()
            );
        }

        let setup = ClasspathSetupResult {
            kbean_classpath,
            run_classpath: compile_classpath.clone().and(&extra_classpath).without_duplicates(),
            compile_classpath,
            imported_dirs: sources.imported_dirs,
            changed,
            compile_failed: !success,
        };
        info!(
            "Classpath of {} set up: {} entries",
            self.base_dir.display(),
            setup.run_classpath.len()
        );
        self.setup = Some(setup.clone());
        Ok(setup)
    }

    /// Lists the KBean classes and picks the init and default beans. Requires
    /// the classpath to be set up.
    pub fn resolve_kbeans(&mut self) -> Result<KBeanResolution> {
        if let Some(resolution) = &self.resolution {
            return Ok(resolution.clone());
        }
        let setup = self.setup.as_ref().ok_or_else(|| {
            Error::Other(format!("Classpath of {} is not resolved", self.base_dir.display()))
        })?;
        let mut discovery = ClassDiscovery::new(
            setup.compile_classpath.clone(),
            &self.classes_dir(),
            &self.work_dir(),
            self.collaborators.scanner.clone(),
            self.collaborators.catalog.clone(),
        )
        .skip_sources(self.settings.skip_sources);

        let all = discovery.all_classes()?;
        let local = discovery.local_classes()?;
        let requested = self
            .settings
            .default_kbean
            .clone()
            .or_else(|| self.properties.get(DEFAULT_KBEAN_PROP))
            .filter(|name| !name.trim().is_empty());
        let default_bean = match requested {
            Some(name) => discovery
                .resolve_name(name.trim())
                .with_context(|| "Selecting the default KBean".to_string())?,
            None => local.first().cloned().unwrap_or_else(|| INFO_KBEAN.to_string()),
        };
        let init_bean = if local.contains(&default_bean) {
            default_bean.clone()
        } else {
            local.first().cloned().unwrap_or_else(|| default_bean.clone())
        };
        debug!("Default KBean of {}: {default_bean}, init KBean: {init_bean}", self.base_dir.display());

        let resolution = KBeanResolution {
            all,
            local,
            init_bean,
            default_bean,
        };
        self.discovery = Some(discovery);
        self.resolution = Some(resolution.clone());
        Ok(resolution)
    }

    /// Actions from properties and `tokens`, the init bean first.
    pub fn resolve_actions(&mut self, tokens: &[String]) -> Result<ActionContainer> {
        let resolution = self.resolve_kbeans()?;
        let properties = self.properties.clone();
        let discovery = self.discovery_mut()?;
        let container = ActionParser::new(discovery, &resolution.default_bean).parse(&properties, tokens)?;
        Ok(container.with_init_bean_first(&resolution.init_bean))
    }

    pub fn discovery_mut(&mut self) -> Result<&mut ClassDiscovery> {
        let base_dir = self.base_dir.display().to_string();
        self.discovery
            .as_mut()
            .ok_or_else(|| Error::Other(format!("KBeans of {base_dir} are not resolved")))
    }

    fn injected_dependencies(&self) -> Result<DependencySet> {
        let value = self.properties.get_or(INJECT_CLASSPATH_PROP, "");
        value
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(str::trim)
            .filter(|descriptor| !descriptor.is_empty())
            .map(|descriptor| Dependency::parse(descriptor, &self.base_dir))
            .collect::<Result<DependencySet>>()
            .with_context(|| format!("Reading property {INJECT_CLASSPATH_PROP}"))
    }

    fn boot_jars(&self) -> PathSequence {
        let boot_dir = self.base_dir.join(JEKA_BOOT_DIR);
        if !boot_dir.is_dir() {
            return PathSequence::new();
        }
        WalkDir::new(&boot_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }

    fn clean_dirs(&self) -> Result<()> {
        if self.settings.clean_work {
            debug!("Cleaning {}", self.work_dir().display());
            delete_content(&self.work_dir())?;
        }
        if self.settings.clean_output {
            debug!("Cleaning {}", self.output_dir().display());
            delete_content(&self.output_dir())?;
        }
        Ok(())
    }

    /// Returns whether compilation succeeded and the extra run classpath.
    fn compile(&self, sources: &ParsedSourceInfo, classpath: &PathSequence) -> Result<(bool, PathSequence)> {
        if sources.sources.is_empty() {
            return Ok((true, PathSequence::new()));
        }
        let classes_dir = self.classes_dir();
        let tracker = CompilationTracker::new(&self.base_dir);
        if !tracker.needs_recompile(&sources.sources, classpath)? {
            let extra = tracker.stored_extra_classpath().and_path(&classes_dir);
            return Ok((true, extra));
        }

        info!("Compiling {}", self.src_dir().display());
        let spec = CompileSpec {
            sources: sources.sources.clone(),
            classpath: classpath.clone(),
            output_dir: classes_dir.clone(),
            options: sources.compile_options.clone(),
        };
        let outcome = self.collaborators.compiler.compile(&spec)?;
        if outcome.success {
            self.copy_resources(&classes_dir)?;
            tracker.record_success(classpath, &outcome.extra_classpath)?;
        } else {
            tracker.record_failure()?;
        }
        Ok((outcome.success, outcome.extra_classpath.and_path(&classes_dir)))
    }

    /// Copies the non-source files of `jeka-src` next to the classes.
    fn copy_resources(&self, classes_dir: &Path) -> Result<()> {
        let src_dir = self.src_dir();
        for entry in WalkDir::new(&src_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "java" || ext == "kt") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&src_dir) else {
                continue;
            };
            let target = classes_dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(path, &target)?;
        }
        Ok(())
    }
}

fn delete_content(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{KBean, KBeanDescriptor};
    use crate::compile::CompileOutcome;
    use crate::discovery::DirectoryScanner;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Build;

    impl KBean for Build {}

    struct NoDeps;

    impl DependencyResolver for NoDeps {
        fn resolve(&self, _dependencies: &DependencySet) -> Result<PathSequence> {
            Ok(PathSequence::new())
        }
    }

    /// Writes one class file per source, or fails.
    struct FakeCompiler {
        succeed: bool,
        calls: Cell<usize>,
    }

    impl Compiler for FakeCompiler {
        fn compile(&self, spec: &CompileSpec) -> Result<CompileOutcome> {
            self.calls.set(self.calls.get() + 1);
            if !self.succeed {
                return Ok(CompileOutcome::failure());
            }
            for source in &spec.sources {
                let name = source.file_stem().unwrap();
                std::fs::create_dir_all(&spec.output_dir)?;
                std::fs::write(spec.output_dir.join(name).with_extension("class"), b"")?;
            }
            Ok(CompileOutcome::success())
        }
    }

    fn collaborators(compiler: Rc<FakeCompiler>) -> Collaborators {
        Collaborators {
            resolver: Rc::new(NoDeps),
            compiler,
            scanner: Rc::new(DirectoryScanner::new()),
            catalog: Rc::new(
                BeanCatalog::builder()
                    .with_bean(KBeanDescriptor::builder::<Build>("Build").header("Build").build())
                    .build(),
            ),
        }
    }

    fn engine(dir: &Path, settings: &Settings, compiler: Rc<FakeCompiler>) -> Engine {
        Engine::new(dir, Rc::new(Properties::new()), settings, &collaborators(compiler), &[]).unwrap()
    }

    fn write_source(dir: &Path) {
        std::fs::create_dir_all(dir.join("jeka-src")).unwrap();
        std::fs::write(dir.join("jeka-src/Build.java"), "class Build extends KBean {}").unwrap();
    }

    #[test]
    fn test_compiles_once() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write_source(temp_dir.path());
        let compiler = Rc::new(FakeCompiler {
            succeed: true,
            calls: Cell::new(0),
        });
        let settings = Settings::default();
        let setup = engine(temp_dir.path(), &settings, compiler.clone()).setup_classpath(&PathSequence::new())?;
        assert!(setup.run_classpath.contains(&temp_dir.path().join(".jeka-work/jeka-src-classes")));
        assert_eq!(compiler.calls.get(), 1);

        let mut second = engine(temp_dir.path(), &settings, compiler.clone());
        second.setup_classpath(&PathSequence::new())?;
        assert_eq!(compiler.calls.get(), 1);

        let resolution = second.resolve_kbeans()?;
        assert_eq!(resolution.local, vec!["Build"]);
        assert_eq!(resolution.default_bean, "Build");
        assert_eq!(resolution.init_bean, "Build");
        Ok(())
    }

    #[test]
    fn test_compile_failure() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write_source(temp_dir.path());
        let compiler = Rc::new(FakeCompiler {
            succeed: false,
            calls: Cell::new(0),
        });
        let err = engine(temp_dir.path(), &Settings::default(), compiler.clone())
            .setup_classpath(&PathSequence::new())
            .unwrap_err();
        assert!(matches!(err, Error::CompilationError(_)));

        let settings = Settings {
            ignore_compile_failure: true,
            ..Default::default()
        };
        let setup = engine(temp_dir.path(), &settings, compiler.clone()).setup_classpath(&PathSequence::new())?;
        assert!(setup.compile_failed);
        assert!(!temp_dir.path().join(".jeka-work/compile-flag.json").exists());
        Ok(())
    }

    #[test]
    fn test_project_without_beans_defaults_to_info() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let compiler = Rc::new(FakeCompiler {
            succeed: true,
            calls: Cell::new(0),
        });
        let mut engine = engine(temp_dir.path(), &Settings::default(), compiler);
        engine.setup_classpath(&PathSequence::new())?;
        let resolution = engine.resolve_kbeans()?;
        assert_eq!(resolution.default_bean, INFO_KBEAN);
        let actions = engine.resolve_actions(&["beans".to_string()])?;
        let shown: Vec<String> = actions.actions().iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["INIT info", "INVOKE info#beans()"]);
        Ok(())
    }

    #[test]
    fn test_clean_work() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::create_dir_all(temp_dir.path().join(".jeka-work/stale"))?;
        std::fs::create_dir_all(temp_dir.path().join("jeka-output"))?;
        std::fs::write(temp_dir.path().join("jeka-output/app.jar"), b"")?;
        let settings = Settings {
            clean_work: true,
            clean_output: true,
            ..Default::default()
        };
        let compiler = Rc::new(FakeCompiler {
            succeed: true,
            calls: Cell::new(0),
        });
        engine(temp_dir.path(), &settings, compiler).setup_classpath(&PathSequence::new())?;
        assert!(!temp_dir.path().join(".jeka-work/stale").exists());
        assert!(!temp_dir.path().join("jeka-output/app.jar").exists());
        Ok(())
    }
}
