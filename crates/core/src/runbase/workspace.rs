use super::{Runbase, RunbaseState};
use crate::action::{ActionContainer, ActionKind, ActionSource, KBeanAction};
use crate::bean::{BeanCatalog, BeanContext, BeanHandle, FieldInjector, KBean, KBeanDescriptor, short_name};
use crate::compile::{Compiler, ProcessCompiler};
use crate::config::{Properties, Settings};
use crate::constants::{LOCAL_REPO_PROP, USER_HOME_ENV};
use crate::deps::{DependencyResolver, LocalRepoResolver, PathSequence};
use crate::discovery::{ClasspathScanner, DirectoryScanner};
use crate::engine::{ClasspathSetupResult, Collaborators, Engine, KBeanResolution};
use crate::error::{Error, Result, ResultExt};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Which beans an initialization instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeanSelection {
    /// Every bean named by an INIT or INVOKE action.
    Involved,
    /// The init bean only, for projects reached through imports.
    InitBeanOnly,
}

/// Effective actions of one runbase.
#[derive(Debug, Clone, Serialize)]
pub struct RunbaseReport {
    pub base_dir: PathBuf,
    pub effective_actions: Vec<KBeanAction>,
}

/// What an execution resolved, for `-ri` output.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub base_dir: PathBuf,
    pub actions: ActionContainer,
    pub classpath: PathSequence,
    /// Imported project dirs, transitively, each once.
    pub imported_dirs: Vec<PathBuf>,
    /// The root runbase first.
    pub runbases: Vec<RunbaseReport>,
}

/// Owns the runbases of one process, keyed by canonical base dir.
///
/// Imported projects get their own runbase, created on demand and shared by
/// every project importing them.
pub struct Workspace {
    catalog: Rc<BeanCatalog>,
    resolver: Option<Rc<dyn DependencyResolver>>,
    compiler: Rc<dyn Compiler>,
    scanner: Rc<dyn ClasspathScanner>,
    settings: Settings,
    system_properties: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    global_properties: Option<PathBuf>,
    dependencies: Vec<String>,
    runbases: IndexMap<PathBuf, Runbase>,
    resolving: Vec<PathBuf>,
}

impl Workspace {
    pub fn builder(catalog: BeanCatalog) -> WorkspaceBuilder {
        WorkspaceBuilder {
            catalog,
            resolver: None,
            compiler: None,
            scanner: None,
            settings: Settings::default(),
            system_properties: BTreeMap::new(),
            env: BTreeMap::new(),
            global_properties: None,
            dependencies: Vec::new(),
        }
    }

    pub fn catalog(&self) -> Rc<BeanCatalog> {
        self.catalog.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn runbase(&self, base_dir: &Path) -> Option<&Runbase> {
        self.runbases.get(base_dir)
    }

    /// Initializes the runbase of `base_dir` with `tokens`, then invokes the
    /// requested methods.
    pub fn execute(&mut self, base_dir: &Path, tokens: &[String]) -> Result<ExecutionReport> {
        let report = self.prepare(base_dir, tokens)?;
        self.run(&report.base_dir)?;
        Ok(report)
    }

    /// Initializes the runbase of `base_dir` without invoking any method.
    pub fn prepare(&mut self, base_dir: &Path, tokens: &[String]) -> Result<ExecutionReport> {
        let base_dir = canonical_dir(base_dir)?;
        info!("Preparing {}", base_dir.display());
        self.init_runbase_with(&base_dir, tokens, BeanSelection::Involved)?;
        self.report(&base_dir)
    }

    /// Resolves the classpath of `base_dir`, imported projects first. A project
    /// reached again while its own resolution is in progress contributes
    /// nothing.
    pub fn resolve_classpaths(&mut self, base_dir: &Path) -> Result<ClasspathSetupResult> {
        if let Some(setup) = self.runbase_mut(base_dir)?.engine().classpath_setup() {
            return Ok(setup.clone());
        }
        if self.resolving.iter().any(|dir| dir == base_dir) {
            warn!(
                "Import cycle detected: {} is already being resolved, skipped",
                base_dir.display()
            );
            return Ok(ClasspathSetupResult::default());
        }
        self.resolving.push(base_dir.to_path_buf());
        let result = self.resolve_own_classpath(base_dir);
        self.resolving.pop();
        result
    }

    pub fn resolve_kbeans(&mut self, base_dir: &Path) -> Result<KBeanResolution> {
        self.resolve_classpaths(base_dir)?;
        let runbase = self.runbase_mut(base_dir)?;
        let resolution = runbase.engine_mut().resolve_kbeans()?;
        runbase.advance(RunbaseState::BeansDiscovered);
        Ok(resolution)
    }

    /// Initializes the runbase of `base_dir` with the actions of `tokens` and
    /// of the properties. Runs once per runbase.
    pub fn init_runbase(&mut self, base_dir: &Path, tokens: &[String]) -> Result<()> {
        self.init_runbase_with(base_dir, tokens, BeanSelection::Involved)
    }

    /// Instance of `class_name` in the runbase of `base_dir`, created,
    /// injected and initialized if absent.
    ///
    /// The instance is registered before its imports and `init` hook run, so
    /// import cycles resolve to it. Accessing it during its own `init` fails
    /// with [`Error::BeanBusy`]. A failed initialization unregisters it.
    pub fn load_bean(&mut self, base_dir: &Path, class_name: &str) -> Result<BeanHandle> {
        if let Some(handle) = self.runbase(base_dir).and_then(|runbase| runbase.bean(class_name)) {
            return Ok(handle);
        }
        let runbase = self.runbase_mut(base_dir)?;
        let descriptor = runbase.engine_mut().discovery_mut()?.load(class_name)?;
        let handle = BeanHandle::new(class_name, base_dir, descriptor.instantiate()?);
        runbase.register(handle.clone());
        debug!("Registered KBean {class_name} in {}", base_dir.display());

        if let Err(e) = self.initialize_bean(base_dir, &descriptor, &handle) {
            if let Some(runbase) = self.runbases.get_mut(base_dir) {
                runbase.unregister(class_name);
            }
            return Err(e.context(format!(
                "Initializing KBean {} (base dir: {})",
                short_name(class_name),
                base_dir.display()
            )));
        }
        Ok(handle)
    }

    /// Like [`load_bean`](Self::load_bean), the class designated by any
    /// accepted KBean name.
    pub fn load_bean_by_name(&mut self, base_dir: &Path, name: &str) -> Result<BeanHandle> {
        let class_name = self
            .runbase_mut(base_dir)?
            .engine_mut()
            .discovery_mut()?
            .resolve_name(name)?;
        self.load_bean(base_dir, &class_name)
    }

    /// Bean of another project. Its runbase is initialized first with its
    /// init bean only.
    pub fn load_imported(&mut self, base_dir: &Path, class_name: &str) -> Result<BeanHandle> {
        let base_dir = canonical_dir(base_dir)?;
        self.init_runbase_with(&base_dir, &[], BeanSelection::InitBeanOnly)?;
        self.load_bean(&base_dir, class_name)
    }

    /// Invokes the methods of the INVOKE actions, in order.
    pub fn run(&mut self, base_dir: &Path) -> Result<()> {
        let actions = self.runbase_mut(base_dir)?.actions().clone();
        self.run_actions(base_dir, &actions)
    }

    /// Invokes the methods of the INVOKE actions of `actions` on the beans of
    /// `base_dir`, loading them if needed. Stops at the first failure.
    pub fn run_actions(&mut self, base_dir: &Path, actions: &ActionContainer) -> Result<()> {
        for action in actions.invokes() {
            let ActionKind::Invoke { method } = &action.kind else {
                continue;
            };
            let handle = self.load_bean(base_dir, &action.bean)?;
            let descriptor = self
                .catalog
                .get(&action.bean)
                .ok_or_else(|| Error::StaleClass(action.bean.clone()))?;
            info!("Invoking {}", action.target());
            let mut guard = handle.borrow_mut()?;
            let mut ctx = BeanContext::new(self, base_dir);
            match descriptor.invoke(method, &mut **guard, &mut ctx) {
                Some(result) => result.with_context(|| {
                    format!("Method {} failed (base dir: {})", action.target(), base_dir.display())
                })?,
                None => {
                    return Err(Error::MethodNotFound {
                        method: method.clone(),
                        bean: action.bean.clone(),
                        base_dir: base_dir.to_path_buf(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Directories imported by `base_dir`, directly or not, each listed once
    /// and after its own imports.
    pub fn transitive_imports(&self, base_dir: &Path) -> Vec<PathBuf> {
        let mut visited = HashSet::from([base_dir.to_path_buf()]);
        let mut result = Vec::new();
        self.collect_imports(base_dir, &mut visited, &mut result);
        result
    }

    fn collect_imports(&self, base_dir: &Path, visited: &mut HashSet<PathBuf>, result: &mut Vec<PathBuf>) {
        let Some(runbase) = self.runbases.get(base_dir) else {
            return;
        };
        for imported in runbase.imported_dirs() {
            if visited.insert(imported.clone()) {
                self.collect_imports(imported, visited, result);
                result.push(imported.clone());
            }
        }
    }

    fn resolve_own_classpath(&mut self, base_dir: &Path) -> Result<ClasspathSetupResult> {
        let imported_dirs = self
            .runbase_mut(base_dir)?
            .engine_mut()
            .parse_sources()?
            .imported_dirs
            .clone();
        let mut imported_classpath = PathSequence::new();
        for imported in &imported_dirs {
            let setup = self
                .resolve_classpaths(imported)
                .with_context(|| format!("Resolving imported project {}", imported.display()))?;
            imported_classpath = imported_classpath.and(&setup.run_classpath);
        }
        let runbase = self.runbase_mut(base_dir)?;
        let setup = runbase.engine_mut().setup_classpath(&imported_classpath)?;
        runbase.advance(RunbaseState::ClasspathResolved);
        Ok(setup)
    }

    fn init_runbase_with(&mut self, base_dir: &Path, tokens: &[String], selection: BeanSelection) -> Result<()> {
        self.resolve_kbeans(base_dir)?;
        let runbase = self.runbase_mut(base_dir)?;
        if runbase.state() == RunbaseState::Running {
            return Ok(());
        }
        let actions = runbase.engine_mut().resolve_actions(tokens)?;
        let mut beans = actions.involved_beans();
        if selection == BeanSelection::InitBeanOnly {
            beans.truncate(1);
        }
        debug!("Actions of {}: {}", base_dir.display(), actions.len());
        runbase.set_actions(actions);
        runbase.advance(RunbaseState::Running);

        for bean in &beans {
            self.load_bean(base_dir, bean)?;
        }
        self.post_init_beans(base_dir)
    }

    /// Runs `post_init` once on every registered bean, including beans
    /// loaded by another bean's `post_init`.
    fn post_init_beans(&mut self, base_dir: &Path) -> Result<()> {
        let mut done: HashSet<String> = HashSet::new();
        loop {
            let pending: Vec<BeanHandle> = self
                .runbase_mut(base_dir)?
                .beans()
                .filter(|handle| !done.contains(handle.class_name()))
                .cloned()
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            for handle in pending {
                done.insert(handle.class_name().to_string());
                let mut guard = handle.borrow_mut()?;
                let mut ctx = BeanContext::new(self, base_dir);
                guard
                    .post_init(&mut ctx)
                    .with_context(|| format!("Post-initializing KBean {}", short_name(handle.class_name())))?;
            }
        }
    }

    fn initialize_bean(&mut self, base_dir: &Path, descriptor: &KBeanDescriptor, handle: &BeanHandle) -> Result<()> {
        let class_name = descriptor.class_name();
        let runbase = self.runbase_mut(base_dir)?;
        let actions = runbase.actions();
        let values = actions.set_values_for(class_name);
        let set_actions: Vec<KBeanAction> = actions.set_actions_for(class_name).cloned().collect();
        let init_action = actions
            .actions()
            .iter()
            .find(|action| action.is_init() && action.bean == class_name)
            .cloned()
            .unwrap_or_else(|| KBeanAction::init(class_name, ActionSource::Loaded));

        {
            let mut guard = handle.borrow_mut()?;
            let bean: &mut dyn KBean = &mut **guard;
            let consumed = FieldInjector::inject(descriptor.fields(), bean.as_any_mut(), &values)?;
            for key in values.keys().filter(|key| !consumed.contains(*key)) {
                warn!("Value of '{key}' matches no field of KBean {class_name}, ignored");
            }
        }
        runbase.record_effective(init_action);
        for action in set_actions {
            runbase.record_effective(action);
        }

        for import in descriptor.imports() {
            let import_error = |reason: String| Error::ImportError {
                holder: class_name.to_string(),
                field: import.field.clone(),
                class: import.class_name.clone(),
                base_dir: base_dir.to_path_buf(),
                reason,
            };
            let target = base_dir.join(&import.relative_dir);
            let imported = self
                .load_imported(&target, &import.class_name)
                .map_err(|e| import_error(e.to_string()))?;
            let mut guard = handle.borrow_mut()?;
            (import.setter)(&mut **guard, imported).map_err(import_error)?;
        }

        let mut guard = handle.borrow_mut()?;
        let mut ctx = BeanContext::new(self, base_dir);
        guard.init(&mut ctx)
    }

    fn report(&self, base_dir: &Path) -> Result<ExecutionReport> {
        let runbase = self
            .runbase(base_dir)
            .ok_or_else(|| Error::Other(format!("No runbase for {}", base_dir.display())))?;
        let imported_dirs = self.transitive_imports(base_dir);
        let runbases = std::iter::once(base_dir)
            .chain(imported_dirs.iter().map(PathBuf::as_path))
            .filter_map(|dir| self.runbase(dir))
            .map(|runbase| RunbaseReport {
                base_dir: runbase.base_dir().to_path_buf(),
                effective_actions: runbase.effective_actions().to_vec(),
            })
            .collect();
        Ok(ExecutionReport {
            base_dir: base_dir.to_path_buf(),
            actions: runbase.actions().clone(),
            classpath: runbase.classpath().clone(),
            imported_dirs,
            runbases,
        })
    }

    fn runbase_mut(&mut self, base_dir: &Path) -> Result<&mut Runbase> {
        if !self.runbases.contains_key(base_dir) {
            let runbase = self.create_runbase(base_dir)?;
            self.runbases.insert(base_dir.to_path_buf(), runbase);
        }
        self.runbases
            .get_mut(base_dir)
            .ok_or_else(|| Error::Other(format!("No runbase for {}", base_dir.display())))
    }

    fn create_runbase(&self, base_dir: &Path) -> Result<Runbase> {
        debug!("Creating runbase for {}", base_dir.display());
        let properties = Rc::new(
            Properties::load(
                base_dir,
                &self.system_properties,
                &self.env,
                self.global_properties.as_deref(),
            )
            .with_context(|| format!("Loading properties of {}", base_dir.display()))?,
        );
        let resolver = match &self.resolver {
            Some(resolver) => resolver.clone(),
            None => Rc::new(LocalRepoResolver::new(default_repo_dir(&properties, &self.env))),
        };
        let collaborators = Collaborators {
            resolver,
            compiler: self.compiler.clone(),
            scanner: self.scanner.clone(),
            catalog: self.catalog.clone(),
        };
        let engine = Engine::new(base_dir, properties, &self.settings, &collaborators, &self.dependencies)?;
        Ok(Runbase::new(engine))
    }
}

pub struct WorkspaceBuilder {
    catalog: BeanCatalog,
    resolver: Option<Rc<dyn DependencyResolver>>,
    compiler: Option<Rc<dyn Compiler>>,
    scanner: Option<Rc<dyn ClasspathScanner>>,
    settings: Settings,
    system_properties: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    global_properties: Option<PathBuf>,
    dependencies: Vec<String>,
}

impl WorkspaceBuilder {
    pub fn resolver(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    pub fn compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Some(Rc::new(compiler));
        self
    }

    pub fn scanner(mut self, scanner: impl ClasspathScanner + 'static) -> Self {
        self.scanner = Some(Rc::new(scanner));
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// `-D` overrides, the highest precedence property layer.
    pub fn system_properties(mut self, system_properties: BTreeMap<String, String>) -> Self {
        self.system_properties = system_properties;
        self
    }

    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn global_properties_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_properties = path;
        self
    }

    /// Command-line `@` dependency descriptors, added to every project.
    pub fn dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn build(self) -> Workspace {
        let compiler = self
            .compiler
            .unwrap_or_else(|| Rc::new(ProcessCompiler::from_env(&self.env)));
        Workspace {
            catalog: Rc::new(self.catalog),
            resolver: self.resolver,
            compiler,
            scanner: self.scanner.unwrap_or_else(|| Rc::new(DirectoryScanner::new())),
            settings: self.settings,
            system_properties: self.system_properties,
            env: self.env,
            global_properties: self.global_properties,
            dependencies: self.dependencies,
            runbases: IndexMap::new(),
            resolving: Vec::new(),
        }
    }
}

fn canonical_dir(dir: &Path) -> Result<PathBuf> {
    dir.canonicalize()
        .map_err(|_| Error::ConfigError(format!("Project dir {} does not exist", dir.display())))
}

/// `jeka.repos.local`, else the repository under the user tool home.
fn default_repo_dir(properties: &Properties, env: &BTreeMap<String, String>) -> PathBuf {
    if let Some(dir) = properties.get(LOCAL_REPO_PROP) {
        return PathBuf::from(dir);
    }
    let home = env
        .get(USER_HOME_ENV)
        .map(PathBuf::from)
        .or_else(|| env.get("HOME").map(|home| Path::new(home).join(".jeka")))
        .unwrap_or_else(|| PathBuf::from(".jeka"));
    home.join("cache").join("repo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencySet;
    use tempfile::TempDir;

    struct NoDeps;

    impl DependencyResolver for NoDeps {
        fn resolve(&self, _dependencies: &DependencySet) -> Result<PathSequence> {
            Ok(PathSequence::new())
        }
    }

    #[derive(Default)]
    struct Greeter {
        name: String,
        greeted: Vec<String>,
    }

    impl KBean for Greeter {}

    #[derive(Default)]
    struct Busy;

    impl KBean for Busy {
        fn init(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
            let me = ctx.find("app.BusyKBean").expect("registered before init");
            me.with::<Busy, _>(|_| ()).map(|_| ())
        }
    }

    fn catalog() -> BeanCatalog {
        BeanCatalog::builder()
            .with_bean(
                KBeanDescriptor::builder::<Greeter>("app.GreeterKBean")
                    .header("Greets")
                    .field("name", |g| &mut g.name)
                    .method("greet", |g, _| {
                        let line = format!("hello {}", g.name);
                        g.greeted.push(line);
                        Ok(())
                    })
                    .build(),
            )
            .with_bean(KBeanDescriptor::builder::<Busy>("app.BusyKBean").header("Busy").build())
            .build()
    }

    fn project(class_names: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let classes = temp_dir.path().join(".jeka-work/jeka-src-classes/app");
        std::fs::create_dir_all(&classes).unwrap();
        for name in class_names {
            std::fs::write(classes.join(format!("{name}.class")), b"").unwrap();
        }
        temp_dir
    }

    fn workspace() -> Workspace {
        Workspace::builder(catalog()).resolver(NoDeps).build()
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_execute_injects_and_invokes() -> Result<()> {
        let project = project(&["GreeterKBean"]);
        let mut workspace = workspace();
        let report = workspace.execute(project.path(), &tokens("greeter: name=bob greet greet"))?;
        let runbase = workspace.runbase(&report.base_dir).unwrap();
        let greeted = runbase
            .bean("app.GreeterKBean")
            .unwrap()
            .with::<Greeter, _>(|g| g.greeted.clone())?;
        assert_eq!(greeted, vec!["hello bob", "hello bob"]);
        assert_eq!(runbase.state(), RunbaseState::Running);
        let effective: Vec<String> = report.runbases[0]
            .effective_actions
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(effective.contains(&"SET_FIELD greeter.name=bob".to_string()));
        Ok(())
    }

    #[test]
    fn test_reentrant_access_during_init_is_busy() {
        let project = project(&["GreeterKBean", "BusyKBean"]);
        let mut workspace = workspace();
        let err = workspace
            .execute(project.path(), &tokens("busy:"))
            .unwrap_err();
        assert!(matches!(err.root(), Error::BeanBusy(_)));
        let base_dir = project.path().canonicalize().unwrap();
        assert!(workspace.runbase(&base_dir).unwrap().bean("app.BusyKBean").is_none());
    }

    #[test]
    fn test_unknown_dir_fails() {
        let mut workspace = workspace();
        let err = workspace.execute(Path::new("/nonexistent/project"), &[]).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_default_repo_dir() {
        let env = BTreeMap::from([("JEKA_USER_HOME".to_string(), "/home/u/.jk".to_string())]);
        assert_eq!(
            default_repo_dir(&Properties::new(), &env),
            PathBuf::from("/home/u/.jk/cache/repo")
        );
        let props = Properties::new().with_layer(
            "test",
            [("jeka.repos.local".to_string(), "/repo".to_string())],
        );
        assert_eq!(default_repo_dir(&props, &env), PathBuf::from("/repo"));
    }
}
