//! End-to-end tests of project initialization and method execution

use jeka_runner_core::compile::{CompileOutcome, CompileSpec, Compiler};
use jeka_runner_core::deps::DependencySet;
use jeka_runner_core::{
    ActionContainer, ActionKind, ActionSource, BeanCatalog, BeanContext, BeanHandle,
    DependencyResolver, Error, KBean, KBeanAction, KBeanDescriptor, PathSequence, Result,
    RunbaseState, Settings, Workspace,
};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct CountingResolver {
    calls: Rc<Cell<usize>>,
}

impl DependencyResolver for CountingResolver {
    fn resolve(&self, _dependencies: &DependencySet) -> Result<PathSequence> {
        self.calls.set(self.calls.get() + 1);
        Ok(PathSequence::new())
    }
}

/// Writes one class file per source, under the package directory the source
/// sits in.
struct FakeCompiler;

impl Compiler for FakeCompiler {
    fn compile(&self, spec: &CompileSpec) -> Result<CompileOutcome> {
        let base_dir = spec.output_dir.parent().unwrap().parent().unwrap();
        let src_dir = base_dir.join("jeka-src");
        for source in &spec.sources {
            let relative = source.strip_prefix(&src_dir).unwrap().with_extension("class");
            let target = spec.output_dir.join(relative);
            fs::create_dir_all(target.parent().unwrap())?;
            fs::write(target, b"")?;
        }
        Ok(CompileOutcome::success())
    }
}

#[derive(Default)]
struct ProjectX {
    name: String,
    calls: Vec<String>,
}

impl KBean for ProjectX {}

#[derive(Default)]
struct Build {
    lib: Option<BeanHandle>,
    lib_sees_build: bool,
}

impl KBean for Build {}

#[derive(Default)]
struct Lib {
    build: Option<BeanHandle>,
}

impl KBean for Lib {}

#[derive(Default)]
struct Orphan {
    lib: Option<BeanHandle>,
}

impl KBean for Orphan {}

#[derive(Default)]
struct Base;

impl KBean for Base {}

#[derive(Default)]
struct Stage;

impl KBean for Stage {
    fn post_init(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
        ctx.load("tool").map(|_| ())
    }
}

#[derive(Default)]
struct Tool {
    post_inits: usize,
}

impl KBean for Tool {
    fn post_init(&mut self, _ctx: &mut BeanContext<'_>) -> Result<()> {
        self.post_inits += 1;
        Ok(())
    }
}

fn catalog() -> BeanCatalog {
    BeanCatalog::builder()
        .with_bean(
            KBeanDescriptor::builder::<ProjectX>("app.ProjectXKBean")
                .header("Builds project X")
                .field("name", |p| &mut p.name)
                .method("clean", |p, _| {
                    p.calls.push("clean".to_string());
                    Ok(())
                })
                .method("pack", |p, _| {
                    p.calls.push(format!("pack:{}", p.name));
                    Ok(())
                })
                .build(),
        )
        .with_bean(
            KBeanDescriptor::builder::<Build>("app.BuildKBean")
                .header("Builds the app")
                .import("lib", "../lib", "lib.LibKBean", |b, handle| b.lib = Some(handle))
                .method("run", |b, _| {
                    let lib = b
                        .lib
                        .clone()
                        .ok_or_else(|| Error::Other("lib not imported".to_string()))?;
                    b.lib_sees_build = lib.with::<Lib, _>(|l| l.build.is_some())?;
                    Ok(())
                })
                .build(),
        )
        .with_bean(
            KBeanDescriptor::builder::<Lib>("lib.LibKBean")
                .header("Builds the library")
                .import("build", "../app", "app.BuildKBean", |l, handle| l.build = Some(handle))
                .build(),
        )
        .with_bean(
            KBeanDescriptor::builder::<Orphan>("app.OrphanKBean")
                .header("Imports a project that does not exist")
                .import("lib", "../missing", "lib.LibKBean", |o, handle| o.lib = Some(handle))
                .build(),
        )
        .with_bean(
            KBeanDescriptor::builder::<Orphan>("app.BaseUserKBean")
                .header("Imports an abstract bean")
                .import("lib", "../lib", "lib.BaseKBean", |o, handle| o.lib = Some(handle))
                .build(),
        )
        .with_bean(KBeanDescriptor::abstract_builder::<Base>("lib.BaseKBean").build())
        .with_bean(
            KBeanDescriptor::builder::<Stage>("app.StageKBean")
                .header("Loads the tool bean once initialized")
                .build(),
        )
        .with_bean(
            KBeanDescriptor::builder::<Tool>("app.ToolKBean")
                .header("Counts its post-initializations")
                .build(),
        )
        .build()
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn new_workspace(resolver: CountingResolver) -> Workspace {
    Workspace::builder(catalog())
        .resolver(resolver)
        .compiler(FakeCompiler)
        .build()
}

/// Project whose `jeka-src` holds one empty source per class of `classes`,
/// given as `package.Class`.
fn project_of(dir: &Path, classes: &[&str]) {
    for class in classes {
        let (package, name) = class.split_once('.').unwrap();
        write(
            &dir.join(format!("jeka-src/{package}/{name}.java")),
            &format!("package {package};\nclass {name} extends KBean {{}}\n"),
        );
    }
}

fn project_x() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(
        &temp_dir.path().join("jeka-src/app/ProjectXKBean.java"),
        "package app;\nclass ProjectXKBean extends KBean {}\n",
    );
    temp_dir
}

#[test]
fn test_scoped_methods_run_in_order() -> Result<()> {
    let project = project_x();
    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.execute(project.path(), &tokens("projectX: clean pack"))?;

    let kinds: Vec<&ActionKind> = report.actions.actions().iter().map(|a| &a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &ActionKind::Init,
            &ActionKind::Invoke { method: "clean".to_string() },
            &ActionKind::Invoke { method: "pack".to_string() },
        ]
    );
    assert!(report.actions.actions().iter().all(|a| a.bean == "app.ProjectXKBean"));

    let calls = workspace
        .runbase(&report.base_dir)
        .unwrap()
        .bean("app.ProjectXKBean")
        .unwrap()
        .with::<ProjectX, _>(|p| p.calls.clone())?;
    assert_eq!(calls, vec!["clean", "pack:"]);
    Ok(())
}

#[test]
fn test_command_line_overrides_properties() -> Result<()> {
    let project = project_x();
    write(
        &project.path().join("jeka.properties"),
        "projectX#name=fromProps\nunknown#field=ignored\n",
    );

    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.execute(project.path(), &tokens("pack"))?;
    let handle = workspace.runbase(&report.base_dir).unwrap().bean("app.ProjectXKBean").unwrap();
    assert_eq!(handle.with::<ProjectX, _>(|p| p.calls.clone())?, vec!["pack:fromProps"]);

    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.execute(project.path(), &tokens("projectX: name=fromCmd pack"))?;
    let handle = workspace.runbase(&report.base_dir).unwrap().bean("app.ProjectXKBean").unwrap();
    assert_eq!(handle.with::<ProjectX, _>(|p| p.calls.clone())?, vec!["pack:fromCmd"]);
    Ok(())
}

#[test]
fn test_resolved_classpath_is_cached_between_runs() -> Result<()> {
    let project = project_x();
    let props = project.path().join("jeka.properties");
    write(&props, "jeka.inject.classpath=org.acme:lib:1.0\n");
    let resolver = CountingResolver::default();

    new_workspace(resolver.clone()).execute(project.path(), &[])?;
    assert_eq!(resolver.calls.get(), 1);

    new_workspace(resolver.clone()).execute(project.path(), &[])?;
    assert_eq!(resolver.calls.get(), 1);

    write(&props, "jeka.inject.classpath=org.acme:lib:1.1\n");
    new_workspace(resolver.clone()).execute(project.path(), &[])?;
    assert_eq!(resolver.calls.get(), 2);
    Ok(())
}

#[test]
fn test_requested_default_kbean_must_exist() {
    let project = project_x();
    let settings = Settings {
        default_kbean: Some("missing".to_string()),
        ..Settings::default()
    };
    let mut workspace = Workspace::builder(catalog())
        .resolver(CountingResolver::default())
        .compiler(FakeCompiler)
        .settings(settings)
        .build();
    let err = workspace.execute(project.path(), &[]).unwrap_err();
    assert!(matches!(err.root(), Error::KBeanNotFound { .. }));
}

/// `app` and `lib` import each other, both for their classpath and for a
/// bean field.
fn import_cycle() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let app = temp_dir.path().join("app");
    let lib = temp_dir.path().join("lib");
    write(
        &app.join("jeka-src/app/BuildKBean.java"),
        "package app;\nclass BuildKBean extends KBean {\n  @JkImportProject(\"../lib\")\n  LibKBean lib;\n}\n",
    );
    write(
        &lib.join("jeka-src/lib/LibKBean.java"),
        "package lib;\nclass LibKBean extends KBean {\n  @JkImportProject(\"../app\")\n  BuildKBean build;\n}\n",
    );
    let app = app.canonicalize().unwrap();
    let lib = lib.canonicalize().unwrap();
    (temp_dir, app, lib)
}

#[test]
fn test_import_cycle_resolves_to_published_instances() -> Result<()> {
    let (_temp_dir, app, lib) = import_cycle();
    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.execute(&app, &tokens("build: run"))?;

    assert_eq!(workspace.transitive_imports(&app), vec![lib.clone()]);
    assert_eq!(report.imported_dirs, vec![lib.clone()]);

    let build = workspace.runbase(&app).unwrap().bean("app.BuildKBean").unwrap();
    assert!(build.with::<Build, _>(|b| b.lib_sees_build)?);

    let lib_bean = workspace.runbase(&lib).unwrap().bean("lib.LibKBean").unwrap();
    let seen_build = lib_bean.with::<Lib, _>(|l| l.build.clone())?.unwrap();
    assert!(seen_build.same_instance(&build));
    assert!(workspace.runbase(&lib).unwrap().bean("app.BuildKBean").is_none());
    Ok(())
}

#[test]
fn test_imported_classes_are_visible_but_not_local() -> Result<()> {
    let (_temp_dir, app, _lib) = import_cycle();
    let mut workspace = new_workspace(CountingResolver::default());
    let resolution = workspace.resolve_kbeans(&app)?;
    assert_eq!(resolution.local, vec!["app.BuildKBean"]);
    assert!(resolution.all.contains(&"lib.LibKBean".to_string()));
    assert_eq!(resolution.default_bean, "app.BuildKBean");
    Ok(())
}

#[test]
fn test_unknown_method_stops_the_run() -> Result<()> {
    let project = project_x();
    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.prepare(project.path(), &tokens("projectX:"))?;

    let bean = "app.ProjectXKBean";
    let actions: ActionContainer = ["clean", "deploy", "pack"]
        .into_iter()
        .map(|method| KBeanAction::invoke(bean, method, ActionSource::CommandLine))
        .collect();
    let err = workspace.run_actions(&report.base_dir, &actions).unwrap_err();
    match err.root() {
        Error::MethodNotFound { method, bean: class, base_dir } => {
            assert_eq!(method, "deploy");
            assert_eq!(class, bean);
            assert_eq!(base_dir, &report.base_dir);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let handle = workspace.runbase(&report.base_dir).unwrap().bean(bean).unwrap();
    assert_eq!(handle.with::<ProjectX, _>(|p| p.calls.clone())?, vec!["clean"]);
    Ok(())
}

#[test]
fn test_import_of_missing_project_names_holder_and_field() {
    let temp_dir = TempDir::new().unwrap();
    let app = temp_dir.path().join("app");
    project_of(&app, &["app.OrphanKBean"]);
    let app = app.canonicalize().unwrap();

    let mut workspace = new_workspace(CountingResolver::default());
    let err = workspace.execute(&app, &[]).unwrap_err();
    match err.root() {
        Error::ImportError { holder, field, class, base_dir, .. } => {
            assert_eq!(holder, "app.OrphanKBean");
            assert_eq!(field, "lib");
            assert_eq!(class, "lib.LibKBean");
            assert_eq!(base_dir, &app);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(workspace.runbase(&app).unwrap().bean("app.OrphanKBean").is_none());
}

#[test]
fn test_import_of_abstract_bean_fails() {
    let temp_dir = TempDir::new().unwrap();
    let app = temp_dir.path().join("app");
    project_of(&app, &["app.BaseUserKBean"]);
    project_of(&temp_dir.path().join("lib"), &["lib.BaseKBean"]);
    let app = app.canonicalize().unwrap();

    let mut workspace = new_workspace(CountingResolver::default());
    let err = workspace.execute(&app, &[]).unwrap_err();
    match err.root() {
        Error::ImportError { holder, class, reason, .. } => {
            assert_eq!(holder, "app.BaseUserKBean");
            assert_eq!(class, "lib.BaseKBean");
            assert!(reason.contains("abstract"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_bean_loaded_in_post_init_is_post_initialized() -> Result<()> {
    let temp_dir = TempDir::new()?;
    project_of(temp_dir.path(), &["app.StageKBean", "app.ToolKBean"]);

    let mut workspace = new_workspace(CountingResolver::default());
    let report = workspace.execute(temp_dir.path(), &[])?;
    let runbase = workspace.runbase(&report.base_dir).unwrap();
    assert!(runbase.bean("app.StageKBean").is_some());
    let tool = runbase.bean("app.ToolKBean").unwrap();
    assert_eq!(tool.with::<Tool, _>(|t| t.post_inits)?, 1);
    Ok(())
}

#[test]
fn test_failed_action_parsing_leaves_runbase_retryable() -> Result<()> {
    let project = project_x();
    let mut workspace = new_workspace(CountingResolver::default());
    let err = workspace
        .execute(project.path(), &tokens("projectX: nope"))
        .unwrap_err();
    assert!(matches!(err.root(), Error::UnknownMember { .. }));

    let base_dir = project.path().canonicalize().unwrap();
    let runbase = workspace.runbase(&base_dir).unwrap();
    assert_ne!(runbase.state(), RunbaseState::Running);
    assert!(runbase.actions().is_empty());

    workspace.execute(project.path(), &tokens("projectX: pack"))?;
    let handle = workspace.runbase(&base_dir).unwrap().bean("app.ProjectXKBean").unwrap();
    assert_eq!(handle.with::<ProjectX, _>(|p| p.calls.clone())?, vec!["pack:"]);
    Ok(())
}
