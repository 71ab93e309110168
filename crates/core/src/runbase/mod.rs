//! Per-project registries of KBean instances and the workspace owning them.

pub mod workspace;

pub use workspace::{ExecutionReport, RunbaseReport, Workspace, WorkspaceBuilder};

use crate::action::{ActionContainer, KBeanAction};
use crate::bean::BeanHandle;
use crate::config::Properties;
use crate::deps::PathSequence;
use crate::engine::{Engine, KBeanResolution};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunbaseState {
    #[default]
    Uninitialized,
    ClasspathResolved,
    BeansDiscovered,
    Running,
}

/// Execution context of one project directory: at most one instance per
/// KBean class, registered in instantiation order.
pub struct Runbase {
    base_dir: PathBuf,
    state: RunbaseState,
    engine: Engine,
    beans: IndexMap<String, BeanHandle>,
    actions: ActionContainer,
    effective_actions: Vec<KBeanAction>,
}

impl Runbase {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            base_dir: engine.base_dir().to_path_buf(),
            state: RunbaseState::Uninitialized,
            engine,
            beans: IndexMap::new(),
            actions: ActionContainer::new(),
            effective_actions: Vec::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn state(&self) -> RunbaseState {
        self.state
    }

    pub fn properties(&self) -> &Rc<Properties> {
        self.engine.properties()
    }

    /// Run classpath, empty until resolved.
    pub fn classpath(&self) -> &PathSequence {
        static EMPTY: PathSequence = PathSequence::new();
        self.engine
            .classpath_setup()
            .map(|setup| &setup.run_classpath)
            .unwrap_or(&EMPTY)
    }

    pub fn imported_dirs(&self) -> &[PathBuf] {
        self.engine
            .classpath_setup()
            .map(|setup| setup.imported_dirs.as_slice())
            .unwrap_or_default()
    }

    pub fn resolution(&self) -> Option<&KBeanResolution> {
        self.engine.resolution()
    }

    pub fn bean(&self, class_name: &str) -> Option<BeanHandle> {
        self.beans.get(class_name).cloned()
    }

    /// Registered beans, in instantiation order.
    pub fn beans(&self) -> impl Iterator<Item = &BeanHandle> {
        self.beans.values()
    }

    /// Actions parsed for this runbase.
    pub fn actions(&self) -> &ActionContainer {
        &self.actions
    }

    /// INIT and SET_FIELD actions actually applied, in order.
    pub fn effective_actions(&self) -> &[KBeanAction] {
        &self.effective_actions
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub(crate) fn advance(&mut self, state: RunbaseState) {
        self.state = self.state.max(state);
    }

    pub(crate) fn set_actions(&mut self, actions: ActionContainer) {
        self.actions = actions;
    }

    pub(crate) fn register(&mut self, handle: BeanHandle) {
        self.beans.insert(handle.class_name().to_string(), handle);
    }

    pub(crate) fn unregister(&mut self, class_name: &str) {
        self.beans.shift_remove(class_name);
    }

    pub(crate) fn record_effective(&mut self, action: KBeanAction) {
        self.effective_actions.push(action);
    }
}
