use super::BeanCatalog;
use crate::config::Properties;
use crate::deps::PathSequence;
use crate::error::{Error, Result};
use crate::runbase::{Runbase, Workspace};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Upcast to `Any`, implemented for every sized `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A build component living in a runbase.
///
/// Fields and methods are exposed through its
/// [`KBeanDescriptor`](super::KBeanDescriptor). Hooks run once per runbase:
/// `init` right after field injection, `post_init` after every bean requested
/// by the command line has been initialized.
pub trait KBean: AsAny + 'static {
    fn init(&mut self, _ctx: &mut BeanContext<'_>) -> Result<()> {
        Ok(())
    }

    fn post_init(&mut self, _ctx: &mut BeanContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Shared reference to a registered bean instance.
#[derive(Clone)]
pub struct BeanHandle {
    class_name: Rc<str>,
    base_dir: Rc<Path>,
    cell: Rc<RefCell<Box<dyn KBean>>>,
}

impl fmt::Debug for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanHandle")
            .field("class_name", &self.class_name)
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

impl BeanHandle {
    pub(crate) fn new(class_name: &str, base_dir: &Path, bean: Box<dyn KBean>) -> Self {
        Self {
            class_name: Rc::from(class_name),
            base_dir: Rc::from(base_dir),
            cell: Rc::new(RefCell::new(bean)),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// True if both handles point to the same instance.
    pub fn same_instance(&self, other: &BeanHandle) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Runs `f` on the bean viewed as `T`.
    pub fn with<T: KBean, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self.borrow()?;
        let bean: &dyn KBean = &**guard;
        let typed = bean
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.type_mismatch::<T>())?;
        Ok(f(typed))
    }

    /// Runs `f` on the bean viewed as a mutable `T`.
    pub fn with_mut<T: KBean, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.borrow_mut()?;
        let bean: &mut dyn KBean = &mut **guard;
        match bean.as_any_mut().downcast_mut::<T>() {
            Some(typed) => Ok(f(typed)),
            None => Err(self.type_mismatch::<T>()),
        }
    }

    pub(crate) fn borrow(&self) -> Result<Ref<'_, Box<dyn KBean>>> {
        self.cell
            .try_borrow()
            .map_err(|_| Error::BeanBusy(self.class_name.to_string()))
    }

    pub(crate) fn borrow_mut(&self) -> Result<RefMut<'_, Box<dyn KBean>>> {
        self.cell
            .try_borrow_mut()
            .map_err(|_| Error::BeanBusy(self.class_name.to_string()))
    }

    fn type_mismatch<T>(&self) -> Error {
        Error::Other(format!(
            "KBean {} is not a {}",
            self.class_name,
            std::any::type_name::<T>()
        ))
    }
}

/// What a bean sees of its runbase while its hooks or methods run.
pub struct BeanContext<'a> {
    workspace: &'a mut Workspace,
    base_dir: PathBuf,
}

impl<'a> BeanContext<'a> {
    pub(crate) fn new(workspace: &'a mut Workspace, base_dir: &Path) -> Self {
        Self {
            workspace,
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn runbase(&self) -> Option<&Runbase> {
        self.workspace.runbase(&self.base_dir)
    }

    pub fn properties(&self) -> Option<Rc<Properties>> {
        self.runbase().map(|runbase| runbase.properties().clone())
    }

    pub fn catalog(&self) -> Rc<BeanCatalog> {
        self.workspace.catalog()
    }

    pub fn classpath(&self) -> PathSequence {
        self.runbase()
            .map(|runbase| runbase.classpath().clone())
            .unwrap_or_default()
    }

    /// Bean of this runbase, instantiated if absent. The name may be any
    /// accepted KBean name form.
    pub fn load(&mut self, name: &str) -> Result<BeanHandle> {
        let base_dir = self.base_dir.clone();
        self.workspace.load_bean_by_name(&base_dir, name)
    }

    /// Already registered bean of this runbase.
    pub fn find(&self, class_name: &str) -> Option<BeanHandle> {
        self.runbase().and_then(|runbase| runbase.bean(class_name))
    }

    /// Bean of the project at `relative_dir`, whose runbase is initialized
    /// first if needed.
    pub fn load_from(&mut self, relative_dir: &Path, class_name: &str) -> Result<BeanHandle> {
        let target = self.base_dir.join(relative_dir);
        self.workspace.load_imported(&target, class_name)
    }

    pub fn workspace(&mut self) -> &mut Workspace {
        self.workspace
    }
}
