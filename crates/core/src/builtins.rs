//! KBeans shipped with the tool, always present on the KBean classpath.

use crate::bean::{BeanContext, KBean, KBeanDescriptor, short_name};
use crate::error::Result;

pub const INFO_KBEAN: &str = "jeka.builtins.InfoKBean";

pub const CLASS_NAMES: &[&str] = &[INFO_KBEAN];

pub fn descriptors() -> Vec<KBeanDescriptor> {
    vec![info_descriptor()]
}

/// Displays what the engine resolved for the current project. Default KBean
/// of projects that declare none.
#[derive(Debug, Default)]
pub struct InfoKBean {
    /// Also list field paths in `beans`.
    pub fields: bool,
}

impl KBean for InfoKBean {}

impl InfoKBean {
    fn info(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
        let Some(runbase) = ctx.runbase() else {
            return Ok(());
        };
        println!("Base dir        : {}", runbase.base_dir().display());
        if let Some(resolution) = runbase.resolution() {
            println!("Default KBean   : {}", resolution.default_bean);
            println!("Init KBean      : {}", resolution.init_bean);
            println!("Local KBeans    : {}", resolution.local.len());
            println!("Visible KBeans  : {}", resolution.all.len());
        }
        println!("Classpath       : {} entries", runbase.classpath().len());
        println!("Imported dirs   : {}", runbase.imported_dirs().len());
        Ok(())
    }

    fn beans(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
        let catalog = ctx.catalog();
        let Some(resolution) = ctx.runbase().and_then(|r| r.resolution().cloned()) else {
            return Ok(());
        };
        let width = resolution
            .all
            .iter()
            .map(|name| short_name(name).len())
            .max()
            .unwrap_or(0);
        for class_name in &resolution.all {
            let Some(info) = catalog.info(class_name) else {
                continue;
            };
            let marker = if resolution.default_bean == *class_name { "*" } else { " " };
            let header = info.doc.map(|doc| doc.header).unwrap_or_default();
            println!("{marker} {:<width$}  {header}", info.short_name);
            if self.fields {
                for field in info.fields {
                    println!("      {}: {}", field.path, field.kind);
                }
            }
        }
        Ok(())
    }

    fn classpath(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
        for entry in ctx.classpath().iter() {
            println!("{}", entry.display());
        }
        Ok(())
    }

    fn imports(&mut self, ctx: &mut BeanContext<'_>) -> Result<()> {
        let base_dir = ctx.base_dir().to_path_buf();
        for dir in ctx.workspace().transitive_imports(&base_dir) {
            println!("{}", dir.display());
        }
        Ok(())
    }
}

fn info_descriptor() -> KBeanDescriptor {
    KBeanDescriptor::builder::<InfoKBean>(INFO_KBEAN)
        .header("Displays information about the current project.")
        .detail("Default KBean of projects whose jeka-src declares none.")
        .field("fields", |bean| &mut bean.fields)
        .doc("Also list the fields of each KBean")
        .method("info", InfoKBean::info)
        .doc("Displays base dir, default KBean and classpath size")
        .method("beans", InfoKBean::beans)
        .doc("Lists the KBeans visible from the project")
        .method("classpath", InfoKBean::classpath)
        .doc("Lists the run classpath entries")
        .method("imports", InfoKBean::imports)
        .doc("Lists the imported project dirs, transitively")
        .build()
}
