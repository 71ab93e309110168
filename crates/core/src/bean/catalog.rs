use super::descriptor::{BeanDoc, KBeanDescriptor};
use super::naming::short_name;
use crate::builtins;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Summary of a property field, for help output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub path: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Discovered identity of a KBean class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KBeanClassInfo {
    pub class_name: String,
    pub short_name: String,
    pub hierarchy: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<BeanDoc>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<String>,
}

impl KBeanClassInfo {
    pub fn of(descriptor: &KBeanDescriptor) -> Self {
        let fields = descriptor
            .fields()
            .field_paths()
            .into_iter()
            .map(|path| {
                let leaf = lookup(descriptor, &path);
                FieldInfo {
                    kind: leaf.map(|f| f.kind.to_string()).unwrap_or_default(),
                    doc: leaf.and_then(|f| f.doc.clone()),
                    path,
                }
            })
            .collect();
        Self {
            class_name: descriptor.class_name().to_string(),
            short_name: short_name(descriptor.class_name()),
            hierarchy: descriptor.hierarchy().to_vec(),
            doc: descriptor.doc().cloned(),
            fields,
            methods: descriptor
                .method_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

fn lookup<'a>(descriptor: &'a KBeanDescriptor, path: &str) -> Option<&'a super::FieldSpec> {
    let mut object = descriptor.fields();
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let field = object.field(segment)?;
        if segments.peek().is_none() {
            return Some(field);
        }
        object = field.nested_descriptor()?;
    }
    None
}

/// KBean types this process can instantiate, keyed by class name.
///
/// A class name found on a classpath but unknown here cannot be loaded.
#[derive(Clone)]
pub struct BeanCatalog {
    descriptors: IndexMap<String, Rc<KBeanDescriptor>>,
}

impl fmt::Debug for BeanCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCatalog")
            .field("descriptors", &self.descriptors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BeanCatalog {
    /// Catalog holding the builtin beans.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for descriptor in builtins::descriptors() {
            catalog.register(descriptor);
        }
        catalog
    }

    pub fn empty() -> Self {
        Self {
            descriptors: IndexMap::new(),
        }
    }

    pub fn builder() -> BeanCatalogBuilder {
        BeanCatalogBuilder {
            catalog: Self::new(),
        }
    }

    pub fn register(&mut self, descriptor: KBeanDescriptor) {
        self.descriptors
            .insert(descriptor.class_name().to_string(), Rc::new(descriptor));
    }

    pub fn get(&self, class_name: &str) -> Option<Rc<KBeanDescriptor>> {
        self.descriptors.get(class_name).cloned()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.descriptors.contains_key(class_name)
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn is_builtin(class_name: &str) -> bool {
        builtins::CLASS_NAMES.contains(&class_name)
    }

    pub fn info(&self, class_name: &str) -> Option<KBeanClassInfo> {
        self.descriptors
            .get(class_name)
            .map(|descriptor| KBeanClassInfo::of(descriptor))
    }
}

impl Default for BeanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for catalogs holding project beans next to the builtin ones.
pub struct BeanCatalogBuilder {
    catalog: BeanCatalog,
}

impl BeanCatalogBuilder {
    pub fn with_bean(mut self, descriptor: KBeanDescriptor) -> Self {
        self.catalog.register(descriptor);
        self
    }

    pub fn build(self) -> BeanCatalog {
        self.catalog
    }
}
