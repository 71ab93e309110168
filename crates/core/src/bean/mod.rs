//! KBean object model: typed descriptors standing for reflection, value
//! coercion, naming conventions and field injection.

pub mod catalog;
pub mod coerce;
pub mod descriptor;
pub mod injector;
pub mod instance;
pub mod naming;

pub use catalog::{BeanCatalog, BeanCatalogBuilder, FieldInfo, KBeanClassInfo};
pub use coerce::{EnumField, FieldKind, FieldValue};
pub use descriptor::{
    BeanDoc, FieldSpec, ImportSpec, KBeanDescriptor, KBeanDescriptorBuilder, MethodSpec,
    ObjectDescriptor, ObjectDescriptorBuilder,
};
pub use injector::FieldInjector;
pub use instance::{AsAny, BeanContext, BeanHandle, KBean};
pub use naming::{NameResolver, name_matches, short_name};
