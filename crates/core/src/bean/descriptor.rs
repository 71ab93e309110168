//! Static description of KBean types: property fields, invokable methods and
//! imported beans, with the closures reaching into the concrete type.

use super::coerce::{EnumField, FieldKind, FieldValue};
use super::instance::{BeanContext, BeanHandle, KBean};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;

type Setter = Rc<dyn Fn(&mut dyn Any, &str) -> std::result::Result<(), String>>;
type Invoker = Rc<dyn Fn(&mut dyn KBean, &mut BeanContext<'_>) -> Result<()>>;
type ImportSetter = Rc<dyn Fn(&mut dyn KBean, BeanHandle) -> std::result::Result<(), String>>;
type Factory = Rc<dyn Fn() -> Box<dyn KBean>>;

/// Access to an optional nested object, created with its default on demand.
pub(crate) trait NestedSlot {
    fn get_or_create<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct OptionSlot<O, N> {
    accessor: fn(&mut O) -> &mut Option<N>,
}

impl<O: 'static, N: Default + 'static> NestedSlot for OptionSlot<O, N> {
    fn get_or_create<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let target = target.downcast_mut::<O>()?;
        let slot = (self.accessor)(target);
        let nested: &mut dyn Any = slot.get_or_insert_with(N::default);
        Some(nested)
    }
}

#[derive(Clone)]
pub(crate) enum FieldAccess {
    Value(Setter),
    Nested {
        descriptor: Rc<ObjectDescriptor>,
        slot: Rc<dyn NestedSlot>,
    },
    /// Final, or of a type values cannot be converted to.
    None,
}

/// A property field: settable from `name=value` actions and `bean#name`
/// properties.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub doc: Option<String>,
    pub is_final: bool,
    pub(crate) access: FieldAccess,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_final", &self.is_final)
            .finish()
    }
}

impl FieldSpec {
    pub fn nested_descriptor(&self) -> Option<&ObjectDescriptor> {
        match &self.access {
            FieldAccess::Nested { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }
}

/// Property fields of one type, in declaration order.
#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    type_name: String,
    fields: Vec<FieldSpec>,
}

impl ObjectDescriptor {
    pub fn builder<O: 'static>(type_name: &str) -> ObjectDescriptorBuilder<O> {
        ObjectDescriptorBuilder {
            type_name: type_name.to_string(),
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Descriptor of a type without property fields.
    pub fn empty(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// True if `path` designates a field, directly or through nested fields
    /// (`a.b.c`).
    pub fn has_field_path(&self, path: &str) -> bool {
        if self.field(path).is_some() {
            return true;
        }
        match path.split_once('.') {
            Some((head, rest)) => self
                .field(head)
                .and_then(FieldSpec::nested_descriptor)
                .is_some_and(|nested| nested.has_field_path(rest))
                || self.field(head).is_some_and(|field| field.is_final),
            None => false,
        }
    }

    /// Dotted names of every leaf field, nested ones included.
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in &self.fields {
            match field.nested_descriptor() {
                Some(nested) => paths.extend(
                    nested
                        .field_paths()
                        .into_iter()
                        .map(|sub| format!("{}.{sub}", field.name)),
                ),
                None => paths.push(field.name.clone()),
            }
        }
        paths
    }
}

pub struct ObjectDescriptorBuilder<O> {
    type_name: String,
    fields: Vec<FieldSpec>,
    _marker: PhantomData<fn(&mut O)>,
}

impl<O: 'static> ObjectDescriptorBuilder<O> {
    pub fn field<T: FieldValue>(self, name: &str, accessor: fn(&mut O) -> &mut T) -> Self {
        let setter: Setter = Rc::new(move |target: &mut dyn Any, raw: &str| {
            let target = target
                .downcast_mut::<O>()
                .ok_or_else(|| "target has an unexpected type".to_string())?;
            *accessor(target) = T::parse_value(raw)?;
            Ok(())
        });
        self.push(name, T::kind(), false, FieldAccess::Value(setter))
    }

    pub fn enum_field<E: EnumField>(self, name: &str, accessor: fn(&mut O) -> &mut E) -> Self {
        let setter: Setter = Rc::new(move |target: &mut dyn Any, raw: &str| {
            let target = target
                .downcast_mut::<O>()
                .ok_or_else(|| "target has an unexpected type".to_string())?;
            *accessor(target) = E::value_of(raw)?;
            Ok(())
        });
        self.push(name, FieldKind::Enum(E::constant_names()), false, FieldAccess::Value(setter))
    }

    /// Structured field, injected through `name.sub` keys.
    pub fn nested<N: Default + 'static>(
        self,
        name: &str,
        accessor: fn(&mut O) -> &mut Option<N>,
        descriptor: ObjectDescriptor,
    ) -> Self {
        let kind = FieldKind::Nested(descriptor.type_name.clone());
        let access = FieldAccess::Nested {
            descriptor: Rc::new(descriptor),
            slot: Rc::new(OptionSlot { accessor }),
        };
        self.push(name, kind, false, access)
    }

    /// Documented but immutable field. Injecting into it is an error.
    pub fn final_field(self, name: &str, kind: FieldKind) -> Self {
        self.push(name, kind, true, FieldAccess::None)
    }

    /// Field of a type values cannot be converted to.
    pub fn opaque_field(self, name: &str, type_name: &str) -> Self {
        self.push(name, FieldKind::Unsupported(type_name.to_string()), false, FieldAccess::None)
    }

    /// Documents the last declared field.
    pub fn doc(mut self, doc: &str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.doc = Some(doc.to_string());
        }
        self
    }

    pub fn build(self) -> ObjectDescriptor {
        ObjectDescriptor {
            type_name: self.type_name,
            fields: self.fields,
        }
    }

    fn push(mut self, name: &str, kind: FieldKind, is_final: bool, access: FieldAccess) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            doc: None,
            is_final,
            access,
        });
        self
    }
}

/// Header and detail documentation of a KBean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanDoc {
    pub header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone)]
pub struct MethodSpec {
    pub name: String,
    pub doc: Option<String>,
    pub(crate) invoker: Invoker,
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec").field("name", &self.name).finish()
    }
}

/// Bean of another project injected into a field of the holder.
#[derive(Clone)]
pub struct ImportSpec {
    pub field: String,
    pub relative_dir: PathBuf,
    pub class_name: String,
    pub(crate) setter: ImportSetter,
}

impl fmt::Debug for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportSpec")
            .field("field", &self.field)
            .field("relative_dir", &self.relative_dir)
            .field("class_name", &self.class_name)
            .finish()
    }
}

/// Everything the engine knows about a KBean type.
#[derive(Clone)]
pub struct KBeanDescriptor {
    class_name: String,
    doc: Option<BeanDoc>,
    hierarchy: Vec<String>,
    fields: ObjectDescriptor,
    methods: Vec<MethodSpec>,
    imports: Vec<ImportSpec>,
    factory: Option<Factory>,
}

impl fmt::Debug for KBeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KBeanDescriptor")
            .field("class_name", &self.class_name)
            .field("is_abstract", &self.is_abstract())
            .field("methods", &self.method_names())
            .finish()
    }
}

impl KBeanDescriptor {
    /// Descriptor of a concrete bean created with `T::default()`.
    pub fn builder<T: KBean + Default>(class_name: &str) -> KBeanDescriptorBuilder<T> {
        let factory: Factory = Rc::new(|| Box::new(T::default()));
        KBeanDescriptorBuilder::new(class_name, Some(factory))
    }

    /// Descriptor of a bean type that cannot be instantiated.
    pub fn abstract_builder<T: KBean>(class_name: &str) -> KBeanDescriptorBuilder<T> {
        KBeanDescriptorBuilder::new(class_name, None)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn doc(&self) -> Option<&BeanDoc> {
        self.doc.as_ref()
    }

    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    /// Declaring types, the bean type first.
    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    pub fn fields(&self) -> &ObjectDescriptor {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|method| method.name.as_str()).collect()
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    pub fn instantiate(&self) -> Result<Box<dyn KBean>> {
        self.factory
            .as_ref()
            .map(|factory| factory())
            .ok_or_else(|| Error::AbstractKBean(self.class_name.clone()))
    }

    pub(crate) fn invoke(&self, name: &str, bean: &mut dyn KBean, ctx: &mut BeanContext<'_>) -> Option<Result<()>> {
        let method = self.method(name)?;
        Some((method.invoker)(bean, ctx))
    }
}

enum LastMember {
    None,
    Field,
    Method,
}

pub struct KBeanDescriptorBuilder<T> {
    class_name: String,
    doc: Option<BeanDoc>,
    hierarchy: Vec<String>,
    fields: ObjectDescriptorBuilder<T>,
    methods: Vec<MethodSpec>,
    imports: Vec<ImportSpec>,
    factory: Option<Factory>,
    last: LastMember,
}

impl<T: KBean> KBeanDescriptorBuilder<T> {
    fn new(class_name: &str, factory: Option<Factory>) -> Self {
        Self {
            class_name: class_name.to_string(),
            doc: None,
            hierarchy: vec![class_name.to_string()],
            fields: ObjectDescriptor::builder::<T>(class_name),
            methods: Vec::new(),
            imports: Vec::new(),
            factory,
            last: LastMember::None,
        }
    }

    pub fn header(mut self, header: &str) -> Self {
        self.doc.get_or_insert_with(BeanDoc::default).header = header.to_string();
        self
    }

    pub fn detail(mut self, detail: &str) -> Self {
        self.doc.get_or_insert_with(BeanDoc::default).detail = Some(detail.to_string());
        self
    }

    /// Declares a supertype, for provenance display.
    pub fn extends(mut self, class_name: &str) -> Self {
        self.hierarchy.push(class_name.to_string());
        self
    }

    pub fn field<V: FieldValue>(mut self, name: &str, accessor: fn(&mut T) -> &mut V) -> Self {
        self.fields = self.fields.field(name, accessor);
        self.last = LastMember::Field;
        self
    }

    pub fn enum_field<E: EnumField>(mut self, name: &str, accessor: fn(&mut T) -> &mut E) -> Self {
        self.fields = self.fields.enum_field(name, accessor);
        self.last = LastMember::Field;
        self
    }

    pub fn nested<N: Default + 'static>(
        mut self,
        name: &str,
        accessor: fn(&mut T) -> &mut Option<N>,
        descriptor: ObjectDescriptor,
    ) -> Self {
        self.fields = self.fields.nested(name, accessor, descriptor);
        self.last = LastMember::Field;
        self
    }

    pub fn final_field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields = self.fields.final_field(name, kind);
        self.last = LastMember::Field;
        self
    }

    pub fn opaque_field(mut self, name: &str, type_name: &str) -> Self {
        self.fields = self.fields.opaque_field(name, type_name);
        self.last = LastMember::Field;
        self
    }

    /// Public no-argument method, invokable from the command line.
    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut T, &mut BeanContext<'_>) -> Result<()> + 'static,
    {
        let class_name = self.class_name.clone();
        let invoker: Invoker = Rc::new(move |bean: &mut dyn KBean, ctx: &mut BeanContext<'_>| {
            let typed = bean.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
                Error::Other(format!("Bean instance is not a {class_name}"))
            })?;
            f(typed, ctx)
        });
        self.methods.push(MethodSpec {
            name: name.to_string(),
            doc: None,
            invoker,
        });
        self.last = LastMember::Method;
        self
    }

    /// Field holding a bean of the project at `relative_dir`.
    pub fn import(
        mut self,
        field: &str,
        relative_dir: impl Into<PathBuf>,
        class_name: &str,
        setter: fn(&mut T, BeanHandle),
    ) -> Self {
        let holder = self.class_name.clone();
        let setter: ImportSetter = Rc::new(move |bean: &mut dyn KBean, handle: BeanHandle| {
            let typed = bean
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or_else(|| format!("holder instance is not a {holder}"))?;
            setter(typed, handle);
            Ok(())
        });
        self.imports.push(ImportSpec {
            field: field.to_string(),
            relative_dir: relative_dir.into(),
            class_name: class_name.to_string(),
            setter,
        });
        self
    }

    /// Documents the last declared field or method.
    pub fn doc(mut self, doc: &str) -> Self {
        match self.last {
            LastMember::Field => self.fields = self.fields.doc(doc),
            LastMember::Method => {
                if let Some(method) = self.methods.last_mut() {
                    method.doc = Some(doc.to_string());
                }
            }
            LastMember::None => {}
        }
        self
    }

    pub fn build(self) -> KBeanDescriptor {
        KBeanDescriptor {
            class_name: self.class_name,
            doc: self.doc,
            hierarchy: self.hierarchy,
            fields: self.fields.build(),
            methods: self.methods,
            imports: self.imports,
            factory: self.factory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[derive(Default)]
    struct Options {
        level: i32,
    }

    #[derive(Default)]
    struct Sample {
        name: String,
        options: Option<Options>,
        runs: usize,
    }

    impl KBean for Sample {}

    fn descriptor() -> KBeanDescriptor {
        KBeanDescriptor::builder::<Sample>("org.acme.SampleKBean")
            .header("Sample bean")
            .field("name", |s| &mut s.name)
            .doc("Name of the sample")
            .nested(
                "options",
                |s| &mut s.options,
                ObjectDescriptor::builder::<Options>("org.acme.Options")
                    .field("level", |o| &mut o.level)
                    .build(),
            )
            .final_field("id", FieldKind::String)
            .method("run", |s, _| {
                s.runs += 1;
                Ok(())
            })
            .doc("Runs it")
            .build()
    }

    #[test]
    fn test_descriptor_members() {
        let descriptor = descriptor();
        assert_eq!(descriptor.class_name(), "org.acme.SampleKBean");
        assert_eq!(descriptor.doc().unwrap().header, "Sample bean");
        assert_eq!(descriptor.method_names(), vec!["run"]);
        assert_eq!(descriptor.method("run").unwrap().doc.as_deref(), Some("Runs it"));
        assert_eq!(
            descriptor.fields().field("name").unwrap().doc.as_deref(),
            Some("Name of the sample")
        );
        assert_eq!(descriptor.fields().field_paths(), vec!["name", "options.level", "id"]);
        assert!(descriptor.fields().has_field_path("options.level"));
        assert!(!descriptor.fields().has_field_path("options.nope"));
        assert!(!descriptor.is_abstract());
    }

    #[test]
    fn test_instantiate_and_setter() {
        let descriptor = descriptor();
        let mut bean = descriptor.instantiate().unwrap();
        let field = descriptor.fields().field("name").unwrap();
        if let FieldAccess::Value(setter) = &field.access {
            setter(bean.as_mut().as_any_mut(), "demo").unwrap();
        }
        let sample = bean.as_mut().as_any_mut().downcast_mut::<Sample>().unwrap();
        assert_eq!(sample.name, "demo");
    }

    #[derive(Default)]
    struct Holder {
        imported: Option<BeanHandle>,
    }

    impl KBean for Holder {}

    #[test]
    fn test_import_setter_rejects_other_bean_types() {
        let descriptor = KBeanDescriptor::builder::<Holder>("org.acme.HolderKBean")
            .import("imported", "../lib", "org.lib.LibKBean", |h, handle| h.imported = Some(handle))
            .build();
        let import = &descriptor.imports()[0];
        let handle = BeanHandle::new("org.lib.LibKBean", Path::new("/lib"), Box::new(Sample::default()));

        let mut wrong: Box<dyn KBean> = Box::new(Sample::default());
        let err = (import.setter)(wrong.as_mut(), handle.clone()).unwrap_err();
        assert!(err.contains("org.acme.HolderKBean"));

        let mut holder = descriptor.instantiate().unwrap();
        (import.setter)(holder.as_mut(), handle).unwrap();
        let holder = holder.as_mut().as_any_mut().downcast_mut::<Holder>().unwrap();
        assert!(holder.imported.is_some());
    }

    #[test]
    fn test_abstract_bean_cannot_be_instantiated() {
        let descriptor = KBeanDescriptor::abstract_builder::<Sample>("org.acme.Base").build();
        assert!(descriptor.is_abstract());
        assert!(matches!(descriptor.instantiate(), Err(Error::AbstractKBean(_))));
    }
}
