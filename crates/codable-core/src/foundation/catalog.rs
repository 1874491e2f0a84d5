//! The class catalog.
//!
//! Every decodable struct and every plugin base registers itself at link
//! time into one of two distributed slices. [`ClassCatalog`] indexes those
//! registrations by fully qualified dotted name (the module path with `::`
//! replaced by `.`, followed by the type name) and by [`TypeId`], which is
//! what the plugin registries resolve `_class` and label strings against.
//!
//! # Registration
//!
//! `#[derive(Codable)]` registers structs. `plugin_base!` registers trait
//! object bases. Tests and embedders that want an isolated catalog build one
//! with [`ClassCatalog::new`] and the `with_*` methods.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use linkme::distributed_slice;
use tracing::{debug, warn};

use crate::error::DecodeResult;
use crate::foundation::descriptor::FieldSummary;
use crate::foundation::node::ObjectView;
use crate::hydrate::Hydrator;

// =============================================================================
// Registration Records
// =============================================================================

/// Instantiates and hydrates a class from an object node, type-erased.
pub type HydrateFn = fn(ObjectView<'_>, &mut Hydrator<'_>) -> DecodeResult<Box<dyn Any>>;

/// Converts a `Box<Concrete>` into a `Box<Box<dyn Base>>`, both erased.
///
/// Returns the input unchanged if it is not the expected concrete type.
pub type UpcastFn = fn(Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>>;

/// One base a class can be upcast to.
pub struct BaseImpl {
    pub base: fn() -> TypeId,
    pub upcast: UpcastFn,
}

/// Link-time record of a decodable struct.
pub struct ClassInfo {
    /// `module_path!()` of the defining module.
    pub module: &'static str,
    /// The type identifier.
    pub ident: &'static str,
    /// Explicit dotted name overriding `module.ident`.
    pub name: Option<&'static str>,
    pub type_id: fn() -> TypeId,
    pub hydrate: HydrateFn,
    pub fields: fn() -> Vec<FieldSummary>,
    pub bases: &'static [BaseImpl],
}

impl ClassInfo {
    /// The fully qualified dotted name.
    pub fn qualified_name(&self) -> String {
        match self.name {
            Some(name) => name.to_owned(),
            None => qualify(self.module, self.ident),
        }
    }

    /// Returns true if the class can be upcast to `base`.
    pub fn implements(&self, base: TypeId) -> bool {
        self.bases.iter().any(|b| (b.base)() == base)
    }

    /// Upcasts an erased instance of this class to an erased `Box<dyn Base>`.
    pub fn upcast(&self, base: TypeId, object: Box<dyn Any>) -> Option<Box<dyn Any>> {
        let entry = self.bases.iter().find(|b| (b.base)() == base)?;
        (entry.upcast)(object).ok()
    }

    /// First array field whose elements are `base`, own fields first.
    pub fn array_field_for(&self, base: TypeId) -> Option<&'static str> {
        (self.fields)()
            .into_iter()
            .find(|field| field.kind.is_array_of(base))
            .map(|field| field.name)
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.qualified_name())
            .field("bases", &self.bases.len())
            .finish()
    }
}

/// Link-time record of a plugin base (a trait object type).
pub struct BaseInfo {
    pub module: &'static str,
    pub ident: &'static str,
    /// The plugin category this base is decoded through.
    pub category: &'static str,
    pub type_id: fn() -> TypeId,
}

impl BaseInfo {
    pub fn qualified_name(&self) -> String {
        qualify(self.module, self.ident)
    }

    /// The dotted module path of the base.
    pub fn package(&self) -> String {
        self.module.replace("::", ".")
    }
}

impl fmt::Debug for BaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseInfo")
            .field("name", &self.qualified_name())
            .field("category", &self.category)
            .finish()
    }
}

fn qualify(module: &str, ident: &str) -> String {
    format!("{}.{ident}", module.replace("::", "."))
}

/// Registered decodable structs.
#[distributed_slice]
pub static CLASSES: [ClassInfo];

/// Registered plugin bases.
#[distributed_slice]
pub static BASES: [BaseInfo];

// =============================================================================
// Catalog
// =============================================================================

/// Name and type index over registered classes and bases.
#[derive(Default)]
pub struct ClassCatalog {
    classes: HashMap<String, &'static ClassInfo>,
    classes_by_type: HashMap<TypeId, &'static ClassInfo>,
    bases: HashMap<String, &'static BaseInfo>,
    bases_by_type: HashMap<TypeId, &'static BaseInfo>,
}

impl ClassCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from every link-time registration.
    ///
    /// If two registrations share a name the first one wins and a warning is
    /// emitted.
    pub fn collect_all() -> Self {
        let mut catalog = Self::new();
        for class in CLASSES.iter() {
            catalog.register_class(class);
        }
        for base in BASES.iter() {
            catalog.register_base(base);
        }
        debug!(
            classes = catalog.classes.len(),
            bases = catalog.bases.len(),
            "Collected class catalog"
        );
        catalog
    }

    /// The process-wide catalog built from link-time registrations.
    pub fn global() -> Arc<ClassCatalog> {
        static GLOBAL: OnceLock<Arc<ClassCatalog>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::collect_all())))
    }

    pub fn with_class(mut self, class: &'static ClassInfo) -> Self {
        self.register_class(class);
        self
    }

    pub fn with_base(mut self, base: &'static BaseInfo) -> Self {
        self.register_base(base);
        self
    }

    pub fn register_class(&mut self, class: &'static ClassInfo) {
        let name = class.qualified_name();
        if self.classes.contains_key(&name) {
            warn!(class = %name, "Multiple classes registered under one name, using the first");
            return;
        }
        self.classes_by_type.entry((class.type_id)()).or_insert(class);
        self.classes.insert(name, class);
    }

    pub fn register_base(&mut self, base: &'static BaseInfo) {
        let name = base.qualified_name();
        if self.bases.contains_key(&name) {
            warn!(base = %name, "Multiple bases registered under one name, using the first");
            return;
        }
        self.bases_by_type.entry((base.type_id)()).or_insert(base);
        self.bases.insert(name, base);
    }

    /// Looks up a class by fully qualified dotted name.
    pub fn class(&self, name: &str) -> Option<&'static ClassInfo> {
        self.classes.get(name).copied()
    }

    pub fn class_of(&self, type_id: TypeId) -> Option<&'static ClassInfo> {
        self.classes_by_type.get(&type_id).copied()
    }

    /// Looks up a base by fully qualified dotted name.
    pub fn base(&self, name: &str) -> Option<&'static BaseInfo> {
        self.bases.get(name).copied()
    }

    pub fn base_of(&self, type_id: TypeId) -> Option<&'static BaseInfo> {
        self.bases_by_type.get(&type_id).copied()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn base_count(&self) -> usize {
        self.bases.len()
    }
}

impl fmt::Debug for ClassCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassCatalog")
            .field("classes", &self.classes.len())
            .field("bases", &self.bases.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrate::{Codable, PluginBase};
    use codable_macros::Codable;

    pub trait Widget {}
    crate::plugin_base!(dyn Widget, category = "widget");

    #[derive(Default, Codable)]
    #[codable(base = dyn Widget)]
    struct Knob {
        items: Vec<Box<dyn Widget>>,
        label: String,
    }
    impl Widget for Knob {}

    #[derive(Debug, Default, Codable)]
    #[codable(name = "custom.Lever")]
    struct Lever {
        pull: i32,
    }

    #[test]
    fn test_qualified_names() {
        let module = module_path!().replace("::", ".");
        assert_eq!(Knob::class_info().qualified_name(), format!("{module}.Knob"));
        assert_eq!(Lever::class_info().qualified_name(), "custom.Lever");
        assert_eq!(
            <dyn Widget as PluginBase>::base_info().qualified_name(),
            format!("{module}.Widget")
        );
    }

    #[test]
    fn test_collect_all_finds_registrations() {
        let catalog = ClassCatalog::global();
        let module = module_path!().replace("::", ".");
        assert!(catalog.class(&format!("{module}.Knob")).is_some());
        assert!(catalog.class("custom.Lever").is_some());
        assert!(catalog.base_of(TypeId::of::<dyn Widget>()).is_some());
        assert!(catalog.class_of(TypeId::of::<Lever>()).is_some());
    }

    #[test]
    fn test_isolated_catalog() {
        let catalog = ClassCatalog::new().with_class(Lever::class_info());
        assert_eq!(catalog.class_count(), 1);
        assert_eq!(catalog.base_count(), 0);
        assert!(catalog.class_of(TypeId::of::<Knob>()).is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let catalog = ClassCatalog::new()
            .with_class(Lever::class_info())
            .with_class(Lever::class_info());
        assert_eq!(catalog.class_count(), 1);
    }

    #[test]
    fn test_subtype_and_array_field() {
        let knob = Knob::class_info();
        assert!(knob.implements(TypeId::of::<dyn Widget>()));
        assert!(!Lever::class_info().implements(TypeId::of::<dyn Widget>()));
        assert_eq!(knob.array_field_for(TypeId::of::<dyn Widget>()), Some("items"));
        assert_eq!(Lever::class_info().array_field_for(TypeId::of::<dyn Widget>()), None);
    }

    #[test]
    fn test_upcast() {
        let erased: Box<dyn Any> = Box::new(Knob::default());
        let upcast = Knob::class_info()
            .upcast(TypeId::of::<dyn Widget>(), erased)
            .unwrap();
        assert!(upcast.downcast::<Box<dyn Widget>>().is_ok());

        let wrong: Box<dyn Any> = Box::new(Lever::default());
        assert!(Knob::class_info().upcast(TypeId::of::<dyn Widget>(), wrong).is_none());
    }
}
