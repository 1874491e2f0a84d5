//! The per-category plugin registry.
//!
//! A plugin category is configured by one object section:
//!
//! ```text
//! filter {
//!   _field  = type          # discriminator key (required)
//!   _strict = true          # unknown classes are fatal (required)
//!   _class  = app.Filter    # base type (optional)
//!   _array  = chain         # array sugar label (optional)
//!   _default = chain        # default type label (optional)
//!   chain  = Chain          # label -> class name
//!   upper  = { _class = app.filters.Upper, pattern = "X" }
//!   loud   = { _class = upper, _inline = true }   # alias with defaults
//! }
//! ```
//!
//! Keys beginning with `_` are directives and never labels. An object entry
//! whose `_class` names another top-level key is an alias; its remaining
//! keys are defaults applied beneath nodes decoded through it.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::foundation::catalog::{BaseInfo, ClassCatalog, ClassInfo};
use crate::foundation::descriptor::FieldKind;
use crate::foundation::node::{ConfigValueType, coerce_bool, with_fallback};

/// Discriminator key of categories that are not configured.
pub const DEFAULT_CLASS_FIELD: &str = "class";

const RESERVED_PREFIX: char = '_';
const FIELD_KEY: &str = "_field";
const STRICT_KEY: &str = "_strict";
const CLASS_KEY: &str = "_class";
const ARRAY_KEY: &str = "_array";
const DEFAULT_KEY: &str = "_default";
const INLINE_KEY: &str = "_inline";

// =============================================================================
// Sugar
// =============================================================================

/// The type used when a list is given where an object is expected.
#[derive(Debug, Clone)]
pub struct ArraySugar {
    class: &'static ClassInfo,
    label: String,
    field: &'static str,
    origin: String,
}

impl ArraySugar {
    pub fn class(&self) -> &'static ClassInfo {
        self.class
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The array field the list is assigned to.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Provenance string, `"<category> array sugar : <label>"`.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// The type used when a node has no discriminator.
#[derive(Debug, Clone)]
pub struct DefaultSugar {
    class: &'static ClassInfo,
    label: String,
    origin: String,
}

impl DefaultSugar {
    pub fn class(&self) -> &'static ClassInfo {
        self.class
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Provenance string, `"<category> default type : <label>"`.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Label and alias tables for one plugin category.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct PluginRegistry {
    category: String,
    config: Map<String, Value>,
    labels: IndexMap<String, &'static ClassInfo>,
    classes: HashMap<TypeId, String>,
    aliases: IndexMap<String, String>,
    inlined: HashSet<String>,
    class_field: String,
    base: Option<&'static BaseInfo>,
    array_sugar: Option<ArraySugar>,
    default_sugar: Option<DefaultSugar>,
    catalog: Arc<ClassCatalog>,
}

impl PluginRegistry {
    /// Builds the registry of `category` from its config section.
    pub fn new(
        category: impl Into<String>,
        section: &Map<String, Value>,
        catalog: Arc<ClassCatalog>,
    ) -> RegistryResult<Self> {
        let category = category.into();
        let class_field = required_string(&category, section, FIELD_KEY)?;
        let strict = required_bool(&category, section, STRICT_KEY)?;
        let base = match section.get(CLASS_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(catalog.base(name).ok_or_else(|| {
                RegistryError::MissingBaseClass {
                    category: category.clone(),
                    base: name.clone(),
                }
            })?),
            Some(other) => return Err(wrong_directive(&category, CLASS_KEY, "STRING", other)),
        };

        let mut registry = Self {
            category,
            config: section.clone(),
            labels: IndexMap::new(),
            classes: HashMap::new(),
            aliases: IndexMap::new(),
            inlined: HashSet::new(),
            class_field,
            base,
            array_sugar: None,
            default_sugar: None,
            catalog,
        };
        registry.register_entries(section, strict)?;
        registry.check_alias_cycles()?;
        registry.array_sugar = registry.load_array_sugar(section)?;
        registry.default_sugar = registry.load_default_sugar(section)?;

        debug!(
            category = %registry.category,
            labels = registry.labels.len(),
            aliases = registry.aliases.len(),
            "Built plugin registry"
        );
        Ok(registry)
    }

    /// A registry for a category with no configuration.
    ///
    /// It has no labels; types can only be named by class name.
    pub fn empty(
        category: impl Into<String>,
        base: Option<&'static BaseInfo>,
        catalog: Arc<ClassCatalog>,
    ) -> Self {
        Self {
            category: category.into(),
            config: Map::new(),
            labels: IndexMap::new(),
            classes: HashMap::new(),
            aliases: IndexMap::new(),
            inlined: HashSet::new(),
            class_field: DEFAULT_CLASS_FIELD.to_owned(),
            base,
            array_sugar: None,
            default_sugar: None,
            catalog,
        }
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn register_entries(&mut self, section: &Map<String, Value>, strict: bool) -> RegistryResult<()> {
        for (label, entry) in section {
            if label.starts_with(RESERVED_PREFIX) {
                continue;
            }
            let class_name = match entry {
                Value::String(name) => name.as_str(),
                Value::Object(object) => {
                    if object.get(INLINE_KEY).and_then(coerce_bool).unwrap_or(false) {
                        self.inlined.insert(label.clone());
                    }
                    let Some(Value::String(name)) = object.get(CLASS_KEY) else {
                        return Err(RegistryError::MissingEntryClass {
                            category: self.category.clone(),
                            label: label.clone(),
                        });
                    };
                    if section.contains_key(name.as_str()) {
                        self.aliases.insert(label.clone(), name.clone());
                        continue;
                    }
                    name.as_str()
                }
                other => {
                    return Err(RegistryError::WrongEntryType {
                        category: self.category.clone(),
                        label: label.clone(),
                        found: ConfigValueType::of(other),
                    });
                }
            };

            match self.find_and_validate(class_name, label) {
                Ok(class) => self.insert_label(label, class)?,
                Err(RegistryError::MissingClass { class, .. }) if !strict => {
                    warn!(
                        category = %self.category,
                        label = %label,
                        class = %class,
                        "Skipping plugin label pointing to missing class"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn insert_label(&mut self, label: &str, class: &'static ClassInfo) -> RegistryResult<()> {
        let type_id = (class.type_id)();
        if let Some(first) = self.classes.get(&type_id) {
            return Err(RegistryError::DuplicateClass {
                category: self.category.clone(),
                class: class.qualified_name(),
                first: first.clone(),
                second: label.to_owned(),
            });
        }
        self.classes.insert(type_id, label.to_owned());
        self.labels.insert(label.to_owned(), class);
        Ok(())
    }

    fn check_alias_cycles(&self) -> RegistryResult<()> {
        for start in self.aliases.keys() {
            let mut visited = HashSet::from([start.as_str()]);
            let mut current = start.as_str();
            while let Some(next) = self.aliases.get(current) {
                if !visited.insert(next.as_str()) {
                    return Err(RegistryError::CyclicAlias {
                        category: self.category.clone(),
                        alias: start.clone(),
                    });
                }
                current = next.as_str();
            }
        }
        Ok(())
    }

    fn load_array_sugar(&self, section: &Map<String, Value>) -> RegistryResult<Option<ArraySugar>> {
        let label = match section.get(ARRAY_KEY) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(label)) => label,
            Some(other) => return Err(wrong_directive(&self.category, ARRAY_KEY, "STRING", other)),
        };
        let Some(class) = self.registered(label) else {
            warn!(category = %self.category, label = %label, "Array sugar label is not registered, array sugar disabled");
            return Ok(None);
        };
        let base = self.base.map(|base| (base.type_id)());
        let field = (class.fields)().into_iter().find(|field| {
            field
                .kind
                .element()
                .and_then(FieldKind::object)
                .is_some_and(|element| {
                    element.polymorphic
                        && class.implements(element.type_id)
                        && base.is_none_or(|base| base == element.type_id)
                })
        });
        let Some(field) = field else {
            warn!(
                category = %self.category,
                label = %label,
                class = %class.qualified_name(),
                "Array sugar class has no array field of the base type, array sugar disabled"
            );
            return Ok(None);
        };
        Ok(Some(ArraySugar {
            class,
            label: label.clone(),
            field: field.name,
            origin: format!("{} array sugar : {label}", self.category),
        }))
    }

    fn load_default_sugar(&self, section: &Map<String, Value>) -> RegistryResult<Option<DefaultSugar>> {
        let label = match section.get(DEFAULT_KEY) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(label)) => label,
            Some(other) => return Err(wrong_directive(&self.category, DEFAULT_KEY, "STRING", other)),
        };
        let class = self
            .registered(label)
            .ok_or_else(|| RegistryError::UnknownDefaultLabel {
                category: self.category.clone(),
                label: label.clone(),
            })?;
        Ok(Some(DefaultSugar {
            class,
            label: label.clone(),
            origin: format!("{} default type : {label}", self.category),
        }))
    }

    // -------------------------------------------------------------------------
    // Class Lookup
    // -------------------------------------------------------------------------

    /// Finds `name` relative to the base's module path, trying each enclosing
    /// module, then as a fully qualified name.
    fn lookup_class(&self, name: &str) -> Option<&'static ClassInfo> {
        if let Some(base) = self.base {
            let mut package = Some(base.package());
            while let Some(current) = package {
                if let Some(class) = self.catalog.class(&format!("{current}.{name}")) {
                    return Some(class);
                }
                package = current.rfind('.').map(|end| current[..end].to_owned());
            }
        }
        self.catalog.class(name)
    }

    fn find_and_validate(&self, class_name: &str, label: &str) -> RegistryResult<&'static ClassInfo> {
        let class = self
            .lookup_class(class_name)
            .ok_or_else(|| RegistryError::MissingClass {
                category: self.category.clone(),
                label: label.to_owned(),
                class: class_name.to_owned(),
            })?;
        if let Some(base) = self.base {
            if !class.implements((base.type_id)()) {
                return Err(RegistryError::NotSubtype {
                    category: self.category.clone(),
                    base: base.qualified_name(),
                    class_field: self.class_field.clone(),
                    class: class.qualified_name(),
                });
            }
        }
        Ok(class)
    }

    /// Follows aliases from `label` to a registered class.
    fn registered(&self, label: &str) -> Option<&'static ClassInfo> {
        let mut current = label;
        loop {
            if let Some(class) = self.labels.get(current) {
                return Some(*class);
            }
            current = self.aliases.get(current)?.as_str();
        }
    }

    /// Resolves a label, alias or class name to a class.
    pub fn resolve(&self, label: &str) -> RegistryResult<&'static ClassInfo> {
        if let Some(class) = self.registered(label) {
            return Ok(class);
        }
        match self.find_and_validate(label, label) {
            Err(RegistryError::MissingClass { .. }) => Err(RegistryError::UnknownLabel {
                category: self.category.clone(),
                label: label.to_owned(),
            }),
            other => other,
        }
    }

    /// Default values declared on `label`, merged along its alias chain.
    ///
    /// Directive keys are stripped. Entries nearer to `label` win.
    pub fn defaults(&self, label: &str) -> Map<String, Value> {
        let own: Map<String, Value> = match self.config.get(label) {
            Some(Value::Object(object)) => object
                .iter()
                .filter(|(key, _)| !key.starts_with(RESERVED_PREFIX))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Map::new(),
        };
        match self.aliases.get(label) {
            Some(target) => with_fallback(&own, &self.defaults(target)),
            None => own,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The discriminator key.
    pub fn class_field(&self) -> &str {
        &self.class_field
    }

    pub fn base(&self) -> Option<&'static BaseInfo> {
        self.base
    }

    /// The raw config section the registry was built from.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ClassCatalog> {
        &self.catalog
    }

    /// Registered labels in config order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &'static ClassInfo)> + '_ {
        self.labels.iter().map(|(label, class)| (label.as_str(), *class))
    }

    /// Alias to target pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.aliases.iter().map(|(alias, target)| (alias.as_str(), target.as_str()))
    }

    pub fn is_alias(&self, label: &str) -> bool {
        self.aliases.contains_key(label)
    }

    /// Returns true if defaults of `label` merge deeply.
    pub fn is_inlined(&self, label: &str) -> bool {
        self.inlined.contains(label)
    }

    pub fn array_sugar(&self) -> Option<&ArraySugar> {
        self.array_sugar.as_ref()
    }

    pub fn default_sugar(&self) -> Option<&DefaultSugar> {
        self.default_sugar.as_ref()
    }

    /// The label registered for a class.
    pub fn label_for(&self, type_id: TypeId) -> Option<&str> {
        self.classes.get(&type_id).map(String::as_str)
    }

    /// The label of `class`, or its qualified name if it has none.
    pub fn class_name(&self, class: &ClassInfo) -> String {
        self.label_for((class.type_id)())
            .map(str::to_owned)
            .unwrap_or_else(|| class.qualified_name())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (field '{}'", self.category, self.class_field)?;
        if let Some(base) = self.base {
            write!(f, ", base {}", base.qualified_name())?;
        }
        write!(f, "): [")?;
        for (i, (label, class)) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label} -> {}", class.qualified_name())?;
        }
        for (alias, target) in &self.aliases {
            write!(f, ", {alias} => {target}")?;
        }
        write!(f, "]")?;
        if let Some(sugar) = &self.array_sugar {
            write!(f, " array={}", sugar.label)?;
        }
        if let Some(sugar) = &self.default_sugar {
            write!(f, " default={}", sugar.label)?;
        }
        Ok(())
    }
}

// =============================================================================
// Directive Helpers
// =============================================================================

fn wrong_directive(category: &str, key: &str, expected: &'static str, found: &Value) -> RegistryError {
    RegistryError::WrongDirectiveType {
        category: category.to_owned(),
        key: key.to_owned(),
        expected,
        found: ConfigValueType::of(found),
    }
}

fn required_string(category: &str, section: &Map<String, Value>, key: &'static str) -> RegistryResult<String> {
    match section.get(key) {
        None | Some(Value::Null) => Err(RegistryError::MissingDirective {
            category: category.to_owned(),
            key,
        }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(wrong_directive(category, key, "STRING", other)),
    }
}

fn required_bool(category: &str, section: &Map<String, Value>, key: &'static str) -> RegistryResult<bool> {
    match section.get(key) {
        None | Some(Value::Null) => Err(RegistryError::MissingDirective {
            category: category.to_owned(),
            key,
        }),
        Some(value) => coerce_bool(value).ok_or_else(|| wrong_directive(category, key, "BOOLEAN", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Chain, Length, Upper};
    use crate::hydrate::Codable;
    use rstest::rstest;
    use serde_json::json;

    fn build(section: Value) -> RegistryResult<PluginRegistry> {
        let section = section.as_object().cloned().unwrap_or_default();
        PluginRegistry::new("filter", &section, ClassCatalog::global())
    }

    #[test]
    fn test_builds_labels_and_bijection() {
        let registry = build(fixtures::filter_section()).unwrap();
        assert_eq!(registry.class_field(), "type");
        assert!(registry.base().is_some());

        let upper = registry.resolve("upper").unwrap();
        assert_eq!((upper.type_id)(), TypeId::of::<Upper>());
        assert_eq!(registry.label_for(TypeId::of::<Upper>()), Some("upper"));
        assert_eq!(registry.class_name(Upper::class_info()), "upper");
        for (label, class) in registry.labels() {
            assert_eq!(registry.label_for((class.type_id)()), Some(label));
        }
    }

    #[test]
    fn test_reserved_keys_are_not_labels() {
        let registry = build(fixtures::filter_section()).unwrap();
        assert!(registry.labels().all(|(label, _)| !label.starts_with('_')));
    }

    #[rstest]
    #[case(json!({"_strict": true}), "_field")]
    #[case(json!({"_field": "type"}), "_strict")]
    fn test_missing_directive(#[case] section: Value, #[case] expected: &str) {
        let err = build(section).unwrap_err();
        assert!(matches!(err, RegistryError::MissingDirective { key, .. } if key == expected));
    }

    #[test]
    fn test_wrong_directive_type() {
        let err = build(json!({"_field": 3, "_strict": true})).unwrap_err();
        assert!(matches!(err, RegistryError::WrongDirectiveType { .. }));
    }

    #[test]
    fn test_wrong_entry_type() {
        let err = build(json!({"_field": "type", "_strict": true, "bad": 7})).unwrap_err();
        assert!(matches!(err, RegistryError::WrongEntryType { found: ConfigValueType::Number, .. }));
    }

    #[test]
    fn test_missing_class_strict_and_lenient() {
        let strict = build(json!({"_field": "type", "_strict": true, "ghost": "no.such.Ghost"}));
        assert!(matches!(strict.unwrap_err(), RegistryError::MissingClass { .. }));

        let lenient = build(json!({"_field": "type", "_strict": false, "ghost": "no.such.Ghost"})).unwrap();
        assert!(lenient.is_empty());
    }

    #[test]
    fn test_missing_base_class() {
        let err = build(json!({"_field": "type", "_strict": true, "_class": "no.such.Base"})).unwrap_err();
        assert!(matches!(err, RegistryError::MissingBaseClass { .. }));
    }

    #[test]
    fn test_not_subtype_is_fatal_even_when_lenient() {
        let mut section = fixtures::filter_section();
        section["_strict"] = json!(false);
        section["odd"] = json!("Stranger");
        let err = build(section).unwrap_err();
        match err {
            RegistryError::NotSubtype { category, class_field, class, .. } => {
                assert_eq!(category, "filter");
                assert_eq!(class_field, "type");
                assert!(class.ends_with("Stranger"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut section = fixtures::filter_section();
        section["shout"] = json!("Upper");
        let err = build(section).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateClass { .. }));
    }

    #[rstest]
    #[case(json!({"a": {"_class": "b"}, "b": {"_class": "a"}}))]
    #[case(json!({"a": {"_class": "a"}}))]
    #[case(json!({"a": {"_class": "b"}, "b": {"_class": "c"}, "c": {"_class": "a"}}))]
    fn test_alias_cycles_rejected(#[case] entries: Value) {
        let mut section = json!({"_field": "type", "_strict": true});
        for (key, value) in entries.as_object().unwrap() {
            section[key] = value.clone();
        }
        let err = build(section).unwrap_err();
        assert!(matches!(err, RegistryError::CyclicAlias { .. }));
    }

    #[test]
    fn test_alias_chain_resolves_and_merges_defaults() {
        let registry = build(fixtures::filter_section()).unwrap();
        assert!(registry.is_alias("short"));
        assert!(registry.is_alias("tiny"));
        let tiny = registry.resolve("tiny").unwrap();
        assert_eq!((tiny.type_id)(), TypeId::of::<Length>());

        let defaults = registry.defaults("tiny");
        assert_eq!(Value::Object(defaults), json!({"max": 2, "min": 0}));
        assert!(registry.is_inlined("tiny"));
        assert!(!registry.is_inlined("short"));
    }

    #[test]
    fn test_package_relative_and_qualified_resolution() {
        let registry = build(fixtures::filter_section()).unwrap();
        let qualified = Upper::class_info().qualified_name();
        assert_eq!((registry.resolve(&qualified).unwrap().type_id)(), TypeId::of::<Upper>());
        assert_eq!((registry.resolve("Chain").unwrap().type_id)(), TypeId::of::<Chain>());
        assert!(matches!(registry.resolve("nothing"), Err(RegistryError::UnknownLabel { .. })));
        assert!(matches!(registry.resolve("Stranger"), Err(RegistryError::NotSubtype { .. })));
    }

    #[rstest]
    #[case("Upper", true)]
    #[case("fixtures.Upper", true)]
    #[case("elsewhere.Upper", false)]
    #[case("fixtures.elsewhere.Upper", false)]
    fn test_class_lookup_walks_parent_packages(#[case] class: &str, #[case] found: bool) {
        let section = json!({
            "_field": "type",
            "_strict": true,
            "_class": fixtures::qualified("Filter"),
            "entry": class,
        });
        match build(section) {
            Ok(registry) => {
                assert!(found, "{class} should not resolve");
                let resolved = registry.resolve("entry").unwrap();
                assert_eq!((resolved.type_id)(), TypeId::of::<Upper>());
            }
            Err(err) => {
                assert!(!found, "{class} should resolve: {err}");
                assert!(matches!(err, RegistryError::MissingClass { .. }));
            }
        }
    }

    #[test]
    fn test_sugar_loaded() {
        let registry = build(fixtures::filter_section()).unwrap();
        let array = registry.array_sugar().unwrap();
        assert_eq!(array.field(), "filters");
        assert_eq!(array.origin(), "filter array sugar : chain");
        let default = registry.default_sugar().unwrap();
        assert_eq!(default.label(), "upper");
        assert_eq!(default.origin(), "filter default type : upper");
    }

    #[test]
    fn test_array_sugar_disabled_when_unusable() {
        let mut unknown = fixtures::filter_section();
        unknown["_array"] = json!("missing");
        assert!(build(unknown).unwrap().array_sugar().is_none());

        let mut no_field = fixtures::filter_section();
        no_field["_array"] = json!("upper");
        assert!(build(no_field).unwrap().array_sugar().is_none());
    }

    #[test]
    fn test_unknown_default_label_rejected() {
        let mut section = fixtures::filter_section();
        section["_default"] = json!("missing");
        let err = build(section).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDefaultLabel { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = PluginRegistry::empty("filter", None, ClassCatalog::global());
        assert_eq!(registry.class_field(), DEFAULT_CLASS_FIELD);
        assert!(registry.is_empty());
        assert!(registry.default_sugar().is_none());
        let qualified = Upper::class_info().qualified_name();
        assert!(registry.resolve(&qualified).is_ok());
    }

    #[test]
    fn test_display_lists_labels() {
        let registry = build(fixtures::filter_section()).unwrap();
        let rendered = registry.to_string();
        assert!(rendered.starts_with("filter (field 'type'"));
        assert!(rendered.contains("upper -> "));
        assert!(rendered.contains("array=chain"));
    }
}
