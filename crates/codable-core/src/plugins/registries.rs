//! The set of plugin registries, keyed by category.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::foundation::catalog::{BaseInfo, ClassCatalog};
use crate::foundation::node::ConfigValueType;
use crate::plugins::registry::PluginRegistry;

/// All configured plugin categories plus the catalog they resolve against.
pub struct PluginRegistries {
    registries: HashMap<String, Arc<PluginRegistry>>,
    /// Empty registries handed out for unconfigured categories.
    unconfigured: RwLock<HashMap<String, Arc<PluginRegistry>>>,
    catalog: Arc<ClassCatalog>,
}

impl PluginRegistries {
    /// Creates a set with no configured categories.
    pub fn new(catalog: Arc<ClassCatalog>) -> Self {
        Self {
            registries: HashMap::new(),
            unconfigured: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    /// Builds one registry per key of the `plugins` object.
    ///
    /// Any category failing to build fails the whole set.
    pub fn from_config(section: &Value, catalog: Arc<ClassCatalog>) -> RegistryResult<Self> {
        let Value::Object(categories) = section else {
            return Err(RegistryError::WrongDirectiveType {
                category: String::from("plugins"),
                key: String::from("plugins"),
                expected: "OBJECT",
                found: ConfigValueType::of(section),
            });
        };

        let mut registries = Self::new(catalog);
        for (category, value) in categories {
            let Value::Object(body) = value else {
                return Err(RegistryError::WrongEntryType {
                    category: category.clone(),
                    label: category.clone(),
                    found: ConfigValueType::of(value),
                });
            };
            let registry = PluginRegistry::new(category.clone(), body, Arc::clone(&registries.catalog))?;
            registries.insert(registry);
        }
        info!(categories = registries.len(), "Plugin registries ready");
        Ok(registries)
    }

    /// Adds or replaces the registry of its category.
    pub fn insert(&mut self, registry: PluginRegistry) {
        self.registries
            .insert(registry.category().to_owned(), Arc::new(registry));
    }

    pub fn get(&self, category: &str) -> Option<&Arc<PluginRegistry>> {
        self.registries.get(category)
    }

    /// The registry of `category`, or an empty one if it is not configured.
    ///
    /// The empty registry is built on first use and shared afterwards; `base`
    /// only matters for that first call.
    pub fn get_or_empty(&self, category: &str, base: Option<&'static BaseInfo>) -> Arc<PluginRegistry> {
        if let Some(registry) = self.registries.get(category) {
            return Arc::clone(registry);
        }
        if let Some(registry) = self.unconfigured.read().get(category) {
            return Arc::clone(registry);
        }
        let mut unconfigured = self.unconfigured.write();
        let registry = unconfigured.entry(category.to_owned()).or_insert_with(|| {
            debug!(category, "Using empty registry for unconfigured category");
            Arc::new(PluginRegistry::empty(category, base, Arc::clone(&self.catalog)))
        });
        Arc::clone(registry)
    }

    pub fn catalog(&self) -> &Arc<ClassCatalog> {
        &self.catalog
    }

    /// Configured category names.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.registries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRegistry> + '_ {
        self.registries.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

impl fmt::Debug for PluginRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut categories: Vec<&str> = self.categories().collect();
        categories.sort_unstable();
        f.debug_struct("PluginRegistries")
            .field("categories", &categories)
            .field("catalog", &self.catalog)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    #[test]
    fn test_from_config_builds_each_category() {
        let plugins = json!({"filter": fixtures::filter_section()});
        let registries = PluginRegistries::from_config(&plugins, ClassCatalog::global()).unwrap();
        assert_eq!(registries.len(), 1);
        assert!(registries.get("filter").is_some());
        assert!(registries.get("sink").is_none());
    }

    #[test]
    fn test_unconfigured_category_is_empty() {
        let registries = PluginRegistries::new(ClassCatalog::global());
        let registry = registries.get_or_empty("sink", None);
        assert!(registry.is_empty());
        assert_eq!(registry.class_field(), "class");
        assert_eq!(registries.len(), 0);
    }

    #[test]
    fn test_unconfigured_registry_built_once() {
        let plugins = json!({"filter": fixtures::filter_section()});
        let registries = PluginRegistries::from_config(&plugins, ClassCatalog::global()).unwrap();

        let first = registries.get_or_empty("sink", None);
        let second = registries.get_or_empty("sink", None);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &registries.get_or_empty("other", None)));

        let configured = registries.get_or_empty("filter", None);
        assert!(Arc::ptr_eq(&configured, registries.get("filter").unwrap()));
        assert!(!configured.is_empty());
    }

    #[test]
    fn test_one_bad_category_fails_all() {
        let plugins = json!({
            "filter": fixtures::filter_section(),
            "broken": {"_strict": true},
        });
        assert!(PluginRegistries::from_config(&plugins, ClassCatalog::global()).is_err());
    }

    #[test]
    fn test_non_object_sections_rejected() {
        assert!(PluginRegistries::from_config(&json!([1]), ClassCatalog::global()).is_err());
        let err = PluginRegistries::from_config(&json!({"filter": "x"}), ClassCatalog::global()).unwrap_err();
        assert!(matches!(err, RegistryError::WrongEntryType { .. }));
    }
}
