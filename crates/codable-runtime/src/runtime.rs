//! Runtime bootstrap: config tree, logging, plugin registries and decoder.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use codable_runtime::CodecRuntime;
//!
//! // Loads codable.{toml,yaml,json} from the current directory plus CODABLE_* variables
//! let runtime = CodecRuntime::builder().build()?;
//! let filter: Option<Box<dyn Filter>> = runtime.decode_path("app.filter")?;
//!
//! // Or start from an already merged tree
//! let runtime = CodecRuntime::from_tree(tree, ClassCatalog::global())?;
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use codable_core::{ClassCatalog, Decode, DecodeResult, Decoder, PluginRegistries, at_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{
    ConfigError, ConfigLoader, LoadedConfig, RUNTIME_KEY, RuntimeSettings, validate_settings,
};
use crate::error::RuntimeResult;
use crate::logging;

/// A loaded config tree together with the decoder built from its plugins section.
///
/// Cheap to share: the tree and the registries sit behind `Arc`s and the
/// decoder is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct CodecRuntime {
    tree: Arc<Value>,
    settings: RuntimeSettings,
    decoder: Decoder,
}

impl CodecRuntime {
    /// Creates a runtime builder for file and environment based loading.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already merged tree.
    ///
    /// Runtime settings are read from the tree's `runtime` key, defaults
    /// apply when it is absent.
    pub fn from_tree(tree: Value, catalog: Arc<ClassCatalog>) -> RuntimeResult<Self> {
        let settings = match at_path(&tree, RUNTIME_KEY) {
            Some(section) => {
                RuntimeSettings::deserialize(section).map_err(ConfigError::InvalidSettings)?
            }
            None => RuntimeSettings::default(),
        };
        Self::from_loaded(LoadedConfig { tree, settings }, catalog)
    }

    /// Creates a runtime from the output of a [`ConfigLoader`].
    pub fn from_loaded(loaded: LoadedConfig, catalog: Arc<ClassCatalog>) -> RuntimeResult<Self> {
        let LoadedConfig { tree, settings } = loaded;
        validate_settings(&settings)?;

        if settings.init_logging {
            logging::init_from_config(&settings.logging);
        }

        let registries = match at_path(&tree, &settings.plugins) {
            Some(section) => PluginRegistries::from_config(section, catalog)?,
            None => {
                debug!(path = %settings.plugins, "No plugins section, only qualified class names resolve");
                PluginRegistries::new(catalog)
            }
        };

        let runtime = Self {
            tree: Arc::new(tree),
            settings,
            decoder: Decoder::new(Arc::new(registries)),
        };

        info!(
            log_level = %runtime.settings.logging.level,
            stats = %runtime.stats(),
            "Runtime initialized from configuration"
        );

        Ok(runtime)
    }

    /// The whole loaded tree.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn registries(&self) -> &Arc<PluginRegistries> {
        self.decoder.registries()
    }

    /// Decodes an arbitrary value with this runtime's registries.
    pub fn decode<T: Decode>(&self, value: &Value) -> DecodeResult<T> {
        self.decoder.decode(value)
    }

    /// Decodes the value at a dotted path of the loaded tree.
    ///
    /// Returns `Ok(None)` if the path is absent or null.
    pub fn decode_path<T: Decode>(&self, path: &str) -> DecodeResult<Option<T>> {
        self.decoder.decode_path(&self.tree, path)
    }

    /// Counts of what the runtime has loaded.
    pub fn stats(&self) -> RuntimeStats {
        let registries = self.registries();
        let (labels, aliases) = registries.iter().fold((0, 0), |(labels, aliases), registry| {
            (labels + registry.len(), aliases + registry.aliases().count())
        });
        RuntimeStats {
            categories: registries.len(),
            labels,
            aliases,
            classes: registries.catalog().class_count(),
            bases: registries.catalog().base_count(),
        }
    }
}

/// Statistics about a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Number of configured plugin categories.
    pub categories: usize,
    /// Number of labels bound directly to a class, across all categories.
    pub labels: usize,
    /// Number of alias labels, across all categories.
    pub aliases: usize,
    /// Number of classes in the catalog.
    pub classes: usize,
    /// Number of plugin bases in the catalog.
    pub bases: usize,
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} categories, {} labels ({} aliases), {} classes, {} bases",
            self.categories, self.labels, self.aliases, self.classes, self.bases
        )
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `CodecRuntime` from files and environment.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = CodecRuntime::builder()
///     .config_file("config/codable.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    catalog: Option<Arc<ClassCatalog>>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            catalog: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge<T: Serialize>(mut self, overrides: T) -> Self {
        self.config_loader = self.config_loader.merge(overrides);
        self
    }

    /// Uses `catalog` instead of the global link-time catalog.
    pub fn catalog(mut self, catalog: Arc<ClassCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<CodecRuntime> {
        let loaded = self.config_loader.load()?;
        let catalog = self.catalog.unwrap_or_else(ClassCatalog::global);
        CodecRuntime::from_loaded(loaded, catalog)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use codable_core::{DecodeErrorKind, RegistryError, plugin_base};
    use codable_macros::Codable;
    use serde_json::json;

    pub trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }
    plugin_base!(dyn Greeter, category = "greeter");

    #[derive(Default, Codable)]
    #[codable(base = dyn Greeter, name = "greet.Hello")]
    struct Hello {
        name: String,
        excited: bool,
    }

    impl Greeter for Hello {
        fn greet(&self) -> String {
            let mark = if self.excited { "!" } else { "." };
            format!("Hello, {}{mark}", self.name)
        }
    }

    #[derive(Default, Codable)]
    #[codable(base = dyn Greeter, name = "greet.Chorus")]
    struct Chorus {
        voices: Vec<Box<dyn Greeter>>,
    }

    impl Greeter for Chorus {
        fn greet(&self) -> String {
            self.voices.iter().map(|voice| voice.greet()).collect::<Vec<_>>().join(" ")
        }
    }

    fn tree() -> Value {
        json!({
            "runtime": {"init_logging": false},
            "plugins": {
                "greeter": {
                    "_field": "kind",
                    "_strict": true,
                    "_class": "codable_runtime.runtime.tests.Greeter",
                    "_array": "chorus",
                    "hello": "greet.Hello",
                    "chorus": "greet.Chorus",
                    "shout": {"_class": "hello", "excited": true},
                },
            },
            "app": {
                "greeter": [
                    {"kind": "hello", "name": "Ada"},
                    {"shout": {"name": "Bob"}},
                ],
            },
        })
    }

    #[test]
    fn test_from_tree_decodes_paths() {
        let runtime = CodecRuntime::from_tree(tree(), ClassCatalog::global()).unwrap();
        let greeter: Box<dyn Greeter> = runtime.decode_path("app.greeter").unwrap().unwrap();
        assert_eq!(greeter.greet(), "Hello, Ada. Hello, Bob!");
        assert!(runtime.decode_path::<Box<dyn Greeter>>("app.missing").unwrap().is_none());
    }

    #[test]
    fn test_stats() {
        let runtime = CodecRuntime::from_tree(tree(), ClassCatalog::global()).unwrap();
        let stats = runtime.stats();
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.labels, 2);
        assert_eq!(stats.aliases, 1);
        assert!(stats.classes >= 2);
        assert!(stats.to_string().starts_with("1 categories, 2 labels (1 aliases)"));
    }

    #[test]
    fn test_missing_plugins_section() {
        let runtime = CodecRuntime::from_tree(
            json!({"runtime": {"init_logging": false}, "hello": {"class": "greet.Hello", "name": "Cy"}}),
            ClassCatalog::global(),
        )
        .unwrap();
        assert!(runtime.registries().is_empty());
        let greeter: Box<dyn Greeter> = runtime.decode_path("hello").unwrap().unwrap();
        assert_eq!(greeter.greet(), "Hello, Cy.");
    }

    #[test]
    fn test_custom_plugins_path() {
        let mut tree = tree();
        tree["runtime"]["plugins"] = json!("app.registry");
        tree["app"]["registry"] = tree["plugins"].take();
        let runtime = CodecRuntime::from_tree(tree, ClassCatalog::global()).unwrap();
        assert_eq!(runtime.stats().categories, 1);
    }

    #[test]
    fn test_registry_errors_surface() {
        let mut tree = tree();
        tree["plugins"]["greeter"]["ghost"] = json!("greet.Ghost");
        let err = CodecRuntime::from_tree(tree, ClassCatalog::global()).unwrap_err();
        assert!(matches!(err, RuntimeError::Registry(RegistryError::MissingClass { .. })));
    }

    #[test]
    fn test_invalid_settings() {
        let err = CodecRuntime::from_tree(
            json!({"runtime": {"init_logging": false, "plugins": ""}}),
            ClassCatalog::global(),
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(ConfigError::MissingField { .. })));

        let err = CodecRuntime::from_tree(
            json!({"runtime": {"logging": {"output": "pigeon"}}}),
            ClassCatalog::global(),
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(ConfigError::InvalidSettings(_))));
    }

    #[test]
    fn test_decode_errors_carry_paths() {
        let runtime = CodecRuntime::from_tree(tree(), ClassCatalog::global()).unwrap();
        let err = runtime
            .decode::<Box<dyn Greeter>>(&json!({"kind": "hello", "excited": "very"}))
            .err()
            .unwrap();
        assert_eq!(err.path(), "excited");
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_builder_loads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("codable.json"), tree().to_string()).unwrap();

        let runtime = CodecRuntime::builder()
            .search_path(dir.path())
            .without_env()
            .merge(json!({"app": {"solo": {"kind": "hello", "name": "Di"}}}))
            .build()
            .unwrap();

        let solo: Box<dyn Greeter> = runtime.decode_path("app.solo").unwrap().unwrap();
        assert_eq!(solo.greet(), "Hello, Di.");
        assert!(!runtime.settings().init_logging);
    }
}
