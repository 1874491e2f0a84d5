//! Error types for registry construction and decoding.
//!
//! Registry errors are raised once, while a plugin category is being built,
//! and poison that category. Decode errors abort a single decode call and
//! carry the field path and target type at which they occurred.

use thiserror::Error;

use crate::foundation::node::ConfigValueType;

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while building or querying a plugin registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A required `_`-directive is absent from the category section.
    #[error("plugin category '{category}' is missing required directive '{key}'")]
    MissingDirective {
        /// The category being built.
        category: String,
        /// The directive key (e.g. `_field`).
        key: &'static str,
    },

    /// A directive is present but has the wrong value type.
    #[error(
        "plugin category '{category}' directive '{key}' has wrong type: expected {expected}, found {found}"
    )]
    WrongDirectiveType {
        /// The category being built.
        category: String,
        /// The directive key.
        key: String,
        /// What was expected.
        expected: &'static str,
        /// What was found.
        found: ConfigValueType,
    },

    /// An entry is neither a string nor an object.
    #[error(
        "plugin category '{category}' entry '{label}' has wrong type: expected STRING OR OBJECT, found {found}"
    )]
    WrongEntryType {
        /// The category being built.
        category: String,
        /// The offending label.
        label: String,
        /// What was found.
        found: ConfigValueType,
    },

    /// An object entry has no `_class` key.
    #[error("plugin category '{category}' entry '{label}' does not name a '_class'")]
    MissingEntryClass {
        /// The category being built.
        category: String,
        /// The offending label.
        label: String,
    },

    /// A label points at a class the catalog does not know.
    #[error("plugin category '{category}' with alias '{label}' is pointing to missing class '{class}'")]
    MissingClass {
        /// The category being built.
        category: String,
        /// The label being registered.
        label: String,
        /// The class name that could not be found.
        class: String,
    },

    /// The `_class` directive names a base the catalog does not know.
    #[error("could not find specified base class '{base}' for category '{category}'")]
    MissingBaseClass {
        /// The category being built.
        category: String,
        /// The base name that could not be found.
        base: String,
    },

    /// A resolved class cannot be upcast to the category's base.
    #[error(
        "plugin {category} specified base class {base}, but '{class_field}: {class}' is not a valid subtype"
    )]
    NotSubtype {
        /// The category.
        category: String,
        /// The base class name.
        base: String,
        /// The discriminator key of the category.
        class_field: String,
        /// The offending class.
        class: String,
    },

    /// The same class is registered under two labels.
    #[error("plugin category '{category}' registers class '{class}' under both '{first}' and '{second}'")]
    DuplicateClass {
        /// The category being built.
        category: String,
        /// The class registered twice.
        class: String,
        /// The label registered first.
        first: String,
        /// The label registered second.
        second: String,
    },

    /// Following an alias chain revisits an alias.
    #[error("plugin category '{category}': cyclical aliases detected at '{alias}'")]
    CyclicAlias {
        /// The category being built.
        category: String,
        /// The alias whose chain loops.
        alias: String,
    },

    /// `_default` names a label that is not registered.
    #[error("plugin category '{category}' default type '{label}' is not a registered label")]
    UnknownDefaultLabel {
        /// The category being built.
        category: String,
        /// The unknown label.
        label: String,
    },

    /// A label (or class name) does not resolve to any known type.
    #[error("plugin category '{category}' has no type registered for '{label}'")]
    UnknownLabel {
        /// The category queried.
        category: String,
        /// The label that failed to resolve.
        label: String,
    },
}

// =============================================================================
// Decode Errors
// =============================================================================

/// What went wrong while decoding a value.
#[derive(Debug, Clone, Error)]
pub enum DecodeErrorKind {
    /// The value has the wrong shape for the target.
    #[error("expected {expected}, found {found}")]
    WrongType {
        /// The shape that was expected.
        expected: &'static str,
        /// The shape that was found.
        found: ConfigValueType,
    },

    /// A number does not fit the target width.
    #[error("value {value} is out of range for {target}")]
    NumberOutOfRange {
        /// The rendered value.
        value: String,
        /// The target numeric type.
        target: &'static str,
    },

    /// A fractional number was given for an integer target.
    #[error("value {value} is not an integer")]
    NotAnInteger {
        /// The rendered value.
        value: String,
    },

    /// The numeric representation has no decoding rule.
    #[error("unsupported numeric or primitive type {target}")]
    UnsupportedNumber {
        /// The target numeric type.
        target: &'static str,
    },

    /// A string does not name any variant of the target enum.
    #[error("'{value}' is not a variant of {enum_name}")]
    UnknownEnumVariant {
        /// The string from the config.
        value: String,
        /// The enum type name.
        enum_name: &'static str,
    },

    /// Polymorphic type resolution failed.
    #[error(transparent)]
    Resolve(#[from] RegistryError),

    /// No discriminator, no single-key shorthand and no default type.
    #[error("no '{class_field}' discriminator and no default type for category '{category}'")]
    MissingType {
        /// The category of the target.
        category: String,
        /// The discriminator key of the category.
        class_field: String,
    },

    /// A list was given for an object target without usable array sugar.
    #[error("list value given but category '{category}' has no array sugar for this type")]
    ArraySugarUnavailable {
        /// The category of the target.
        category: String,
    },

    /// A `null` element or map value for a non-optional type.
    #[error("null is not allowed for a non-optional value")]
    NullElement,

    /// Default construction of the target failed.
    #[error("could not construct {type_name}: {reason}")]
    Construct {
        /// The type being constructed.
        type_name: &'static str,
        /// Why construction failed.
        reason: String,
    },

    /// Raised by a custom-decode or post-decode hook.
    #[error("{0}")]
    Custom(String),
}

/// A fatal decode failure, located by field path and target type.
#[derive(Debug, Clone, Error)]
#[error("failed to decode `{path}` ({target}): {kind}")]
pub struct DecodeError {
    path: String,
    target: &'static str,
    #[source]
    kind: DecodeErrorKind,
}

impl DecodeError {
    /// Creates a decode error at the given location.
    pub fn new(path: impl Into<String>, target: &'static str, kind: DecodeErrorKind) -> Self {
        Self {
            path: path.into(),
            target,
            kind,
        }
    }

    /// The dotted field path at which decoding failed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The type that was being hydrated.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// The failure itself.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

// =============================================================================
// Hook Errors
// =============================================================================

/// Failure reported by a type's constructor.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConstructError(String);

impl ConstructError {
    /// Creates a construction error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Failure reported by a post-decode hook.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    /// Creates a hook error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registry construction and lookup.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;
