//! # Codable Core
//!
//! Plugin registry and hydration engine for the Codable configuration
//! framework.
//!
//! This crate turns a config tree (a [`serde_json::Value`]) into typed,
//! possibly polymorphic, object graphs. Polymorphism is driven by per-category
//! plugin registries that map short labels to concrete types.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Config nodes**: value types, dotted paths, object views and merging ([`ObjectView`])
//! - **Descriptors**: per-type field tables ([`TypeDescriptor`], [`FieldKind`], [`FieldFlags`])
//! - **Class catalog**: link-time registry of decodable types and bases ([`ClassCatalog`])
//! - **Interning**: shared map keys ([`intern`])
//!
//! ### Plugin Layer
//!
//! - **Registry**: labels, aliases, array and default sugar of one category ([`PluginRegistry`])
//! - **Registries**: all categories of a config tree ([`PluginRegistries`])
//!
//! ### Hydration Layer
//!
//! - **Capabilities**: [`Codable`], [`Decode`], [`CustomDecode`], [`PostDecode`], [`PluginBase`]
//! - **Engine**: [`Decoder`] and the per-call [`Hydrator`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use codable_core::{ClassCatalog, Decoder, PluginRegistries, plugin_base};
//! use codable_macros::Codable;
//! use serde_json::json;
//!
//! pub trait Filter {
//!     fn accept(&self, value: &str) -> bool;
//! }
//! plugin_base!(dyn Filter, category = "filter");
//!
//! #[derive(Default, Codable)]
//! #[codable(base = dyn Filter)]
//! struct Upper {
//!     pattern: String,
//! }
//!
//! impl Filter for Upper {
//!     fn accept(&self, value: &str) -> bool {
//!         value.contains(&self.pattern.to_uppercase())
//!     }
//! }
//!
//! let plugins = json!({"filter": {"_field": "type", "_strict": true, "upper": "app.Upper"}});
//! let registries = PluginRegistries::from_config(&plugins, ClassCatalog::global())?;
//! let decoder = Decoder::new(registries.into());
//! let filter: Box<dyn Filter> = decoder.decode(&json!({"type": "upper", "pattern": "ab"}))?;
//! assert!(filter.accept("xxABxx"));
//! ```

extern crate self as codable_core;

pub mod error;
pub mod foundation;
pub mod hydrate;
pub mod plugins;

#[cfg(test)]
mod fixtures;

#[doc(hidden)]
pub use linkme;
pub use serde_json;

// =============================================================================
// Foundation Layer Exports
// =============================================================================

pub use foundation::catalog::{BASES, BaseImpl, BaseInfo, CLASSES, ClassCatalog, ClassInfo};
pub use foundation::descriptor::{
    FieldDescriptor, FieldFlags, FieldKind, FieldSummary, NumberKind, ObjectKind, TypeDescriptor,
    TypeDescriptorBuilder, field_summaries,
};
pub use foundation::intern::intern;
pub use foundation::node::{ConfigValueType, ObjectView, at_path, has_path, with_fallback};

// =============================================================================
// Plugin Layer Exports
// =============================================================================

pub use plugins::registries::PluginRegistries;
pub use plugins::registry::{ArraySugar, DEFAULT_CLASS_FIELD, DefaultSugar, PluginRegistry};

// =============================================================================
// Hydration Layer Exports
// =============================================================================

pub use hydrate::{
    Codable, CodableEnum, CustomDecode, Decode, Decoder, Hydrator, MapKey, PluginBase, PostDecode,
    hydrate_erased,
};

// =============================================================================
// Error Exports
// =============================================================================

pub use error::{
    ConstructError, DecodeError, DecodeErrorKind, DecodeResult, HookError, RegistryError,
    RegistryResult,
};
