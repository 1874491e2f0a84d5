//! # Codable
//!
//! Typed, polymorphic object graphs from layered configuration trees.
//!
//! ## Overview
//!
//! A config tree names the concrete type of each polymorphic field with a
//! short label. Per-category plugin registries, configured in the tree
//! itself, map labels to Rust types that declared the matching base with
//! `#[codable(base = dyn Trait)]`.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌──────────────────────┐
//! │ ConfigLoader │────▶│ PluginRegistries   │────▶│ Decoder / Hydrator   │──▶ Box<dyn Trait>
//! │ (files, env) │     │ (labels, aliases)  │     │ (per-call path stack)│──▶ typed structs
//! └──────────────┘     └────────────────────┘     └──────────────────────┘
//! ```
//!
//! - **Runtime**: loads the tree, initialises logging, builds the registries
//! - **Registries**: one per category (`_field`, `_strict`, `_class`, `_array`, `_default`)
//! - **Engine**: resolves types and populates fields through derived descriptors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use codable::prelude::*;
//!
//! pub trait Shape {
//!     fn area(&self) -> f64;
//! }
//! plugin_base!(dyn Shape, category = "shape");
//!
//! #[derive(Default, Codable)]
//! #[codable(base = dyn Shape)]
//! struct Circle {
//!     radius: f64,
//! }
//!
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         std::f64::consts::PI * self.radius * self.radius
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CodecRuntime::builder().build()?;
//!     let shape: Option<Box<dyn Shape>> = runtime.decode_path("app.shape")?;
//!     Ok(())
//! }
//! ```
//!
//! Derived code refers to `::codable_core`, so crates deriving `Codable`
//! depend on `codable-core` next to this crate.
//!
//! ## Features
//!
//! - `toml-config`: TOML config files (default)
//! - `yaml-config`: YAML config files
//! - `json-log`: JSON log lines

pub use codable_core as core;
pub use codable_runtime as runtime;

pub use codable_macros::{Codable, CodableEnum};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use codable::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use codable_runtime::{CodecRuntime, ConfigLoader, LoggingBuilder, RuntimeError};

    // Declaring decodable types
    pub use codable_core::plugin_base;
    pub use codable_core::{Codable, CodableEnum, CustomDecode, PluginBase, PostDecode};
    pub use codable_macros::{Codable, CodableEnum};

    // Decoding
    pub use codable_core::{
        ClassCatalog, Decode, DecodeError, DecodeResult, Decoder, Hydrator, ObjectView,
        PluginRegistries,
    };

    // Hook errors
    pub use codable_core::{ConstructError, HookError};
}
