//! Procedural macros for the Codable configuration framework.
//!
//! This crate provides:
//!
//! - `#[derive(Codable)]` - Field descriptor, catalog registration and
//!   `Decode` implementation for structs
//! - `#[derive(CodableEnum)]` - Name table and `Decode` implementation for
//!   unit-only enums
//!
//! Generated code refers to `::codable_core`, so the deriving crate must
//! depend on `codable-core` directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use codable::prelude::*;
//!
//! pub trait Filter {
//!     fn accept(&self, value: &str) -> bool;
//! }
//! plugin_base!(dyn Filter, category = "filter");
//!
//! #[derive(Default, Codable)]
//! #[codable(base = dyn Filter)]
//! pub struct Chain {
//!     filters: Vec<Box<dyn Filter>>,
//!     #[codable(rename = "match-all")]
//!     match_all: bool,
//! }
//! ```

mod codable;
mod enumeration;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Codable` and `Decode` for a struct with named fields.
///
/// # Struct attributes
///
/// - `#[codable(base = dyn Trait)]` - The struct can be decoded as `Box<dyn Trait>`
///   (repeatable; `Trait` must be declared with `plugin_base!`)
/// - `#[codable(name = "a.b.Name")]` - Override the dotted catalog name
/// - `#[codable(constructor = path::to::fn)]` - Construct with `fn() -> Result<Self, ConstructError>`
///   instead of `Default::default`
/// - `#[codable(custom_decode)]` - The struct implements `CustomDecode`
/// - `#[codable(post_decode)]` - The struct implements `PostDecode`
///
/// # Field attributes
///
/// - `#[codable(rename = "key")]` - Config key (default: the field name)
/// - `#[codable(skip)]` - Not part of the descriptor
/// - `#[codable(write_only)]` - Described but never populated
/// - `#[codable(intern)]` - Intern the keys of this map field
/// - `#[codable(flatten)]` - Read the fields of an embedded `Codable` struct
///   from the same node
#[proc_macro_derive(Codable, attributes(codable))]
pub fn derive_codable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match codable::derive_codable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `CodableEnum` and `Decode` for a unit-only enum.
///
/// Variants are matched against the upper-cased config string. The default
/// name of a variant is its identifier in SCREAMING_SNAKE_CASE; override it
/// with `#[codable(rename = "...")]`. The enum must be `Copy`.
#[proc_macro_derive(CodableEnum, attributes(codable))]
pub fn derive_codable_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match enumeration::derive_codable_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
