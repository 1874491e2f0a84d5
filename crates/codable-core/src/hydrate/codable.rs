//! Capability traits implemented by decodable types.

use serde_json::Value;

use crate::error::{ConstructError, DecodeErrorKind, DecodeResult, HookError};
use crate::foundation::catalog::{BaseInfo, ClassInfo};
use crate::foundation::descriptor::{FieldKind, TypeDescriptor};
use crate::foundation::node::ObjectView;
use crate::hydrate::engine::Hydrator;

/// A struct that can be instantiated and hydrated from an object node.
///
/// Usually derived with `#[derive(Codable)]`, which also registers the type
/// in the class catalog.
pub trait Codable: Sized + 'static {
    /// The field table used to populate instances.
    fn descriptor() -> &'static TypeDescriptor<Self>;

    /// The catalog record of this type.
    fn class_info() -> &'static ClassInfo;

    /// Creates a fresh instance before population.
    fn construct() -> Result<Self, ConstructError>;

    /// Returns the custom-decode capability, if the type has one.
    ///
    /// A type with custom decoding receives the whole node and its fields are
    /// not populated generically.
    fn as_custom_decode(&mut self) -> Option<&mut dyn CustomDecode> {
        None
    }

    /// Returns the post-decode capability, if the type has one.
    fn as_post_decode(&mut self) -> Option<&mut dyn PostDecode> {
        None
    }
}

/// Decodes an instance from its node by hand.
pub trait CustomDecode {
    fn decode_from(&mut self, node: ObjectView<'_>, cx: &mut Hydrator<'_>) -> DecodeResult<()>;
}

/// Runs after all fields of an instance were populated.
pub trait PostDecode {
    fn post_decode(&mut self) -> Result<(), HookError>;
}

/// A value that can be decoded from a config node.
pub trait Decode: Sized {
    /// Dispatch kind of a field of this type.
    fn kind() -> FieldKind;

    /// Decodes a non-null value.
    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self>;

    /// Decodes an explicit `null`.
    fn decode_null(cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        Err(cx.error(DecodeErrorKind::NullElement))
    }
}

/// A trait object type decoded polymorphically through a plugin category.
///
/// Implemented for `dyn Trait` by the [`plugin_base!`](crate::plugin_base)
/// macro.
pub trait PluginBase: 'static {
    /// The plugin category whose registry resolves this base.
    const CATEGORY: &'static str;

    fn base_info() -> &'static BaseInfo;
}

/// A unit-only enum decoded from its upper-cased variant name.
pub trait CodableEnum: Copy + 'static {
    const NAME: &'static str;

    /// Variant names (upper case) paired with their values.
    fn variants() -> &'static [(&'static str, Self)];
}

/// Declares a trait object type as a plugin base of `category`.
///
/// ```ignore
/// pub trait Filter { fn accept(&self, value: &str) -> bool; }
/// codable_core::plugin_base!(dyn Filter, category = "filter");
/// ```
#[macro_export]
macro_rules! plugin_base {
    (dyn $base:ident, category = $category:literal $(,)?) => {
        const _: () = {
            #[$crate::linkme::distributed_slice($crate::BASES)]
            #[linkme(crate = $crate::linkme)]
            static BASE_INFO: $crate::BaseInfo = $crate::BaseInfo {
                module: ::core::module_path!(),
                ident: ::core::stringify!($base),
                category: $category,
                type_id: ::core::any::TypeId::of::<dyn $base>,
            };

            impl $crate::PluginBase for dyn $base {
                const CATEGORY: &'static str = $category;

                fn base_info() -> &'static $crate::BaseInfo {
                    &BASE_INFO
                }
            }
        };
    };
}
