//! `#[derive(Codable)]` implementation.
//!
//! # Generated items
//!
//! All items are emitted inside an anonymous `const _: () = { ... };` block:
//!
//! 1. A `ClassInfo` static registered into `codable_core::CLASSES`
//! 2. One upcast function per declared base
//! 3. `impl Codable` with a lazily built `TypeDescriptor`
//! 4. `impl Decode` routing to `Hydrator::hydrate_custom`
//!
//! # Struct-level attributes `#[codable(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `base` | `dyn Filter` | Plugin base the struct implements (repeatable) |
//! | `name` | `"app.filters.Upper"` | Dotted catalog name override |
//! | `constructor` | `Self::create` | Fallible constructor used instead of `Default` |
//! | `custom_decode` | | Route decoding to the `CustomDecode` impl |
//! | `post_decode` | | Run the `PostDecode` impl after population |
//!
//! # Field-level attributes `#[codable(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `rename = "key"` | Config key of the field |
//! | `skip` | Leave the field out of the descriptor |
//! | `write_only` | Describe the field but never populate it |
//! | `intern` | Intern map keys |
//! | `flatten` | Read an embedded `Codable` struct from the same node |

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, Path, Type, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

#[derive(Default)]
struct StructAttrs {
    bases: Vec<Type>,
    name: Option<String>,
    constructor: Option<Path>,
    custom_decode: bool,
    post_decode: bool,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    write_only: bool,
    intern: bool,
    flatten: bool,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_codable(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Codable cannot be derived for generic types",
        ));
    }

    let fields: Vec<&Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.span(),
                    "Codable requires named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Codable cannot be derived for enums. Use CodableEnum for unit-only enums.",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Codable cannot be derived for unions",
            ));
        }
    };

    let attrs = parse_struct_attrs(&input.attrs)?;
    let descriptor = generate_descriptor(input, &fields)?;
    Ok(generate_impl(input, &attrs, descriptor))
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut parsed = StructAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("codable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base") {
                parsed.bases.push(meta.value()?.parse::<Type>()?);
            } else if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("constructor") {
                parsed.constructor = Some(meta.value()?.parse::<Path>()?);
            } else if meta.path.is_ident("custom_decode") {
                parsed.custom_decode = true;
            } else if meta.path.is_ident("post_decode") {
                parsed.post_decode = true;
            } else {
                return Err(meta.error("unsupported struct attribute, expected one of: base, name, constructor, custom_decode, post_decode"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("codable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                parsed.rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else if meta.path.is_ident("write_only") {
                parsed.write_only = true;
            } else if meta.path.is_ident("intern") {
                parsed.intern = true;
            } else if meta.path.is_ident("flatten") {
                parsed.flatten = true;
            } else {
                return Err(meta.error("unsupported field attribute, expected one of: rename, skip, write_only, intern, flatten"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

// ============================================================================
// Code generation
// ============================================================================

fn generate_descriptor(input: &DeriveInput, fields: &[&Field]) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let mut chain = Vec::with_capacity(fields.len());

    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new(field.span(), "Codable requires named fields"));
        };
        let key = attrs
            .rename
            .clone()
            .unwrap_or_else(|| ident.unraw().to_string());

        if attrs.flatten {
            if attrs.write_only || attrs.intern || attrs.rename.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "`flatten` cannot be combined with rename, write_only or intern",
                ));
            }
            chain.push(quote! {
                .flatten(#key, |this: &mut #name| &mut this.#ident)
            });
            continue;
        }

        let mut flags = Vec::new();
        if attrs.write_only {
            flags.push(quote!(::codable_core::FieldFlags::WRITE_ONLY));
        }
        if attrs.intern {
            flags.push(quote!(::codable_core::FieldFlags::INTERN));
        }
        if flags.is_empty() {
            chain.push(quote! {
                .field(#key, |this: &mut #name| &mut this.#ident)
            });
        } else {
            chain.push(quote! {
                .field_with(#key, #(#flags)|*, |this: &mut #name| &mut this.#ident)
            });
        }
    }

    Ok(quote! {
        static DESCRIPTOR: ::std::sync::OnceLock<::codable_core::TypeDescriptor<#name>> =
            ::std::sync::OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            ::codable_core::TypeDescriptor::builder(#name_str)
                #(#chain)*
                .build()
        })
    })
}

fn generate_impl(input: &DeriveInput, attrs: &StructAttrs, descriptor: TokenStream) -> TokenStream {
    let name = &input.ident;
    let ident_str = name.unraw().to_string();

    let class_name = match &attrs.name {
        Some(explicit) => quote!(::core::option::Option::Some(#explicit)),
        None => quote!(::core::option::Option::None),
    };

    let upcast_fns: Vec<_> = (0..attrs.bases.len())
        .map(|index| format_ident!("__codable_upcast_{}", index))
        .collect();
    let bases = &attrs.bases;

    let construct = match &attrs.constructor {
        Some(path) => quote!(#path()),
        None => quote!(::core::result::Result::Ok(<Self as ::core::default::Default>::default())),
    };

    let custom_decode = attrs.custom_decode.then(|| {
        quote! {
            fn as_custom_decode(&mut self) -> ::core::option::Option<&mut dyn ::codable_core::CustomDecode> {
                ::core::option::Option::Some(self)
            }
        }
    });

    let post_decode = attrs.post_decode.then(|| {
        quote! {
            fn as_post_decode(&mut self) -> ::core::option::Option<&mut dyn ::codable_core::PostDecode> {
                ::core::option::Option::Some(self)
            }
        }
    });

    quote! {
        const _: () = {
            #(
                fn #upcast_fns(
                    object: ::std::boxed::Box<dyn ::core::any::Any>,
                ) -> ::core::result::Result<
                    ::std::boxed::Box<dyn ::core::any::Any>,
                    ::std::boxed::Box<dyn ::core::any::Any>,
                > {
                    let concrete = object.downcast::<#name>()?;
                    let upcast: ::std::boxed::Box<#bases> = concrete;
                    ::core::result::Result::Ok(::std::boxed::Box::new(upcast))
                }
            )*

            #[::codable_core::linkme::distributed_slice(::codable_core::CLASSES)]
            #[linkme(crate = ::codable_core::linkme)]
            static __CODABLE_CLASS: ::codable_core::ClassInfo = ::codable_core::ClassInfo {
                module: ::core::module_path!(),
                ident: #ident_str,
                name: #class_name,
                type_id: ::core::any::TypeId::of::<#name>,
                hydrate: ::codable_core::hydrate_erased::<#name>,
                fields: ::codable_core::field_summaries::<#name>,
                bases: &[
                    #(
                        ::codable_core::BaseImpl {
                            base: ::core::any::TypeId::of::<#bases>,
                            upcast: #upcast_fns,
                        },
                    )*
                ],
            };

            impl ::codable_core::Codable for #name {
                fn descriptor() -> &'static ::codable_core::TypeDescriptor<Self> {
                    #descriptor
                }

                fn class_info() -> &'static ::codable_core::ClassInfo {
                    &__CODABLE_CLASS
                }

                fn construct() -> ::core::result::Result<Self, ::codable_core::ConstructError> {
                    #construct
                }

                #custom_decode
                #post_decode
            }

            impl ::codable_core::Decode for #name {
                fn kind() -> ::codable_core::FieldKind {
                    ::codable_core::FieldKind::Object(::codable_core::ObjectKind::of::<#name>(false))
                }

                fn decode(
                    value: &::codable_core::serde_json::Value,
                    cx: &mut ::codable_core::Hydrator<'_>,
                ) -> ::codable_core::DecodeResult<Self> {
                    cx.hydrate_custom::<Self>(value)
                }
            }
        };
    }
}
