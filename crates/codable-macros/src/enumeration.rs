//! `#[derive(CodableEnum)]` implementation.

use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, spanned::Spanned};

pub fn derive_codable_enum(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "CodableEnum cannot be derived for generic types",
        ));
    }
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "CodableEnum can only be derived for enums",
        ));
    };

    let name = &input.ident;
    let name_str = name.unraw().to_string();
    let mut entries = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "CodableEnum variants must not carry data",
            ));
        }
        let key = match parse_rename(&variant.attrs)? {
            Some(rename) => rename.to_uppercase(),
            None => variant.ident.unraw().to_string().to_shouty_snake_case(),
        };
        let ident = &variant.ident;
        entries.push(quote!((#key, #name::#ident)));
    }

    Ok(quote! {
        impl ::codable_core::CodableEnum for #name {
            const NAME: &'static str = #name_str;

            fn variants() -> &'static [(&'static str, Self)] {
                const VARIANTS: &[(&str, #name)] = &[#(#entries),*];
                VARIANTS
            }
        }

        impl ::codable_core::Decode for #name {
            fn kind() -> ::codable_core::FieldKind {
                ::codable_core::FieldKind::Enum { name: #name_str }
            }

            fn decode(
                value: &::codable_core::serde_json::Value,
                cx: &mut ::codable_core::Hydrator<'_>,
            ) -> ::codable_core::DecodeResult<Self> {
                cx.read_enum::<Self>(value)
            }
        }
    })
}

fn parse_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("codable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported variant attribute, expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}
