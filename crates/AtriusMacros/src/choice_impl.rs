//! `#[derive(FhirChoice)]`: tagged-union glue for an enum of node types.
//!
//! Every variant must wrap exactly one node type. Three flavours are supported:
//!
//! * `#[fhir(base_name = "value")]` – a choice field family (`value[x]`). Variants are named
//!   after the `DataValue` variant they mirror, which also yields the FHIR suffix
//!   (`valueString`, `valueCoding`).
//! * `#[fhir(base_name = "value", open)]` – the open value union itself.
//! * no options – a plain closed union such as the resource union.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Type};

use crate::field_helpers::parse_choice_attrs;

pub(crate) fn derive(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let krate = quote! { ::atrius_fhir_model };

    let Data::Enum(de) = &input.data else {
        return Err(syn::Error::new(input.span(), "FhirChoice only supports enums"));
    };
    let attrs = parse_choice_attrs(&input.attrs)?;

    let mut variants: Vec<(&Ident, &Type)> = Vec::new();
    for v in &de.variants {
        let Fields::Unnamed(unnamed) = &v.fields else {
            return Err(syn::Error::new(v.span(), "FhirChoice variants must wrap one node type"));
        };
        if unnamed.unnamed.len() != 1 {
            return Err(syn::Error::new(v.span(), "FhirChoice variants must wrap one node type"));
        }
        variants.push((&v.ident, &unnamed.unnamed[0].ty));
    }
    if variants.is_empty() {
        return Err(syn::Error::new(input.span(), "FhirChoice needs at least one variant"));
    }

    let idents: Vec<_> = variants.iter().map(|(i, _)| *i).collect();
    let types: Vec<_> = variants.iter().map(|(_, t)| *t).collect();
    let accessors = idents.iter().zip(&types).map(|(ident, ty)| {
        let as_fn = format_ident!("as_{}", ident.to_string().to_snake_case());
        quote! {
            pub fn #as_fn(&self) -> ::core::option::Option<&#ty> {
                match self {
                    #name::#ident(v) => ::core::option::Option::Some(v),
                    #[allow(unreachable_patterns)]
                    _ => ::core::option::Option::None,
                }
            }
        }
    });

    let node_impl = quote! {
        impl #krate::node::Node for #name {
            fn type_name(&self) -> &'static str {
                match self { #(#name::#idents(v) => #krate::node::Node::type_name(v),)* }
            }

            fn fields(&self) -> #krate::node::FieldTable {
                match self { #(#name::#idents(v) => #krate::node::Node::fields(v),)* }
            }

            fn constraints(&self) -> &'static [#krate::support::Invariant] {
                match self { #(#name::#idents(v) => #krate::node::Node::constraints(v),)* }
            }

            fn walk_children<'t>(&'t self, walker: &mut #krate::visitor::Walker<'_, 't>) {
                match self { #(#name::#idents(v) => #krate::node::Node::walk_children(v, walker),)* }
            }

            fn has_children(&self) -> bool {
                match self { #(#name::#idents(v) => #krate::node::Node::has_children(v),)* }
            }

            fn is_resource(&self) -> bool {
                match self { #(#name::#idents(v) => #krate::node::Node::is_resource(v),)* }
            }

            fn is_primitive(&self) -> bool {
                match self { #(#name::#idents(v) => #krate::node::Node::is_primitive(v),)* }
            }

            fn primitive_value(&self) -> ::core::option::Option<#krate::primitive::PrimitiveValue<'_>> {
                match self { #(#name::#idents(v) => #krate::node::Node::primitive_value(v),)* }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                match self { #(#name::#idents(v) => #krate::node::Node::as_any(v),)* }
            }
        }
    };

    let common = quote! {
        #(
            impl ::core::convert::From<#types> for #name {
                fn from(value: #types) -> Self {
                    #name::#idents(value)
                }
            }
        )*

        impl #name {
            #(#accessors)*
        }

        #node_impl

        impl ::core::cmp::PartialEq for #name {
            fn eq(&self, other: &Self) -> bool {
                match (self, other) {
                    #((#name::#idents(a), #name::#idents(b)) => a == b,)*
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }

        impl ::core::cmp::Eq for #name {}

        impl ::core::hash::Hash for #name {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash(&::core::mem::discriminant(self), state);
                match self { #(#name::#idents(v) => ::core::hash::Hash::hash(v, state),)* }
            }
        }

        impl #krate::__private::serde::Serialize for #name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: #krate::__private::serde::Serializer,
            {
                match self {
                    #(#name::#idents(v) => #krate::__private::serde::Serialize::serialize(v, serializer),)*
                }
            }
        }

        impl #krate::support::IntoEvaluationResult for #name {
            fn to_evaluation_result(&self) -> #krate::support::EvaluationResult {
                match self {
                    #(#name::#idents(v) => #krate::support::IntoEvaluationResult::to_evaluation_result(v),)*
                }
            }
        }
    };

    let Some(base_name) = attrs.base_name else {
        if attrs.open {
            return Err(syn::Error::new(input.span(), "an open union needs a base_name"));
        }
        return Ok(common);
    };

    let field_names = idents.iter().map(|i| format!("{base_name}{i}"));
    let choice_element = quote! {
        impl #krate::support::ChoiceElement for #name {
            const ADMISSIBLE_TYPES: &'static [&'static str] =
                &[#(<#types as #krate::node::FhirType>::TYPE_NAME),*];

            fn base_name() -> &'static str {
                #base_name
            }

            fn possible_field_names() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#field_names),*]
            }
        }
    };

    let conversions = if attrs.open {
        quote! {
            impl #krate::choice::ChoiceValue for #name {
                fn from_data_value(value: #krate::choice::DataValue) -> ::core::result::Result<Self, #krate::choice::DataValue> {
                    ::core::result::Result::Ok(value)
                }
            }
        }
    } else {
        quote! {
            impl ::core::convert::From<#name> for #krate::choice::DataValue {
                fn from(value: #name) -> Self {
                    match value { #(#name::#idents(v) => #krate::choice::DataValue::#idents(v),)* }
                }
            }

            impl #krate::choice::ChoiceValue for #name {
                fn from_data_value(value: #krate::choice::DataValue) -> ::core::result::Result<Self, #krate::choice::DataValue> {
                    match value {
                        #(#krate::choice::DataValue::#idents(v) => ::core::result::Result::Ok(#name::#idents(v)),)*
                        other => ::core::result::Result::Err(other),
                    }
                }
            }

            impl ::core::convert::TryFrom<#krate::choice::DataValue> for #name {
                type Error = #krate::choice::DataValue;

                fn try_from(value: #krate::choice::DataValue) -> ::core::result::Result<Self, Self::Error> {
                    <Self as #krate::choice::ChoiceValue>::from_data_value(value)
                }
            }
        }
    };

    Ok(quote! {
        #common
        #choice_element
        #conversions
    })
}
