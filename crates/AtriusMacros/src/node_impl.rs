//! `#[derive(FhirNode)]`: immutable node glue for a struct.
//!
//! From one struct declaration this emits the field accessors, the static field table,
//! the `Node` traversal impl, visitor-based equality/hash/serialization, the capability
//! trait impls of the struct's layer, and the `<Name>Builder` accumulator whose
//! `build()` runs every local check before freezing.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type};

use crate::field_helpers::{get_effective_field_name, parse_field_attrs, parse_type_attrs};
use crate::invariant::{parse_invariants, InvariantLit};
use crate::type_helpers::{box_inner, is_rust_string, last_ident, option_inner, vec_inner};

/// Storage shape of a declared field, derived from its Rust type.
enum Shape<'a> {
    Required(&'a Type),
    Optional(&'a Type),
    Boxed(&'a Type),
    List(&'a Type),
    RequiredChoice(&'a Type),
    OptionalChoice(&'a Type),
    RequiredScalar,
    OptionalScalar,
}

struct NodeField<'a> {
    ident: &'a Ident,
    name: String,
    shape: Shape<'a>,
    min: u32,
    attribute: bool,
    invariants: Vec<InvariantLit>,
}

struct LayerField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    kind: String,
}

fn classify<'a>(ty: &'a Type, choice: bool) -> Shape<'a> {
    if choice {
        return match option_inner(ty) {
            Some(inner) => Shape::OptionalChoice(inner),
            None => Shape::RequiredChoice(ty),
        };
    }
    if let Some(inner) = vec_inner(ty) {
        return Shape::List(inner);
    }
    if let Some(inner) = option_inner(ty) {
        if let Some(boxed) = box_inner(inner) {
            return Shape::Boxed(boxed);
        }
        if is_rust_string(inner) {
            return Shape::OptionalScalar;
        }
        return Shape::Optional(inner);
    }
    if is_rust_string(ty) {
        return Shape::RequiredScalar;
    }
    Shape::Required(ty)
}

pub(crate) fn derive(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let krate = quote! { ::atrius_fhir_model };

    let Data::Struct(ds) = &input.data else {
        return Err(syn::Error::new(input.span(), "FhirNode only supports structs"));
    };
    let Fields::Named(named) = &ds.fields else {
        return Err(syn::Error::new(input.span(), "FhirNode requires named fields"));
    };

    let type_attrs = parse_type_attrs(&input.attrs)?;
    let type_name = type_attrs
        .type_name
        .clone()
        .unwrap_or_else(|| name.to_string());
    let type_invariants = parse_invariants(&input.attrs)?;

    let mut layer: Option<LayerField> = None;
    let mut fields = Vec::new();
    for f in &named.named {
        let Some(ident) = &f.ident else { continue };
        let attrs = parse_field_attrs(&f.attrs)?;
        if attrs.layer {
            if layer.is_some() {
                return Err(syn::Error::new(f.span(), "only one #[fhir(layer)] field is allowed"));
            }
            let kind = last_ident(&f.ty)
                .ok_or_else(|| syn::Error::new(f.ty.span(), "unsupported layer type"))?;
            layer = Some(LayerField { ident, ty: &f.ty, kind });
            continue;
        }
        let shape = classify(&f.ty, attrs.choice);
        let min = match (&shape, attrs.min) {
            (Shape::List(_), Some(min)) => min,
            (_, Some(_)) => {
                return Err(syn::Error::new(f.span(), "#[fhir(min)] only applies to list fields"));
            }
            (Shape::Required(_) | Shape::RequiredChoice(_) | Shape::RequiredScalar, None) => 1,
            _ => 0,
        };
        fields.push(NodeField {
            ident,
            name: get_effective_field_name(ident, &attrs),
            shape,
            min,
            attribute: attrs.attribute,
            invariants: parse_invariants(&f.attrs)?,
        });
    }
    let Some(layer) = layer else {
        return Err(syn::Error::new(input.span(), "FhirNode requires a #[fhir(layer)] field"));
    };

    let builder = format_ident!("{}Builder", name);
    let layer_ident = layer.ident;
    let layer_ty = layer.ty;

    let field_infos = fields.iter().map(|f| field_info(f, &krate));
    let type_invs = type_invariants.iter().map(InvariantLit::to_tokens);
    let accessors = fields.iter().map(|f| accessor(f, &type_name));

    let walk_stmts = fields.iter().map(walk_stmt);
    let presence = fields
        .iter()
        .filter(|f| !f.attribute)
        .map(node_presence);

    let builder_fields = fields.iter().map(|f| builder_field(f, &krate));
    let builder_methods = fields.iter().map(|f| builder_methods(f, &krate));
    let seeds = fields.iter().map(seed);

    let exclusive = exclusivity_checks(&type_attrs, &fields)?;
    let freezes = fields.iter().map(freeze);
    let unwraps = fields.iter().filter_map(unwrap_required);
    let field_idents = fields.iter().map(|f| f.ident);
    let value_check = match layer.kind.as_str() {
        "ElementLayer" | "BackboneLayer" => quote! { violations.require_value_or_children(&node); },
        _ => quote! {},
    };
    let draft = format_ident!("{}Draft", name);
    let vis = &input.vis;
    let draft_doc = LitStr::new(
        &format!("Borrowed view of `{type_name}` values, read by local rules before required fields are enforced."),
        Span::call_site(),
    );
    let draft_fields = fields.iter().map(draft_field);
    let node_draft = fields.iter().map(draft_of_node);
    let validators = if type_attrs.validate.is_empty() {
        quote! {}
    } else {
        let draft_of_locals = fields.iter().map(draft_of_local);
        let calls = type_attrs.validate.iter();
        quote! {
            {
                let draft = #draft {
                    #layer_ident: &#layer_ident,
                    #(#draft_of_locals,)*
                };
                #(#calls(&draft, &mut violations);)*
            }
        }
    };

    let capabilities = capability_impls(name, &builder, &layer, &krate)?;

    Ok(quote! {
        impl #name {
            #[doc(hidden)]
            pub const OWN_FIELDS: &'static [#krate::node::FieldInfo] = &[#(#field_infos),*];

            #[doc(hidden)]
            pub const INVARIANTS: &'static [#krate::support::Invariant] = &[#(#type_invs),*];

            /// Starts an empty builder.
            pub fn builder() -> #builder {
                #builder::default()
            }

            /// Seeds a builder with this node's field values.
            pub fn to_builder(&self) -> #builder {
                #builder::from(self)
            }

            #(#accessors)*

            /// Borrows this node as the view its local rules read.
            pub fn draft(&self) -> #draft<'_> {
                #draft {
                    #layer_ident: &self.#layer_ident,
                    #(#node_draft,)*
                }
            }
        }

        #[doc = #draft_doc]
        #[derive(Debug, Clone, Copy)]
        #vis struct #draft<'b> {
            pub #layer_ident: &'b #layer_ty,
            #(#draft_fields,)*
        }

        impl #krate::node::FhirType for #name {
            const TYPE_NAME: &'static str = #type_name;
        }

        impl #krate::node::Node for #name {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn fields(&self) -> #krate::node::FieldTable {
                #krate::node::FieldTable::new(
                    <#layer_ty as #krate::layer::Layer>::FIELDS,
                    Self::OWN_FIELDS,
                )
            }

            fn constraints(&self) -> &'static [#krate::support::Invariant] {
                Self::INVARIANTS
            }

            fn walk_children<'t>(&'t self, walker: &mut #krate::visitor::Walker<'_, 't>) {
                walker.layer(&self.#layer_ident);
                #(#walk_stmts)*
            }

            fn has_children(&self) -> bool {
                <#layer_ty as #krate::layer::Layer>::has_children(&self.#layer_ident)
                    #(|| #presence)*
            }

            fn is_resource(&self) -> bool {
                <#layer_ty as #krate::layer::Layer>::IS_RESOURCE
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        impl ::core::cmp::PartialEq for #name {
            fn eq(&self, other: &Self) -> bool {
                #krate::visitor::equality::structurally_equal(self, other)
            }
        }

        impl ::core::cmp::Eq for #name {}

        impl ::core::hash::Hash for #name {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                #krate::visitor::equality::structural_hash(self, state)
            }
        }

        impl #krate::__private::serde::Serialize for #name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: #krate::__private::serde::Serializer,
            {
                #krate::visitor::json::serialize_node(self, serializer)
            }
        }

        impl #krate::support::IntoEvaluationResult for #name {
            fn to_evaluation_result(&self) -> #krate::support::EvaluationResult {
                #krate::visitor::evaluation::to_evaluation_result(self)
            }
        }

        #[derive(Debug, Clone, Default)]
        pub struct #builder {
            #layer_ident: <#layer_ty as #krate::layer::Layer>::Builder,
            #(#builder_fields,)*
        }

        impl #builder {
            #(#builder_methods)*

            /// Freezes the accumulated values into an immutable node.
            ///
            /// Every local violation is collected before failing, so one error names
            /// all the fields that need fixing.
            pub fn build(self) -> ::core::result::Result<#name, #krate::builder::BuildError> {
                let mut violations = #krate::builder::Violations::new(#type_name);
                #(#exclusive)*
                let #layer_ident =
                    <#layer_ty as #krate::layer::Layer>::freeze(self.#layer_ident, &mut violations);
                #(#freezes)*
                #validators
                #(#unwraps)*
                let node = #name {
                    #layer_ident,
                    #(#field_idents,)*
                };
                #value_check
                violations.finish(node)
            }
        }

        impl ::core::convert::From<&#name> for #builder {
            fn from(node: &#name) -> Self {
                #builder {
                    #layer_ident: <#layer_ty as #krate::layer::Layer>::seed(&node.#layer_ident),
                    #(#seeds,)*
                }
            }
        }

        #capabilities
    })
}

fn field_info(f: &NodeField, krate: &TokenStream) -> TokenStream {
    let name = &f.name;
    let min = f.min;
    let max = match f.shape {
        Shape::List(_) => quote! { #krate::node::Max::Many },
        _ => quote! { #krate::node::Max::One },
    };
    let kind = match f.shape {
        Shape::RequiredChoice(ty) | Shape::OptionalChoice(ty) => quote! {
            #krate::node::FieldKind::Choice(<#ty as #krate::support::ChoiceElement>::ADMISSIBLE_TYPES)
        },
        Shape::RequiredScalar | Shape::OptionalScalar => quote! { #krate::node::FieldKind::Scalar },
        _ => quote! { #krate::node::FieldKind::Node },
    };
    let invs = f.invariants.iter().map(InvariantLit::to_tokens);
    quote! {
        #krate::node::FieldInfo {
            name: #name,
            min: #min,
            max: #max,
            kind: #kind,
            constraints: &[#(#invs),*],
        }
    }
}

fn accessor(f: &NodeField, type_name: &str) -> TokenStream {
    let ident = f.ident;
    let doc = LitStr::new(&format!("`{}.{}`", type_name, f.name), Span::call_site());
    let body = match f.shape {
        Shape::Required(ty) | Shape::RequiredChoice(ty) => quote! {
            pub fn #ident(&self) -> &#ty { &self.#ident }
        },
        Shape::Optional(ty) | Shape::OptionalChoice(ty) => quote! {
            pub fn #ident(&self) -> ::core::option::Option<&#ty> { self.#ident.as_ref() }
        },
        Shape::Boxed(ty) => quote! {
            pub fn #ident(&self) -> ::core::option::Option<&#ty> { self.#ident.as_deref() }
        },
        Shape::List(ty) => quote! {
            pub fn #ident(&self) -> &[#ty] { &self.#ident }
        },
        Shape::RequiredScalar => quote! {
            pub fn #ident(&self) -> &str { &self.#ident }
        },
        Shape::OptionalScalar => quote! {
            pub fn #ident(&self) -> ::core::option::Option<&str> { self.#ident.as_deref() }
        },
    };
    quote! {
        #[doc = #doc]
        #body
    }
}

fn walk_stmt(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    let name = &f.name;
    match f.shape {
        Shape::Required(_) | Shape::RequiredChoice(_) => quote! { walker.node(#name, &self.#ident); },
        Shape::Optional(_) | Shape::OptionalChoice(_) => {
            quote! { walker.optional(#name, self.#ident.as_ref()); }
        }
        Shape::Boxed(_) => quote! { walker.optional(#name, self.#ident.as_deref()); },
        Shape::List(_) => quote! { walker.list(#name, &self.#ident); },
        Shape::RequiredScalar => {
            quote! { walker.scalar(#name, ::core::option::Option::Some(self.#ident.as_str())); }
        }
        Shape::OptionalScalar => quote! { walker.scalar(#name, self.#ident.as_deref()); },
    }
}

fn node_presence(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(_) | Shape::RequiredChoice(_) | Shape::RequiredScalar => quote! { true },
        Shape::List(_) => quote! { !self.#ident.is_empty() },
        _ => quote! { self.#ident.is_some() },
    }
}

fn builder_field(f: &NodeField, krate: &TokenStream) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(ty) | Shape::Optional(ty) | Shape::Boxed(ty) => {
            quote! { #ident: ::core::option::Option<#ty> }
        }
        Shape::List(ty) => quote! { #ident: ::std::vec::Vec<::core::option::Option<#ty>> },
        Shape::RequiredChoice(_) | Shape::OptionalChoice(_) => {
            quote! { #ident: ::core::option::Option<#krate::choice::DataValue> }
        }
        Shape::RequiredScalar | Shape::OptionalScalar => {
            quote! { #ident: ::core::option::Option<::std::string::String> }
        }
    }
}

fn builder_methods(f: &NodeField, krate: &TokenStream) -> TokenStream {
    let ident = f.ident;
    let bare = ident.unraw();
    match f.shape {
        Shape::Required(ty) | Shape::Optional(ty) | Shape::Boxed(ty) => quote! {
            /// Sets the field; `None` clears it.
            pub fn #ident(mut self, value: impl ::core::convert::Into<::core::option::Option<#ty>>) -> Self {
                self.#ident = value.into();
                self
            }
        },
        Shape::List(ty) => {
            let add = format_ident!("add_{}", bare);
            let extend = format_ident!("extend_{}", bare);
            quote! {
                /// Appends one item. A `None` item is accepted here and rejected by `build()`.
                pub fn #add(mut self, item: impl ::core::convert::Into<::core::option::Option<#ty>>) -> Self {
                    self.#ident.push(item.into());
                    self
                }

                /// Appends every item, keeping what was already accumulated.
                pub fn #extend(mut self, items: impl ::core::iter::IntoIterator<Item = #ty>) -> Self {
                    self.#ident.extend(items.into_iter().map(::core::option::Option::Some));
                    self
                }

                /// Replaces the accumulated items.
                pub fn #ident(mut self, items: impl ::core::iter::IntoIterator<Item = #ty>) -> Self {
                    self.#ident = items.into_iter().map(::core::option::Option::Some).collect();
                    self
                }
            }
        }
        Shape::RequiredChoice(_) | Shape::OptionalChoice(_) => {
            let clear = format_ident!("clear_{}", bare);
            quote! {
                /// Sets the choice value; admissibility is checked by `build()`.
                pub fn #ident(mut self, value: impl ::core::convert::Into<#krate::choice::DataValue>) -> Self {
                    self.#ident = ::core::option::Option::Some(value.into());
                    self
                }

                pub fn #clear(mut self) -> Self {
                    self.#ident = ::core::option::Option::None;
                    self
                }
            }
        }
        Shape::RequiredScalar | Shape::OptionalScalar => {
            let clear = format_ident!("clear_{}", bare);
            quote! {
                pub fn #ident(mut self, value: impl ::core::convert::Into<::std::string::String>) -> Self {
                    self.#ident = ::core::option::Option::Some(value.into());
                    self
                }

                pub fn #clear(mut self) -> Self {
                    self.#ident = ::core::option::Option::None;
                    self
                }
            }
        }
    }
}

fn seed(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(_) | Shape::RequiredScalar => {
            quote! { #ident: ::core::option::Option::Some(node.#ident.clone()) }
        }
        Shape::Optional(_) | Shape::OptionalScalar => quote! { #ident: node.#ident.clone() },
        Shape::Boxed(_) => quote! { #ident: node.#ident.as_deref().cloned() },
        Shape::List(_) => quote! {
            #ident: node.#ident.iter().cloned().map(::core::option::Option::Some).collect()
        },
        Shape::RequiredChoice(_) => quote! {
            #ident: ::core::option::Option::Some(::core::convert::Into::into(node.#ident.clone()))
        },
        Shape::OptionalChoice(_) => quote! {
            #ident: node.#ident.clone().map(::core::convert::Into::into)
        },
    }
}

/// Exclusivity checks read the builder before any field is moved out of it.
fn exclusivity_checks(
    attrs: &crate::field_helpers::TypeAttrs,
    fields: &[NodeField],
) -> syn::Result<Vec<TokenStream>> {
    let lookup = |ident: &Ident| -> syn::Result<(String, TokenStream)> {
        let field = fields
            .iter()
            .find(|f| f.ident == ident)
            .ok_or_else(|| syn::Error::new(ident.span(), "unknown field in field group"))?;
        let id = field.ident;
        let present = match field.shape {
            Shape::List(_) => quote! { !self.#id.is_empty() },
            _ => quote! { self.#id.is_some() },
        };
        Ok((field.name.clone(), present))
    };

    let mut out = Vec::new();
    let groups = attrs
        .one_of
        .iter()
        .map(|g| (g, quote! { exactly_one }))
        .chain(attrs.at_most_one.iter().map(|g| (g, quote! { at_most_one })));
    for (group, check) in groups {
        let mut names = Vec::new();
        let mut present = Vec::new();
        for ident in group {
            let (name, p) = lookup(ident)?;
            names.push(name);
            present.push(p);
        }
        out.push(quote! {
            violations.#check(&[#(#names),*], &[#(#present),*]);
        });
    }
    Ok(out)
}

fn freeze(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    let name = &f.name;
    let min = f.min as usize;
    match f.shape {
        Shape::Required(_) | Shape::RequiredScalar => {
            quote! { let #ident = violations.require(#name, self.#ident); }
        }
        Shape::Optional(_) | Shape::OptionalScalar => quote! { let #ident = self.#ident; },
        Shape::Boxed(_) => quote! { let #ident = self.#ident.map(::std::boxed::Box::new); },
        Shape::List(_) => quote! { let #ident = violations.list(#name, self.#ident, #min); },
        Shape::RequiredChoice(ty) => {
            quote! { let #ident = violations.required_choice::<#ty>(#name, self.#ident); }
        }
        Shape::OptionalChoice(ty) => {
            quote! { let #ident = violations.choice::<#ty>(#name, self.#ident); }
        }
    }
}

fn draft_field(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(ty)
        | Shape::Optional(ty)
        | Shape::Boxed(ty)
        | Shape::RequiredChoice(ty)
        | Shape::OptionalChoice(ty) => quote! { pub #ident: ::core::option::Option<&'b #ty> },
        Shape::List(ty) => quote! { pub #ident: &'b [#ty] },
        Shape::RequiredScalar | Shape::OptionalScalar => {
            quote! { pub #ident: ::core::option::Option<&'b str> }
        }
    }
}

/// Reads a field as frozen by `build()`, before required fields are unwrapped.
fn draft_of_local(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(_)
        | Shape::Optional(_)
        | Shape::RequiredChoice(_)
        | Shape::OptionalChoice(_) => quote! { #ident: #ident.as_ref() },
        Shape::Boxed(_) | Shape::RequiredScalar | Shape::OptionalScalar => {
            quote! { #ident: #ident.as_deref() }
        }
        Shape::List(_) => quote! { #ident: #ident.as_slice() },
    }
}

fn draft_of_node(f: &NodeField) -> TokenStream {
    let ident = f.ident;
    match f.shape {
        Shape::Required(_) | Shape::RequiredChoice(_) => {
            quote! { #ident: ::core::option::Option::Some(&self.#ident) }
        }
        Shape::Optional(_) | Shape::OptionalChoice(_) => quote! { #ident: self.#ident.as_ref() },
        Shape::Boxed(_) | Shape::OptionalScalar => quote! { #ident: self.#ident.as_deref() },
        Shape::List(_) => quote! { #ident: self.#ident.as_slice() },
        Shape::RequiredScalar => {
            quote! { #ident: ::core::option::Option::Some(self.#ident.as_str()) }
        }
    }
}

fn unwrap_required(f: &NodeField) -> Option<TokenStream> {
    let ident = f.ident;
    match f.shape {
        Shape::Required(_) | Shape::RequiredChoice(_) | Shape::RequiredScalar => Some(quote! {
            let ::core::option::Option::Some(#ident) = #ident else {
                return ::core::result::Result::Err(violations.into_error());
            };
        }),
        _ => None,
    }
}

fn capability_impls(
    name: &Ident,
    builder: &Ident,
    layer: &LayerField,
    krate: &TokenStream,
) -> syn::Result<TokenStream> {
    let l = layer.ident;
    let tokens = match layer.kind.as_str() {
        "ElementLayer" => quote! {
            impl #krate::layer::Element for #name {
                fn element_layer(&self) -> &#krate::layer::ElementLayer { &self.#l }
            }
            impl #krate::layer::ElementBuilder for #builder {
                fn element_layer_mut(&mut self) -> &mut #krate::layer::ElementLayerBuilder { &mut self.#l }
            }
        },
        "BackboneLayer" => quote! {
            impl #krate::layer::Element for #name {
                fn element_layer(&self) -> &#krate::layer::ElementLayer { self.#l.element() }
            }
            impl #krate::layer::BackboneElement for #name {
                fn backbone_layer(&self) -> &#krate::layer::BackboneLayer { &self.#l }
            }
            impl #krate::layer::ElementBuilder for #builder {
                fn element_layer_mut(&mut self) -> &mut #krate::layer::ElementLayerBuilder { self.#l.element_mut() }
            }
            impl #krate::layer::BackboneElementBuilder for #builder {
                fn backbone_layer_mut(&mut self) -> &mut #krate::layer::BackboneLayerBuilder { &mut self.#l }
            }
        },
        "ResourceLayer" => quote! {
            impl #krate::layer::Resource for #name {
                fn resource_layer(&self) -> &#krate::layer::ResourceLayer { &self.#l }
            }
            impl #krate::layer::ResourceBuilder for #builder {
                fn resource_layer_mut(&mut self) -> &mut #krate::layer::ResourceLayerBuilder { &mut self.#l }
            }
        },
        "DomainResourceLayer" => quote! {
            impl #krate::layer::Resource for #name {
                fn resource_layer(&self) -> &#krate::layer::ResourceLayer { self.#l.resource() }
            }
            impl #krate::layer::DomainResource for #name {
                fn domain_resource_layer(&self) -> &#krate::layer::DomainResourceLayer { &self.#l }
            }
            impl #krate::layer::ResourceBuilder for #builder {
                fn resource_layer_mut(&mut self) -> &mut #krate::layer::ResourceLayerBuilder { self.#l.resource_mut() }
            }
            impl #krate::layer::DomainResourceBuilder for #builder {
                fn domain_resource_layer_mut(&mut self) -> &mut #krate::layer::DomainResourceLayerBuilder { &mut self.#l }
            }
        },
        other => {
            return Err(syn::Error::new(
                layer.ty.span(),
                format!("unknown capability layer `{other}`"),
            ));
        }
    };
    Ok(tokens)
}
