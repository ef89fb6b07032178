//! # Atrius Macros - derive macros for the FHIR node framework
//!
//! Generated FHIR types are plain Rust structs and enums; these derives supply everything
//! that makes them behave as immutable, traversable, validated nodes.
//!
//! - **`#[derive(FhirNode)]`** on a struct emits accessors, the static field table, the
//!   `Node` traversal impl, equality/hash/serialization driven by the visitor protocol,
//!   capability trait impls for the struct's layer and a `<Name>Builder` with
//!   append/replace list semantics and an aggregating `build()`.
//! - **`#[derive(FhirChoice)]`** on an enum emits the tagged-union glue for a choice field
//!   (`value[x]`): conversions to and from the open value union, the admissible type set
//!   and node delegation.
//!
//! ## Usage
//!
//! ```ignore
//! #[derive(Debug, Clone, FhirNode)]
//! #[fhir(type_name = "ConceptMap.group.element.target", one_of(code, value_set))]
//! #[fhir_invariant(
//!     key = "cmd-7",
//!     severity = "rule",
//!     human = "Either code or valueSet SHALL be present but not both.",
//!     expr = "(code.exists() and valueSet.empty()) or (code.empty() and valueSet.exists())",
//!     path = "ConceptMap.group.element.target"
//! )]
//! pub struct ConceptMapGroupElementTarget {
//!     #[fhir(layer)]
//!     base: BackboneLayer,
//!     code: Option<Code>,
//!     display: Option<FhirString>,
//!     value_set: Option<Canonical>,
//!     relationship: ConceptMapRelationship,
//!     comment: Option<FhirString>,
//!     property: Vec<ConceptMapGroupElementTargetProperty>,
//! }
//! ```
//!
//! Field shapes follow from the Rust type: `T` is required, `Option<T>` optional,
//! `Option<Box<T>>` optional and recursive, `Vec<T>` repeating, `String` / `Option<String>`
//! a plain string leaf. Choice fields are marked `#[fhir(choice)]`.
//!
//! The generated code refers to `::atrius_fhir_model`, so the derives are meant to be used
//! from that crate (which aliases itself under that name).

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

pub(crate) mod choice_impl;
pub(crate) mod field_helpers;
pub(crate) mod invariant;
pub(crate) mod node_impl;
pub(crate) mod type_helpers;

/// Derives node, builder and traversal glue for a FHIR struct.
///
/// # Supported Attributes
///
/// Struct level:
/// - `#[fhir(type_name = "...")]` - type name used in traversal and errors (defaults to the ident)
/// - `#[fhir(one_of(a, b, ...))]` - exactly one of the fields must be present
/// - `#[fhir(at_most_one(a, b, ...))]` - at most one of the fields may be present
/// - `#[fhir(validate = path)]` - extra `fn(&<Name>Draft<'_>, &mut Violations)` run by `build()`,
///   also when required fields are missing (they read as `None` in the draft)
/// - `#[fhir_invariant(key, severity, human, expr, path)]` - declared constraint metadata
///
/// Field level:
/// - `#[fhir(layer)]` - the capability layer the struct is composed on
/// - `#[fhir(choice)]` - a choice field; the type must derive `FhirChoice`
/// - `#[fhir(rename = "...")]`, `#[fhir(min = N)]`, `#[fhir(attribute)]`
/// - `#[fhir_invariant(...)]` - constraint metadata on the field's path
#[proc_macro_derive(FhirNode, attributes(fhir, fhir_invariant))]
pub fn derive_fhir_node(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    node_impl::derive(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives the tagged-union glue for a choice enum.
///
/// # Supported Attributes
///
/// - `#[fhir(base_name = "...")]` - the field family name, e.g. `value` for `value[x]`
/// - `#[fhir(open)]` - marks the union of every admissible datatype
#[proc_macro_derive(FhirChoice, attributes(fhir))]
pub fn derive_fhir_choice(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    choice_impl::derive(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
