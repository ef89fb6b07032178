//! # Atrius FHIR Model
//!
//! Immutable, validated FHIR node trees.
//!
//! Every schema type is a plain struct composed of one capability [`layer`] (Element,
//! BackboneElement, Resource or DomainResource) plus its own fields. Nodes are created
//! only through their builder, whose `build()` runs the local structural checks and
//! either returns a fully valid node or a [`builder::BuildError`] listing every
//! violation. Built nodes never change; "modify" means `to_builder()`, edit, `build()`.
//!
//! All generic behaviour (equality, hashing, JSON output, path tracking, conversion for
//! expression engines and whole-document constraint checking) is driven by one
//! depth-first traversal in schema field order, see [`visitor`].
//!
//! ```rust
//! use atrius_fhir_model::prelude::*;
//! use atrius_fhir_model::r5::concept_map::ConceptMapProperty;
//! use atrius_fhir_model::codes::{PropertyType, PropertyTypeCode};
//!
//! let property = ConceptMapProperty::builder()
//!     .code(Code::of("display"))
//!     .r#type(PropertyType::of(PropertyTypeCode::Coding))
//!     .build()
//!     .unwrap();
//! assert_eq!(property.code().value().map(String::as_str), Some("display"));
//! assert!(property.system().is_none());
//! ```

#[cfg(not(feature = "R5"))]
compile_error!("atrius-fhir-model currently ships the R5 resource set only; enable the `R5` feature");

// Generated code names this crate by its external path.
extern crate self as atrius_fhir_model;

pub use atrius_fhirpath_support as support;

pub mod builder;
pub mod choice;
pub mod codes;
pub mod constraint;
pub mod datatypes;
pub mod date_time;
pub mod layer;
pub mod node;
pub mod primitive;
#[cfg(feature = "R5")]
pub mod r5;
pub mod visitor;

pub use builder::{BuildError, Violation, Violations};
pub use choice::{ChoiceValue, DataValue};
pub use node::{FhirType, Node};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

/// Traits and primitive aliases needed to build and read nodes.
pub mod prelude {
    pub use crate::choice::{ChoiceValue, DataValue};
    pub use crate::layer::{
        BackboneElement, BackboneElementBuilder, DomainResource, DomainResourceBuilder, Element,
        ElementBuilder, Resource, ResourceBuilder,
    };
    pub use crate::node::{FhirType, Node};
    pub use crate::primitive::{
        Boolean, Canonical, Code, Date, DateTime, Decimal, FhirString, Id, Integer, Markdown,
        Uri,
    };
    pub use crate::support::{ChoiceElement, IntoEvaluationResult};
}
