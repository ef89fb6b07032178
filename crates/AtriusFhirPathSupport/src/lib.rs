//! # FHIRPath Support Types
//!
//! The bridge between FHIR node trees and whatever expression engine evaluates their
//! constraints. The model crate converts built nodes into [`EvaluationResult`] values and
//! hands them, together with the declarative [`Invariant`] metadata, to a
//! [`FhirPathEngine`]. Nothing here depends on the model crate, so an engine can be
//! developed against these types alone.
//!
//! ## Core Types
//!
//! - [`EvaluationResult`] - value shape an engine evaluates against
//! - [`EvaluationError`] - failures an engine may report
//! - [`IntoEvaluationResult`] - conversion of Rust and FHIR values into results
//! - [`Invariant`] / [`ConstraintLevel`] / [`ValidationIssue`] - the constraint contract
//!
//! ```rust
//! use atrius_fhirpath_support::{EvaluationResult, IntoEvaluationResult};
//!
//! let text = "Hello, FHIR!".to_string();
//! assert_eq!(text.to_evaluation_result(), EvaluationResult::string("Hello, FHIR!".to_string()));
//!
//! let numbers = vec![1, 2, 3];
//! assert_eq!(numbers.to_evaluation_result().count(), 3);
//! ```

pub mod evaluation_error;
pub mod evaluation_result;
pub mod traits;
pub mod type_info;
pub mod validate;

pub use evaluation_error::EvaluationError;
pub use evaluation_result::EvaluationResult;
pub use traits::{ChoiceElement, IntoEvaluationResult};
pub use type_info::TypeInfoResult;
pub use validate::*;
