use rust_decimal::Decimal;

use crate::evaluation_result::EvaluationResult;

/// Metadata of a FHIR choice element (`value[x]`).
///
/// Implemented by the per-field tagged unions of the model. The admissible type list is
/// closed and field specific: `ConceptMap.sourceScope[x]` admits `uri` and `canonical`,
/// `ConceptMap.versionAlgorithm[x]` admits `string` and `Coding`.
///
/// ```rust,ignore
/// impl ChoiceElement for ConceptMapSourceScope {
///     const ADMISSIBLE_TYPES: &'static [&'static str] = &["uri", "canonical"];
///
///     fn base_name() -> &'static str {
///         "sourceScope"
///     }
///
///     fn possible_field_names() -> Vec<&'static str> {
///         vec!["sourceScopeUri", "sourceScopeCanonical"]
///     }
/// }
/// ```
pub trait ChoiceElement {
    /// FHIR type names a value of this choice may have, in declaration order.
    const ADMISSIBLE_TYPES: &'static [&'static str];

    /// Field name without the `[x]` suffix.
    fn base_name() -> &'static str;

    /// Every name the field can take in the wire format.
    fn possible_field_names() -> Vec<&'static str>;

    fn admits(type_name: &str) -> bool {
        Self::ADMISSIBLE_TYPES.contains(&type_name)
    }
}

/// Conversion into the value shape an expression engine consumes.
///
/// Absent values convert to [`EvaluationResult::Empty`], sequences to collections.
///
/// ```rust
/// use atrius_fhirpath_support::{EvaluationResult, IntoEvaluationResult};
///
/// assert_eq!(Some(true).to_evaluation_result(), EvaluationResult::boolean(true));
/// assert_eq!(None::<bool>.to_evaluation_result(), EvaluationResult::Empty);
/// ```
pub trait IntoEvaluationResult {
    fn to_evaluation_result(&self) -> EvaluationResult;
}

impl IntoEvaluationResult for String {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::string(self.clone())
    }
}

impl IntoEvaluationResult for str {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::string(self.to_string())
    }
}

impl IntoEvaluationResult for bool {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::boolean(*self)
    }
}

impl IntoEvaluationResult for i32 {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::integer(*self as i64)
    }
}

impl IntoEvaluationResult for i64 {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::integer(*self)
    }
}

impl IntoEvaluationResult for Decimal {
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::decimal(*self)
    }
}

impl<T> IntoEvaluationResult for Option<T>
where
    T: IntoEvaluationResult,
{
    fn to_evaluation_result(&self) -> EvaluationResult {
        match self {
            Some(value) => value.to_evaluation_result(),
            None => EvaluationResult::Empty,
        }
    }
}

impl<T> IntoEvaluationResult for Vec<T>
where
    T: IntoEvaluationResult,
{
    fn to_evaluation_result(&self) -> EvaluationResult {
        EvaluationResult::collection(self.iter().map(|item| item.to_evaluation_result()).collect())
    }
}

impl<T> IntoEvaluationResult for Box<T>
where
    T: IntoEvaluationResult + ?Sized,
{
    fn to_evaluation_result(&self) -> EvaluationResult {
        (**self).to_evaluation_result()
    }
}

impl<T> IntoEvaluationResult for &T
where
    T: IntoEvaluationResult + ?Sized,
{
    fn to_evaluation_result(&self) -> EvaluationResult {
        (*self).to_evaluation_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scope;

    impl ChoiceElement for Scope {
        const ADMISSIBLE_TYPES: &'static [&'static str] = &["uri", "canonical"];

        fn base_name() -> &'static str {
            "sourceScope"
        }

        fn possible_field_names() -> Vec<&'static str> {
            vec!["sourceScopeUri", "sourceScopeCanonical"]
        }
    }

    #[test]
    fn admits_only_declared_types() {
        assert!(Scope::admits("canonical"));
        assert!(!Scope::admits("string"));
    }

    #[test]
    fn vectors_become_collections() {
        let result = vec!["a".to_string(), "b".to_string()].to_evaluation_result();
        assert_eq!(result.count(), 2);
        assert_eq!(Vec::<String>::new().to_evaluation_result(), EvaluationResult::Empty);
    }
}
