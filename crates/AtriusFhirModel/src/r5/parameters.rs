//! Parameters: the operation request/response envelope.

use atrius_macros::FhirNode;

use crate::choice::DataValue;
use crate::layer::{BackboneLayer, ResourceLayer};
use crate::primitive::FhirString;
use crate::r5::AnyResource;

#[derive(Debug, Clone, FhirNode)]
pub struct Parameters {
    #[fhir(layer)]
    base: ResourceLayer,
    parameter: Vec<ParametersParameter>,
}

impl Parameters {
    /// First parameter called `name`, at the top level only.
    pub fn get(&self, name: &str) -> Option<&ParametersParameter> {
        self.parameter.iter().find(|p| p.is_named(name))
    }
}

/// A named value, resource or group of nested parts.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "Parameters.parameter", one_of(value, resource, part))]
#[fhir_invariant(
    key = "inv-1",
    severity = "rule",
    human = "A parameter must have one and only one of (value, resource, part)",
    expr = "(part.exists() and value.empty() and resource.empty()) or (part.empty() and (value.exists() xor resource.exists()))",
    path = "Parameters.parameter"
)]
pub struct ParametersParameter {
    #[fhir(layer)]
    base: BackboneLayer,
    name: FhirString,
    #[fhir(choice)]
    value: Option<DataValue>,
    resource: Option<AnyResource>,
    part: Vec<ParametersParameter>,
}

impl ParametersParameter {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.value().map(String::as_str) == Some(name)
    }

    pub fn get_part(&self, name: &str) -> Option<&ParametersParameter> {
        self.part.iter().find(|p| p.is_named(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Exclusivity, Violation};
    use crate::primitive::{Boolean, Code};

    fn flag(name: &str, value: bool) -> ParametersParameter {
        ParametersParameter::builder()
            .name(FhirString::of(name))
            .value(Boolean::of(value))
            .build()
            .unwrap()
    }

    #[test]
    fn parameter_needs_exactly_one_payload() {
        let err = ParametersParameter::builder()
            .name(FhirString::of("empty"))
            .build()
            .unwrap_err();
        assert!(matches!(
            &err.violations[0],
            Violation::ExclusiveFields { rule: Exclusivity::ExactlyOne, present, .. } if present.is_empty()
        ));
        assert_eq!(err.fields(), vec!["value", "resource", "part"]);

        let err = ParametersParameter::builder()
            .name(FhirString::of("both"))
            .value(Code::of("x"))
            .add_part(flag("inner", true))
            .build()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["value", "part"]);
    }

    #[test]
    fn lookup_by_name() {
        let group = ParametersParameter::builder()
            .name(FhirString::of("match"))
            .add_part(flag("exact", true))
            .build()
            .unwrap();
        let params = Parameters::builder()
            .add_parameter(flag("result", true))
            .add_parameter(group)
            .build()
            .unwrap();
        let exact = params.get("match").and_then(|m| m.get_part("exact"));
        assert_eq!(
            exact.and_then(|p| p.value()).and_then(DataValue::as_boolean),
            Some(&Boolean::of(true))
        );
        assert!(params.get("exact").is_none());
    }
}
