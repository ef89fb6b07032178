//! Conversion of node trees into [`EvaluationResult`] values for expression engines.
//!
//! Complex nodes become typed objects keyed by field name. Choice fields are keyed by
//! their base name (`value`, not `valueCoding`) since that is how path expressions
//! address them; the concrete type travels in the item's type info. Repeating fields
//! become collections, primitives keep their FHIR type (`code`, `uri`, ...).

use std::collections::HashMap;

use super::{children, Child};
use crate::node::Node;
use crate::support::EvaluationResult;

fn object(node: &dyn Node) -> EvaluationResult {
    let mut map: HashMap<String, EvaluationResult> = HashMap::new();
    let mut lists: Vec<(&'static str, Vec<EvaluationResult>)> = Vec::new();
    if node.is_resource() {
        map.insert(
            "resourceType".to_string(),
            EvaluationResult::string(node.type_name().to_string()),
        );
    }
    for child in children(node) {
        match child {
            Child::Value { name, value } => {
                map.insert(name.to_string(), EvaluationResult::string(value.canonical().into_owned()));
            }
            Child::Node { name, index: None, node: child } => {
                map.insert(name.to_string(), to_evaluation_result(child));
            }
            Child::Node { name, index: Some(_), node: child } => match lists.last_mut() {
                Some((current, items)) if *current == name => items.push(to_evaluation_result(child)),
                _ => lists.push((name, vec![to_evaluation_result(child)])),
            },
        }
    }
    for (name, items) in lists {
        map.insert(name.to_string(), EvaluationResult::collection(items));
    }
    EvaluationResult::typed_object(map, "FHIR", node.type_name())
}

/// Result view of any node. A primitive without a value is empty.
pub fn to_evaluation_result(node: &dyn Node) -> EvaluationResult {
    if node.is_primitive() {
        return node
            .primitive_value()
            .map_or(EvaluationResult::Empty, |v| v.to_evaluation_result(node.type_name()));
    }
    object(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Coding, Extension};
    use crate::layer::ElementBuilder;
    use crate::primitive::{Code, FhirString, Uri};
    use crate::support::IntoEvaluationResult;

    #[test]
    fn choice_is_keyed_by_base_name() {
        let coding = Coding::builder()
            .system(Uri::of("http://snomed.info/sct"))
            .code(Code::of("22298006"))
            .build()
            .unwrap();
        let ext = Extension::builder()
            .url("http://example.org/finding")
            .value(coding)
            .build()
            .unwrap();
        let result = ext.to_evaluation_result();
        let value = result.get("value").unwrap();
        assert_eq!(value.type_info().map(|t| t.name.as_str()), Some("Coding"));
        assert_eq!(
            value.get("code"),
            Some(&EvaluationResult::fhir_string("22298006".to_string(), "code"))
        );
        assert!(result.get("valueCoding").is_none());
    }

    #[test]
    fn lists_become_collections() {
        let nested = |v: &str| {
            Extension::builder()
                .url("part")
                .value(FhirString::of(v))
                .build()
                .unwrap()
        };
        let ext = Extension::builder()
            .url("http://example.org/complex")
            .add_extension(nested("a"))
            .add_extension(nested("b"))
            .build()
            .unwrap();
        assert_eq!(ext.to_evaluation_result().get("extension").map(EvaluationResult::count), Some(2));
    }
}
