mod common;

use atrius_fhir_model::codes::{
    ConceptMapRelationshipCode, PublicationStatus, PublicationStatusCode, QuantityComparator,
    QuantityComparatorCode,
};
use atrius_fhir_model::datatypes::Quantity;
use atrius_fhir_model::prelude::*;
use atrius_fhir_model::r5::concept_map::ConceptMap;
use atrius_fhir_model::r5::parameters::{Parameters, ParametersParameter};
use atrius_fhir_model::r5::AnyResource;
use atrius_fhir_model::visitor::json::{to_json, to_json_string};
use common::{element, group, target};
use rust_decimal_macros::dec;
use serde_json::json;

#[test]
fn concept_map_renders_as_fhir_json() {
    let map = ConceptMap::builder()
        .id("101")
        .url(Uri::of("http://hl7.org/fhir/ConceptMap/101"))
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .source_scope(Canonical::of("http://hl7.org/fhir/ValueSet/address-use"))
        .add_group(group(vec![element(
            "home",
            vec![target("H", ConceptMapRelationshipCode::Equivalent)],
        )]))
        .build()
        .unwrap();
    assert_eq!(
        serde_json::to_value(&map).unwrap(),
        json!({
            "resourceType": "ConceptMap",
            "id": "101",
            "url": "http://hl7.org/fhir/ConceptMap/101",
            "status": "draft",
            "sourceScopeCanonical": "http://hl7.org/fhir/ValueSet/address-use",
            "group": [{
                "source": "http://hl7.org/fhir/address-use",
                "target": "http://terminology.hl7.org/CodeSystem/v3-AddressUse",
                "element": [{
                    "code": "home",
                    "target": [{ "code": "H", "relationship": "equivalent" }]
                }]
            }]
        })
    );
}

#[test]
fn parameters_nest_values_parts_and_resources() {
    let map = ConceptMap::builder()
        .status(PublicationStatus::of(PublicationStatusCode::Active))
        .build()
        .unwrap();
    let params = Parameters::builder()
        .add_parameter(
            ParametersParameter::builder()
                .name(FhirString::of("result"))
                .value(Boolean::of(true))
                .build()
                .unwrap(),
        )
        .add_parameter(
            ParametersParameter::builder()
                .name(FhirString::of("match"))
                .add_part(
                    ParametersParameter::builder()
                        .name(FhirString::of("source"))
                        .resource(AnyResource::from(map))
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    assert_eq!(
        to_json(&params),
        json!({
            "resourceType": "Parameters",
            "parameter": [
                { "name": "result", "valueBoolean": true },
                {
                    "name": "match",
                    "part": [{
                        "name": "source",
                        "resource": { "resourceType": "ConceptMap", "status": "active" }
                    }]
                }
            ]
        })
    );
}

#[test]
fn decimals_keep_their_scale() {
    let quantity = Quantity::builder()
        .value(Decimal::of(dec!(1.50)))
        .comparator(QuantityComparator::of(QuantityComparatorCode::LessThan))
        .unit(FhirString::of("mg"))
        .build()
        .unwrap();
    let text = to_json_string(&quantity).unwrap();
    assert!(text.contains(r#""value":1.50"#), "{text}");
    assert!(text.contains(r#""comparator":"<""#));
}
