mod common;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use atrius_fhir_model::builder::Exclusivity;
use atrius_fhir_model::codes::{
    ConceptMapRelationshipCode, ExampleScenarioActorType, ExampleScenarioActorTypeCode,
    PublicationStatus, PublicationStatusCode,
};
use atrius_fhir_model::datatypes::Coding;
use atrius_fhir_model::prelude::*;
use atrius_fhir_model::r5::concept_map::{
    ConceptMap, ConceptMapBuilder, ConceptMapGroup, ConceptMapGroupElement,
    ConceptMapSourceScope, ConceptMapVersionAlgorithm,
};
use atrius_fhir_model::r5::example_scenario::{ExampleScenarioActor, OTHER_ACTOR};
use atrius_fhir_model::visitor::equality::{structural_hash, structurally_equal};
use atrius_fhir_model::Violation;
use common::{actor, address_use_map, element, group, operation, scenario, target};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn missing_required_fields_are_all_named() {
    let err = ExampleScenarioActor::builder().build().unwrap_err();
    assert_eq!(err.type_name, "ExampleScenario.actor");
    assert_eq!(err.fields(), vec!["key", "type", "title"]);
    assert!(err.violations.iter().all(|v| matches!(v, Violation::MissingRequired { .. })));

    let err = ConceptMap::builder().build().unwrap_err();
    assert_eq!(err.fields(), vec!["status"]);
    assert!(err.to_string().contains("`status`"));
}

#[test]
fn local_rules_are_reported_alongside_missing_fields() {
    let err = ExampleScenarioActor::builder()
        .key(FhirString::of(OTHER_ACTOR))
        .r#type(ExampleScenarioActorType::of(ExampleScenarioActorTypeCode::Person))
        .build()
        .unwrap_err();
    assert_eq!(err.fields(), vec!["title"]);
    assert!(err.has_rule("exs-23"));
    assert_eq!(err.violations.len(), 2);

    let err = atrius_fhir_model::datatypes::Extension::builder().build().unwrap_err();
    assert!(matches!(&err.violations[0], Violation::MissingRequired { field: "url" }));
    assert!(err.has_rule("ext-1"));
}

#[test]
fn admissible_choice_is_returned_unchanged() {
    let coding = Coding::builder()
        .system(Uri::of("http://hl7.org/fhir/version-algorithm"))
        .code(Code::of("semver"))
        .build()
        .unwrap();
    let map = ConceptMap::builder()
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .version_algorithm(coding.clone())
        .source_scope(Uri::of("http://hl7.org/fhir/ValueSet/address-use"))
        .build()
        .unwrap();
    assert_eq!(
        map.version_algorithm(),
        Some(&ConceptMapVersionAlgorithm::Coding(coding))
    );
    assert!(matches!(map.source_scope(), Some(ConceptMapSourceScope::Uri(_))));
}

#[test]
fn inadmissible_choice_fails_the_build() {
    let err = ConceptMap::builder()
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .version_algorithm(Boolean::of(true))
        .build()
        .unwrap_err();
    assert_eq!(
        err.violations,
        vec![Violation::InadmissibleChoice {
            field: "versionAlgorithm",
            actual: "boolean",
            admissible: &["string", "Coding"],
        }]
    );
}

#[test]
fn to_builder_round_trips() {
    let map = address_use_map();
    let rebuilt = map.to_builder().build().unwrap();
    assert_eq!(rebuilt, map);
    assert!(structurally_equal(&rebuilt, &map));
    assert_eq!(ConceptMapBuilder::from(&map).build().unwrap(), map);

    let exchange = scenario(
        vec![actor("lab", "Laboratory"), actor("ehr", "EHR")],
        vec![operation("Order", "ehr", "lab"), operation("Result", "lab", "ehr")],
    );
    assert_eq!(exchange.to_builder().build().unwrap(), exchange);
}

#[test]
fn modifying_a_copy_leaves_the_original_alone() {
    let map = address_use_map();
    let retired = map
        .to_builder()
        .status(PublicationStatus::of(PublicationStatusCode::Retired))
        .build()
        .unwrap();
    assert_eq!(map.status().value(), Some(&PublicationStatusCode::Active));
    assert_eq!(retired.status().value(), Some(&PublicationStatusCode::Retired));
    assert_ne!(map, retired);
}

#[test]
fn append_keeps_and_replace_discards() {
    let home = element("home", vec![target("H", ConceptMapRelationshipCode::Equivalent)]);
    let work = element("work", vec![target("WP", ConceptMapRelationshipCode::Equivalent)]);
    let temp = element("temp", vec![target("TMP", ConceptMapRelationshipCode::Equivalent)]);

    let builder = ConceptMapGroup::builder().add_element(home.clone());
    let appended = builder
        .clone()
        .extend_element([work, temp.clone()])
        .build()
        .unwrap();
    let codes: Vec<_> = appended
        .element()
        .iter()
        .filter_map(|e| e.code().and_then(|c| c.value()).map(String::as_str))
        .collect();
    assert_eq!(codes, vec!["home", "work", "temp"]);

    let replaced = builder.element([temp.clone()]).build().unwrap();
    assert_eq!(replaced.element(), &[temp]);
}

#[test]
fn null_list_item_fails_at_build_not_at_insert() {
    let home = element("home", vec![target("H", ConceptMapRelationshipCode::Equivalent)]);
    let builder = ConceptMapGroup::builder()
        .add_element(home)
        .add_element(None::<ConceptMapGroupElement>);
    let err = builder.build().unwrap_err();
    assert_eq!(
        err.violations,
        vec![Violation::NullListItem {
            field: "element",
            index: 1
        }]
    );
}

#[test]
fn identical_builders_give_equal_nodes_and_hashes() {
    let a = address_use_map();
    let b = address_use_map();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    let mut ha = DefaultHasher::new();
    let mut hb = DefaultHasher::new();
    structural_hash(&a, &mut ha);
    structural_hash(&b, &mut hb);
    assert_eq!(ha.finish(), hb.finish());

    let changed = common::concept_map(
        PublicationStatusCode::Active,
        vec![group(vec![
            element("home", vec![target("H", ConceptMapRelationshipCode::Equivalent)]),
            element("work", vec![target("WP", ConceptMapRelationshipCode::RelatedTo)]),
        ])],
    );
    assert_ne!(a, changed);
    assert!(!structurally_equal(&a, &changed));
}

#[test]
fn code_and_value_set_together_name_both_fields() {
    let err = ConceptMapGroupElement::builder()
        .code(Code::of("home"))
        .value_set(Canonical::of("http://hl7.org/fhir/ValueSet/address-use"))
        .build()
        .unwrap_err();
    assert_eq!(err.fields(), vec!["code", "valueSet"]);
    assert!(matches!(
        &err.violations[0],
        Violation::ExclusiveFields { rule: Exclusivity::ExactlyOne, .. }
    ));
}

#[test]
fn primitive_may_carry_extensions_instead_of_a_value() {
    let ext = atrius_fhir_model::datatypes::Extension::builder()
        .url("http://example.org/fhir/StructureDefinition/data-absent-reason")
        .value(Code::of("unknown"))
        .build()
        .unwrap();
    let status = PublicationStatus::builder().add_extension(ext).build().unwrap();
    assert!(status.value().is_none());
    assert_eq!(status.extension().len(), 1);
    assert!(PublicationStatus::builder().build().is_err());
}

#[test]
fn resource_modifier_extensions_append_and_replace() {
    let ext = |url: &str| {
        atrius_fhir_model::datatypes::Extension::builder()
            .url(url)
            .value(Boolean::of(true))
            .build()
            .unwrap()
    };
    let map = address_use_map()
        .to_builder()
        .add_modifier_extension(ext("http://example.org/a"))
        .extend_modifier_extension(vec![ext("http://example.org/b"), ext("http://example.org/c")])
        .build()
        .unwrap();
    let urls: Vec<&str> = map.modifier_extension().iter().map(|e| e.url()).collect();
    assert_eq!(urls, vec!["http://example.org/a", "http://example.org/b", "http://example.org/c"]);

    let replaced = map
        .to_builder()
        .modifier_extension(vec![ext("http://example.org/d")])
        .build()
        .unwrap();
    assert_eq!(replaced.modifier_extension().len(), 1);
}
