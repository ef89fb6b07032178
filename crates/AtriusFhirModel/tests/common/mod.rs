#![allow(dead_code)]

use atrius_fhir_model::codes::{
    ConceptMapRelationship, ConceptMapRelationshipCode, ExampleScenarioActorType,
    ExampleScenarioActorTypeCode, PublicationStatus, PublicationStatusCode,
};
use atrius_fhir_model::prelude::*;
use atrius_fhir_model::r5::concept_map::{
    ConceptMap, ConceptMapGroup, ConceptMapGroupElement, ConceptMapGroupElementTarget,
};
use atrius_fhir_model::r5::example_scenario::{
    ExampleScenario, ExampleScenarioActor, ExampleScenarioProcess, ExampleScenarioProcessStep,
    ExampleScenarioProcessStepOperation,
};

/// Log output for a failing test: `RUST_LOG=atrius_fhir_model=trace cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn target(code: &str, relationship: ConceptMapRelationshipCode) -> ConceptMapGroupElementTarget {
    ConceptMapGroupElementTarget::builder()
        .code(Code::of(code))
        .relationship(ConceptMapRelationship::of(relationship))
        .build()
        .unwrap()
}

pub fn element(code: &str, targets: Vec<ConceptMapGroupElementTarget>) -> ConceptMapGroupElement {
    ConceptMapGroupElement::builder()
        .code(Code::of(code))
        .target(targets)
        .build()
        .unwrap()
}

pub fn group(elements: Vec<ConceptMapGroupElement>) -> ConceptMapGroup {
    ConceptMapGroup::builder()
        .source(Canonical::of("http://hl7.org/fhir/address-use"))
        .target(Canonical::of("http://terminology.hl7.org/CodeSystem/v3-AddressUse"))
        .element(elements)
        .build()
        .unwrap()
}

pub fn concept_map(status: PublicationStatusCode, groups: Vec<ConceptMapGroup>) -> ConceptMap {
    ConceptMap::builder()
        .url(Uri::of("http://hl7.org/fhir/ConceptMap/101"))
        .name(FhirString::of("FHIRv3AddressUse"))
        .status(PublicationStatus::of(status))
        .group(groups)
        .build()
        .unwrap()
}

/// The address-use map: one group, `home` and `work` each mapped once.
pub fn address_use_map() -> ConceptMap {
    concept_map(
        PublicationStatusCode::Active,
        vec![group(vec![
            element("home", vec![target("H", ConceptMapRelationshipCode::Equivalent)]),
            element("work", vec![target("WP", ConceptMapRelationshipCode::Equivalent)]),
        ])],
    )
}

pub fn actor(key: &str, title: &str) -> ExampleScenarioActor {
    ExampleScenarioActor::builder()
        .key(FhirString::of(key))
        .r#type(ExampleScenarioActorType::of(ExampleScenarioActorTypeCode::System))
        .title(FhirString::of(title))
        .build()
        .unwrap()
}

pub fn operation(title: &str, initiator: &str, receiver: &str) -> ExampleScenarioProcessStepOperation {
    ExampleScenarioProcessStepOperation::builder()
        .title(FhirString::of(title))
        .initiator(FhirString::of(initiator))
        .receiver(FhirString::of(receiver))
        .build()
        .unwrap()
}

/// A draft scenario with one process running `operations` in order.
pub fn scenario(
    actors: Vec<ExampleScenarioActor>,
    operations: Vec<ExampleScenarioProcessStepOperation>,
) -> ExampleScenario {
    let steps = operations.into_iter().map(|op| {
        ExampleScenarioProcessStep::builder()
            .operation(op)
            .build()
            .unwrap()
    });
    let process = ExampleScenarioProcess::builder()
        .title(FhirString::of("Exchange"))
        .step(steps)
        .build()
        .unwrap();
    ExampleScenario::builder()
        .name(FhirString::of("LabExchange"))
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .actor(actors)
        .add_process(process)
        .build()
        .unwrap()
}
