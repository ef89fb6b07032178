mod common;

use atrius_fhir_model::codes::{ConceptMapRelationship, ConceptMapRelationshipCode, PublicationStatusCode};
use atrius_fhir_model::constraint::rules::standard_rules;
use atrius_fhir_model::constraint::{DocumentValidator, ValidationOptions};
use atrius_fhir_model::prelude::*;
use atrius_fhir_model::r5::concept_map::{ConceptMap, ConceptMapGroupElementTarget};
use atrius_fhir_model::r5::AnyResource;
use atrius_fhir_model::support::ConstraintLevel;
use common::{actor, concept_map, element, group, init_tracing, operation, scenario};

#[test]
fn duplicate_actor_keys_pass_build_but_fail_validation() {
    init_tracing();
    let actors = vec![actor("lab", "Laboratory"), actor("lab", "Reference laboratory")];
    let doc = scenario(actors, vec![operation("Order", "lab", "lab")]);

    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&doc);
    let issues: Vec<_> = report.issues_for("exs-6").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].instance_path, "ExampleScenario");
    assert_eq!(issues[0].severity, ConstraintLevel::Rule);
    assert!(!report.has_issue("exs-7"));
    assert!(!report.is_conformant());
}

#[test]
fn distinct_actors_with_known_keys_conform() {
    init_tracing();
    let doc = scenario(
        vec![actor("lab", "Laboratory"), actor("ehr", "EHR")],
        vec![operation("Order", "ehr", "lab"), operation("Result", "lab", "ehr")],
    );
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&doc);
    assert!(report.is_conformant(), "{:#?}", report.issues);
    assert!(report.evaluated > 0);
    assert!(report.unsupported.contains(&"exampleScenario-24"));
}

#[test]
fn unknown_actor_reference_is_reported_at_the_operation() {
    let doc = scenario(
        vec![actor("lab", "Laboratory")],
        vec![operation("Order", "ghost", "lab"), operation("Forward", "lab", "OTHER")],
    );
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&doc);
    let paths: Vec<_> = report
        .issues_for("exs-17")
        .map(|i| i.instance_path.as_str())
        .collect();
    assert_eq!(paths, vec!["ExampleScenario.process[0].step[0].operation"]);
    assert!(!report.has_issue("exs-18"));
}

#[test]
fn warnings_are_reported_without_blocking() {
    let doc = scenario(
        vec![actor("lab", "Laboratory"), actor("idle", "Idle system")],
        vec![operation("Self check", "lab", "lab")],
    );
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&doc);
    let unused: Vec<_> = report.warnings().filter(|i| i.key == "exs-19").collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].instance_path, "ExampleScenario.actor[1]");
    assert!(report.is_conformant());
    assert_eq!(report.errors().count(), 0);

    let quiet = DocumentValidator::new(&rules)
        .with_options(ValidationOptions {
            include_warnings: false,
            ..ValidationOptions::default()
        })
        .validate(&doc);
    assert!(quiet.issues.is_empty());
}

fn broad_target(comment: Option<&str>) -> ConceptMapGroupElementTarget {
    ConceptMapGroupElementTarget::builder()
        .code(Code::of("PHYS"))
        .relationship(ConceptMapRelationship::of(
            ConceptMapRelationshipCode::SourceIsBroaderThanTarget,
        ))
        .comment(comment.map(FhirString::of))
        .build()
        .unwrap()
}

#[test]
fn broader_mapping_needs_a_comment_unless_draft() {
    let rules = standard_rules();
    let active = concept_map(
        PublicationStatusCode::Active,
        vec![group(vec![element("home", vec![broad_target(None)])])],
    );
    let report = DocumentValidator::new(&rules).validate(&active);
    let paths: Vec<_> = report.issues_for("cmd-1").map(|i| i.instance_path.as_str()).collect();
    assert_eq!(paths, vec!["ConceptMap.group[0].element[0].target[0]"]);

    let commented = concept_map(
        PublicationStatusCode::Active,
        vec![group(vec![element("home", vec![broad_target(Some("postal only"))])])],
    );
    assert!(!DocumentValidator::new(&rules).validate(&commented).has_issue("cmd-1"));

    let draft = concept_map(
        PublicationStatusCode::Draft,
        vec![group(vec![element("home", vec![broad_target(None)])])],
    );
    assert!(!DocumentValidator::new(&rules).validate(&draft).has_issue("cmd-1"));
}

#[test]
fn field_invariants_are_checked_on_the_field() {
    let map = ConceptMap::builder()
        .url(Uri::of("http://hl7.org/fhir/ConceptMap/101|4.0.1"))
        .name(FhirString::of("address use"))
        .status(atrius_fhir_model::codes::PublicationStatus::of(PublicationStatusCode::Draft))
        .build()
        .unwrap();
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&map);
    let url = report.issues_for("cnl-1").next().expect("cnl-1 issue");
    assert_eq!(url.instance_path, "ConceptMap.url");
    assert_eq!(url.severity, ConstraintLevel::Warning);
    assert!(report.has_issue("cnl-0"));
    assert!(report.is_conformant());
}

#[test]
fn contained_resources_are_their_own_resource_context() {
    let inner = scenario(vec![actor("lab", "Laboratory")], vec![operation("Order", "ehr", "lab")]);
    let outer = ConceptMap::builder()
        .status(atrius_fhir_model::codes::PublicationStatus::of(PublicationStatusCode::Draft))
        .add_contained(AnyResource::from(inner))
        .build()
        .unwrap();
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&outer);
    let issue = report.issues_for("exs-17").next().expect("exs-17 issue");
    assert_eq!(
        issue.instance_path,
        "ConceptMap.contained[0].process[0].step[0].operation"
    );
}

#[test]
fn report_serializes_for_tooling() {
    let doc = scenario(
        vec![actor("lab", "Laboratory"), actor("lab", "Laboratory 2")],
        vec![operation("Order", "lab", "lab")],
    );
    let rules = standard_rules();
    let report = DocumentValidator::new(&rules).validate(&doc);
    let json = serde_json::to_value(&report).unwrap();
    let first = &json["issues"][0];
    assert_eq!(first["key"], "exs-6");
    assert_eq!(first["severity"], "rule");
    assert_eq!(first["instance_path"], "ExampleScenario");
}
