mod common;

use atrius_fhir_model::codes::{
    ConceptMapRelationshipCode, PropertyType, PropertyTypeCode, PublicationStatus,
    PublicationStatusCode,
};
use atrius_fhir_model::prelude::*;
use atrius_fhir_model::primitive::PrimitiveValue;
use atrius_fhir_model::r5::concept_map::ConceptMapProperty;
use atrius_fhir_model::r5::example_scenario::ExampleScenario;
use atrius_fhir_model::visitor::path::node_paths;
use atrius_fhir_model::visitor::{walk, Visitor};
use common::{concept_map, element, group, target};

/// Records what the root reports for each of its own fields.
#[derive(Default)]
struct TopLevel {
    depth: usize,
    events: Vec<String>,
}

impl<'t> Visitor<'t> for TopLevel {
    fn visit_start(&mut self, name: &'static str, index: Option<usize>, _node: &'t dyn Node) {
        if self.depth == 1 {
            self.events.push(match index {
                Some(i) => format!("{name}[{i}]"),
                None => name.to_string(),
            });
        }
        self.depth += 1;
    }

    fn visit_end(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {
        self.depth -= 1;
    }

    fn visit_value(&mut self, name: &'static str, _value: PrimitiveValue<'t>) {
        if self.depth == 1 {
            self.events.push(name.to_string());
        }
    }

    fn visit_absent(&mut self, name: &'static str) {
        if self.depth == 1 {
            self.events.push(format!("absent {name}"));
        }
    }
}

fn top_level(node: &dyn Node) -> Vec<String> {
    let mut visitor = TopLevel::default();
    walk(node, &mut visitor);
    visitor.events
}

#[test]
fn property_fields_are_visited_in_schema_order() {
    let property = ConceptMapProperty::builder()
        .code(Code::of("display"))
        .r#type(PropertyType::of(PropertyTypeCode::Coding))
        .build()
        .unwrap();
    assert_eq!(
        top_level(&property),
        vec![
            "absent id",
            "absent extension",
            "absent modifierExtension",
            "code",
            "absent uri",
            "absent description",
            "type",
            "absent system",
        ]
    );
    let names: Vec<_> = property.fields().iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec!["id", "extension", "modifierExtension", "code", "uri", "description", "type", "system"]
    );
}

#[test]
fn setter_order_does_not_change_traversal_order() {
    let title_first = ExampleScenario::builder()
        .title(FhirString::of("Lab exchange"))
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .build()
        .unwrap();
    let status_first = ExampleScenario::builder()
        .status(PublicationStatus::of(PublicationStatusCode::Draft))
        .title(FhirString::of("Lab exchange"))
        .build()
        .unwrap();
    assert_eq!(top_level(&title_first), top_level(&status_first));
    let events = top_level(&title_first);
    let title = events.iter().position(|e| e == "title");
    let status = events.iter().position(|e| e == "status");
    assert!(title < status);
}

#[test]
fn list_items_carry_their_index() {
    let map = concept_map(
        PublicationStatusCode::Draft,
        vec![group(vec![element("home", vec![target("H", ConceptMapRelationshipCode::Equivalent)])])],
    );
    let events = top_level(&map);
    assert!(events.contains(&"group[0]".to_string()));
    assert!(events.contains(&"absent contained".to_string()));
}

#[test]
fn paths_render_indices_and_relative_form() {
    let groups = (0..3)
        .map(|g| {
            group(vec![element(
                &format!("g{g}"),
                vec![
                    target("A", ConceptMapRelationshipCode::Equivalent),
                    target("B", ConceptMapRelationshipCode::RelatedTo),
                ],
            )])
        })
        .collect();
    let map = concept_map(PublicationStatusCode::Draft, groups);
    let paths = node_paths(&map);
    let deep = paths
        .iter()
        .find(|p| p.to_string() == "ConceptMap.group[2].element[0].target[1].code")
        .expect("path of the last group's second target code");
    assert_eq!(deep.relative(), "group[2].element[0].target[1].code");
    assert_eq!(deep.depth(), 5);
    assert_eq!(paths[0].to_string(), "ConceptMap");
}
