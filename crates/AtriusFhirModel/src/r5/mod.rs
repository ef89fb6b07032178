//! FHIR R5 resources.

use atrius_macros::FhirChoice;

pub mod concept_map;
pub mod example_scenario;
pub mod parameters;

pub use concept_map::ConceptMap;
pub use example_scenario::ExampleScenario;
pub use parameters::Parameters;

/// Any resource of this model, as held by `contained` and `Parameters.parameter.resource`.
#[derive(Debug, Clone, FhirChoice)]
pub enum AnyResource {
    ConceptMap(ConceptMap),
    ExampleScenario(ExampleScenario),
    Parameters(Parameters),
}

impl AnyResource {
    pub fn resource_type(&self) -> &'static str {
        crate::node::Node::type_name(self)
    }
}
