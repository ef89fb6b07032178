//! ExampleScenario: a walkthrough of actors exchanging resource instances.
//!
//! Actors, instances and versions are referenced from steps by their string `key`; those
//! links are resolved by the document rules (`exs-14` .. `exs-21`), never by `build()`.

use atrius_macros::{FhirChoice, FhirNode};

use crate::builder::Violations;
use crate::codes::{ExampleScenarioActorType, PublicationStatus};
use crate::datatypes::{CodeableConcept, Coding, Identifier, Reference};
use crate::layer::{BackboneLayer, DomainResourceLayer};
use crate::primitive::{Boolean, Canonical, DateTime, FhirString, Markdown, Uri};

/// Reserved actor key standing for any actor outside the scenario.
pub const OTHER_ACTOR: &str = "OTHER";

/// `ExampleScenario.versionAlgorithm[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "versionAlgorithm")]
pub enum ExampleScenarioVersionAlgorithm {
    String(FhirString),
    Coding(Coding),
}

#[derive(Debug, Clone, FhirNode)]
#[fhir_invariant(
    key = "cnl-0",
    severity = "warning",
    human = "Name should be usable as an identifier for the module by machine processing applications such as code generation",
    expr = "name.exists() implies name.matches('^[A-Z]([A-Za-z0-9_]){1,254}$')",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-3",
    severity = "rule",
    human = "Must have actors if status is active or required",
    expr = "status='active' or status='retired' implies actor.exists()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-4",
    severity = "rule",
    human = "Must have processes if status is active or required",
    expr = "status='active' or status='retired' implies process.exists()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-6",
    severity = "rule",
    human = "Actor keys must be unique",
    expr = "actor.key.count() = actor.key.distinct().count()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-7",
    severity = "rule",
    human = "Actor titles must be unique",
    expr = "actor.title.count() = actor.title.distinct().count()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-8",
    severity = "rule",
    human = "Instance keys must be unique",
    expr = "instance.key.count() = instance.key.distinct().count()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-9",
    severity = "rule",
    human = "Instance titles must be unique",
    expr = "instance.title.count() = instance.title.distinct().count()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exs-12",
    severity = "rule",
    human = "Process titles must be unique",
    expr = "process.title.count() = process.title.distinct().count()",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exampleScenario-24",
    severity = "warning",
    human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/version-algorithm",
    expr = "versionAlgorithm.as(String).exists() implies (versionAlgorithm.as(String).memberOf('http://hl7.org/fhir/ValueSet/version-algorithm', 'extensible'))",
    path = "ExampleScenario"
)]
#[fhir_invariant(
    key = "exampleScenario-25",
    severity = "warning",
    human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/jurisdiction",
    expr = "jurisdiction.exists() implies (jurisdiction.all(memberOf('http://hl7.org/fhir/ValueSet/jurisdiction', 'extensible')))",
    path = "ExampleScenario"
)]
pub struct ExampleScenario {
    #[fhir(layer)]
    base: DomainResourceLayer,
    #[fhir_invariant(
        key = "cnl-1",
        severity = "warning",
        human = "URL should not contain | or # - these characters make processing canonical references problematic",
        expr = "exists() implies matches('^[^|# ]+$')",
        path = "ExampleScenario.url"
    )]
    url: Option<Uri>,
    identifier: Vec<Identifier>,
    version: Option<FhirString>,
    #[fhir(choice)]
    version_algorithm: Option<ExampleScenarioVersionAlgorithm>,
    name: Option<FhirString>,
    title: Option<FhirString>,
    status: PublicationStatus,
    experimental: Option<Boolean>,
    date: Option<DateTime>,
    publisher: Option<FhirString>,
    description: Option<Markdown>,
    jurisdiction: Vec<CodeableConcept>,
    purpose: Option<Markdown>,
    copyright: Option<Markdown>,
    copyright_label: Option<FhirString>,
    actor: Vec<ExampleScenarioActor>,
    instance: Vec<ExampleScenarioInstance>,
    process: Vec<ExampleScenarioProcess>,
}

/// A system or person who shares or receives an instance within the scenario.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.actor", validate = check_actor)]
#[fhir_invariant(
    key = "exs-19",
    severity = "warning",
    human = "Actor should be referenced in at least one operation",
    expr = "%resource.process.descendants().select(operation).where(initiator=%context.key or receiver=%context.key).exists()",
    path = "ExampleScenario.actor"
)]
#[fhir_invariant(
    key = "exs-23",
    severity = "rule",
    human = "actor.key canot be 'OTHER'",
    expr = "key != 'OTHER'",
    path = "ExampleScenario.actor"
)]
pub struct ExampleScenarioActor {
    #[fhir(layer)]
    base: BackboneLayer,
    key: FhirString,
    r#type: ExampleScenarioActorType,
    title: FhirString,
    description: Option<Markdown>,
}

fn check_actor(node: &ExampleScenarioActorDraft<'_>, violations: &mut Violations) {
    if node.key.and_then(|k| k.value()).map(String::as_str) == Some(OTHER_ACTOR) {
        violations.violated(ExampleScenarioActor::INVARIANTS, "exs-23");
    }
}

/// `ExampleScenario.instance.structureProfile[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "structureProfile")]
pub enum ExampleScenarioInstanceStructureProfile {
    Canonical(Canonical),
    Uri(Uri),
}

/// A single data collection shared by actors over the course of the scenario.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.instance", validate = check_instance)]
#[fhir_invariant(
    key = "exs-1",
    severity = "rule",
    human = "StructureVersion is required if structureType is not FHIR (but may still be present even if FHIR)",
    expr = "structureType.exists() and structureType.memberOf('http://hl7.org/fhir/ValueSet/resource-types').not() implies structureVersion.exists()",
    path = "ExampleScenario.instance"
)]
#[fhir_invariant(
    key = "exs-2",
    severity = "rule",
    human = "instance.content is only allowed if there are no instance.versions",
    expr = "content.exists() implies version.empty()",
    path = "ExampleScenario.instance"
)]
#[fhir_invariant(
    key = "exs-10",
    severity = "rule",
    human = "Version keys must be unique within an instance",
    expr = "version.key.count() = version.key.distinct().count()",
    path = "ExampleScenario.instance"
)]
#[fhir_invariant(
    key = "exs-11",
    severity = "rule",
    human = "Version titles must be unique within an instance",
    expr = "version.title.count() = version.title.distinct().count()",
    path = "ExampleScenario.instance"
)]
#[fhir_invariant(
    key = "exs-20",
    severity = "warning",
    human = "Instance should be referenced in at least one location",
    expr = "%resource.process.descendants().select(instanceReference).where($this=%context.key).exists()",
    path = "ExampleScenario.instance"
)]
#[fhir_invariant(
    key = "exs-21",
    severity = "warning",
    human = "Instance version should be referenced in at least one operation",
    expr = "version.exists() implies version.key.intersect(%resource.process.descendants().where(instanceReference = %context.key).versionReference).exists()",
    path = "ExampleScenario.instance"
)]
pub struct ExampleScenarioInstance {
    #[fhir(layer)]
    base: BackboneLayer,
    key: FhirString,
    #[fhir_invariant(
        key = "exampleScenario-26",
        severity = "warning",
        human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/examplescenario-instance-type",
        expr = "$this.memberOf('http://hl7.org/fhir/ValueSet/examplescenario-instance-type', 'extensible')",
        path = "ExampleScenario.instance.structureType"
    )]
    structure_type: Coding,
    structure_version: Option<FhirString>,
    #[fhir(choice)]
    structure_profile: Option<ExampleScenarioInstanceStructureProfile>,
    title: FhirString,
    description: Option<Markdown>,
    content: Option<Reference>,
    version: Vec<ExampleScenarioInstanceVersion>,
    contained_instance: Vec<ExampleScenarioInstanceContainedInstance>,
}

fn check_instance(node: &ExampleScenarioInstanceDraft<'_>, violations: &mut Violations) {
    if node.content.is_some() && !node.version.is_empty() {
        violations.violated(ExampleScenarioInstance::INVARIANTS, "exs-2");
    }
}

#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.instance.version")]
pub struct ExampleScenarioInstanceVersion {
    #[fhir(layer)]
    base: BackboneLayer,
    key: FhirString,
    title: FhirString,
    description: Option<Markdown>,
    content: Option<Reference>,
}

/// A reference, by key, to an instance (and optionally one of its versions).
///
/// Also the type of `operation.request` and `operation.response`.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.instance.containedInstance")]
#[fhir_invariant(
    key = "exs-14",
    severity = "rule",
    human = "InstanceReference must be a key of an instance defined in the ExampleScenario",
    expr = "%resource.instance.where(key=%context.instanceReference).exists()",
    path = "ExampleScenario.instance.containedInstance"
)]
#[fhir_invariant(
    key = "exs-15",
    severity = "rule",
    human = "versionReference must be specified if the referenced instance defines versions",
    expr = "versionReference.empty() implies %resource.instance.where(key=%context.instanceReference).version.empty()",
    path = "ExampleScenario.instance.containedInstance"
)]
#[fhir_invariant(
    key = "exs-16",
    severity = "rule",
    human = "versionReference must be a key of a version within the instance pointed to by instanceReference",
    expr = "versionReference.exists() implies %resource.instance.where(key=%context.instanceReference).version.where(key=%context.versionReference).exists()",
    path = "ExampleScenario.instance.containedInstance"
)]
pub struct ExampleScenarioInstanceContainedInstance {
    #[fhir(layer)]
    base: BackboneLayer,
    instance_reference: FhirString,
    version_reference: Option<FhirString>,
}

/// A group of operations that represents a significant step within the scenario.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.process")]
#[fhir_invariant(
    key = "exs-5",
    severity = "rule",
    human = "Processes must have steps if ExampleScenario status is active or required",
    expr = "%resource.status='active' or %resource.status='retired' implies step.exists()",
    path = "ExampleScenario.process"
)]
pub struct ExampleScenarioProcess {
    #[fhir(layer)]
    base: BackboneLayer,
    title: FhirString,
    description: Option<Markdown>,
    pre_conditions: Option<Markdown>,
    post_conditions: Option<Markdown>,
    step: Vec<ExampleScenarioProcessStep>,
}

/// One step of a process: a nested process, a workflow, or a single operation.
#[derive(Debug, Clone, FhirNode)]
#[fhir(
    type_name = "ExampleScenario.process.step",
    at_most_one(process, workflow, operation)
)]
#[fhir_invariant(
    key = "exs-13",
    severity = "rule",
    human = "Alternative titles must be unique within a step",
    expr = "alternative.title.count() = alternative.title.distinct().count()",
    path = "ExampleScenario.process.step"
)]
#[fhir_invariant(
    key = "exs-22",
    severity = "rule",
    human = "Can have a process, a workflow, one or more operations or none of these, but cannot have a combination",
    expr = "(process.exists() implies workflow.empty() and operation.empty()) and (workflow.exists() implies operation.empty())",
    path = "ExampleScenario.process.step"
)]
pub struct ExampleScenarioProcessStep {
    #[fhir(layer)]
    base: BackboneLayer,
    number: Option<FhirString>,
    process: Option<Box<ExampleScenarioProcess>>,
    workflow: Option<Canonical>,
    operation: Option<ExampleScenarioProcessStepOperation>,
    alternative: Vec<ExampleScenarioProcessStepAlternative>,
    pause: Option<Boolean>,
}

/// A message exchanged between two actors.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.process.step.operation")]
#[fhir_invariant(
    key = "exs-17",
    severity = "rule",
    human = "If specified, initiator must be a key of an actor within the ExampleScenario",
    expr = "initiator.exists() implies initiator = 'OTHER' or %resource.actor.where(key=%context.initiator).exists()",
    path = "ExampleScenario.process.step.operation"
)]
#[fhir_invariant(
    key = "exs-18",
    severity = "rule",
    human = "If specified, receiver must be a key of an actor within the ExampleScenario",
    expr = "receiver.exists() implies receiver = 'OTHER' or %resource.actor.where(key=%context.receiver).exists()",
    path = "ExampleScenario.process.step.operation"
)]
pub struct ExampleScenarioProcessStepOperation {
    #[fhir(layer)]
    base: BackboneLayer,
    #[fhir_invariant(
        key = "exampleScenario-27",
        severity = "warning",
        human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/testscript-operation-codes",
        expr = "$this.memberOf('http://hl7.org/fhir/ValueSet/testscript-operation-codes', 'extensible')",
        path = "ExampleScenario.process.step.operation.type"
    )]
    r#type: Option<Coding>,
    title: FhirString,
    initiator: Option<FhirString>,
    receiver: Option<FhirString>,
    description: Option<Markdown>,
    initiator_active: Option<Boolean>,
    receiver_active: Option<Boolean>,
    request: Option<ExampleScenarioInstanceContainedInstance>,
    response: Option<ExampleScenarioInstanceContainedInstance>,
}

#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ExampleScenario.process.step.alternative")]
pub struct ExampleScenarioProcessStepAlternative {
    #[fhir(layer)]
    base: BackboneLayer,
    title: FhirString,
    description: Option<Markdown>,
    step: Vec<ExampleScenarioProcessStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Violation;
    use crate::codes::ExampleScenarioActorTypeCode;

    fn actor(key: &str) -> Result<ExampleScenarioActor, crate::BuildError> {
        ExampleScenarioActor::builder()
            .key(FhirString::of(key))
            .r#type(ExampleScenarioActorType::of(ExampleScenarioActorTypeCode::Person))
            .title(FhirString::of(format!("Actor {key}")))
            .build()
    }

    #[test]
    fn other_is_a_reserved_actor_key() {
        assert!(actor("patient").is_ok());
        assert!(actor(OTHER_ACTOR).unwrap_err().has_rule("exs-23"));
    }

    #[test]
    fn step_holds_at_most_one_kind_of_action() {
        let operation = ExampleScenarioProcessStepOperation::builder()
            .title(FhirString::of("Query"))
            .build()
            .unwrap();
        let err = ExampleScenarioProcessStep::builder()
            .workflow(Canonical::of("http://example.org/fhir/ExampleScenario/other"))
            .operation(operation.clone())
            .build()
            .unwrap_err();
        assert!(matches!(
            &err.violations[0],
            Violation::ExclusiveFields { present, .. } if present == &vec!["workflow", "operation"]
        ));
        assert!(ExampleScenarioProcessStep::builder().operation(operation).build().is_ok());
    }

    #[test]
    fn content_and_versions_are_exclusive() {
        let version = ExampleScenarioInstanceVersion::builder()
            .key(FhirString::of("v1"))
            .title(FhirString::of("First"))
            .build()
            .unwrap();
        let structure = Coding::builder()
            .system(Uri::of("http://hl7.org/fhir/fhir-types"))
            .code(crate::primitive::Code::of("Patient"))
            .build()
            .unwrap();
        let content = Reference::builder()
            .reference(FhirString::of("Patient/1"))
            .build()
            .unwrap();
        let err = ExampleScenarioInstance::builder()
            .key(FhirString::of("p"))
            .structure_type(structure)
            .title(FhirString::of("Patient"))
            .content(content)
            .add_version(version)
            .build()
            .unwrap_err();
        assert!(err.has_rule("exs-2"));
    }
}
