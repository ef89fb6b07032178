//! ConceptMap: a statement of relationships from one set of concepts to one or more
//! other concepts.

use atrius_macros::{FhirChoice, FhirNode};

use crate::builder::Violations;
use crate::codes::{
    ConceptMapAttributeType, ConceptMapGroupUnmappedMode, ConceptMapGroupUnmappedModeCode,
    ConceptMapRelationship, PropertyType, PropertyTypeCode, PublicationStatus,
};
use crate::datatypes::{CodeableConcept, Coding, Identifier, Period, Quantity};
use crate::layer::{BackboneLayer, DomainResourceLayer};
use crate::primitive::{
    Boolean, Canonical, Code, Date, DateTime, Decimal, FhirString, Integer, Markdown, Uri,
};

/// `ConceptMap.versionAlgorithm[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "versionAlgorithm")]
pub enum ConceptMapVersionAlgorithm {
    String(FhirString),
    Coding(Coding),
}

/// `ConceptMap.sourceScope[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "sourceScope")]
pub enum ConceptMapSourceScope {
    Uri(Uri),
    Canonical(Canonical),
}

/// `ConceptMap.targetScope[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "targetScope")]
pub enum ConceptMapTargetScope {
    Uri(Uri),
    Canonical(Canonical),
}

#[derive(Debug, Clone, FhirNode)]
#[fhir_invariant(
    key = "cnl-0",
    severity = "warning",
    human = "Name should be usable as an identifier for the module by machine processing applications such as code generation",
    expr = "name.exists() implies name.matches('^[A-Z]([A-Za-z0-9_]){1,254}$')",
    path = "ConceptMap"
)]
#[fhir_invariant(
    key = "conceptMap-12",
    severity = "warning",
    human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/version-algorithm",
    expr = "versionAlgorithm.as(String).exists() implies (versionAlgorithm.as(String).memberOf('http://hl7.org/fhir/ValueSet/version-algorithm', 'extensible'))",
    path = "ConceptMap"
)]
#[fhir_invariant(
    key = "conceptMap-13",
    severity = "warning",
    human = "SHALL, if possible, contain a code from value set http://hl7.org/fhir/ValueSet/jurisdiction",
    expr = "jurisdiction.exists() implies (jurisdiction.all(memberOf('http://hl7.org/fhir/ValueSet/jurisdiction', 'extensible')))",
    path = "ConceptMap"
)]
pub struct ConceptMap {
    #[fhir(layer)]
    base: DomainResourceLayer,
    #[fhir_invariant(
        key = "cnl-1",
        severity = "warning",
        human = "URL should not contain | or # - these characters make processing canonical references problematic",
        expr = "exists() implies matches('^[^|# ]+$')",
        path = "ConceptMap.url"
    )]
    url: Option<Uri>,
    identifier: Vec<Identifier>,
    version: Option<FhirString>,
    #[fhir(choice)]
    version_algorithm: Option<ConceptMapVersionAlgorithm>,
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
    approval_date: Option<Date>,
    last_review_date: Option<Date>,
    effective_period: Option<Period>,
    topic: Vec<CodeableConcept>,
    property: Vec<ConceptMapProperty>,
    additional_attribute: Vec<ConceptMapAdditionalAttribute>,
    #[fhir(choice)]
    source_scope: Option<ConceptMapSourceScope>,
    #[fhir(choice)]
    target_scope: Option<ConceptMapTargetScope>,
    group: Vec<ConceptMapGroup>,
}

/// A property that can be attached to a target concept in this map.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.property", validate = check_property)]
#[fhir_invariant(
    key = "cmd-11",
    severity = "rule",
    human = "If the property type is code, a system SHALL be specified",
    expr = "type = 'code' implies system.exists()",
    path = "ConceptMap.property"
)]
pub struct ConceptMapProperty {
    #[fhir(layer)]
    base: BackboneLayer,
    code: Code,
    uri: Option<Uri>,
    description: Option<FhirString>,
    r#type: PropertyType,
    system: Option<Canonical>,
}

fn check_property(node: &ConceptMapPropertyDraft<'_>, violations: &mut Violations) {
    if node.r#type.and_then(|t| t.value()) == Some(&PropertyTypeCode::Code) && node.system.is_none() {
        violations.violated(ConceptMapProperty::INVARIANTS, "cmd-11");
    }
}

/// An additional attribute that can be attached to a dependsOn or product entry.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.additionalAttribute")]
pub struct ConceptMapAdditionalAttribute {
    #[fhir(layer)]
    base: BackboneLayer,
    code: Code,
    uri: Option<Uri>,
    description: Option<FhirString>,
    r#type: ConceptMapAttributeType,
}

/// Mappings for all the concepts of one source system to one target system.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.group")]
pub struct ConceptMapGroup {
    #[fhir(layer)]
    base: BackboneLayer,
    source: Option<Canonical>,
    target: Option<Canonical>,
    #[fhir(min = 1)]
    element: Vec<ConceptMapGroupElement>,
    unmapped: Option<ConceptMapGroupUnmapped>,
}

#[derive(Debug, Clone, FhirNode)]
#[fhir(
    type_name = "ConceptMap.group.element",
    one_of(code, value_set),
    validate = check_element
)]
#[fhir_invariant(
    key = "cmd-4",
    severity = "rule",
    human = "If noMap is present, target SHALL NOT be present",
    expr = "(noMap.exists() and noMap=true) implies target.empty()",
    path = "ConceptMap.group.element"
)]
#[fhir_invariant(
    key = "cmd-5",
    severity = "rule",
    human = "Either code or valueSet SHALL be present but not both.",
    expr = "(code.exists() and valueSet.empty()) or (code.empty() and valueSet.exists())",
    path = "ConceptMap.group.element"
)]
pub struct ConceptMapGroupElement {
    #[fhir(layer)]
    base: BackboneLayer,
    code: Option<Code>,
    display: Option<FhirString>,
    value_set: Option<Canonical>,
    no_map: Option<Boolean>,
    target: Vec<ConceptMapGroupElementTarget>,
}

fn check_element(node: &ConceptMapGroupElementDraft<'_>, violations: &mut Violations) {
    let no_map = node.no_map.and_then(|b| b.value()).copied();
    if no_map == Some(true) && !node.target.is_empty() {
        violations.violated(ConceptMapGroupElement::INVARIANTS, "cmd-4");
    }
}

/// A concept from the target value set that this concept maps to.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.group.element.target", one_of(code, value_set))]
#[fhir_invariant(
    key = "cmd-1",
    severity = "rule",
    human = "If the map is source-is-broader-than-target or not-related-to, there SHALL be some comments, unless the status is 'draft'",
    expr = "comment.exists() or (%resource.status = 'draft') or relationship.empty() or ((relationship != 'source-is-broader-than-target') and (relationship != 'not-related-to'))",
    path = "ConceptMap.group.element.target"
)]
#[fhir_invariant(
    key = "cmd-7",
    severity = "rule",
    human = "Either code or valueSet SHALL be present but not both.",
    expr = "(code.exists() and valueSet.empty()) or (code.empty() and valueSet.exists())",
    path = "ConceptMap.group.element.target"
)]
pub struct ConceptMapGroupElementTarget {
    #[fhir(layer)]
    base: BackboneLayer,
    code: Option<Code>,
    display: Option<FhirString>,
    value_set: Option<Canonical>,
    relationship: ConceptMapRelationship,
    comment: Option<FhirString>,
    property: Vec<ConceptMapGroupElementTargetProperty>,
    depends_on: Vec<ConceptMapGroupElementTargetDependsOn>,
    product: Vec<ConceptMapGroupElementTargetDependsOn>,
}

/// `ConceptMap.group.element.target.property.value[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "value")]
pub enum ConceptMapGroupElementTargetPropertyValue {
    Coding(Coding),
    String(FhirString),
    Integer(Integer),
    Boolean(Boolean),
    DateTime(DateTime),
    Decimal(Decimal),
    Code(Code),
}

#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.group.element.target.property")]
pub struct ConceptMapGroupElementTargetProperty {
    #[fhir(layer)]
    base: BackboneLayer,
    code: Code,
    #[fhir(choice)]
    value: ConceptMapGroupElementTargetPropertyValue,
}

/// `ConceptMap.group.element.target.dependsOn.value[x]`
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "value")]
pub enum ConceptMapGroupElementTargetDependsOnValue {
    Code(Code),
    Coding(Coding),
    String(FhirString),
    Boolean(Boolean),
    Quantity(Quantity),
}

/// Another element the mapping depends on; also used for `product`.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.group.element.target.dependsOn", one_of(value, value_set))]
#[fhir_invariant(
    key = "cmd-6",
    severity = "rule",
    human = "One of value[x] or valueSet must exist, but not both.",
    expr = "(value.exists() and valueSet.empty()) or (value.empty() and valueSet.exists())",
    path = "ConceptMap.group.element.target.dependsOn"
)]
pub struct ConceptMapGroupElementTargetDependsOn {
    #[fhir(layer)]
    base: BackboneLayer,
    attribute: Code,
    #[fhir(choice)]
    value: Option<ConceptMapGroupElementTargetDependsOnValue>,
    value_set: Option<Canonical>,
}

/// What to do when there is no mapping to a target concept.
#[derive(Debug, Clone, FhirNode)]
#[fhir(type_name = "ConceptMap.group.unmapped", validate = check_unmapped)]
#[fhir_invariant(
    key = "cmd-2",
    severity = "rule",
    human = "If the mode is 'fixed', either a code or valueSet must be provided, but not both.",
    expr = "(mode = 'fixed') implies ((code.exists() and valueSet.empty()) or (code.empty() and valueSet.exists()))",
    path = "ConceptMap.group.unmapped"
)]
#[fhir_invariant(
    key = "cmd-3",
    severity = "rule",
    human = "If the mode is 'other-map', a url for the other map must be provided",
    expr = "(mode = 'other-map') implies otherMap.exists()",
    path = "ConceptMap.group.unmapped"
)]
#[fhir_invariant(
    key = "cmd-8",
    severity = "rule",
    human = "If the mode is not 'fixed', code, display and valueSet are not allowed",
    expr = "(mode != 'fixed') implies (code.empty() and display.empty() and valueSet.empty())",
    path = "ConceptMap.group.unmapped"
)]
#[fhir_invariant(
    key = "cmd-9",
    severity = "rule",
    human = "If the mode is not 'other-map', relationship must be provided",
    expr = "(mode != 'other-map') implies relationship.exists()",
    path = "ConceptMap.group.unmapped"
)]
#[fhir_invariant(
    key = "cmd-10",
    severity = "rule",
    human = "If the mode is not 'other-map', otherMap is not allowed",
    expr = "(mode != 'other-map') implies otherMap.empty()",
    path = "ConceptMap.group.unmapped"
)]
pub struct ConceptMapGroupUnmapped {
    #[fhir(layer)]
    base: BackboneLayer,
    mode: ConceptMapGroupUnmappedMode,
    code: Option<Code>,
    display: Option<FhirString>,
    value_set: Option<Canonical>,
    relationship: Option<ConceptMapRelationship>,
    other_map: Option<Canonical>,
}

/// The mode-dependent rules of `unmapped`. A mode carried only as extensions leaves
/// every rule vacuously satisfied.
pub(crate) fn unmapped_violations(node: &ConceptMapGroupUnmappedDraft<'_>) -> Vec<&'static str> {
    let Some(mode) = node.mode.and_then(|m| m.value()).copied() else {
        return Vec::new();
    };
    let mut broken = Vec::new();
    let fixed = mode == ConceptMapGroupUnmappedModeCode::Fixed;
    let other_map = mode == ConceptMapGroupUnmappedModeCode::OtherMap;
    if fixed && node.code.is_some() == node.value_set.is_some() {
        broken.push("cmd-2");
    }
    if other_map && node.other_map.is_none() {
        broken.push("cmd-3");
    }
    if !fixed && (node.code.is_some() || node.display.is_some() || node.value_set.is_some()) {
        broken.push("cmd-8");
    }
    if !other_map && node.relationship.is_none() {
        broken.push("cmd-9");
    }
    if !other_map && node.other_map.is_some() {
        broken.push("cmd-10");
    }
    broken
}

fn check_unmapped(node: &ConceptMapGroupUnmappedDraft<'_>, violations: &mut Violations) {
    for key in unmapped_violations(node) {
        violations.violated(ConceptMapGroupUnmapped::INVARIANTS, key);
    }
}
