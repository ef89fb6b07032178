//! General-purpose complex datatypes used by the resources of this model.

use atrius_macros::FhirNode;

use crate::builder::Violations;
use crate::choice::DataValue;
use crate::codes::{IdentifierUse, NarrativeStatus, QuantityComparator};
use crate::layer::{Element, ElementLayer};
use crate::primitive::{Boolean, Canonical, Code, DateTime, Decimal, FhirString, Id, Uri};

/// Optional additional information, identified by `url`.
#[derive(Debug, Clone, FhirNode)]
#[fhir(validate = check_extension)]
#[fhir_invariant(
    key = "ext-1",
    severity = "rule",
    human = "Must have either extensions or value[x], not both",
    expr = "extension.exists() != value.exists()",
    path = "Extension"
)]
pub struct Extension {
    #[fhir(layer)]
    base: ElementLayer,
    #[fhir(attribute)]
    url: String,
    #[fhir(choice)]
    value: Option<DataValue>,
}

fn check_extension(node: &ExtensionDraft<'_>, violations: &mut Violations) {
    if node.base.extension().is_empty() == node.value.is_none() {
        violations.violated(Extension::INVARIANTS, "ext-1");
    }
}

#[derive(Debug, Clone, FhirNode)]
pub struct Coding {
    #[fhir(layer)]
    base: ElementLayer,
    system: Option<Uri>,
    version: Option<FhirString>,
    code: Option<Code>,
    display: Option<FhirString>,
    user_selected: Option<Boolean>,
}

#[derive(Debug, Clone, FhirNode)]
pub struct CodeableConcept {
    #[fhir(layer)]
    base: ElementLayer,
    coding: Vec<Coding>,
    text: Option<FhirString>,
}

/// A measured amount.
#[derive(Debug, Clone, FhirNode)]
#[fhir(validate = check_quantity)]
#[fhir_invariant(
    key = "qty-3",
    severity = "rule",
    human = "If a code for the unit is present, the system SHALL also be present",
    expr = "code.empty() or system.exists()",
    path = "Quantity"
)]
pub struct Quantity {
    #[fhir(layer)]
    base: ElementLayer,
    value: Option<Decimal>,
    comparator: Option<QuantityComparator>,
    unit: Option<FhirString>,
    system: Option<Uri>,
    code: Option<Code>,
}

fn check_quantity(node: &QuantityDraft<'_>, violations: &mut Violations) {
    if node.code.is_some() && node.system.is_none() {
        violations.violated(Quantity::INVARIANTS, "qty-3");
    }
}

#[derive(Debug, Clone, FhirNode)]
pub struct Identifier {
    #[fhir(layer)]
    base: ElementLayer,
    r#use: Option<IdentifierUse>,
    r#type: Option<CodeableConcept>,
    system: Option<Uri>,
    value: Option<FhirString>,
    period: Option<Period>,
    assigner: Option<Box<Reference>>,
}

#[derive(Debug, Clone, FhirNode)]
pub struct Reference {
    #[fhir(layer)]
    base: ElementLayer,
    reference: Option<FhirString>,
    r#type: Option<Uri>,
    identifier: Option<Identifier>,
    display: Option<FhirString>,
}

/// Time range defined by start and end date/times.
#[derive(Debug, Clone, FhirNode)]
#[fhir(validate = check_period)]
#[fhir_invariant(
    key = "per-1",
    severity = "rule",
    human = "If present, start SHALL have a lower or equal value than end",
    expr = "start.hasValue().not() or end.hasValue().not() or (start.lowBoundary() <= end.highBoundary())",
    path = "Period"
)]
pub struct Period {
    #[fhir(layer)]
    base: ElementLayer,
    start: Option<DateTime>,
    end: Option<DateTime>,
}

/// Whether `start` does not come after `end`, comparing the widest reading of each.
pub(crate) fn period_is_ordered(node: &PeriodDraft<'_>) -> bool {
    let (Some(start), Some(end)) = (
        node.start.and_then(|s| s.value()),
        node.end.and_then(|e| e.value()),
    ) else {
        return true;
    };
    match (start.low_boundary(), end.high_boundary()) {
        (Some(low), Some(high)) => low <= high,
        _ => true,
    }
}

fn check_period(node: &PeriodDraft<'_>, violations: &mut Violations) {
    if !period_is_ordered(node) {
        violations.violated(Period::INVARIANTS, "per-1");
    }
}

/// Metadata about a resource.
#[derive(Debug, Clone, FhirNode)]
pub struct Meta {
    #[fhir(layer)]
    base: ElementLayer,
    version_id: Option<Id>,
    last_updated: Option<DateTime>,
    source: Option<Uri>,
    profile: Vec<Canonical>,
    security: Vec<Coding>,
    tag: Vec<Coding>,
}

/// Human-readable summary of a resource.
#[derive(Debug, Clone, FhirNode)]
pub struct Narrative {
    #[fhir(layer)]
    base: ElementLayer,
    status: NarrativeStatus,
    /// Limited xhtml content.
    div: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::NarrativeStatusCode;
    use crate::date_time::PrecisionDateTime;
    use crate::layer::ElementBuilder;

    fn dt(s: &str) -> DateTime {
        DateTime::of(s.parse::<PrecisionDateTime>().unwrap())
    }

    #[test]
    fn extension_needs_value_or_nested_extensions_but_not_both() {
        let nested = Extension::builder()
            .url("part")
            .value(FhirString::of("x"))
            .build()
            .unwrap();
        let err = Extension::builder()
            .url("http://example.org/complex")
            .value(Boolean::of(true))
            .add_extension(nested.clone())
            .build()
            .unwrap_err();
        assert!(err.has_rule("ext-1"));

        let complex = Extension::builder()
            .url("http://example.org/complex")
            .add_extension(nested)
            .build()
            .unwrap();
        assert!(complex.value().is_none());
    }

    #[test]
    fn quantity_code_requires_system() {
        let err = Quantity::builder().code(Code::of("mg")).build().unwrap_err();
        assert!(err.has_rule("qty-3"));
        assert!(
            Quantity::builder()
                .code(Code::of("mg"))
                .system(Uri::of("http://unitsofmeasure.org"))
                .build()
                .is_ok()
        );
    }

    #[test]
    fn period_bounds_are_compared_by_precision() {
        assert!(
            Period::builder()
                .start(dt("2024-05"))
                .end(dt("2024-05-01"))
                .build()
                .is_ok()
        );
        let err = Period::builder()
            .start(dt("2024-05-02"))
            .end(dt("2024-05-01"))
            .build()
            .unwrap_err();
        assert!(err.has_rule("per-1"));
    }

    #[test]
    fn narrative_requires_status_and_div() {
        let err = Narrative::builder().build().unwrap_err();
        assert_eq!(err.fields(), vec!["status", "div"]);
        let text = Narrative::builder()
            .status(NarrativeStatus::of(NarrativeStatusCode::Generated))
            .div("<div xmlns=\"http://www.w3.org/1999/xhtml\">map</div>")
            .build()
            .unwrap();
        assert!(text.div().starts_with("<div"));
    }
}
