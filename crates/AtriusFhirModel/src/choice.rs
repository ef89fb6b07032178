//! Choice (`[x]`) fields.
//!
//! Builders accept any [`DataValue`] for a choice field; `build()` narrows it to the
//! field's own union (e.g. `ConceptMapSourceScope`) and reports an inadmissible type as
//! a violation. Each field union only has variants for its admissible types, so a built
//! node can never hold anything else.

use atrius_macros::FhirChoice;

use crate::datatypes::{CodeableConcept, Coding, Identifier, Meta, Period, Quantity, Reference};
use crate::node::Node;
use crate::primitive::{
    Boolean, Canonical, Code, Date, DateTime, Decimal, FhirString, Id, Integer, Markdown, Uri,
};
use crate::support::ChoiceElement;

/// A union usable as the frozen type of a choice field.
pub trait ChoiceValue: ChoiceElement + Node + Clone {
    /// Narrows an open value; hands it back unchanged when its type is not admissible.
    fn from_data_value(value: DataValue) -> Result<Self, DataValue>;
}

/// Every datatype a choice field of this model can hold.
#[derive(Debug, Clone, FhirChoice)]
#[fhir(base_name = "value", open)]
pub enum DataValue {
    Boolean(Boolean),
    Integer(Integer),
    Decimal(Decimal),
    String(FhirString),
    Code(Code),
    Uri(Uri),
    Canonical(Canonical),
    Id(Id),
    Markdown(Markdown),
    Date(Date),
    DateTime(DateTime),
    Coding(Coding),
    CodeableConcept(CodeableConcept),
    Quantity(Quantity),
    Identifier(Identifier),
    Reference(Reference),
    Period(Period),
    Meta(Meta),
}

impl DataValue {
    /// Wire name of this value under a choice field, e.g. `valueCodeableConcept`.
    pub fn field_name(&self, base_name: &str) -> String {
        choice_field_name(base_name, self.type_name())
    }
}

/// `base` plus the type name with its first letter upper-cased.
pub fn choice_field_name(base: &str, type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => format!("{base}{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_follows_type_name() {
        let v = DataValue::from(DateTime::of("2024-05-01T10:00:00Z".parse::<crate::date_time::PrecisionDateTime>().unwrap()));
        assert_eq!(v.field_name("value"), "valueDateTime");
        assert_eq!(choice_field_name("sourceScope", "uri"), "sourceScopeUri");
        assert!(DataValue::possible_field_names().contains(&"valueCodeableConcept"));
    }

    #[test]
    fn open_union_admits_every_type() {
        assert!(DataValue::admits("Quantity"));
        assert!(DataValue::admits("markdown"));
        assert!(!DataValue::admits("ConceptMap"));
    }
}
