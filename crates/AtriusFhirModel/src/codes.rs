//! Code systems bound (required strength) to fields of this model.
//!
//! Each set is a closed enum over the FHIR code text plus a primitive alias, so a bound
//! field still carries `id`/`extension` like any other `code`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::primitive::{CodeKind, Primitive, PrimitiveScalar, PrimitiveValue};

/// A code outside the bound value set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{code}` is not a valid {value_set} code")]
pub struct UnknownCode {
    pub value_set: &'static str,
    pub code: String,
}

macro_rules! fhir_codes {
    (
        $(#[$meta:meta])*
        $code_enum:ident => $alias:ident, $value_set:literal {
            $($variant:ident = $text:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $code_enum {
            $($variant),*
        }

        impl $code_enum {
            pub const VALUE_SET: &'static str = $value_set;
            pub const ALL: &'static [$code_enum] = &[$($code_enum::$variant),*];

            /// FHIR code text.
            pub fn code(self) -> &'static str {
                match self {
                    $($code_enum::$variant => $text),*
                }
            }
        }

        impl fmt::Display for $code_enum {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $code_enum {
            type Err = UnknownCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($code_enum::$variant),)*
                    _ => Err(UnknownCode {
                        value_set: $value_set,
                        code: s.to_string(),
                    }),
                }
            }
        }

        impl PrimitiveScalar for $code_enum {
            fn primitive_value(&self) -> PrimitiveValue<'_> {
                PrimitiveValue::Text(self.code())
            }
        }

        pub type $alias = Primitive<$code_enum, CodeKind>;
    };
}

fhir_codes! {
    PublicationStatusCode => PublicationStatus, "http://hl7.org/fhir/ValueSet/publication-status" {
        Draft = "draft",
        Active = "active",
        Retired = "retired",
        Unknown = "unknown",
    }
}

fhir_codes! {
    /// Type of a ConceptMap property value.
    PropertyTypeCode => PropertyType, "http://hl7.org/fhir/ValueSet/conceptmap-property-type" {
        Coding = "Coding",
        String = "string",
        Integer = "integer",
        Boolean = "boolean",
        DateTime = "dateTime",
        Decimal = "decimal",
        Code = "code",
    }
}

fhir_codes! {
    ConceptMapAttributeTypeCode => ConceptMapAttributeType, "http://hl7.org/fhir/ValueSet/conceptmap-attribute-type" {
        Code = "code",
        Coding = "Coding",
        String = "string",
        Boolean = "boolean",
        Quantity = "Quantity",
    }
}

fhir_codes! {
    /// Relationship between a source and a target concept.
    ConceptMapRelationshipCode => ConceptMapRelationship, "http://hl7.org/fhir/ValueSet/concept-map-relationship" {
        RelatedTo = "related-to",
        Equivalent = "equivalent",
        SourceIsNarrowerThanTarget = "source-is-narrower-than-target",
        SourceIsBroaderThanTarget = "source-is-broader-than-target",
        NotRelatedTo = "not-related-to",
    }
}

fhir_codes! {
    ConceptMapGroupUnmappedModeCode => ConceptMapGroupUnmappedMode, "http://hl7.org/fhir/ValueSet/conceptmap-unmapped-mode" {
        UseSourceCode = "use-source-code",
        Fixed = "fixed",
        OtherMap = "other-map",
    }
}

fhir_codes! {
    ExampleScenarioActorTypeCode => ExampleScenarioActorType, "http://hl7.org/fhir/ValueSet/examplescenario-actor-type" {
        Person = "person",
        System = "system",
    }
}

fhir_codes! {
    NarrativeStatusCode => NarrativeStatus, "http://hl7.org/fhir/ValueSet/narrative-status" {
        Generated = "generated",
        Extensions = "extensions",
        Additional = "additional",
        Empty = "empty",
    }
}

fhir_codes! {
    QuantityComparatorCode => QuantityComparator, "http://hl7.org/fhir/ValueSet/quantity-comparator" {
        LessThan = "<",
        LessOrEqual = "<=",
        GreaterOrEqual = ">=",
        GreaterThan = ">",
        Ad = "ad",
    }
}

fhir_codes! {
    IdentifierUseCode => IdentifierUse, "http://hl7.org/fhir/ValueSet/identifier-use" {
        Usual = "usual",
        Official = "official",
        Temp = "temp",
        Secondary = "secondary",
        Old = "old",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_code_text() {
        for code in ConceptMapRelationshipCode::ALL {
            assert_eq!(code.code().parse::<ConceptMapRelationshipCode>(), Ok(*code));
        }
    }

    #[test]
    fn unknown_code_names_the_value_set() {
        let err = "wider".parse::<ConceptMapGroupUnmappedModeCode>().unwrap_err();
        assert!(err.to_string().contains("conceptmap-unmapped-mode"));
    }
}
