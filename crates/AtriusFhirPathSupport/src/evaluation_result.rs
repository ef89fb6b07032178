use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;

use crate::type_info::TypeInfoResult;

/// Value shape an expression engine evaluates against.
///
/// Built nodes are converted into this form before being handed to an engine: complex
/// nodes become [`EvaluationResult::Object`]s keyed by FHIR field name, repeating fields
/// become [`EvaluationResult::Collection`]s and primitives become the matching scalar
/// variant carrying their FHIR type.
///
/// ```rust
/// use atrius_fhirpath_support::EvaluationResult;
///
/// let items = vec![
///     EvaluationResult::fhir_string("a".to_string(), "code"),
///     EvaluationResult::fhir_string("b".to_string(), "code"),
/// ];
/// let collection = EvaluationResult::collection(items);
/// assert_eq!(collection.count(), 2);
/// assert!(collection.is_collection());
/// ```
#[derive(Debug, Clone)]
pub enum EvaluationResult {
    /// No value; the empty collection `{}`.
    Empty,
    Boolean(bool, Option<TypeInfoResult>),
    /// Text value; used for string, code, uri, canonical, id, markdown.
    String(String, Option<TypeInfoResult>),
    /// Decimal value. Equality and hashing ignore trailing zeros.
    Decimal(Decimal, Option<TypeInfoResult>),
    Integer(i64, Option<TypeInfoResult>),
    /// Date in its original partial-precision lexical form.
    Date(String, Option<TypeInfoResult>),
    /// DateTime in its original partial-precision lexical form.
    DateTime(String, Option<TypeInfoResult>),
    /// Ordered items of a repeating field.
    Collection {
        items: Vec<EvaluationResult>,
        type_info: Option<TypeInfoResult>,
    },
    /// Complex node keyed by FHIR field name. Absent fields are not present in the map.
    Object {
        map: HashMap<String, EvaluationResult>,
        type_info: Option<TypeInfoResult>,
    },
}

impl PartialEq for EvaluationResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EvaluationResult::Empty, EvaluationResult::Empty) => true,
            (EvaluationResult::Boolean(a, _), EvaluationResult::Boolean(b, _)) => a == b,
            (EvaluationResult::String(a, _), EvaluationResult::String(b, _)) => a == b,
            (EvaluationResult::Decimal(a, _), EvaluationResult::Decimal(b, _)) => {
                a.normalize() == b.normalize()
            }
            (EvaluationResult::Integer(a, _), EvaluationResult::Integer(b, _)) => a == b,
            (EvaluationResult::Date(a, _), EvaluationResult::Date(b, _)) => a == b,
            (EvaluationResult::DateTime(a, _), EvaluationResult::DateTime(b, _)) => a == b,
            (
                EvaluationResult::Collection { items: a, .. },
                EvaluationResult::Collection { items: b, .. },
            ) => a == b,
            (EvaluationResult::Object { map: a, .. }, EvaluationResult::Object { map: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl Eq for EvaluationResult {}

impl Hash for EvaluationResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            EvaluationResult::Empty => {}
            EvaluationResult::Boolean(b, _) => b.hash(state),
            EvaluationResult::String(s, _) => s.hash(state),
            EvaluationResult::Decimal(d, _) => d.normalize().hash(state),
            EvaluationResult::Integer(i, _) => i.hash(state),
            EvaluationResult::Date(d, _) => d.hash(state),
            EvaluationResult::DateTime(dt, _) => dt.hash(state),
            EvaluationResult::Collection { items, .. } => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            EvaluationResult::Object { map, .. } => {
                // sorted keys keep the hash independent of map iteration order
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                keys.len().hash(state);
                for key in keys {
                    key.hash(state);
                    map[key].hash(state);
                }
            }
        }
    }
}

impl EvaluationResult {
    pub fn boolean(value: bool) -> Self {
        EvaluationResult::Boolean(value, Some(TypeInfoResult::system("Boolean")))
    }

    pub fn fhir_boolean(value: bool) -> Self {
        EvaluationResult::Boolean(value, Some(TypeInfoResult::fhir("boolean")))
    }

    pub fn string(value: String) -> Self {
        EvaluationResult::String(value, Some(TypeInfoResult::system("String")))
    }

    /// String-valued FHIR primitive (`string`, `code`, `uri`, ...).
    pub fn fhir_string(value: String, fhir_type: &str) -> Self {
        EvaluationResult::String(value, Some(TypeInfoResult::fhir(fhir_type)))
    }

    pub fn integer(value: i64) -> Self {
        EvaluationResult::Integer(value, Some(TypeInfoResult::system("Integer")))
    }

    pub fn fhir_integer(value: i64) -> Self {
        EvaluationResult::Integer(value, Some(TypeInfoResult::fhir("integer")))
    }

    pub fn decimal(value: Decimal) -> Self {
        EvaluationResult::Decimal(value, Some(TypeInfoResult::system("Decimal")))
    }

    pub fn fhir_decimal(value: Decimal) -> Self {
        EvaluationResult::Decimal(value, Some(TypeInfoResult::fhir("decimal")))
    }

    pub fn fhir_date(value: String) -> Self {
        EvaluationResult::Date(value, Some(TypeInfoResult::fhir("date")))
    }

    pub fn fhir_datetime(value: String) -> Self {
        EvaluationResult::DateTime(value, Some(TypeInfoResult::fhir("dateTime")))
    }

    /// Collection with no type information; an empty input yields [`EvaluationResult::Empty`].
    pub fn collection(items: Vec<EvaluationResult>) -> Self {
        if items.is_empty() {
            return EvaluationResult::Empty;
        }
        EvaluationResult::Collection {
            items,
            type_info: None,
        }
    }

    pub fn object(map: HashMap<String, EvaluationResult>) -> Self {
        EvaluationResult::Object {
            map,
            type_info: None,
        }
    }

    pub fn typed_object(
        map: HashMap<String, EvaluationResult>,
        type_namespace: &str,
        type_name: &str,
    ) -> Self {
        EvaluationResult::Object {
            map,
            type_info: Some(TypeInfoResult::new(type_namespace, type_name)),
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EvaluationResult::Boolean(val, _) => Some(*val),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            EvaluationResult::String(val, _) => Some(val),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            EvaluationResult::Integer(val, _) => Some(*val),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            EvaluationResult::Decimal(val, _) => Some(*val),
            _ => None,
        }
    }

    /// Property lookup on an object; `None` for absent fields and non-objects.
    pub fn get(&self, key: &str) -> Option<&EvaluationResult> {
        match self {
            EvaluationResult::Object { map, .. } => map.get(key),
            _ => None,
        }
    }

    /// Items of this result using collection semantics: empty yields nothing, a
    /// singleton yields itself.
    pub fn items(&self) -> Vec<&EvaluationResult> {
        match self {
            EvaluationResult::Empty => Vec::new(),
            EvaluationResult::Collection { items, .. } => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, EvaluationResult::Collection { .. })
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of items under FHIRPath counting rules.
    pub fn count(&self) -> usize {
        match self {
            EvaluationResult::Empty => 0,
            EvaluationResult::Collection { items, .. } => items.len(),
            _ => 1,
        }
    }

    pub fn type_info(&self) -> Option<&TypeInfoResult> {
        match self {
            EvaluationResult::Empty => None,
            EvaluationResult::Boolean(_, t)
            | EvaluationResult::String(_, t)
            | EvaluationResult::Decimal(_, t)
            | EvaluationResult::Integer(_, t)
            | EvaluationResult::Date(_, t)
            | EvaluationResult::DateTime(_, t) => t.as_ref(),
            EvaluationResult::Collection { type_info, .. }
            | EvaluationResult::Object { type_info, .. } => type_info.as_ref(),
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            EvaluationResult::Empty => "Empty",
            EvaluationResult::Boolean(_, _) => "Boolean",
            EvaluationResult::String(_, _) => "String",
            EvaluationResult::Decimal(_, _) => "Decimal",
            EvaluationResult::Integer(_, _) => "Integer",
            EvaluationResult::Date(_, _) => "Date",
            EvaluationResult::DateTime(_, _) => "DateTime",
            EvaluationResult::Collection { .. } => "Collection",
            EvaluationResult::Object { .. } => "Object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &EvaluationResult) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn decimals_compare_normalized() {
        let a = EvaluationResult::fhir_decimal(dec!(1.0));
        let b = EvaluationResult::decimal(dec!(1.00));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn empty_collection_collapses_to_empty() {
        assert_eq!(EvaluationResult::collection(Vec::new()), EvaluationResult::Empty);
        assert!(EvaluationResult::Empty.items().is_empty());
    }

    #[test]
    fn object_lookup_and_type_info() {
        let mut map = HashMap::new();
        map.insert("code".to_string(), EvaluationResult::fhir_string("display".into(), "code"));
        let object = EvaluationResult::typed_object(map, "FHIR", "Coding");

        assert_eq!(
            object.get("code").and_then(|c| c.as_string()).map(String::as_str),
            Some("display")
        );
        assert!(object.get("system").is_none());
        assert_eq!(object.type_info().map(|t| t.name.as_str()), Some("Coding"));
    }
}
