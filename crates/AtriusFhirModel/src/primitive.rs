//! FHIR primitive types.
//!
//! A primitive is a leaf node: an optional scalar value plus the Element layer (`id` and
//! `extension`), because FHIR lets metadata hang off plain values. One generic wrapper,
//! [`Primitive`], covers them all; the FHIR type is a zero-sized kind parameter.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use rust_decimal::Decimal as RustDecimal;
use serde_json::{Number, Value};

use crate::builder::{BuildError, Violations};
use crate::date_time::{PrecisionDate, PrecisionDateTime};
use crate::layer::{Element, ElementBuilder, ElementLayer, ElementLayerBuilder, Layer};
use crate::node::{FhirType, FieldInfo, FieldKind, FieldTable, Max, Node};
use crate::support::{EvaluationResult, IntoEvaluationResult};
use crate::visitor::Walker;

/// Borrowed view of a primitive's value, as handed to visitors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveValue<'a> {
    Boolean(bool),
    Integer(i32),
    Decimal(&'a RustDecimal),
    /// string, code, uri, canonical, id, markdown and plain string leaves.
    Text(&'a str),
    Date(&'a PrecisionDate),
    DateTime(&'a PrecisionDateTime),
}

impl<'a> PrimitiveValue<'a> {
    /// Canonical lexical form. Decimals keep their scale (`1.50` stays `1.50`).
    pub fn canonical(&self) -> Cow<'a, str> {
        match *self {
            PrimitiveValue::Boolean(b) => Cow::Borrowed(if b { "true" } else { "false" }),
            PrimitiveValue::Integer(i) => Cow::Owned(i.to_string()),
            PrimitiveValue::Decimal(d) => Cow::Owned(d.to_string()),
            PrimitiveValue::Text(s) => Cow::Borrowed(s),
            PrimitiveValue::Date(d) => Cow::Borrowed(d.original_string()),
            PrimitiveValue::DateTime(dt) => Cow::Borrowed(dt.original_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match *self {
            PrimitiveValue::Boolean(b) => Value::Bool(b),
            PrimitiveValue::Integer(i) => Value::Number(i.into()),
            PrimitiveValue::Decimal(d) => {
                let text = d.to_string();
                Number::from_str(&text).map_or(Value::String(text), Value::Number)
            }
            other => Value::String(other.canonical().into_owned()),
        }
    }

    /// Scalar result typed with the FHIR primitive `fhir_type`.
    pub fn to_evaluation_result(&self, fhir_type: &str) -> EvaluationResult {
        match *self {
            PrimitiveValue::Boolean(b) => EvaluationResult::fhir_boolean(b),
            PrimitiveValue::Integer(i) => EvaluationResult::fhir_integer(i64::from(i)),
            PrimitiveValue::Decimal(d) => EvaluationResult::fhir_decimal(*d),
            PrimitiveValue::Text(s) => EvaluationResult::fhir_string(s.to_string(), fhir_type),
            PrimitiveValue::Date(d) => EvaluationResult::fhir_date(d.original_string().to_string()),
            PrimitiveValue::DateTime(dt) => {
                EvaluationResult::fhir_datetime(dt.original_string().to_string())
            }
        }
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match *self {
            PrimitiveValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Rust value types a primitive can wrap.
pub trait PrimitiveScalar: Clone + fmt::Debug + Send + Sync + 'static {
    fn primitive_value(&self) -> PrimitiveValue<'_>;
}

impl PrimitiveScalar for bool {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::Boolean(*self)
    }
}

impl PrimitiveScalar for i32 {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::Integer(*self)
    }
}

impl PrimitiveScalar for RustDecimal {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::Decimal(self)
    }
}

impl PrimitiveScalar for String {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::Text(self)
    }
}

impl PrimitiveScalar for PrecisionDate {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::Date(self)
    }
}

impl PrimitiveScalar for PrecisionDateTime {
    fn primitive_value(&self) -> PrimitiveValue<'_> {
        PrimitiveValue::DateTime(self)
    }
}

/// Marker naming a FHIR primitive type.
pub trait PrimitiveKind: Send + Sync + 'static {
    const TYPE_NAME: &'static str;
}

macro_rules! primitive_kinds {
    ($($kind:ident => $name:literal),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $kind {}

            impl PrimitiveKind for $kind {
                const TYPE_NAME: &'static str = $name;
            }
        )*
    };
}

primitive_kinds! {
    BooleanKind => "boolean",
    IntegerKind => "integer",
    DecimalKind => "decimal",
    StringKind => "string",
    CodeKind => "code",
    UriKind => "uri",
    CanonicalKind => "canonical",
    IdKind => "id",
    MarkdownKind => "markdown",
    DateKind => "date",
    DateTimeKind => "dateTime",
}

pub type Boolean = Primitive<bool, BooleanKind>;
pub type Integer = Primitive<i32, IntegerKind>;
pub type Decimal = Primitive<RustDecimal, DecimalKind>;
pub type FhirString = Primitive<String, StringKind>;
pub type Code = Primitive<String, CodeKind>;
pub type Uri = Primitive<String, UriKind>;
pub type Canonical = Primitive<String, CanonicalKind>;
pub type Id = Primitive<String, IdKind>;
pub type Markdown = Primitive<String, MarkdownKind>;
pub type Date = Primitive<PrecisionDate, DateKind>;
pub type DateTime = Primitive<PrecisionDateTime, DateTimeKind>;

const PRIMITIVE_FIELDS: &[FieldInfo] = &[FieldInfo {
    name: "value",
    min: 0,
    max: Max::One,
    kind: FieldKind::Scalar,
    constraints: &[],
}];

/// A FHIR primitive: optional value of type `V` plus `id`/`extension`.
pub struct Primitive<V, K> {
    base: ElementLayer,
    value: Option<V>,
    kind: PhantomData<fn() -> K>,
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Primitive<V, K> {
    /// A primitive holding just `value`.
    pub fn of(value: impl Into<V>) -> Self {
        Self {
            base: ElementLayer::default(),
            value: Some(value.into()),
            kind: PhantomData,
        }
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn builder() -> PrimitiveBuilder<V, K> {
        PrimitiveBuilder::default()
    }

    pub fn to_builder(&self) -> PrimitiveBuilder<V, K> {
        PrimitiveBuilder {
            base: self.base.seed(),
            value: self.value.clone(),
            kind: PhantomData,
        }
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Clone for Primitive<V, K> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            value: self.value.clone(),
            kind: PhantomData,
        }
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> fmt::Debug for Primitive<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(K::TYPE_NAME);
        if let Some(id) = self.base.id() {
            out.field("id", &id);
        }
        if !self.base.extension().is_empty() {
            out.field("extension", &self.base.extension());
        }
        out.field("value", &self.value).finish()
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> fmt::Display for Primitive<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => f.write_str(&v.primitive_value().canonical()),
            None => Ok(()),
        }
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> From<V> for Primitive<V, K> {
    fn from(value: V) -> Self {
        Self::of(value)
    }
}

impl<K: PrimitiveKind> From<&str> for Primitive<String, K> {
    fn from(value: &str) -> Self {
        Self::of(value)
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> FhirType for Primitive<V, K> {
    const TYPE_NAME: &'static str = K::TYPE_NAME;
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Node for Primitive<V, K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn fields(&self) -> FieldTable {
        FieldTable::new(ElementLayer::FIELDS, PRIMITIVE_FIELDS)
    }

    fn walk_children<'t>(&'t self, walker: &mut Walker<'_, 't>) {
        walker.layer(&self.base);
        walker.value("value", self.value.as_ref().map(PrimitiveScalar::primitive_value));
    }

    fn has_children(&self) -> bool {
        self.base.has_children()
    }

    fn is_primitive(&self) -> bool {
        true
    }

    fn primitive_value(&self) -> Option<PrimitiveValue<'_>> {
        self.value.as_ref().map(PrimitiveScalar::primitive_value)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Element for Primitive<V, K> {
    fn element_layer(&self) -> &ElementLayer {
        &self.base
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> PartialEq for Primitive<V, K> {
    fn eq(&self, other: &Self) -> bool {
        crate::visitor::equality::structurally_equal(self, other)
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Eq for Primitive<V, K> {}

impl<V: PrimitiveScalar, K: PrimitiveKind> Hash for Primitive<V, K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        crate::visitor::equality::structural_hash(self, state)
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> serde::Serialize for Primitive<V, K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::visitor::json::serialize_node(self, serializer)
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> IntoEvaluationResult for Primitive<V, K> {
    fn to_evaluation_result(&self) -> EvaluationResult {
        crate::visitor::evaluation::to_evaluation_result(self)
    }
}

/// Builder for a primitive carrying an `id` or extensions.
pub struct PrimitiveBuilder<V, K> {
    base: ElementLayerBuilder,
    value: Option<V>,
    kind: PhantomData<fn() -> K>,
}

impl<V: PrimitiveScalar, K: PrimitiveKind> PrimitiveBuilder<V, K> {
    /// Sets the value; `None` clears it.
    pub fn value(mut self, value: impl Into<Option<V>>) -> Self {
        self.value = value.into();
        self
    }

    /// Fails when the primitive has neither a value nor an extension.
    pub fn build(self) -> Result<Primitive<V, K>, BuildError> {
        let mut violations = Violations::new(K::TYPE_NAME);
        let base = ElementLayer::freeze(self.base, &mut violations);
        let node = Primitive {
            base,
            value: self.value,
            kind: PhantomData,
        };
        violations.require_value_or_children(&node);
        violations.finish(node)
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Default for PrimitiveBuilder<V, K> {
    fn default() -> Self {
        Self {
            base: ElementLayerBuilder::default(),
            value: None,
            kind: PhantomData,
        }
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> Clone for PrimitiveBuilder<V, K> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            value: self.value.clone(),
            kind: PhantomData,
        }
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> fmt::Debug for PrimitiveBuilder<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveBuilder")
            .field("type", &K::TYPE_NAME)
            .field("base", &self.base)
            .field("value", &self.value)
            .finish()
    }
}

impl<V: PrimitiveScalar, K: PrimitiveKind> ElementBuilder for PrimitiveBuilder<V, K> {
    fn element_layer_mut(&mut self) -> &mut ElementLayerBuilder {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Extension;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_keeps_scale_in_json() {
        let d = Decimal::of(dec!(1.50));
        assert_eq!(d.to_string(), "1.50");
        assert_eq!(serde_json::to_string(&d).unwrap(), "1.50");
    }

    #[test]
    fn primitive_needs_value_or_extension() {
        let err = FhirString::builder().id("x").build().unwrap_err();
        assert!(err.to_string().contains("neither a value nor children"));

        let ext = Extension::builder()
            .url("http://example.org/reason")
            .value(Code::of("unknown"))
            .build()
            .unwrap();
        let masked = FhirString::builder().add_extension(ext).build().unwrap();
        assert!(masked.value().is_none());
        assert_eq!(masked.extension().len(), 1);
    }

    #[test]
    fn text_primitives_of_different_kinds_differ_by_type() {
        let code = Code::of("a");
        let uri = Uri::of("a");
        assert_eq!(code.type_name(), "code");
        assert_eq!(uri.type_name(), "uri");
        assert_eq!(code.primitive_value(), uri.primitive_value());
    }
}
