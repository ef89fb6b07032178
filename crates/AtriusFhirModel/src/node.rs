//! The node contract shared by every schema type.

use std::any::Any;
use std::fmt;

use crate::primitive::PrimitiveValue;
use crate::support::Invariant;
use crate::visitor::Walker;

/// Upper cardinality of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Max {
    One,
    Many,
}

/// What a field slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain string leaf (element ids, extension urls, xhtml).
    Scalar,
    /// A primitive or complex node.
    Node,
    /// A choice field with its closed set of admissible FHIR type names.
    Choice(&'static [&'static str]),
}

/// Static description of one field of a node type.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    pub name: &'static str,
    pub min: u32,
    pub max: Max,
    pub kind: FieldKind,
    /// Invariants declared on this field's path.
    pub constraints: &'static [Invariant],
}

impl FieldInfo {
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    pub fn is_repeating(&self) -> bool {
        self.max == Max::Many
    }

    pub fn admissible_types(&self) -> Option<&'static [&'static str]> {
        match self.kind {
            FieldKind::Choice(types) => Some(types),
            _ => None,
        }
    }
}

/// Fields of a node in traversal order: the layer's fields, then the type's own.
#[derive(Debug, Clone, Copy)]
pub struct FieldTable {
    inherited: &'static [FieldInfo],
    own: &'static [FieldInfo],
}

impl FieldTable {
    pub const fn new(inherited: &'static [FieldInfo], own: &'static [FieldInfo]) -> Self {
        Self { inherited, own }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static FieldInfo> + use<> {
        self.inherited.iter().chain(self.own.iter())
    }

    pub fn get(&self, name: &str) -> Option<&'static FieldInfo> {
        self.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|f| f.name).collect()
    }

    pub fn len(&self) -> usize {
        self.inherited.len() + self.own.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// FHIR type name known at compile time; used to compute admissible choice sets.
pub trait FhirType {
    const TYPE_NAME: &'static str;
}

/// An immutable node of a FHIR tree.
///
/// Implemented by `#[derive(FhirNode)]` structs, by `#[derive(FhirChoice)]` unions (which
/// delegate to the populated variant) and by the primitive wrappers.
pub trait Node: Any + fmt::Debug + Send + Sync {
    /// FHIR type name, e.g. `ConceptMap`, `Coding`, `code`.
    fn type_name(&self) -> &'static str;

    fn fields(&self) -> FieldTable;

    /// Invariants declared on the type itself.
    fn constraints(&self) -> &'static [Invariant] {
        &[]
    }

    /// Hands every field to `walker` in schema order.
    fn walk_children<'t>(&'t self, walker: &mut Walker<'_, 't>);

    /// Whether any child (extension or populated field) is present. A primitive's value
    /// is not a child.
    fn has_children(&self) -> bool;

    fn is_resource(&self) -> bool {
        false
    }

    fn is_primitive(&self) -> bool {
        false
    }

    fn primitive_value(&self) -> Option<PrimitiveValue<'_>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Node {
    /// Concrete node behind a trait object; unions resolve to their populated variant.
    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Node>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
