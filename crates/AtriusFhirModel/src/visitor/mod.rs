//! Depth-first traversal of a node tree in schema field order.
//!
//! Field order is defined once per type, by the field order of its struct (layer fields
//! first), and every consumer in this module sees the same event sequence:
//!
//! ```text
//! pre_visit(node)              -> false skips the node entirely
//! visit_start(name, index, node)
//! visit(name, index, node)     -> false skips the children but still ends the node
//!     visit_value / visit_absent / visit_list_start .. visit_list_end / nested nodes
//! visit_end(name, index, node)
//! post_visit(node)
//! ```
//!
//! List items carry their position as `index`, so a visitor can rebuild paths such as
//! `group[2].element[0].target[1].code` from the callbacks alone. An empty list is
//! reported through `visit_absent` exactly like an unset singular field.

pub mod equality;
pub mod evaluation;
pub mod json;
pub mod path;

use crate::layer::Layer;
use crate::node::Node;
use crate::primitive::PrimitiveValue;

/// Callbacks of a traversal. Every hook has a no-op default.
pub trait Visitor<'t> {
    /// About to enter `node`; returning `false` skips it without any further callback.
    fn pre_visit(&mut self, _node: &'t dyn Node) -> bool {
        true
    }

    fn visit_start(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {}

    /// Returning `false` declines descent into the node's children.
    fn visit(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) -> bool {
        true
    }

    fn visit_end(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {}

    /// Post-order hook, after `visit_end`.
    fn post_visit(&mut self, _node: &'t dyn Node) {}

    /// A non-empty list field begins; its items follow with indices `0..len`.
    fn visit_list_start(&mut self, _name: &'static str, _len: usize) {}

    fn visit_list_end(&mut self, _name: &'static str, _len: usize) {}

    /// A populated scalar leaf: a primitive's `value`, an element `id`, an extension `url`.
    fn visit_value(&mut self, _name: &'static str, _value: PrimitiveValue<'t>) {}

    /// A field that is unset, or a list that is empty.
    fn visit_absent(&mut self, _name: &'static str) {}
}

/// Traverses `node` as the field `name` (at `index` within a list).
pub fn accept<'t>(
    node: &'t dyn Node,
    name: &'static str,
    index: Option<usize>,
    visitor: &mut dyn Visitor<'t>,
) {
    if !visitor.pre_visit(node) {
        return;
    }
    visitor.visit_start(name, index, node);
    if visitor.visit(name, index, node) {
        node.walk_children(&mut Walker::new(visitor));
    }
    visitor.visit_end(name, index, node);
    visitor.post_visit(node);
}

/// Traverses a whole tree; the root is named after its type.
pub fn walk<'t>(root: &'t dyn Node, visitor: &mut dyn Visitor<'t>) {
    accept(root, root.type_name(), None, visitor);
}

/// Handed to [`Node::walk_children`]; turns field values into visitor callbacks.
pub struct Walker<'w, 't> {
    visitor: &'w mut dyn Visitor<'t>,
}

impl<'w, 't> Walker<'w, 't> {
    pub fn new(visitor: &'w mut dyn Visitor<'t>) -> Self {
        Self { visitor }
    }

    pub fn node<N: Node>(&mut self, name: &'static str, node: &'t N) {
        accept(node, name, None, &mut *self.visitor);
    }

    pub fn optional<N: Node>(&mut self, name: &'static str, node: Option<&'t N>) {
        match node {
            Some(node) => accept(node, name, None, &mut *self.visitor),
            None => self.visitor.visit_absent(name),
        }
    }

    pub fn list<N: Node>(&mut self, name: &'static str, items: &'t [N]) {
        if items.is_empty() {
            self.visitor.visit_absent(name);
            return;
        }
        self.visitor.visit_list_start(name, items.len());
        for (index, item) in items.iter().enumerate() {
            accept(item, name, Some(index), &mut *self.visitor);
        }
        self.visitor.visit_list_end(name, items.len());
    }

    /// A plain string leaf.
    pub fn scalar(&mut self, name: &'static str, value: Option<&'t str>) {
        self.value(name, value.map(PrimitiveValue::Text));
    }

    pub fn value(&mut self, name: &'static str, value: Option<PrimitiveValue<'t>>) {
        match value {
            Some(value) => self.visitor.visit_value(name, value),
            None => self.visitor.visit_absent(name),
        }
    }

    /// Walks the fields of a capability layer in place.
    pub fn layer<L: Layer>(&mut self, layer: &'t L) {
        layer.walk(self);
    }
}

/// One direct child of a node, as reported by a non-descending walk.
pub(crate) enum Child<'t> {
    Node {
        name: &'static str,
        index: Option<usize>,
        node: &'t dyn Node,
    },
    Value {
        name: &'static str,
        value: PrimitiveValue<'t>,
    },
}

struct DirectChildren<'t>(Vec<Child<'t>>);

impl<'t> Visitor<'t> for DirectChildren<'t> {
    fn visit_start(&mut self, name: &'static str, index: Option<usize>, node: &'t dyn Node) {
        self.0.push(Child::Node { name, index, node });
    }

    fn visit(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) -> bool {
        false
    }

    fn visit_value(&mut self, name: &'static str, value: PrimitiveValue<'t>) {
        self.0.push(Child::Value { name, value });
    }
}

/// Populated children of `node` in field order, without descending further.
pub(crate) fn children<'t>(node: &'t dyn Node) -> Vec<Child<'t>> {
    let mut collector = DirectChildren(Vec::new());
    node.walk_children(&mut Walker::new(&mut collector));
    collector.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{PropertyType, PropertyTypeCode};
    use crate::primitive::Code;
    use crate::r5::concept_map::ConceptMapProperty;

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl<'t> Visitor<'t> for Trace {
        fn visit_start(&mut self, name: &'static str, index: Option<usize>, _node: &'t dyn Node) {
            self.0.push(format!("start {name} {index:?}"));
        }

        fn visit(&mut self, name: &'static str, _index: Option<usize>, _node: &'t dyn Node) -> bool {
            // do not descend into primitives
            name == "ConceptMap.property"
        }

        fn visit_end(&mut self, name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {
            self.0.push(format!("end {name}"));
        }

        fn visit_absent(&mut self, name: &'static str) {
            self.0.push(format!("absent {name}"));
        }
    }

    #[test]
    fn declined_descent_still_ends_the_node() {
        let property = ConceptMapProperty::builder()
            .code(Code::of("display"))
            .r#type(PropertyType::of(PropertyTypeCode::Coding))
            .build()
            .unwrap();
        let mut trace = Trace::default();
        walk(&property, &mut trace);
        assert_eq!(trace.0.first().map(String::as_str), Some("start ConceptMap.property None"));
        assert!(trace.0.contains(&"start code None".to_string()));
        assert!(trace.0.contains(&"end code".to_string()));
        assert!(trace.0.contains(&"absent uri".to_string()));
        assert_eq!(trace.0.last().map(String::as_str), Some("end ConceptMap.property"));
    }
}
