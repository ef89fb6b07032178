//! Structural equality and hashing.
//!
//! Two nodes are equal when their traversals produce the same event sequence: same
//! populated fields, same list lengths and order, same concrete types in choice slots and
//! the same canonical primitive text. Decimal scale is significant (`1.0` differs from
//! `1.00`), matching how FHIR compares decimals lexically.
//!
//! The hash is recomputed on every call by streaming the same events into the hasher;
//! nothing is cached on the node.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use super::{walk, Visitor};
use crate::node::Node;
use crate::primitive::PrimitiveValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Event<'t> {
    Enter {
        name: &'static str,
        index: Option<usize>,
        type_name: &'static str,
    },
    Exit,
    ListStart(&'static str, usize),
    ListEnd,
    Value {
        name: &'static str,
        kind: u8,
        text: Cow<'t, str>,
    },
}

fn value_kind(value: &PrimitiveValue<'_>) -> u8 {
    match value {
        PrimitiveValue::Boolean(_) => 0,
        PrimitiveValue::Integer(_) => 1,
        PrimitiveValue::Decimal(_) => 2,
        PrimitiveValue::Text(_) => 3,
        PrimitiveValue::Date(_) => 4,
        PrimitiveValue::DateTime(_) => 5,
    }
}

/// Feeds traversal events to a sink; absent fields produce no event since both sides of a
/// comparison share the same field table once their type names match.
struct EventStream<F> {
    sink: F,
}

impl<'t, F: FnMut(Event<'t>)> Visitor<'t> for EventStream<F> {
    fn visit_start(&mut self, name: &'static str, index: Option<usize>, node: &'t dyn Node) {
        (self.sink)(Event::Enter {
            name,
            index,
            type_name: node.type_name(),
        });
    }

    fn visit_end(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {
        (self.sink)(Event::Exit);
    }

    fn visit_list_start(&mut self, name: &'static str, len: usize) {
        (self.sink)(Event::ListStart(name, len));
    }

    fn visit_list_end(&mut self, _name: &'static str, _len: usize) {
        (self.sink)(Event::ListEnd);
    }

    fn visit_value(&mut self, name: &'static str, value: PrimitiveValue<'t>) {
        (self.sink)(Event::Value {
            name,
            kind: value_kind(&value),
            text: value.canonical(),
        });
    }
}

fn events<'t>(node: &'t dyn Node) -> Vec<Event<'t>> {
    let mut out = Vec::new();
    walk(node, &mut EventStream { sink: |e: Event<'t>| out.push(e) });
    out
}

/// Visitor-based structural equality of two trees.
pub fn structurally_equal(a: &dyn Node, b: &dyn Node) -> bool {
    if a.type_name() != b.type_name() {
        return false;
    }
    events(a) == events(b)
}

/// Feeds the structure of `node` into `state`; consistent with [`structurally_equal`].
pub fn structural_hash<H: Hasher>(node: &dyn Node, state: &mut H) {
    walk(node, &mut EventStream { sink: |e: Event<'_>| e.hash(state) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{Code, Decimal, Uri};
    use rust_decimal_macros::dec;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(node: &dyn Node) -> u64 {
        let mut hasher = DefaultHasher::new();
        structural_hash(node, &mut hasher);
        hasher.finish()
    }

    #[test]
    fn same_text_different_type_is_unequal() {
        assert!(!structurally_equal(&Code::of("a"), &Uri::of("a")));
    }

    #[test]
    fn decimal_scale_is_significant() {
        let a = Decimal::of(dec!(1.0));
        let b = Decimal::of(dec!(1.00));
        assert_ne!(a, b);
        assert_eq!(a, Decimal::of(dec!(1.0)));
        assert_eq!(hash_of(&a), hash_of(&Decimal::of(dec!(1.0))));
    }
}
