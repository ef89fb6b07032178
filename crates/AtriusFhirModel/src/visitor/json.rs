//! FHIR JSON rendering.
//!
//! Choice fields are keyed `<base><Type>` (`valueCoding`, `sourceScopeUri`), primitives
//! write their value under the field name and their `id`/`extension` under a `_<name>`
//! companion, and resources carry `resourceType`. For repeating primitives the value and
//! companion arrays stay index aligned, with `null` filling the gaps; a companion array
//! that would be all `null` is dropped.

use serde_json::{Map, Value};

use super::{children, Child};
use crate::choice::choice_field_name;
use crate::node::{FieldKind, Node};

fn key_for(parent: &dyn Node, name: &'static str, child: &dyn Node) -> String {
    match parent.fields().get(name).map(|f| f.kind) {
        Some(FieldKind::Choice(_)) => choice_field_name(name, child.type_name()),
        _ => name.to_string(),
    }
}

fn push_item(out: &mut Map<String, Value>, key: &str, item: Value) {
    match out.get_mut(key) {
        Some(Value::Array(items)) => items.push(item),
        _ => {
            out.insert(key.to_string(), Value::Array(vec![item]));
        }
    }
}

/// `id` and `extension` of a primitive, or `None` when it has neither.
fn companion(primitive: &dyn Node) -> Option<Value> {
    let mut map = object(primitive);
    map.remove("value");
    (!map.is_empty()).then_some(Value::Object(map))
}

fn object(node: &dyn Node) -> Map<String, Value> {
    let mut out = Map::new();
    if node.is_resource() {
        out.insert("resourceType".to_string(), Value::String(node.type_name().to_string()));
    }
    let mut companions: Vec<String> = Vec::new();
    for child in children(node) {
        match child {
            Child::Value { name, value } => {
                out.insert(name.to_string(), value.to_json());
            }
            Child::Node { name, index, node: child } => {
                let key = key_for(node, name, child);
                if !child.is_primitive() {
                    let value = Value::Object(object(child));
                    match index {
                        Some(_) => push_item(&mut out, &key, value),
                        None => {
                            out.insert(key, value);
                        }
                    }
                    continue;
                }

                let value = child.primitive_value().map(|v| v.to_json());
                let extra = companion(child);
                let extra_key = format!("_{key}");
                match index {
                    Some(_) => {
                        push_item(&mut out, &key, value.unwrap_or(Value::Null));
                        push_item(&mut out, &extra_key, extra.unwrap_or(Value::Null));
                        if !companions.contains(&extra_key) {
                            companions.push(extra_key);
                        }
                    }
                    None => {
                        if let Some(value) = value {
                            out.insert(key, value);
                        }
                        if let Some(extra) = extra {
                            out.insert(extra_key, extra);
                        }
                    }
                }
            }
        }
    }
    for key in companions {
        let all_null = matches!(out.get(&key), Some(Value::Array(items)) if items.iter().all(Value::is_null));
        if all_null {
            out.remove(&key);
        }
    }
    out
}

/// JSON form of a node. A primitive renders as its bare value (`null` when it has none).
pub fn to_json(node: &dyn Node) -> Value {
    if node.is_primitive() {
        return node.primitive_value().map_or(Value::Null, |v| v.to_json());
    }
    Value::Object(object(node))
}

pub fn to_json_string(node: &dyn Node) -> Result<String, serde_json::Error> {
    serde_json::to_string(&to_json(node))
}

pub fn to_json_string_pretty(node: &dyn Node) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_json(node))
}

/// `serde::Serialize` body shared by every node type.
pub fn serialize_node<S: serde::Serializer>(node: &dyn Node, serializer: S) -> Result<S::Ok, S::Error> {
    serde::Serialize::serialize(&to_json(node), serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Coding, Extension, Meta};
    use crate::layer::ElementBuilder;
    use crate::primitive::{Canonical, Code, Uri};
    use serde_json::json;

    #[test]
    fn primitive_metadata_goes_to_companion() {
        let ext = Extension::builder()
            .url("http://example.org/note")
            .value(Code::of("checked"))
            .build()
            .unwrap();
        let coding = Coding::builder()
            .system(Uri::of("http://loinc.org"))
            .code(Code::builder().value("1234-5".to_string()).id("c1").build().unwrap())
            .display(crate::primitive::FhirString::builder().add_extension(ext).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(
            to_json(&coding),
            json!({
                "system": "http://loinc.org",
                "code": "1234-5",
                "_code": { "id": "c1" },
                "_display": {
                    "extension": [{ "url": "http://example.org/note", "valueCode": "checked" }]
                }
            })
        );
    }

    #[test]
    fn repeating_primitives_keep_companions_aligned() {
        let tagged = Canonical::builder()
            .value("http://example.org/b".to_string())
            .id("p2")
            .build()
            .unwrap();
        let meta = Meta::builder()
            .add_profile(Canonical::of("http://example.org/a"))
            .add_profile(tagged)
            .build()
            .unwrap();
        assert_eq!(
            to_json(&meta),
            json!({
                "profile": ["http://example.org/a", "http://example.org/b"],
                "_profile": [null, { "id": "p2" }]
            })
        );

        let plain = Meta::builder()
            .add_profile(Canonical::of("http://example.org/a"))
            .build()
            .unwrap();
        assert_eq!(to_json(&plain), json!({ "profile": ["http://example.org/a"] }));
    }
}
