//! Build-time validation.
//!
//! A builder's `build()` runs every local check it knows about (required fields, list
//! minimums, null list items, choice admissibility, field exclusivity, value-or-children)
//! against one [`Violations`] accumulator and fails with a single [`BuildError`] naming all
//! of them. Nothing partially built ever escapes.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::choice::{ChoiceValue, DataValue};
use crate::node::Node;
use crate::support::Invariant;

/// One local rule broken by a builder's accumulated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("required field `{field}` is missing")]
    MissingRequired { field: &'static str },

    #[error("field `{field}` needs at least {min} item(s), found {found}")]
    TooFewItems {
        field: &'static str,
        min: usize,
        found: usize,
    },

    #[error("field `{field}` has a null item at index {index}")]
    NullListItem { field: &'static str, index: usize },

    #[error("field `{field}` cannot hold a `{actual}` (admissible: {})", .admissible.join(", "))]
    InadmissibleChoice {
        field: &'static str,
        actual: &'static str,
        admissible: &'static [&'static str],
    },

    #[error("{rule} of [{}] may be present, found [{}]", .fields.join(", "), .present.join(", "))]
    ExclusiveFields {
        fields: &'static [&'static str],
        present: Vec<&'static str>,
        rule: Exclusivity,
    },

    #[error("element has neither a value nor children")]
    NoValueOrChildren,

    #[error("{key}: {message}")]
    Rule { key: &'static str, message: String },
}

impl Violation {
    /// Field names this violation is about; empty for node-level violations.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            Violation::MissingRequired { field }
            | Violation::TooFewItems { field, .. }
            | Violation::NullListItem { field, .. }
            | Violation::InadmissibleChoice { field, .. } => vec![*field],
            Violation::ExclusiveFields {
                fields,
                present,
                rule,
            } => {
                if *rule == Exclusivity::ExactlyOne && present.is_empty() {
                    fields.to_vec()
                } else {
                    present.clone()
                }
            }
            Violation::NoValueOrChildren | Violation::Rule { .. } => Vec::new(),
        }
    }

    pub fn rule_key(&self) -> Option<&'static str> {
        match self {
            Violation::Rule { key, .. } => Some(*key),
            _ => None,
        }
    }
}

/// How many fields of an exclusive group may be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusivity {
    ExactlyOne,
    AtMostOne,
}

impl fmt::Display for Exclusivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Exclusivity::ExactlyOne => "exactly one",
            Exclusivity::AtMostOne => "at most one",
        })
    }
}

/// Every violation found while building one node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct BuildError {
    pub type_name: &'static str,
    pub violations: Vec<Violation>,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot build {}: ", self.type_name)?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl BuildError {
    /// All field names mentioned by the violations, in order of discovery.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for name in self.violations.iter().flat_map(Violation::fields) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    pub fn has_rule(&self, key: &str) -> bool {
        self.violations.iter().any(|v| v.rule_key() == Some(key))
    }
}

/// Accumulator threaded through a `build()`.
#[derive(Debug)]
pub struct Violations {
    type_name: &'static str,
    found: Vec<Violation>,
}

impl Violations {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            found: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.found.push(violation);
    }

    pub fn rule(&mut self, key: &'static str, message: impl Into<String>) {
        self.push(Violation::Rule {
            key,
            message: message.into(),
        });
    }

    /// Records the declared invariant `key` as broken, using its human text.
    pub fn violated(&mut self, declared: &'static [Invariant], key: &'static str) {
        let message = declared
            .iter()
            .find(|inv| inv.key == key)
            .map_or_else(|| key.to_string(), |inv| inv.human.to_string());
        self.rule(key, message);
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn require<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(Violation::MissingRequired { field });
        }
        value
    }

    /// Drops null items (reporting each) and checks the minimum count.
    pub fn list<T>(&mut self, field: &'static str, items: Vec<Option<T>>, min: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Some(item) => out.push(item),
                None => self.push(Violation::NullListItem { field, index }),
            }
        }
        if out.len() < min {
            self.push(Violation::TooFewItems {
                field,
                min,
                found: out.len(),
            });
        }
        out
    }

    /// Narrows a builder's open value to the field's choice type.
    pub fn choice<C: ChoiceValue>(&mut self, field: &'static str, value: Option<DataValue>) -> Option<C> {
        let value = value?;
        match C::from_data_value(value) {
            Ok(choice) => Some(choice),
            Err(rejected) => {
                self.push(Violation::InadmissibleChoice {
                    field,
                    actual: rejected.type_name(),
                    admissible: C::ADMISSIBLE_TYPES,
                });
                None
            }
        }
    }

    pub fn required_choice<C: ChoiceValue>(
        &mut self,
        field: &'static str,
        value: Option<DataValue>,
    ) -> Option<C> {
        match value {
            None => {
                self.push(Violation::MissingRequired { field });
                None
            }
            some => self.choice(field, some),
        }
    }

    pub fn exactly_one(&mut self, fields: &'static [&'static str], present: &[bool]) {
        self.exclusive(fields, present, Exclusivity::ExactlyOne);
    }

    pub fn at_most_one(&mut self, fields: &'static [&'static str], present: &[bool]) {
        self.exclusive(fields, present, Exclusivity::AtMostOne);
    }

    fn exclusive(&mut self, fields: &'static [&'static str], present: &[bool], rule: Exclusivity) {
        let set: Vec<&'static str> = fields
            .iter()
            .zip(present)
            .filter(|(_, p)| **p)
            .map(|(f, _)| *f)
            .collect();
        let broken = match rule {
            Exclusivity::ExactlyOne => set.len() != 1,
            Exclusivity::AtMostOne => set.len() > 1,
        };
        if broken {
            self.push(Violation::ExclusiveFields {
                fields,
                present: set,
                rule,
            });
        }
    }

    pub fn require_value_or_children(&mut self, node: &dyn Node) {
        if node.primitive_value().is_none() && !node.has_children() {
            self.push(Violation::NoValueOrChildren);
        }
    }

    pub fn into_error(self) -> BuildError {
        debug!(
            type_name = self.type_name,
            violations = self.found.len(),
            "build rejected"
        );
        BuildError {
            type_name: self.type_name,
            violations: self.found,
        }
    }

    pub fn finish<T>(self, node: T) -> Result<T, BuildError> {
        if self.found.is_empty() {
            Ok(node)
        } else {
            Err(self.into_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation() {
        let mut v = Violations::new("ConceptMap.group.element");
        v.exactly_one(&["code", "valueSet"], &[true, true]);
        let items: Vec<Option<u8>> = vec![Some(1), None];
        assert_eq!(v.list("target", items, 2), vec![1]);
        let err = v.finish(()).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert_eq!(err.fields(), vec!["code", "valueSet", "target"]);
        assert!(err.to_string().starts_with("cannot build ConceptMap.group.element: "));
    }

    #[test]
    fn at_most_one_allows_none() {
        let mut v = Violations::new("ExampleScenario.process.step");
        v.at_most_one(&["process", "workflow", "operation"], &[false, false, false]);
        assert!(v.is_empty());
        v.exactly_one(&["value", "resource", "part"], &[false, false, false]);
        assert_eq!(
            v.into_error().fields(),
            vec!["value", "resource", "part"]
        );
    }
}
