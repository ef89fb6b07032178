//! Declarative constraint metadata and the engine-facing evaluation contract.
//!
//! Node types declare [`Invariant`]s; a document validator walks an assembled document
//! and, for every node carrying invariants, asks an engine whether each one holds. A
//! failed or unevaluable invariant becomes a [`ValidationIssue`].

use serde::Serialize;

use crate::evaluation_error::EvaluationError;
use crate::evaluation_result::EvaluationResult;

/// How binding an invariant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintLevel {
    /// Must hold; a violation makes the document non-conformant.
    Rule,
    /// Should hold; a violation is reported but never blocks acceptance.
    Warning,
}

impl ConstraintLevel {
    pub fn is_blocking(self) -> bool {
        matches!(self, ConstraintLevel::Rule)
    }
}

/// A named invariant attached to a node type or to one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invariant {
    /// Stable identifier, e.g. `exs-6`.
    pub key: &'static str,
    pub severity: ConstraintLevel,
    /// Natural-language statement of the rule.
    pub human: &'static str,
    /// Machine-evaluable expression over the focus node.
    pub expr: &'static str,
    /// Declared location, e.g. `ExampleScenario.actor`.
    pub path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub key: &'static str,
    pub severity: ConstraintLevel,
    pub path: &'static str,        // declared FHIR path (e.g. "Parameters.parameter")
    pub instance_path: String,     // concrete instance path (e.g. "Parameters.parameter[0]")
    pub expression: &'static str,
    pub message: &'static str,
    /// Set when the engine could not evaluate the expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl ValidationIssue {
    pub fn violated(invariant: &Invariant, instance_path: impl Into<String>) -> Self {
        Self {
            key: invariant.key,
            severity: invariant.severity,
            path: invariant.path,
            instance_path: instance_path.into(),
            expression: invariant.expr,
            message: invariant.human,
            diagnostics: None,
        }
    }

    pub fn unevaluable(
        invariant: &Invariant,
        instance_path: impl Into<String>,
        error: &EvaluationError,
    ) -> Self {
        Self {
            diagnostics: Some(error.to_string()),
            ..Self::violated(invariant, instance_path)
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

/// Environment variables available to an expression besides its focus.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionEnvironment {
    /// `%resource`: the resource that contains the focus.
    pub resource: EvaluationResult,
    /// `%rootResource`: the outermost resource of the document.
    pub root_resource: EvaluationResult,
}

/// Something that can evaluate a boolean FHIRPath expression over a focus node.
pub trait FhirPathEngine {
    fn eval_bool(
        &self,
        focus: &EvaluationResult,
        env: &ExpressionEnvironment,
        expr: &str,
    ) -> Result<bool, EvaluationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTOR_KEYS_UNIQUE: Invariant = Invariant {
        key: "exs-6",
        severity: ConstraintLevel::Rule,
        human: "Actor keys must be unique",
        expr: "actor.key.count() = actor.key.distinct().count()",
        path: "ExampleScenario",
    };

    #[test]
    fn issue_carries_invariant_metadata() {
        let issue = ValidationIssue::violated(&ACTOR_KEYS_UNIQUE, "ExampleScenario");
        assert_eq!(issue.key, "exs-6");
        assert!(issue.is_blocking());
        assert!(issue.diagnostics.is_none());
    }

    #[test]
    fn unevaluable_issue_keeps_error_text() {
        let error = EvaluationError::UnsupportedFunction("distinct".to_string());
        let issue = ValidationIssue::unevaluable(&ACTOR_KEYS_UNIQUE, "ExampleScenario", &error);
        assert_eq!(issue.diagnostics.as_deref(), Some("Unsupported Function: distinct"));
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_value(ConstraintLevel::Warning).unwrap_or_default();
        assert_eq!(json, serde_json::json!("warning"));
    }
}
