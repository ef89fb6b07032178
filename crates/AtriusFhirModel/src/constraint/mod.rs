//! Whole-document constraint checking.
//!
//! `build()` only checks what a single node can see. The invariants declared with
//! `#[fhir_invariant]` (on a type, or on one of its fields) are checked here instead,
//! once the document is assembled: [`DocumentValidator`] walks the tree, and for every
//! node carrying invariants hands a [`ConstraintContext`] to a [`ConstraintEvaluator`].
//!
//! Two evaluators ship with the crate. [`FhirPathEvaluator`] runs each invariant's
//! expression on any [`FhirPathEngine`]; [`rules::RuleSet`] evaluates invariants natively,
//! keyed by id (see [`rules::standard_rules`]).
//!
//! ```rust
//! use atrius_fhir_model::constraint::{rules::standard_rules, DocumentValidator};
//! use atrius_fhir_model::r5::Parameters;
//!
//! let params = Parameters::builder().build().unwrap();
//! let rules = standard_rules();
//! let report = DocumentValidator::new(&rules).validate(&params);
//! assert!(report.is_conformant());
//! ```

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::node::Node;
use crate::support::{
    ConstraintLevel, EvaluationError, ExpressionEnvironment, FhirPathEngine, Invariant,
    ValidationIssue,
};
use crate::visitor::evaluation::to_evaluation_result;
use crate::visitor::path::{NodePath, PathTracker};
use crate::visitor::{walk, Visitor};

/// Everything an evaluator may look at for one invariant on one node.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'t> {
    pub invariant: &'t Invariant,
    /// The node the invariant is declared on (`%context`).
    pub focus: &'t dyn Node,
    /// Nearest resource enclosing the focus, the focus itself when it is a resource
    /// (`%resource`).
    pub resource: &'t dyn Node,
    /// Document root (`%rootResource`).
    pub root: &'t dyn Node,
    pub path: &'t NodePath,
}

impl<'t> ConstraintContext<'t> {
    /// The focus as a concrete node type.
    pub fn focus_as<T: Node>(&self) -> Option<&'t T> {
        self.focus.downcast_ref::<T>()
    }

    pub fn resource_as<T: Node>(&self) -> Option<&'t T> {
        self.resource.downcast_ref::<T>()
    }
}

/// Decides whether an invariant holds for a focus node.
pub trait ConstraintEvaluator {
    /// Invariants an evaluator does not support are counted in the report instead of
    /// being evaluated.
    fn supports(&self, _invariant: &Invariant) -> bool {
        true
    }

    fn evaluate(&self, ctx: &ConstraintContext<'_>) -> Result<bool, EvaluationError>;
}

/// Evaluates invariant expressions with an external FHIRPath engine.
///
/// The focus, `%resource` and `%rootResource` are converted with
/// [`to_evaluation_result`] for every invocation.
#[derive(Debug, Clone)]
pub struct FhirPathEvaluator<E> {
    engine: E,
}

impl<E: FhirPathEngine> FhirPathEvaluator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: FhirPathEngine> ConstraintEvaluator for FhirPathEvaluator<E> {
    fn evaluate(&self, ctx: &ConstraintContext<'_>) -> Result<bool, EvaluationError> {
        let focus = to_evaluation_result(ctx.focus);
        let env = ExpressionEnvironment {
            resource: to_evaluation_result(ctx.resource),
            root_resource: to_evaluation_result(ctx.root),
        };
        self.engine.eval_bool(&focus, &env, ctx.invariant.expr)
    }
}

/// Knobs for a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Evaluate `warning` invariants too.
    pub include_warnings: bool,
    /// Stop once this many issues were reported.
    pub max_issues: Option<usize>,
    /// Invariant keys never evaluated.
    pub ignore: Vec<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            include_warnings: true,
            max_issues: None,
            ignore: Vec::new(),
        }
    }
}

impl ValidationOptions {
    fn skips(&self, invariant: &Invariant) -> bool {
        (!self.include_warnings && invariant.severity == ConstraintLevel::Warning)
            || self.ignore.iter().any(|key| key == invariant.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    /// Number of (invariant, node) pairs handed to the evaluator.
    pub evaluated: usize,
    /// Keys of invariants the evaluator declined, each listed once.
    pub unsupported: Vec<&'static str>,
    /// Set when `max_issues` cut the run short.
    pub truncated: bool,
}

impl ValidationReport {
    /// No `rule` invariant failed or was left unevaluable.
    pub fn is_conformant(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_blocking)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_blocking())
    }

    pub fn issues_for<'r>(&'r self, key: &'r str) -> impl Iterator<Item = &'r ValidationIssue> {
        self.issues.iter().filter(move |i| i.key == key)
    }

    pub fn has_issue(&self, key: &str) -> bool {
        self.issues_for(key).next().is_some()
    }
}

/// Runs every declared invariant of a document through one evaluator.
pub struct DocumentValidator<'e> {
    evaluator: &'e dyn ConstraintEvaluator,
    options: ValidationOptions,
}

impl<'e> DocumentValidator<'e> {
    pub fn new(evaluator: &'e dyn ConstraintEvaluator) -> Self {
        Self {
            evaluator,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Walks `root` in traversal order. Never fails: evaluator errors become issues.
    pub fn validate(&self, root: &dyn Node) -> ValidationReport {
        let mut pass = Pass {
            validator: self,
            root,
            tracker: PathTracker::default(),
            frames: Vec::new(),
            resources: Vec::new(),
            report: ValidationReport::default(),
        };
        walk(root, &mut pass);
        let report = pass.report;
        debug!(
            "validated {}: {} constraints evaluated, {} issues, {} unsupported",
            root.type_name(),
            report.evaluated,
            report.issues.len(),
            report.unsupported.len()
        );
        report
    }
}

struct Pass<'v, 't> {
    validator: &'v DocumentValidator<'v>,
    root: &'t dyn Node,
    tracker: PathTracker,
    frames: Vec<&'t dyn Node>,
    resources: Vec<&'t dyn Node>,
    report: ValidationReport,
}

impl<'t> Pass<'_, 't> {
    fn check(&mut self, invariant: &'static Invariant, focus: &'t dyn Node) {
        let options = &self.validator.options;
        if self.report.truncated || options.skips(invariant) {
            return;
        }
        let evaluator = self.validator.evaluator;
        if !evaluator.supports(invariant) {
            trace!("{} not supported by evaluator", invariant.key);
            if !self.report.unsupported.contains(&invariant.key) {
                self.report.unsupported.push(invariant.key);
            }
            return;
        }

        let path = self.tracker.current();
        let ctx = ConstraintContext {
            invariant,
            focus,
            resource: self.resources.last().copied().unwrap_or(self.root),
            root: self.root,
            path,
        };
        self.report.evaluated += 1;
        let issue = match evaluator.evaluate(&ctx) {
            Ok(true) => {
                trace!("{} holds at {}", invariant.key, path);
                None
            }
            Ok(false) => {
                debug!("{} violated at {}", invariant.key, path);
                Some(ValidationIssue::violated(invariant, path.to_string()))
            }
            Err(e) => {
                warn!("{} could not be evaluated at {}: {}", invariant.key, path, e);
                Some(ValidationIssue::unevaluable(invariant, path.to_string(), &e))
            }
        };
        if let Some(issue) = issue {
            self.report.issues.push(issue);
            if options
                .max_issues
                .is_some_and(|max| self.report.issues.len() >= max)
            {
                self.report.truncated = true;
            }
        }
    }
}

impl<'t> Visitor<'t> for Pass<'_, 't> {
    fn visit_start(&mut self, name: &'static str, index: Option<usize>, node: &'t dyn Node) {
        self.tracker.enter(name, index);
        if node.is_resource() {
            self.resources.push(node);
        }
        // field invariants first, they are declared on the parent
        if let Some(field) = self.frames.last().and_then(|parent| parent.fields().get(name)) {
            for invariant in field.constraints {
                self.check(invariant, node);
            }
        }
        for invariant in node.constraints() {
            self.check(invariant, node);
        }
        self.frames.push(node);
    }

    fn visit_end(&mut self, _name: &'static str, _index: Option<usize>, node: &'t dyn Node) {
        self.frames.pop();
        if node.is_resource() {
            self.resources.pop();
        }
        self.tracker.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::FhirString;
    use crate::r5::parameters::{Parameters, ParametersParameter};
    use crate::support::EvaluationResult;

    struct Always(Result<bool, EvaluationError>);

    impl ConstraintEvaluator for Always {
        fn evaluate(&self, _ctx: &ConstraintContext<'_>) -> Result<bool, EvaluationError> {
            self.0.clone()
        }
    }

    fn document() -> Parameters {
        let part = |name: &str| {
            ParametersParameter::builder()
                .name(FhirString::of(name))
                .value(FhirString::of("x"))
                .build()
                .unwrap()
        };
        let group = ParametersParameter::builder()
            .name(FhirString::of("group"))
            .add_part(part("a"))
            .add_part(part("b"))
            .build()
            .unwrap();
        Parameters::builder().add_parameter(group).build().unwrap()
    }

    #[test]
    fn issues_carry_instance_paths() {
        let failing = Always(Ok(false));
        let report = DocumentValidator::new(&failing).validate(&document());
        let paths: Vec<&str> = report.issues_for("inv-1").map(|i| i.instance_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Parameters.parameter[0]",
                "Parameters.parameter[0].part[0]",
                "Parameters.parameter[0].part[1]",
            ]
        );
        assert!(!report.is_conformant());
    }

    #[test]
    fn evaluator_errors_are_reported_not_raised() {
        let broken = Always(Err(EvaluationError::UnsupportedFunction("xor".to_string())));
        let report = DocumentValidator::new(&broken).validate(&document());
        assert_eq!(report.issues.len(), 3);
        assert!(report.issues.iter().all(|i| i.diagnostics.is_some()));
    }

    #[test]
    fn options_limit_the_run() {
        let failing = Always(Ok(false));
        let capped = DocumentValidator::new(&failing)
            .with_options(ValidationOptions {
                max_issues: Some(1),
                ..ValidationOptions::default()
            })
            .validate(&document());
        assert_eq!(capped.issues.len(), 1);
        assert!(capped.truncated);

        let options: ValidationOptions = serde_json::from_str(r#"{ "ignore": ["inv-1"] }"#).unwrap();
        assert!(options.include_warnings);
        let report = DocumentValidator::new(&failing).with_options(options).validate(&document());
        assert!(report.issues.is_empty());
        assert_eq!(report.evaluated, 0);
    }

    struct Recording;

    impl FhirPathEngine for Recording {
        fn eval_bool(
            &self,
            focus: &EvaluationResult,
            env: &ExpressionEnvironment,
            expr: &str,
        ) -> Result<bool, EvaluationError> {
            assert!(expr.contains("part.exists()"));
            assert_eq!(
                env.resource.get("resourceType"),
                Some(&EvaluationResult::string("Parameters".to_string()))
            );
            Ok(focus.get("name").is_some())
        }
    }

    #[test]
    fn fhirpath_evaluator_passes_converted_nodes() {
        let evaluator = FhirPathEvaluator::new(Recording);
        let report = DocumentValidator::new(&evaluator).validate(&document());
        assert_eq!(report.evaluated, 3);
        assert!(report.is_conformant());
    }
}
