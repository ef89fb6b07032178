//! Native evaluation of invariants, keyed by invariant id.
//!
//! A [`RuleSet`] answers only for the keys it holds; everything else is reported as
//! unsupported by the validator. [`standard_rules`] covers the invariants of the
//! resources in this crate that need no terminology service (the `memberOf` bindings
//! are left out).

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{ConstraintContext, ConstraintEvaluator};
use crate::codes::{ConceptMapRelationshipCode, PublicationStatus, PublicationStatusCode};
use crate::datatypes::{period_is_ordered, Extension, Period, Quantity};
use crate::layer::Element;
use crate::node::{FhirType, Node};
use crate::primitive::FhirString;
use crate::r5::concept_map::{
    unmapped_violations, ConceptMap, ConceptMapGroupElement, ConceptMapGroupElementTarget,
    ConceptMapGroupElementTargetDependsOn, ConceptMapGroupUnmapped, ConceptMapProperty,
};
use crate::r5::example_scenario::{
    ExampleScenario, ExampleScenarioActor, ExampleScenarioInstance,
    ExampleScenarioInstanceContainedInstance, ExampleScenarioProcess, ExampleScenarioProcessStep,
    ExampleScenarioProcessStepOperation, OTHER_ACTOR,
};
use crate::r5::parameters::ParametersParameter;
use crate::support::{EvaluationError, Invariant};
use crate::visitor::{children, Child};

type Rule = Box<dyn Fn(&ConstraintContext<'_>) -> Result<bool, EvaluationError> + Send + Sync>;

/// Invariant checks written in Rust, keyed by invariant id.
#[derive(Default)]
pub struct RuleSet {
    rules: HashMap<&'static str, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the check for `key`.
    pub fn insert<F>(&mut self, key: &'static str, rule: F)
    where
        F: Fn(&ConstraintContext<'_>) -> Result<bool, EvaluationError> + Send + Sync + 'static,
    {
        self.rules.insert(key, Box::new(rule));
    }

    pub fn with_rule<F>(mut self, key: &'static str, rule: F) -> Self
    where
        F: Fn(&ConstraintContext<'_>) -> Result<bool, EvaluationError> + Send + Sync + 'static,
    {
        self.insert(key, rule);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("RuleSet").field("keys", &keys).finish()
    }
}

impl ConstraintEvaluator for RuleSet {
    fn supports(&self, invariant: &Invariant) -> bool {
        self.contains(invariant.key)
    }

    fn evaluate(&self, ctx: &ConstraintContext<'_>) -> Result<bool, EvaluationError> {
        match self.rules.get(ctx.invariant.key) {
            Some(rule) => rule(ctx),
            None => Err(EvaluationError::UnsupportedConstraint(ctx.invariant.key.to_string())),
        }
    }
}

/// Adapts a check over a concrete focus type; any other focus is a type error.
fn focused<T, F>(check: F) -> impl Fn(&ConstraintContext<'_>) -> Result<bool, EvaluationError> + Send + Sync + 'static
where
    T: Node + FhirType,
    F: Fn(&T, &ConstraintContext<'_>) -> Result<bool, EvaluationError> + Send + Sync + 'static,
{
    move |ctx: &ConstraintContext<'_>| match ctx.focus_as::<T>() {
        Some(node) => check(node, ctx),
        None => Err(EvaluationError::TypeError(format!(
            "{} applies to {}, found {}",
            ctx.invariant.key,
            T::TYPE_NAME,
            ctx.focus.type_name()
        ))),
    }
}

fn enclosing<'t, T: Node + FhirType>(ctx: &ConstraintContext<'t>) -> Result<&'t T, EvaluationError> {
    ctx.resource_as::<T>().ok_or_else(|| {
        EvaluationError::UndefinedVariable(format!(
            "%resource ({} expected, found {})",
            T::TYPE_NAME,
            ctx.resource.type_name()
        ))
    })
}

fn text(value: Option<&FhirString>) -> Option<&str> {
    value.and_then(|v| v.value()).map(String::as_str)
}

/// Text of the primitive child `field` of any node.
fn field_text<'t>(node: &'t dyn Node, field: &str) -> Option<&'t str> {
    children(node).into_iter().find_map(|child| match child {
        Child::Node { name, node, .. } if name == field => {
            node.primitive_value().and_then(|v| v.as_text())
        }
        _ => None,
    })
}

/// `x.count() = x.distinct().count()` over the populated values.
fn all_distinct<'a>(values: impl IntoIterator<Item = Option<&'a String>>) -> bool {
    let mut seen = HashSet::new();
    values.into_iter().flatten().all(|v| seen.insert(v))
}

fn is_published(status: &PublicationStatus) -> bool {
    matches!(
        status.value(),
        Some(PublicationStatusCode::Active | PublicationStatusCode::Retired)
    )
}

/// `^[A-Z]([A-Za-z0-9_]){1,254}$`
fn is_machine_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && (2..=255).contains(&name.chars().count())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `^[^|# ]+$`
fn is_plain_url(url: &str) -> bool {
    !url.is_empty() && !url.contains(['|', '#', ' '])
}

fn exclusive(a: bool, b: bool) -> bool {
    a != b
}

// ConceptMap

fn loose_relationship_is_explained(
    target: &ConceptMapGroupElementTarget,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let map: &ConceptMap = enclosing(ctx)?;
    let loose = matches!(
        target.relationship().value(),
        Some(ConceptMapRelationshipCode::SourceIsBroaderThanTarget | ConceptMapRelationshipCode::NotRelatedTo)
    );
    let draft = map.status().value() == Some(&PublicationStatusCode::Draft);
    Ok(target.comment().is_some() || draft || !loose)
}

fn unmapped_rule(
    unmapped: &ConceptMapGroupUnmapped,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    Ok(!unmapped_violations(&unmapped.draft()).contains(&ctx.invariant.key))
}

fn no_map_has_no_target(
    element: &ConceptMapGroupElement,
    _ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let no_map = element.no_map().and_then(|b| b.value()).copied();
    Ok(no_map != Some(true) || element.target().is_empty())
}

// ExampleScenario

/// Every operation under the scenario's processes, nested processes and alternatives
/// included.
fn operations(scenario: &ExampleScenario) -> Vec<&ExampleScenarioProcessStepOperation> {
    fn process<'a>(p: &'a ExampleScenarioProcess, out: &mut Vec<&'a ExampleScenarioProcessStepOperation>) {
        for s in p.step() {
            step(s, out);
        }
    }

    fn step<'a>(s: &'a ExampleScenarioProcessStep, out: &mut Vec<&'a ExampleScenarioProcessStepOperation>) {
        if let Some(nested) = s.process() {
            process(nested, out);
        }
        if let Some(operation) = s.operation() {
            out.push(operation);
        }
        for alternative in s.alternative() {
            for s in alternative.step() {
                step(s, out);
            }
        }
    }

    let mut out = Vec::new();
    for p in scenario.process() {
        process(p, &mut out);
    }
    out
}

/// Instance references made by requests and responses.
fn exchanged(scenario: &ExampleScenario) -> Vec<&ExampleScenarioInstanceContainedInstance> {
    operations(scenario)
        .into_iter()
        .flat_map(|op| op.request().into_iter().chain(op.response()))
        .collect()
}

fn instances_keyed<'s>(
    scenario: &'s ExampleScenario,
    key: Option<&'s str>,
) -> impl Iterator<Item = &'s ExampleScenarioInstance> {
    scenario
        .instance()
        .iter()
        .filter(move |i| key.is_some() && text(Some(i.key())) == key)
}

fn actor_exists(scenario: &ExampleScenario, key: Option<&str>) -> bool {
    match key {
        None => true,
        Some(OTHER_ACTOR) => true,
        Some(key) => scenario.actor().iter().any(|a| text(Some(a.key())) == Some(key)),
    }
}

fn actor_takes_part(
    actor: &ExampleScenarioActor,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let Some(key) = text(Some(actor.key())) else {
        return Ok(false);
    };
    Ok(operations(scenario)
        .iter()
        .any(|op| text(op.initiator()) == Some(key) || text(op.receiver()) == Some(key)))
}

fn instance_is_exchanged(
    instance: &ExampleScenarioInstance,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let key = text(Some(instance.key()));
    Ok(key.is_some()
        && exchanged(scenario)
            .iter()
            .any(|r| text(Some(r.instance_reference())) == key))
}

fn version_is_exchanged(
    instance: &ExampleScenarioInstance,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    if instance.version().is_empty() {
        return Ok(true);
    }
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let key = text(Some(instance.key()));
    let referenced: HashSet<&str> = exchanged(scenario)
        .into_iter()
        .filter(|r| key.is_some() && text(Some(r.instance_reference())) == key)
        .filter_map(|r| text(r.version_reference()))
        .collect();
    Ok(instance
        .version()
        .iter()
        .filter_map(|v| text(Some(v.key())))
        .any(|k| referenced.contains(k)))
}

const FHIR_TYPES: &str = "http://hl7.org/fhir/fhir-types";

/// Non-FHIR structures need a version; FHIR types are recognised by their code system.
fn foreign_structure_is_versioned(
    instance: &ExampleScenarioInstance,
    _ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let system = instance.structure_type().system().and_then(|s| s.value());
    Ok(system.map(String::as_str) == Some(FHIR_TYPES) || instance.structure_version().is_some())
}

fn reference_resolves(
    contained: &ExampleScenarioInstanceContainedInstance,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let key = text(Some(contained.instance_reference()));
    Ok(instances_keyed(scenario, key).next().is_some())
}

fn versioned_reference_names_version(
    contained: &ExampleScenarioInstanceContainedInstance,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    if contained.version_reference().is_some() {
        return Ok(true);
    }
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let key = text(Some(contained.instance_reference()));
    Ok(instances_keyed(scenario, key).all(|i| i.version().is_empty()))
}

fn version_reference_resolves(
    contained: &ExampleScenarioInstanceContainedInstance,
    ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let Some(version) = text(contained.version_reference()) else {
        return Ok(true);
    };
    let scenario: &ExampleScenario = enclosing(ctx)?;
    let key = text(Some(contained.instance_reference()));
    Ok(instances_keyed(scenario, key)
        .flat_map(|i| i.version())
        .any(|v| text(Some(v.key())) == Some(version)))
}

fn step_action_is_single(
    step: &ExampleScenarioProcessStep,
    _ctx: &ConstraintContext<'_>,
) -> Result<bool, EvaluationError> {
    let (process, workflow, operation) = (
        step.process().is_some(),
        step.workflow().is_some(),
        step.operation().is_some(),
    );
    Ok((!process || (!workflow && !operation)) && (!workflow || !operation))
}

/// Rules for the invariants of ConceptMap, ExampleScenario, Parameters and the common
/// datatypes.
pub fn standard_rules() -> RuleSet {
    RuleSet::new()
        .with_rule("cnl-0", |ctx: &ConstraintContext<'_>| {
            Ok(field_text(ctx.focus, "name").is_none_or(is_machine_name))
        })
        .with_rule("cnl-1", |ctx: &ConstraintContext<'_>| {
            let url = ctx.focus.primitive_value().and_then(|v| v.as_text());
            Ok(url.is_none_or(is_plain_url))
        })
        // ConceptMap
        .with_rule("cmd-1", focused(loose_relationship_is_explained))
        .with_rule("cmd-2", focused(unmapped_rule))
        .with_rule("cmd-3", focused(unmapped_rule))
        .with_rule("cmd-4", focused(no_map_has_no_target))
        .with_rule(
            "cmd-5",
            focused(|e: &ConceptMapGroupElement, _: &ConstraintContext<'_>| {
                Ok(exclusive(e.code().is_some(), e.value_set().is_some()))
            }),
        )
        .with_rule(
            "cmd-6",
            focused(|d: &ConceptMapGroupElementTargetDependsOn, _: &ConstraintContext<'_>| {
                Ok(exclusive(d.value().is_some(), d.value_set().is_some()))
            }),
        )
        .with_rule(
            "cmd-7",
            focused(|t: &ConceptMapGroupElementTarget, _: &ConstraintContext<'_>| {
                Ok(exclusive(t.code().is_some(), t.value_set().is_some()))
            }),
        )
        .with_rule("cmd-8", focused(unmapped_rule))
        .with_rule("cmd-9", focused(unmapped_rule))
        .with_rule("cmd-10", focused(unmapped_rule))
        .with_rule(
            "cmd-11",
            focused(|p: &ConceptMapProperty, _: &ConstraintContext<'_>| {
                let code = p.r#type().value() == Some(&crate::codes::PropertyTypeCode::Code);
                Ok(!code || p.system().is_some())
            }),
        )
        // ExampleScenario
        .with_rule("exs-1", focused(foreign_structure_is_versioned))
        .with_rule(
            "exs-2",
            focused(|i: &ExampleScenarioInstance, _: &ConstraintContext<'_>| {
                Ok(i.content().is_none() || i.version().is_empty())
            }),
        )
        .with_rule(
            "exs-3",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(!is_published(s.status()) || !s.actor().is_empty())
            }),
        )
        .with_rule(
            "exs-4",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(!is_published(s.status()) || !s.process().is_empty())
            }),
        )
        .with_rule(
            "exs-5",
            focused(|p: &ExampleScenarioProcess, ctx: &ConstraintContext<'_>| {
                let scenario: &ExampleScenario = enclosing(ctx)?;
                Ok(!is_published(scenario.status()) || !p.step().is_empty())
            }),
        )
        .with_rule(
            "exs-6",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.actor().iter().map(|a| a.key().value())))
            }),
        )
        .with_rule(
            "exs-7",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.actor().iter().map(|a| a.title().value())))
            }),
        )
        .with_rule(
            "exs-8",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.instance().iter().map(|i| i.key().value())))
            }),
        )
        .with_rule(
            "exs-9",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.instance().iter().map(|i| i.title().value())))
            }),
        )
        .with_rule(
            "exs-10",
            focused(|i: &ExampleScenarioInstance, _: &ConstraintContext<'_>| {
                Ok(all_distinct(i.version().iter().map(|v| v.key().value())))
            }),
        )
        .with_rule(
            "exs-11",
            focused(|i: &ExampleScenarioInstance, _: &ConstraintContext<'_>| {
                Ok(all_distinct(i.version().iter().map(|v| v.title().value())))
            }),
        )
        .with_rule(
            "exs-12",
            focused(|s: &ExampleScenario, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.process().iter().map(|p| p.title().value())))
            }),
        )
        .with_rule(
            "exs-13",
            focused(|s: &ExampleScenarioProcessStep, _: &ConstraintContext<'_>| {
                Ok(all_distinct(s.alternative().iter().map(|a| a.title().value())))
            }),
        )
        .with_rule("exs-14", focused(reference_resolves))
        .with_rule("exs-15", focused(versioned_reference_names_version))
        .with_rule("exs-16", focused(version_reference_resolves))
        .with_rule(
            "exs-17",
            focused(|op: &ExampleScenarioProcessStepOperation, ctx: &ConstraintContext<'_>| {
                Ok(actor_exists(enclosing(ctx)?, text(op.initiator())))
            }),
        )
        .with_rule(
            "exs-18",
            focused(|op: &ExampleScenarioProcessStepOperation, ctx: &ConstraintContext<'_>| {
                Ok(actor_exists(enclosing(ctx)?, text(op.receiver())))
            }),
        )
        .with_rule("exs-19", focused(actor_takes_part))
        .with_rule("exs-20", focused(instance_is_exchanged))
        .with_rule("exs-21", focused(version_is_exchanged))
        .with_rule("exs-22", focused(step_action_is_single))
        .with_rule(
            "exs-23",
            focused(|a: &ExampleScenarioActor, _: &ConstraintContext<'_>| {
                Ok(text(Some(a.key())) != Some(OTHER_ACTOR))
            }),
        )
        // Parameters
        .with_rule(
            "inv-1",
            focused(|p: &ParametersParameter, _: &ConstraintContext<'_>| {
                let (value, resource) = (p.value().is_some(), p.resource().is_some());
                Ok(if p.part().is_empty() {
                    exclusive(value, resource)
                } else {
                    !value && !resource
                })
            }),
        )
        // datatypes
        .with_rule(
            "ext-1",
            focused(|e: &Extension, _: &ConstraintContext<'_>| {
                Ok(exclusive(!e.extension().is_empty(), e.value().is_some()))
            }),
        )
        .with_rule(
            "qty-3",
            focused(|q: &Quantity, _: &ConstraintContext<'_>| {
                Ok(q.code().is_none() || q.system().is_some())
            }),
        )
        .with_rule(
            "per-1",
            focused(|p: &Period, _: &ConstraintContext<'_>| Ok(period_is_ordered(&p.draft()))),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Markdown;
    use crate::r5::example_scenario::ExampleScenarioProcessStepAlternative;

    #[test]
    fn machine_names() {
        assert!(is_machine_name("ExampleMap_2"));
        assert!(!is_machine_name("exampleMap"));
        assert!(!is_machine_name("E"));
        assert!(!is_machine_name("Example Map"));
        assert!(is_plain_url("http://example.org/fhir/ConceptMap/101"));
        assert!(!is_plain_url("http://example.org/fhir/ConceptMap/101|1.0"));
    }

    #[test]
    fn operations_include_nested_and_alternative_steps() {
        let op = |title: &str| {
            ExampleScenarioProcessStepOperation::builder()
                .title(FhirString::of(title))
                .build()
                .unwrap()
        };
        let step = |title: &str| {
            ExampleScenarioProcessStep::builder()
                .operation(op(title))
                .build()
                .unwrap()
        };
        let nested = ExampleScenarioProcess::builder()
            .title(FhirString::of("nested"))
            .add_step(step("inner"))
            .build()
            .unwrap();
        let alternative = ExampleScenarioProcessStepAlternative::builder()
            .title(FhirString::of("instead"))
            .description(Markdown::of("use the other server"))
            .add_step(step("alternate"))
            .build()
            .unwrap();
        let outer = ExampleScenarioProcessStep::builder()
            .process(nested)
            .add_alternative(alternative)
            .build()
            .unwrap();
        let scenario = ExampleScenario::builder()
            .status(PublicationStatus::of(PublicationStatusCode::Draft))
            .add_process(
                ExampleScenarioProcess::builder()
                    .title(FhirString::of("main"))
                    .add_step(step("first"))
                    .add_step(outer)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let titles: Vec<_> = operations(&scenario)
            .iter()
            .filter_map(|op| text(Some(op.title())))
            .collect();
        assert_eq!(titles, vec!["first", "inner", "alternate"]);
    }

    #[test]
    fn unsupported_keys_are_declined() {
        let rules = standard_rules();
        let member_of = ExampleScenario::INVARIANTS
            .iter()
            .find(|i| i.key == "exampleScenario-24")
            .unwrap();
        assert!(!rules.supports(member_of));
        assert!(ExampleScenario::INVARIANTS.iter().filter(|i| i.key.starts_with("exs")).all(|i| rules.supports(i)));
    }
}
