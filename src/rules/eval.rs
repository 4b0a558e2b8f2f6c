//! condition evaluator
//!
//! applies conditions to a working set by sequential narrowing, which makes a
//! rule's condition list a logical AND

use tracing::debug;

use super::predicate::{select_category, select_text, Bypass, EntitySet, Selection};
use super::types::{Condition, PropertyKind, RuleDefinition};
use crate::model::{
    AttributeAccessor, ClassificationReader, EntityPopulation, Host, WorksetTable,
};

/// default edit distance for unknown category suggestions
pub const DEFAULT_FUZZY_THRESHOLD: usize = 2;

/// host capabilities the predicates read from
pub struct EvalContext<'a> {
    pub population: &'a dyn EntityPopulation,
    pub reader: &'a dyn ClassificationReader,
    pub worksets: &'a dyn WorksetTable,
    pub attributes: &'a dyn AttributeAccessor,
    /// max edit distance for "did you mean" category suggestions
    pub fuzzy_threshold: usize,
}

impl<'a> EvalContext<'a> {
    /// create a new evaluation context
    pub fn new(
        population: &'a dyn EntityPopulation,
        reader: &'a dyn ClassificationReader,
        worksets: &'a dyn WorksetTable,
        attributes: &'a dyn AttributeAccessor,
    ) -> Self {
        Self {
            population,
            reader,
            worksets,
            attributes,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// context over a host that provides every capability
    pub fn from_host<H: Host>(host: &'a H) -> Self {
        Self::new(host, host, host, host)
    }

    /// set the suggestion threshold
    pub fn with_fuzzy_threshold(mut self, threshold: usize) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }
}

/// result of narrowing a working set by one condition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub working: EntitySet,
    /// set when the condition was applied as a no-op
    pub bypass: Option<Bypass>,
}

/// apply one condition to the working set
pub fn apply_condition(condition: &Condition, working: EntitySet, ctx: &EvalContext) -> Step {
    let value = condition.value.as_str();
    let comparator = &condition.comparator;

    let selection = match &condition.property {
        PropertyKind::Category => select_category(&working, comparator, value, ctx),
        PropertyKind::FamilyName => {
            select_text(&working, comparator, value, |id| ctx.reader.family_name(id))
        }
        PropertyKind::TypeName => {
            select_text(&working, comparator, value, |id| ctx.reader.type_name(id))
        }
        PropertyKind::Name => select_text(&working, comparator, value, |id| ctx.reader.name(id)),
        PropertyKind::Workset => select_text(&working, comparator, value, |id| {
            ctx.reader
                .workset_id(id)
                .and_then(|ws| ctx.worksets.workset_name(ws))
        }),
        PropertyKind::Parameter(name) => select_text(&working, comparator, value, |id| {
            ctx.attributes.read(id, name).map(|v| v.to_string())
        }),
        PropertyKind::Unknown(token) => Selection::PassThrough(Bypass::UnknownProperty {
            token: token.clone(),
        }),
    };

    match selection {
        Selection::Narrowed(narrowed) => {
            debug!(
                condition = %condition,
                before = working.len(),
                after = narrowed.len(),
                "condition applied"
            );
            Step {
                working: narrowed,
                bypass: None,
            }
        }
        Selection::PassThrough(bypass) => {
            debug!(condition = %condition, reason = %bypass, "condition bypassed");
            Step {
                working,
                bypass: Some(bypass),
            }
        }
    }
}

/// outcome of folding a rule's conditions over the base population
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSelection {
    pub matched: EntitySet,
    /// (condition index, reason) for every condition applied as a no-op
    pub bypassed: Vec<(usize, Bypass)>,
}

/// fold every condition of `rule` over the instance population
///
/// an empty condition list selects the whole population
pub fn select(rule: &RuleDefinition, ctx: &EvalContext) -> RuleSelection {
    let base: EntitySet = ctx.population.instances().into_iter().collect();
    select_from(rule, base, ctx)
}

/// fold every condition of `rule` over an explicit starting set
pub fn select_from(rule: &RuleDefinition, base: EntitySet, ctx: &EvalContext) -> RuleSelection {
    let mut working = base;
    let mut bypassed = Vec::new();

    for (index, condition) in rule.conditions.iter().enumerate() {
        let step = apply_condition(condition, working, ctx);
        working = step.working;
        if let Some(bypass) = step.bypass {
            bypassed.push((index, bypass));
        }
    }

    RuleSelection {
        matched: working,
        bypassed,
    }
}
