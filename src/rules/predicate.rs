//! predicate library
//!
//! one selection function per property kind. each takes the working set and
//! returns a subset of it, or reports that the condition cannot be applied,
//! in which case the working set passes through unchanged.
//!
//! text comparisons are case-insensitive throughout, including category
//! `Contains`, which matches against the category label. a missing value never
//! equals, contains or exists; it only satisfies `Exists=false` and the negated
//! comparators.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::eval::EvalContext;
use super::types::Comparator;
use crate::model::{Category, ElementId};

/// working set of elements; order is irrelevant for filtering
pub type EntitySet = BTreeSet<ElementId>;

/// reason a condition was applied as a no-op
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bypass {
    /// category token does not name a known category
    UnknownCategory {
        token: String,
        suggestions: Vec<String>,
    },
    UnknownProperty {
        token: String,
    },
    UnknownComparator {
        token: String,
    },
    /// `Exists` needs a literal "true" or "false"
    NonBooleanExists {
        value: String,
    },
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bypass::UnknownCategory { token, suggestions } => {
                write!(f, "unknown category '{}'", token)?;
                if !suggestions.is_empty() {
                    write!(f, " (did you mean: {})", suggestions.join(", "))?;
                }
                Ok(())
            }
            Bypass::UnknownProperty { token } => write!(f, "unknown property '{}'", token),
            Bypass::UnknownComparator { token } => write!(f, "unknown comparator '{}'", token),
            Bypass::NonBooleanExists { value } => {
                write!(f, "Exists expects true or false, got '{}'", value)
            }
        }
    }
}

/// result of applying one predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Narrowed(EntitySet),
    PassThrough(Bypass),
}

/// parse the literal token `Exists` compares against
pub fn exists_literal(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// case-insensitive equality; a missing value never equals
pub fn text_equals(actual: Option<&str>, expected: &str) -> bool {
    actual
        .map(|a| a.to_lowercase() == expected.to_lowercase())
        .unwrap_or(false)
}

/// case-insensitive substring test; a missing value never contains
pub fn text_contains(actual: Option<&str>, expected: &str) -> bool {
    actual
        .map(|a| a.to_lowercase().contains(&expected.to_lowercase()))
        .unwrap_or(false)
}

fn keep(working: &EntitySet, predicate: impl Fn(ElementId) -> bool) -> EntitySet {
    working.iter().copied().filter(|id| predicate(*id)).collect()
}

// ============================================================================
// Category
// ============================================================================

/// category selection; `Equals`/`NotEqual` resolve the value to a symbolic
/// category and pass through when it does not parse
pub fn select_category(
    working: &EntitySet,
    comparator: &Comparator,
    value: &str,
    ctx: &EvalContext,
) -> Selection {
    match comparator {
        Comparator::Equals => match resolve_category(value, ctx) {
            Ok(category) => Selection::Narrowed(keep(working, |id| {
                ctx.reader.category(id) == Some(category)
            })),
            Err(bypass) => Selection::PassThrough(bypass),
        },
        Comparator::NotEqual => match resolve_category(value, ctx) {
            Ok(category) => {
                // removal is against the whole population of that category
                let excluded: EntitySet = ctx
                    .population
                    .instances_of_category(category)
                    .into_iter()
                    .collect();
                Selection::Narrowed(working.difference(&excluded).copied().collect())
            }
            Err(bypass) => Selection::PassThrough(bypass),
        },
        Comparator::Contains => Selection::Narrowed(keep(working, |id| {
            text_contains(ctx.reader.category(id).map(|c| c.label()), value)
        })),
        Comparator::NotContains => Selection::Narrowed(keep(working, |id| {
            !text_contains(ctx.reader.category(id).map(|c| c.label()), value)
        })),
        Comparator::Exists => match exists_literal(value) {
            Some(expected) => Selection::Narrowed(keep(working, |id| {
                ctx.reader.category(id).is_some() == expected
            })),
            None => Selection::PassThrough(Bypass::NonBooleanExists {
                value: value.to_string(),
            }),
        },
        Comparator::Unknown(token) => Selection::PassThrough(Bypass::UnknownComparator {
            token: token.clone(),
        }),
    }
}

fn resolve_category(value: &str, ctx: &EvalContext) -> Result<Category, Bypass> {
    Category::parse(value).ok_or_else(|| Bypass::UnknownCategory {
        token: value.to_string(),
        suggestions: Category::suggest(value, ctx.fuzzy_threshold)
            .iter()
            .map(|c| c.label().to_string())
            .collect(),
    })
}

// ============================================================================
// Text classifications (family, type, workset, name, parameter)
// ============================================================================

/// selection over a free-text classification read per element
pub fn select_text<F>(
    working: &EntitySet,
    comparator: &Comparator,
    value: &str,
    read: F,
) -> Selection
where
    F: Fn(ElementId) -> Option<String>,
{
    match comparator {
        Comparator::Equals => Selection::Narrowed(keep(working, |id| {
            text_equals(read(id).as_deref(), value)
        })),
        Comparator::NotEqual => Selection::Narrowed(keep(working, |id| {
            !text_equals(read(id).as_deref(), value)
        })),
        Comparator::Contains => Selection::Narrowed(keep(working, |id| {
            text_contains(read(id).as_deref(), value)
        })),
        Comparator::NotContains => Selection::Narrowed(keep(working, |id| {
            !text_contains(read(id).as_deref(), value)
        })),
        Comparator::Exists => match exists_literal(value) {
            Some(expected) => {
                Selection::Narrowed(keep(working, |id| read(id).is_some() == expected))
            }
            None => Selection::PassThrough(Bypass::NonBooleanExists {
                value: value.to_string(),
            }),
        },
        Comparator::Unknown(token) => Selection::PassThrough(Bypass::UnknownComparator {
            token: token.clone(),
        }),
    }
}
