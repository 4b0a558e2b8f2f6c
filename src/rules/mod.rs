//! rule compilation and execution
//!
//! a rule table flows through four stages:
//! - `table`: raw header + rows of string cells
//! - `compile`: rows become [`RuleDefinition`]s (flat or wide form)
//! - `eval` / `predicate`: each rule's conditions narrow the element population
//! - `engine` / `setter`: matches receive a type-coerced attribute write
//!
//! conditions never fail. a token the evaluator cannot act on (unknown
//! category, property or comparator) leaves the working set unchanged and is
//! recorded as a [`Bypass`] on the rule's report.

mod compile;
mod engine;
mod eval;
mod predicate;
mod setter;
mod table;
mod types;

pub use compile::{compile, detect_form, CompileError, CompileOptions, OperatorPolicy, TableForm};
pub use engine::{
    apply_rules, AppliedWrite, ApplyOptions, BypassedCondition, IssueReason, RuleReport,
    RunReport, WriteIssue,
};
pub use eval::{
    apply_condition, select, select_from, EvalContext, RuleSelection, Step, DEFAULT_FUZZY_THRESHOLD,
};
pub use predicate::{Bypass, EntitySet};
pub use setter::{coerce, set_attribute, Coercion, RawValue, SetOutcome};
pub use table::RawTable;
pub use types::{Comparator, Condition, PropertyKind, RuleDefinition};
