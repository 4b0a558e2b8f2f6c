//! rule engine - runs compiled rules in order against a host
//!
//! rules run strictly in sequence. each rule selects its matches before any
//! of its own writes are issued, but a later rule sees every write made by an
//! earlier one: rules that filter on an attribute an earlier rule wrote will
//! observe the new value.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::eval::{select, EvalContext, DEFAULT_FUZZY_THRESHOLD};
use super::predicate::Bypass;
use super::setter::{set_attribute, Coercion, RawValue, SetOutcome};
use super::types::RuleDefinition;
use crate::model::{AttrValue, ElementId, Host, StorageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// report missing and read-only target attributes as issues
    pub report_skipped: bool,
    pub fuzzy_threshold: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            report_skipped: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// why an attribute write did not happen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueReason {
    Missing,
    ReadOnly,
    Incompatible { storage: StorageKind },
    WriteFailed { message: String },
}

impl std::fmt::Display for IssueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueReason::Missing => write!(f, "attribute not found"),
            IssueReason::ReadOnly => write!(f, "attribute is read-only"),
            IssueReason::Incompatible { storage } => {
                write!(f, "value cannot be stored as {}", storage)
            }
            IssueReason::WriteFailed { message } => write!(f, "write failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedWrite {
    pub entity: ElementId,
    pub value: AttrValue,
    pub coercion: Coercion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteIssue {
    pub entity: ElementId,
    pub attribute: String,
    pub attempted: String,
    pub reason: IssueReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BypassedCondition {
    /// index into the rule's condition list
    pub condition: usize,
    pub reason: Bypass,
}

/// what happened to one rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub index: usize,
    pub label: String,
    pub target_attribute: String,
    pub target_value: String,
    pub matched: usize,
    pub bypassed: Vec<BypassedCondition>,
    pub writes: Vec<AppliedWrite>,
    pub issues: Vec<WriteIssue>,
}

impl RuleReport {
    /// NoMatch: the condition chain selected nothing
    pub fn is_unmatched(&self) -> bool {
        self.matched == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rules: Vec<RuleReport>,
}

impl RunReport {
    pub fn unmatched(&self) -> impl Iterator<Item = &RuleReport> {
        self.rules.iter().filter(|r| r.is_unmatched())
    }

    /// every write issue across all rules, with the owning rule
    pub fn issues(&self) -> impl Iterator<Item = (&RuleReport, &WriteIssue)> {
        self.rules
            .iter()
            .flat_map(|r| r.issues.iter().map(move |i| (r, i)))
    }

    pub fn total_writes(&self) -> usize {
        self.rules.iter().map(|r| r.writes.len()).sum()
    }

    pub fn total_matched(&self) -> usize {
        self.rules.iter().map(|r| r.matched).sum()
    }
}

/// run every rule in order against `host`
pub fn apply_rules<H: Host>(host: &mut H, rules: &[RuleDefinition], options: &ApplyOptions) -> RunReport {
    let started_at = Utc::now();
    let mut reports = Vec::with_capacity(rules.len());

    for (index, rule) in rules.iter().enumerate() {
        reports.push(apply_rule(host, index, rule, options));
    }

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        rules: reports,
    };

    info!(
        rules = report.rules.len(),
        unmatched = report.unmatched().count(),
        writes = report.total_writes(),
        issues = report.issues().count(),
        "rule run finished"
    );

    report
}

fn apply_rule<H: Host>(
    host: &mut H,
    index: usize,
    rule: &RuleDefinition,
    options: &ApplyOptions,
) -> RuleReport {
    // selection borrows the host immutably; it ends before any write
    let selection = {
        let ctx = EvalContext::from_host(&*host).with_fuzzy_threshold(options.fuzzy_threshold);
        select(rule, &ctx)
    };

    let bypassed: Vec<BypassedCondition> = selection
        .bypassed
        .into_iter()
        .map(|(condition, reason)| {
            warn!(rule = %rule.label, condition, reason = %reason, "condition bypassed");
            BypassedCondition { condition, reason }
        })
        .collect();

    let mut report = RuleReport {
        index,
        label: rule.label.clone(),
        target_attribute: rule.target_attribute.clone(),
        target_value: rule.target_value.clone(),
        matched: selection.matched.len(),
        bypassed,
        writes: Vec::new(),
        issues: Vec::new(),
    };

    if selection.matched.is_empty() {
        warn!(
            rule = %rule.label,
            attribute = %rule.target_attribute,
            value = %rule.target_value,
            "rule matched no elements"
        );
        return report;
    }

    let value = RawValue::from(rule.target_value.as_str());

    for entity in selection.matched {
        let reason = match set_attribute(host, entity, &rule.target_attribute, &value) {
            SetOutcome::Written { coercion, value } => {
                report.writes.push(AppliedWrite {
                    entity,
                    value,
                    coercion,
                });
                continue;
            }
            SetOutcome::Missing => IssueReason::Missing,
            SetOutcome::ReadOnly => IssueReason::ReadOnly,
            SetOutcome::Incompatible { storage } => IssueReason::Incompatible { storage },
            SetOutcome::Failed { message } => IssueReason::WriteFailed { message },
        };

        let skipped = matches!(reason, IssueReason::Missing | IssueReason::ReadOnly);
        if skipped && !options.report_skipped {
            debug!(rule = %rule.label, %entity, reason = %reason, "attribute skipped");
            continue;
        }

        report.issues.push(WriteIssue {
            entity,
            attribute: rule.target_attribute.clone(),
            attempted: rule.target_value.clone(),
            reason,
        });
    }

    debug!(
        rule = %rule.label,
        matched = report.matched,
        written = report.writes.len(),
        issues = report.issues.len(),
        "rule applied"
    );

    report
}
