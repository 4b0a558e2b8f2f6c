//! rule compiler - converts raw table rows into rule definitions
//!
//! supports two table shapes:
//! - flat: one row per condition, `Rule, Property, Comparer, Value, Parameter,
//!   ParameterValue`; rows sharing a `Rule` key form one rule and the first
//!   row's target is authoritative
//! - wide: `Parameter, ParameterValue`, then one `Property, Comparer, Value`
//!   triple per labelled column block; rows with the same target pair merge
//!
//! malformed rows and incomplete triples are skipped. only a table that yields
//! no rules at all is an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::table::RawTable;
use super::types::{Condition, RuleDefinition};

/// error type for compiling rule tables
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("rule table produced no rule definitions")]
    Empty,
    #[error("rule table is missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: unknown operator '{token}'")]
    UnknownOperator { row: usize, token: String },
}

/// which table shape to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableForm {
    /// flat when the header has `Rule` and `Property` columns, wide otherwise
    #[default]
    Auto,
    Wide,
    Flat,
}

impl FromStr for TableForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(TableForm::Auto),
            "wide" => Ok(TableForm::Wide),
            "flat" => Ok(TableForm::Flat),
            _ => Err(format!("invalid table form '{}': use auto, wide, or flat", s)),
        }
    }
}

impl fmt::Display for TableForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableForm::Auto => write!(f, "auto"),
            TableForm::Wide => write!(f, "wide"),
            TableForm::Flat => write!(f, "flat"),
        }
    }
}

/// how unrecognized property/comparator tokens are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorPolicy {
    /// compile them; they pass every element through at evaluation
    #[default]
    Permissive,
    /// reject the table
    Strict,
}

impl FromStr for OperatorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(OperatorPolicy::Permissive),
            "strict" => Ok(OperatorPolicy::Strict),
            _ => Err(format!(
                "invalid operator policy '{}': use permissive or strict",
                s
            )),
        }
    }
}

impl fmt::Display for OperatorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorPolicy::Permissive => write!(f, "permissive"),
            OperatorPolicy::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub form: TableForm,
    pub operators: OperatorPolicy,
}

impl CompileOptions {
    pub fn with_form(mut self, form: TableForm) -> Self {
        self.form = form;
        self
    }

    pub fn with_operators(mut self, operators: OperatorPolicy) -> Self {
        self.operators = operators;
        self
    }
}

/// compile a raw table into rule definitions, in first-appearance order
pub fn compile(table: &RawTable, options: &CompileOptions) -> Result<Vec<RuleDefinition>, CompileError> {
    let form = match options.form {
        TableForm::Auto => detect_form(table),
        form => form,
    };

    let rules = match form {
        TableForm::Flat => compile_flat(table, options)?,
        TableForm::Wide | TableForm::Auto => compile_wide(table, options)?,
    };

    if rules.is_empty() {
        return Err(CompileError::Empty);
    }

    for rule in rules.iter().filter(|r| r.is_unconditional()) {
        warn!(rule = %rule.label, "rule has no conditions and matches every element");
    }

    info!(form = %form, rules = rules.len(), rows = table.rows.len(), "compiled rule table");
    Ok(rules)
}

/// guess the table shape from its header
pub fn detect_form(table: &RawTable) -> TableForm {
    if table.column_index(&["Rule"]).is_some() && table.column_index(&["Property"]).is_some() {
        TableForm::Flat
    } else {
        TableForm::Wide
    }
}

/// a condition from three cells, or `None` when any cell is blank
fn condition_from_cells(
    property: &str,
    comparator: &str,
    value: &str,
    row: usize,
    options: &CompileOptions,
) -> Result<Option<Condition>, CompileError> {
    if property.trim().is_empty() || comparator.trim().is_empty() || value.trim().is_empty() {
        debug!(row, "skipping incomplete condition");
        return Ok(None);
    }

    let condition = Condition::parse(property, comparator, value);

    if let Some(token) = condition.unknown_token() {
        if options.operators == OperatorPolicy::Strict {
            return Err(CompileError::UnknownOperator {
                row,
                token: token.to_string(),
            });
        }
        debug!(row, token, "unknown operator compiled as pass-through");
    }

    Ok(Some(condition))
}

// ============================================================================
// Flat form
// ============================================================================

struct FlatColumns {
    rule: usize,
    property: usize,
    comparator: usize,
    value: usize,
    parameter: usize,
    parameter_value: usize,
}

impl FlatColumns {
    fn resolve(table: &RawTable) -> Result<Self, CompileError> {
        let find = |label: &str, names: &[&str]| {
            table
                .column_index(names)
                .ok_or_else(|| CompileError::MissingColumn(label.to_string()))
        };

        // "Value" must not resolve to "ParameterValue"; exact header match only
        Ok(Self {
            rule: find("Rule", &["Rule"])?,
            property: find("Property", &["Property"])?,
            comparator: find("Comparer", &["Comparer", "Comparator"])?,
            value: find("Value", &["Value"])?,
            parameter: find("Parameter", &["Parameter"])?,
            parameter_value: find("ParameterValue", &["ParameterValue"])?,
        })
    }
}

fn compile_flat(
    table: &RawTable,
    options: &CompileOptions,
) -> Result<Vec<RuleDefinition>, CompileError> {
    let cols = FlatColumns::resolve(table)?;
    let mut rules: Vec<RuleDefinition> = Vec::new();

    for (i, cells) in table.rows.iter().enumerate() {
        let row = i + 1;

        if cells.len() != table.columns.len() {
            debug!(
                row,
                expected = table.columns.len(),
                found = cells.len(),
                "skipping row with wrong column count"
            );
            continue;
        }

        let key = cells[cols.rule].trim();
        if key.is_empty() {
            debug!(row, "skipping row without rule key");
            continue;
        }

        // in flat form the row is the triple; an incomplete one drops the row
        let Some(condition) = condition_from_cells(
            &cells[cols.property],
            &cells[cols.comparator],
            &cells[cols.value],
            row,
            options,
        )?
        else {
            continue;
        };

        let attribute = cells[cols.parameter].trim();
        let value = cells[cols.parameter_value].trim();

        let index = match rules.iter().position(|r| r.label == key) {
            Some(index) => {
                if !rules[index].targets(attribute, value) && !attribute.is_empty() {
                    debug!(row, rule = key, "ignoring target on non-leading row");
                }
                index
            }
            None => {
                if attribute.is_empty() {
                    debug!(row, rule = key, "skipping row: rule opens without a target");
                    continue;
                }
                rules.push(RuleDefinition::new(key, attribute, value));
                rules.len() - 1
            }
        };

        rules[index].conditions.push(condition);
    }

    Ok(rules)
}

// ============================================================================
// Wide form
// ============================================================================

/// first column of every labelled triple block, scanning every third header
/// cell from column 2 and stopping at the first blank label
pub fn block_starts(columns: &[String]) -> Vec<usize> {
    (2..columns.len())
        .step_by(3)
        .take_while(|&i| !columns[i].trim().is_empty())
        .collect()
}

fn compile_wide(
    table: &RawTable,
    options: &CompileOptions,
) -> Result<Vec<RuleDefinition>, CompileError> {
    if table.columns.len() < 2 {
        return Ok(Vec::new());
    }

    let blocks = block_starts(&table.columns);
    if blocks.is_empty() {
        debug!("no labelled condition blocks in header");
        return Ok(Vec::new());
    }

    let mut rules: Vec<RuleDefinition> = Vec::new();

    for (i, cells) in table.rows.iter().enumerate() {
        let row = i + 1;

        if cells.len() < 2 {
            debug!(row, found = cells.len(), "skipping row without target columns");
            continue;
        }

        let attribute = cells[0].trim();
        let value = cells[1].trim();
        if attribute.is_empty() {
            debug!(row, "skipping row without target attribute");
            continue;
        }

        let mut conditions = Vec::new();
        for &start in &blocks {
            let (Some(property), Some(comparator), Some(expected)) =
                (cells.get(start), cells.get(start + 1), cells.get(start + 2))
            else {
                continue;
            };

            if let Some(condition) =
                condition_from_cells(property, comparator, expected, row, options)?
            {
                conditions.push(condition);
            }
        }

        match rules.iter_mut().find(|r| r.targets(attribute, value)) {
            Some(rule) => rule.conditions.extend(conditions),
            None => {
                let mut rule =
                    RuleDefinition::new(format!("{}={}", attribute, value), attribute, value);
                rule.conditions = conditions;
                rules.push(rule);
            }
        }
    }

    Ok(rules)
}
