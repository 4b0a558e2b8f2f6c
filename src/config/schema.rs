use serde::{Deserialize, Serialize};

use crate::rules::{
    ApplyOptions, CompileOptions, OperatorPolicy, TableForm, DEFAULT_FUZZY_THRESHOLD,
};

/// largest accepted edit distance for category suggestions
pub const MAX_FUZZY_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// rule table shape (auto detects from the header)
    #[serde(default)]
    pub table_form: TableForm,
    /// treatment of unrecognized property/comparator tokens
    #[serde(default)]
    pub operators: OperatorPolicy,
    /// report missing and read-only target attributes
    #[serde(default = "default_report_skipped")]
    pub report_skipped_attributes: bool,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: usize,
}

fn default_report_skipped() -> bool {
    true
}

fn default_fuzzy_threshold() -> usize {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_form: TableForm::default(),
            operators: OperatorPolicy::default(),
            report_skipped_attributes: default_report_skipped(),
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

impl Settings {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::default()
            .with_form(self.table_form)
            .with_operators(self.operators)
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            report_skipped: self.report_skipped_attributes,
            fuzzy_threshold: self.fuzzy_threshold,
        }
    }
}
