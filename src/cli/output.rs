//! output formatting utilities for scriptable CLI output
//!
//! uses JSON-RPC 2.0 format for machine-readable output:
//! - success: {"jsonrpc": "2.0", "result": {...}, "id": null}
//! - error: {"jsonrpc": "2.0", "error": {"code": N, "message": "...", "data": {...}}, "id": null}
//!
//! also provides format string templating for one-line-per-rule listings

use serde::Serialize;
use std::io::IsTerminal;

use crate::rules::{RuleDefinition, RunReport, TableForm};

/// JSON-RPC version constant
const JSONRPC_VERSION: &str = "2.0";

/// output mode determines how results are formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// human-readable text output
    Text,
    /// machine-readable JSON-RPC 2.0 output
    Json,
    /// no output on success (errors still go to stderr)
    Quiet,
    /// custom format string with {field} placeholders
    Format,
}

impl OutputMode {
    /// determine output mode from CLI flags and environment
    ///
    /// priority: quiet > format > json > no_json > auto-detect
    pub fn from_flags(json: bool, no_json: bool, quiet: bool, format: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        if format {
            return Self::Format;
        }
        if json {
            return Self::Json;
        }
        if no_json {
            return Self::Text;
        }
        // auto-detect: JSON when stdout is not a TTY (piped)
        if !std::io::stdout().is_terminal() {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

/// JSON-RPC 2.0 success response
#[derive(Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub result: T,
    /// null for CLI responses (no request id)
    pub id: Option<String>,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result,
            id: None,
        }
    }
}

/// JSON-RPC 2.0 error response
#[derive(Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    pub error: RpcError,
    pub id: Option<String>,
}

/// JSON-RPC 2.0 error object
#[derive(Serialize)]
pub struct RpcError {
    /// error code (rulebatch exit code, offset by -32000 for app-specific errors)
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// additional error data
#[derive(Serialize)]
pub struct ErrorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl JsonRpcError {
    /// create error with standard JSON-RPC error code range
    /// rulebatch uses -32000 to -32099 for application errors (per JSON-RPC spec)
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            error: RpcError {
                code: to_jsonrpc_code(code),
                message: message.into(),
                data: None,
            },
            id: None,
        }
    }

    pub fn with_details(code: i32, message: impl Into<String>, details: Vec<String>) -> Self {
        let mut error = Self::new(code, message);
        if !details.is_empty() {
            error.error.data = Some(ErrorData {
                details: Some(details),
            });
        }
        error
    }
}

/// convert rulebatch exit code to JSON-RPC error code
/// JSON-RPC reserves -32000 to -32099 for server/application errors
fn to_jsonrpc_code(code: i32) -> i32 {
    -32000 - code
}

// ============================================================================
// Result data structures for different commands
// ============================================================================

/// result data for the compile command
#[derive(Serialize)]
pub struct CompileData<'a> {
    pub table: String,
    pub form: TableForm,
    pub rules: &'a [RuleDefinition],
}

/// result data for the apply command
#[derive(Serialize)]
pub struct ApplyData<'a> {
    pub model: String,
    /// where the updated model was written, null on dry runs
    pub saved_to: Option<String>,
    pub dry_run: bool,
    pub summary: SummaryData,
    pub report: &'a RunReport,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct SummaryData {
    pub rules: usize,
    pub matched: usize,
    pub writes: usize,
    pub unmatched: usize,
    pub issues: usize,
    pub bypassed: usize,
}

impl SummaryData {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            rules: report.rules.len(),
            matched: report.total_matched(),
            writes: report.total_writes(),
            unmatched: report.unmatched().count(),
            issues: report.issues().count(),
            bypassed: report.rules.iter().map(|r| r.bypassed.len()).sum(),
        }
    }
}

// ============================================================================
// Output functions
// ============================================================================

/// format a string template with {field} placeholders
///
/// # example
/// ```ignore
/// let rule = RuleDefinition::new("R1", "Comments", "Reviewed");
/// let result = format_template("{label}: {target_attribute}", &rule);
/// assert_eq!(result, "R1: Comments");
/// ```
pub fn format_template<T: Serialize>(template: &str, data: &T) -> String {
    let value = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(_) => return template.to_string(),
    };

    let mut result = template.to_string();

    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            let placeholder = format!("{{{}}}", key);
            let replacement = match val {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                // arrays collapse to their length
                serde_json::Value::Array(arr) => arr.len().to_string(),
                serde_json::Value::Object(_) => val.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }
    }

    result
}

/// print JSON-RPC success response to stdout
pub fn print_json<T: Serialize>(data: &T) {
    let response = JsonRpcResponse::new(data);
    if let Ok(json) = serde_json::to_string(&response) {
        println!("{}", json);
    }
}

/// print JSON-RPC error to stdout
pub fn print_json_error(code: i32, message: &str, details: Vec<String>) {
    let error = JsonRpcError::with_details(code, message, details);
    if let Ok(json) = serde_json::to_string(&error) {
        println!("{}", json);
    }
}
