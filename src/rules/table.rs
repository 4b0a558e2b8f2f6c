//! raw rule tables as handed over by the spreadsheet/CSV reader
//!
//! a table is a header row plus data rows of string cells. on disk it is JSON,
//! either `{ "columns": [...], "rows": [[...], ...] }` or a bare array of rows
//! whose first entry is the header. non-string cells are stringified and
//! `null` becomes an empty cell.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableFile")]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Object {
        columns: Vec<JsonValue>,
        #[serde(default)]
        rows: Vec<Vec<JsonValue>>,
    },
    Grid(Vec<Vec<JsonValue>>),
}

impl From<TableFile> for RawTable {
    fn from(file: TableFile) -> Self {
        let (columns, rows) = match file {
            TableFile::Object { columns, rows } => (columns, rows),
            TableFile::Grid(mut grid) => {
                if grid.is_empty() {
                    (Vec::new(), Vec::new())
                } else {
                    let header = grid.remove(0);
                    (header, grid)
                }
            }
        };

        Self {
            columns: cells(columns),
            rows: rows.into_iter().map(cells).collect(),
        }
    }
}

fn cells(values: Vec<JsonValue>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| match v {
            JsonValue::String(s) => s,
            JsonValue::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

impl RawTable {
    pub fn new(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// index of the first column whose normalized header matches one of `names`
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| names.iter().any(|n| normalize_header(c) == normalize_header(n)))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// header comparison ignores case, whitespace and underscores
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
