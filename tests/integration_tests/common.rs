// shared utilities for integration tests

use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

// counter for unique test directory names
static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// create a unique test directory name
pub fn unique_test_name(prefix: &str) -> String {
    let count = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, std::process::id(), count)
}

/// create a fresh temporary directory for one test
pub fn create_test_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir()
        .join("rulebatch_integration_tests")
        .join(unique_test_name(name));

    // clean up if exists
    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }

    fs::create_dir_all(&dir).expect("Failed to create test directory");
    dir
}

/// clean up a test directory
pub fn cleanup_test_dir(path: &Path) {
    if path.exists() {
        fs::remove_dir_all(path).ok();
    }
}

pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap())
        .expect("Failed to write fixture");
    path
}

pub fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("Failed to read output file");
    serde_json::from_str(&content).expect("Output is not valid JSON")
}

/// run rulebatch with an isolated config file
pub fn run_rulebatch(dir: &Path, args: &[&str]) -> Output {
    let config_path = dir.join("config.json");

    Command::new(env!("CARGO_BIN_EXE_rulebatch"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env_remove("RULEBATCH_CONFIG")
        .env_remove("RULEBATCH_LOG")
        .output()
        .expect("Failed to run rulebatch")
}

/// run rulebatch with --json and parse the JSON-RPC envelope from stdout
pub fn run_json(dir: &Path, args: &[&str]) -> (Output, Value) {
    let mut full = vec!["--json"];
    full.extend(args);
    let output = run_rulebatch(dir, &full);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout));
    (output, value)
}

/// the value stored in one attribute of one element of a model snapshot
pub fn attribute_value(model: &Value, id: i64, name: &str) -> Value {
    model["elements"]
        .as_array()
        .and_then(|elements| elements.iter().find(|e| e["id"] == json!(id)))
        .map(|e| e["attributes"][name]["value"].clone())
        .unwrap_or(Value::Null)
}

fn string_attribute() -> Value {
    json!({ "storage": "string" })
}

/// three walls, two doors and a door type
pub fn sample_model() -> Value {
    json!({
        "worksets": [
            { "id": 1, "name": "Shell" },
            { "id": 2, "name": "Interior" }
        ],
        "elements": [
            { "id": 1, "category": "Walls", "name": "W1", "workset": 1,
              "attributes": { "Comment": string_attribute() } },
            { "id": 2, "category": "Walls", "name": "W2", "workset": 1,
              "attributes": { "Comment": string_attribute() } },
            { "id": 3, "category": "Walls", "name": "W3", "workset": 2,
              "attributes": { "Comment": string_attribute() } },
            { "id": 10, "category": "Doors", "family": "Single-Flush", "workset": 2,
              "attributes": {
                  "Comment": string_attribute(),
                  "Count": { "storage": "integer", "value": 0 },
                  "Tag": { "storage": "string", "read_only": true, "value": "D" }
              } },
            { "id": 11, "category": "Doors", "family": "Double-Flush", "workset": 2,
              "attributes": { "Comment": string_attribute() } },
            { "id": 20, "category": "Doors", "family": "Single-Flush", "is_type": true,
              "attributes": { "Comment": string_attribute() } }
        ]
    })
}

pub const FLAT_HEADER: [&str; 6] = [
    "Rule",
    "Property",
    "Comparer",
    "Value",
    "Parameter",
    "ParameterValue",
];

pub fn flat_table(rows: &[[&str; 6]]) -> Value {
    json!({ "columns": FLAT_HEADER, "rows": rows })
}
