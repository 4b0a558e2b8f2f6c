// integration tests for the compile command

use crate::common::*;
use serde_json::json;

#[test]
fn test_compile_flat_table_json() {
    let dir = create_test_dir("compile_flat");
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"],
            ["R2", "Category", "Equals", "Doors", "Mark", "D"],
            ["R1", "Workset", "Contains", "shell", "", ""],
        ]),
    );

    let (output, response) = run_json(&dir, &["compile", table.to_str().unwrap()]);

    assert!(output.status.success());
    let result = &response["result"];
    assert_eq!(result["form"], json!("flat"));
    assert_eq!(result["rules"].as_array().unwrap().len(), 2);
    assert_eq!(result["rules"][0]["label"], json!("R1"));
    assert_eq!(result["rules"][0]["conditions"].as_array().unwrap().len(), 2);
    assert_eq!(result["rules"][1]["target_attribute"], json!("Mark"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_compile_wide_table_text() {
    let dir = create_test_dir("compile_wide");
    let table = write_json(
        &dir,
        "rules.json",
        &json!({
            "columns": ["Parameter", "ParameterValue", "Doors", "", ""],
            "rows": [["Comment", "Door", "Category", "Equals", "Doors"]]
        }),
    );

    let output = run_rulebatch(&dir, &["--no-json", "compile", table.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 rule(s)"));
    assert!(stdout.contains("(wide form)"));
    assert!(stdout.contains("[Comment=Door] Comment = \"Door\" when Category Equals \"Doors\""));

    cleanup_test_dir(&dir);
}

#[test]
fn test_compile_format_template() {
    let dir = create_test_dir("compile_format");
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"],
            ["R2", "Category", "Equals", "Doors", "Mark", "D"],
        ]),
    );

    let output = run_rulebatch(
        &dir,
        &[
            "compile",
            table.to_str().unwrap(),
            "--format",
            "{label}:{target_attribute}={target_value}",
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["R1:Comment=Reviewed", "R2:Mark=D"]);

    cleanup_test_dir(&dir);
}

#[test]
fn test_compile_strict_rejects_unknown_operator() {
    let dir = create_test_dir("compile_strict");
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Category", "StartsWith", "Wa", "Comment", "x"]]),
    );

    let (output, _) = run_json(&dir, &["compile", table.to_str().unwrap()]);
    assert!(output.status.success());

    let (output, response) = run_json(&dir, &["compile", table.to_str().unwrap(), "--strict"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("unknown operator 'StartsWith'"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_compile_forced_flat_reports_missing_column() {
    let dir = create_test_dir("compile_missing_column");
    let table = write_json(
        &dir,
        "rules.json",
        &json!([
            ["Rule", "Property", "Comparer", "Value", "Parameter"],
            ["R1", "Category", "Equals", "Walls", "Comment"]
        ]),
    );

    let output = run_rulebatch(
        &dir,
        &["--no-json", "compile", table.to_str().unwrap(), "--form", "flat"],
    );

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("'ParameterValue'"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_compile_unreadable_table() {
    let dir = create_test_dir("compile_unreadable");
    let missing = dir.join("missing.json");

    let (output, response) = run_json(&dir, &["compile", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(response["error"]["code"], json!(-32002));

    cleanup_test_dir(&dir);
}
