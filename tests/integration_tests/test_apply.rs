// integration tests for the apply command

use crate::common::*;
use serde_json::json;
use std::fs;

// ============================================================================
// end-to-end scenarios
// ============================================================================

#[test]
fn test_apply_marks_every_wall() {
    let dir = create_test_dir("apply_walls");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"]]),
    );
    let out = dir.join("out.json");

    let (output, response) = run_json(
        &dir,
        &[
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    assert_eq!(response["result"]["summary"]["writes"], json!(3));
    assert_eq!(response["result"]["dry_run"], json!(false));

    let updated = read_json(&out);
    for id in [1, 2, 3] {
        assert_eq!(attribute_value(&updated, id, "Comment"), json!("Reviewed"));
    }
    assert_eq!(attribute_value(&updated, 10, "Comment"), json!(null));

    // the input snapshot is untouched when --output is given
    assert_eq!(attribute_value(&read_json(&model), 1, "Comment"), json!(null));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_conditions_are_anded() {
    let dir = create_test_dir("apply_and");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Category", "Equals", "Doors", "Comment", "Single"],
            ["R1", "FamilyName", "Contains", "Single", "", ""],
        ]),
    );

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert_eq!(response["result"]["report"]["rules"][0]["matched"], json!(1));

    // saved in place; the door type (20) is never part of the population
    let updated = read_json(&model);
    assert_eq!(attribute_value(&updated, 10, "Comment"), json!("Single"));
    assert_eq!(attribute_value(&updated, 11, "Comment"), json!(null));
    assert_eq!(attribute_value(&updated, 20, "Comment"), json!(null));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_unknown_category_is_ignored() {
    let dir = create_test_dir("apply_unknown_category");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[[
            "R1",
            "Category",
            "Equals",
            "NotARealCategory",
            "Comment",
            "Seen",
        ]]),
    );

    let (output, response) = run_json(
        &dir,
        &[
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--dry-run",
        ],
    );

    assert!(output.status.success());
    let rule = &response["result"]["report"]["rules"][0];
    assert_eq!(rule["matched"], json!(5));
    assert_eq!(rule["bypassed"][0]["reason"]["kind"], json!("unknown_category"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_row_with_blank_comparer_writes_nothing() {
    let dir = create_test_dir("apply_blank_comparer");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Category", "", "Doors", "Comment", "Door"],
            ["R2", "Name", "Equals", "W1", "Comment", "First"],
        ]),
    );

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert!(output.status.success());
    let rules = response["result"]["report"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["label"], json!("R2"));

    let updated = read_json(&model);
    assert_eq!(attribute_value(&updated, 1, "Comment"), json!("First"));
    for id in [2, 3, 10, 11] {
        assert_eq!(attribute_value(&updated, id, "Comment"), json!(null));
    }

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_numeric_text_into_string_attribute() {
    let dir = create_test_dir("apply_string_42");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Name", "Equals", "W1", "Comment", "42"]]),
    );

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert_eq!(
        response["result"]["report"]["rules"][0]["writes"][0]["coercion"],
        json!("string_to_string")
    );
    assert_eq!(attribute_value(&read_json(&model), 1, "Comment"), json!("42"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_empty_table_writes_nothing() {
    let dir = create_test_dir("apply_empty");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(&dir, "rules.json", &flat_table(&[]));
    let before = fs::read_to_string(&model).unwrap();

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(response["error"]["code"], json!(-32004));
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no rule definitions"));
    assert_eq!(fs::read_to_string(&model).unwrap(), before);

    cleanup_test_dir(&dir);
}

// ============================================================================
// write plan and failure modes
// ============================================================================

#[test]
fn test_apply_wide_table_with_typed_write() {
    let dir = create_test_dir("apply_wide");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &json!([
            ["Parameter", "ParameterValue", "Doors", "", "", "Shell", "", ""],
            ["Count", 7, "Category", "Equals", "Doors", "Workset", "Equals", "Interior"],
            ["Comment", "Shell", null, null, null, "Workset", "Equals", "Shell"]
        ]),
    );

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert!(output.status.success());
    let rules = &response["result"]["report"]["rules"];
    assert_eq!(rules[0]["label"], json!("Count=7"));
    assert_eq!(rules[0]["matched"], json!(2));

    // element 11 has no Count attribute
    assert_eq!(rules[0]["issues"][0]["entity"], json!(11));
    assert_eq!(rules[0]["issues"][0]["reason"]["kind"], json!("missing"));

    let updated = read_json(&model);
    assert_eq!(attribute_value(&updated, 10, "Count"), json!(7));
    assert_eq!(attribute_value(&updated, 1, "Comment"), json!("Shell"));
    assert_eq!(attribute_value(&updated, 2, "Comment"), json!("Shell"));
    assert_eq!(attribute_value(&updated, 3, "Comment"), json!(null));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_dry_run_leaves_model_alone() {
    let dir = create_test_dir("apply_dry_run");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"]]),
    );
    let before = fs::read_to_string(&model).unwrap();

    let (output, response) = run_json(
        &dir,
        &[
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--dry-run",
        ],
    );

    assert!(output.status.success());
    assert_eq!(response["result"]["saved_to"], json!(null));
    assert_eq!(response["result"]["summary"]["writes"], json!(3));
    assert_eq!(fs::read_to_string(&model).unwrap(), before);

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_later_rule_sees_earlier_write() {
    let dir = create_test_dir("apply_sequential");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Workset", "Equals", "Shell", "Comment", "Outer"],
            ["R2", "Parameter:Comment", "Equals", "Outer", "Comment", "Checked"],
        ]),
    );

    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert_eq!(response["result"]["report"]["rules"][1]["matched"], json!(2));

    let updated = read_json(&model);
    assert_eq!(attribute_value(&updated, 1, "Comment"), json!("Checked"));
    assert_eq!(attribute_value(&updated, 3, "Comment"), json!(null));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_fail_on_unmatched() {
    let dir = create_test_dir("apply_fail_unmatched");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[
            ["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"],
            ["R2", "Category", "Equals", "Windows", "Comment", "Glazed"],
        ]),
    );
    let before = fs::read_to_string(&model).unwrap();

    let (output, response) = run_json(
        &dir,
        &[
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--fail-on-unmatched",
        ],
    );

    assert_eq!(output.status.code(), Some(5));
    assert!(response["error"]["data"]["details"][0]
        .as_str()
        .unwrap()
        .contains("R2"));
    assert_eq!(fs::read_to_string(&model).unwrap(), before);

    // without the flag the unmatched rule is only reported
    let (output, response) = run_json(
        &dir,
        &["apply", table.to_str().unwrap(), "--model", model.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(response["result"]["summary"]["unmatched"], json!(1));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_fail_on_issues() {
    let dir = create_test_dir("apply_fail_issues");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Name", "Exists", "false", "Tag", "X"]]),
    );

    let output = run_rulebatch(
        &dir,
        &[
            "--no-json",
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--fail-on-issues",
        ],
    );

    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not applied"));
    assert!(stderr.contains("read-only"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_text_output() {
    let dir = create_test_dir("apply_text");
    let model = write_json(&dir, "model.json", &sample_model());
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Category", "Equals", "Wals", "Comment", "Reviewed"]]),
    );

    let output = run_rulebatch(
        &dir,
        &[
            "--no-json",
            "apply",
            table.to_str().unwrap(),
            "--model",
            model.to_str().unwrap(),
            "--dry-run",
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[R1] Comment = \"Reviewed\": 5 matched, 5 written"));
    assert!(stdout.contains("did you mean: Walls"));
    assert!(stdout.contains("Dry run: model not saved"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_apply_missing_model_is_invalid_args() {
    let dir = create_test_dir("apply_missing_model");
    let table = write_json(
        &dir,
        "rules.json",
        &flat_table(&[["R1", "Category", "Equals", "Walls", "Comment", "Reviewed"]]),
    );
    let missing = dir.join("missing.json");

    let output = run_rulebatch(
        &dir,
        &[
            "--no-json",
            "apply",
            table.to_str().unwrap(),
            "--model",
            missing.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read model file"));

    cleanup_test_dir(&dir);
}
