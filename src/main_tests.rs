use std::path::PathBuf;

use serde_json::json;

use super::{parse_json_array, read_input};

fn unique_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn json_arrays_parse_with_surrounding_whitespace() {
    let items = parse_json_array("  [\"a\", 1, null]\n", "--args").expect("array");
    assert_eq!(items, vec![json!("a"), json!(1), json!(null)]);
}

#[test]
fn non_array_json_names_the_input_and_kind() {
    let err = parse_json_array(r#"{"action": "x"}"#, "batch").expect_err("should fail");
    assert_eq!(err.to_string(), "batch must be a JSON array, got an object");

    let err = parse_json_array("[1,", "--args").expect_err("should fail");
    assert!(
        err.to_string().starts_with("--args must be a JSON array:"),
        "{err}"
    );
}

#[test]
fn read_input_reads_files() {
    let dir = unique_dir("roam-main");
    let path = dir.join("actions.json");
    std::fs::write(&path, "[]").expect("write should work");
    assert_eq!(read_input(Some(&path)).expect("read"), "[]");

    let missing = dir.join("missing.json");
    let err = read_input(Some(&missing)).expect_err("missing file should fail");
    assert!(err.to_string().starts_with("I/O error:"), "{err}");
    let _ = std::fs::remove_dir_all(dir);
}
