//! Binary-level tests: plan/apply/destroy against the demo stack with a
//! temporary state file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn demo_stack() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/agent-network.yaml")
}

fn trellis() -> Command {
    Command::cargo_bin("trellis").unwrap()
}

#[test]
fn plan_lists_every_node_as_create_on_fresh_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    trellis()
        .args(["plan", "-f"])
        .arg(demo_stack())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("agent-network"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("update-or-unchanged").not());
}

#[test]
fn apply_then_plan_then_destroy_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    trellis()
        .args(["apply", "-f"])
        .arg(demo_stack())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("stack converged"));
    assert!(state.exists());

    trellis()
        .args(["plan", "-f"])
        .arg(demo_stack())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("update-or-unchanged"));

    trellis()
        .args(["destroy", "-f"])
        .arg(demo_stack())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("stack destroyed"));

    let remaining: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&state).unwrap()).unwrap();
    assert_eq!(remaining, serde_json::json!({}));
}

#[test]
fn skip_group_leaves_the_group_unprovisioned() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    trellis()
        .args(["apply", "--skip-group", "code-execution", "-f"])
        .arg(demo_stack())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("toggle skipped"));
}

#[test]
fn cyclic_stack_exits_with_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let stack = dir.path().join("stack.yaml");
    std::fs::write(
        &stack,
        "name: demo\nnodes:\n  - id: a\n    kind: tool_group\n    depends_on: [b]\n  - id: b\n    kind: tool_group\n    depends_on: [a]\n",
    )
    .unwrap();

    trellis()
        .args(["plan", "-f"])
        .arg(&stack)
        .arg("--state")
        .arg(dir.path().join("state.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cycle involving"));
}

#[test]
fn missing_stack_file_exits_with_usage_error() {
    trellis()
        .args(["plan", "-f", "/nonexistent/stack.yaml"])
        .assert()
        .code(2);
}
