use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn rejects_unknown_pipeline_stage() {
    let mut cmd = Command::cargo_bin("lamplit").expect("binary exists");
    cmd.env("LAMPLIT_STAGES", "spotlight,bloom");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("unknown stage `bloom`"));
}

#[cfg(target_os = "linux")]
#[test]
fn headless_start_reports_window_failure() {
    let mut cmd = Command::cargo_bin("lamplit").expect("binary exists");
    cmd.env_remove("DISPLAY").env_remove("WAYLAND_DISPLAY");
    cmd.assert()
        .failure()
        .code(255)
        .stderr(contains("failed to create window"));
}
