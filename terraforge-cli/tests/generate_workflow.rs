//! Integration tests for the CLI workflows.
//!
//! These run the compiled `terraforge` binary against temporary
//! directories. The generate test relies only on the synthetic fallback
//! source, so no network access or credentials are required.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn terraforge_cmd(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_terraforge"));
    cmd.current_dir(workdir);
    cmd
}

#[test]
fn cache_stats_on_empty_cache() {
    let tmp = TempDir::new().unwrap();
    let cache_dir = tmp.path().join("cache");

    let output = terraforge_cmd(tmp.path())
        .args(["cache", "stats"])
        .arg("--cache-dir")
        .arg(&cache_dir)
        .output()
        .expect("failed to run terraforge");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("entries:     0"), "stdout: {stdout}");
}

#[test]
fn generate_produces_artifacts_from_synthetic_fallback() {
    let tmp = TempDir::new().unwrap();
    let cache_dir = tmp.path().join("cache");
    let output_dir = tmp.path().join("out");

    let output = terraforge_cmd(tmp.path())
        .args([
            "generate",
            "--name",
            "smoke",
            "--north",
            "47.05",
            "--south",
            "47.0",
            "--east",
            "8.05",
            "--west",
            "8.0",
            "--resolution",
            "64",
            "--format",
            "unity",
            "--no-weightmaps",
        ])
        .arg("--output")
        .arg(&output_dir)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .output()
        .expect("failed to run terraforge");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Done:"), "stdout: {stdout}");

    let terrain_dir = output_dir.join("smoke");
    assert!(terrain_dir.join("result.json").exists());
    assert!(terrain_dir.join("unity").join("smoke_terrain.raw").exists());

    // The run populated the cache
    assert!(cache_dir.join("index.json").exists());
}

#[test]
fn malformed_bbox_fails_fast() {
    let tmp = TempDir::new().unwrap();

    // north < south: rejected at admission, non-zero exit
    let output = terraforge_cmd(tmp.path())
        .args([
            "generate", "--name", "bad", "--north", "10.0", "--south", "20.0", "--east", "1.0",
            "--west", "0.0",
        ])
        .arg("--cache-dir")
        .arg(tmp.path().join("cache"))
        .output()
        .expect("failed to run terraforge");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("submit failed"), "stderr: {stderr}");
}
