//! CLI integration tests for dockyard.
//!
//! These tests drive the binary through the commands that never run an
//! upstream build: options, plan, clean, completions and the preflight
//! failures of package.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the dockyard binary command, isolated from the user's config.
fn dockyard(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dockyard").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("DOCKYARD_DEPS_PREFIX")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory for a test run.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const LINUX_GCC: [&str; 8] = [
    "--os",
    "linux",
    "--arch",
    "x86_64",
    "--compiler",
    "gcc",
    "--compiler-version",
    "12",
];

// ============================================================================
// dockyard options
// ============================================================================

#[test]
fn test_options_linux_with_openssl() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .arg("options")
        .args(LINUX_GCC)
        .args(["-o", "with_openssl=true"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "libpq 10.4 (linux-x86_64 gcc 12 (release))",
        ))
        .stdout(predicate::str::contains("  with_openssl = true"))
        .stdout(predicate::str::contains("OpenSSL/1.0.2o@conan/stable"));
}

#[test]
fn test_options_windows_json() {
    let tmp = temp_dir();

    let output = dockyard(tmp.path())
        .args(["--message-format", "json", "options", "--os", "windows"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["settings"]["compiler"], "msvc");
    assert_eq!(report["removed"], serde_json::json!(["fPIC", "shared"]));
    assert!(report["options"].get("shared").is_none());
    assert_eq!(report["requirements"], serde_json::json!([]));
}

#[test]
fn test_options_invalid_value() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .arg("options")
        .args(LINUX_GCC)
        .args(["-o", "shared=maybe"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "invalid value `maybe` for option `shared`",
        ));
}

#[test]
fn test_options_unknown_option() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .arg("options")
        .args(LINUX_GCC)
        .args(["-o", "with_ldap=true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown option `with_ldap`"));
}

#[test]
fn test_options_malformed_assignment() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["options", "-o", "shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected `name=value`"));
}

#[test]
fn test_unknown_builtin_recipe() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["options", "sqlite"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no built-in recipe named `sqlite`"));
}

// ============================================================================
// dockyard plan
// ============================================================================

#[test]
fn test_plan_staged_json() {
    let tmp = temp_dir();

    let output = dockyard(tmp.path())
        .args(["--message-format", "json", "plan"])
        .args(["--os", "macos", "--arch", "armv8", "-o", "with_zlib=true"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["strategy"], "staged");
    assert_eq!(plan["component"], "src/interfaces/libpq");
    assert_eq!(plan["stages"][0], "configure");
    assert_eq!(
        plan["requirements"],
        serde_json::json!(["zlib/1.2.11@conan/stable"])
    );
}

#[test]
fn test_plan_script_text() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["plan", "--os", "windows", "--build-type", "debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: script"))
        .stdout(predicate::str::contains("(debug)"));
}

#[test]
fn test_plan_from_recipe_file() {
    let tmp = temp_dir();
    let recipe = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/recipes/libpq.toml");

    dockyard(tmp.path())
        .arg("plan")
        .arg(&recipe)
        .args(LINUX_GCC)
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: staged"));
}

#[test]
fn test_plan_unsupported_platform() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["plan", "--os", "windows", "--compiler", "gcc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unsupported platform"));
}

#[test]
fn test_invalid_setting() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["plan", "--os", "plan9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid os 'plan9'"));
}

// ============================================================================
// dockyard package (preflight failures only)
// ============================================================================

#[test]
fn test_package_missing_dependency_json() {
    let tmp = temp_dir();

    let output = dockyard(tmp.path())
        .args(["--message-format", "json", "package"])
        .args(LINUX_GCC)
        .args(["-o", "with_openssl=true", "--source-dir", "upstream"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let event: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(event["reason"], "package-failed");
    assert_eq!(event["code"], "dockyard::deps::unavailable");

    // Nothing was fetched or built
    assert!(!tmp.path().join(".dockyard/work").exists());
    assert!(!tmp.path().join(".dockyard/package").exists());
}

#[test]
fn test_package_unsupported_platform_touches_nothing() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["package", "--os", "windows", "--compiler", "clang"])
        .args(["--source-dir", "upstream"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported platform"))
        .stderr(predicate::str::contains("help"));

    assert!(!tmp.path().join(".dockyard").exists());
}

// ============================================================================
// dockyard clean
// ============================================================================

#[test]
fn test_clean_removes_work_dir() {
    let tmp = temp_dir();
    let work = tmp.path().join(".dockyard/work/libpq");
    let package = tmp.path().join(".dockyard/package/libpq");
    fs::create_dir_all(work.join("output")).unwrap();
    fs::create_dir_all(&package).unwrap();

    dockyard(tmp.path())
        .arg("clean")
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!work.exists());
    assert!(package.exists());
}

#[test]
fn test_clean_with_package() {
    let tmp = temp_dir();
    let package = tmp.path().join(".dockyard/package/libpq");
    fs::create_dir_all(&package).unwrap();

    dockyard(tmp.path())
        .args(["clean", "--package"])
        .assert()
        .success();

    assert!(!package.exists());
}

// ============================================================================
// dockyard completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    dockyard(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dockyard"));
}
