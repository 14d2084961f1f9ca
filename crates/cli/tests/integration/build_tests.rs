//! Build and clean command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_install_copies_file() {
  let env = TestEnv::from_fixture("install.lua");
  env.write_file("data.txt", "payload");

  env
    .atmake_cmd()
    .arg("build")
    .arg(&env.descriptor)
    .arg("install")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete"));

  let installed = env.output_path().join("share/data.txt");
  assert_eq!(std::fs::read_to_string(installed).unwrap(), "payload");
}

#[test]
fn build_missing_install_source_fails() {
  let env = TestEnv::from_fixture("install.lua");

  env
    .atmake_cmd()
    .arg("build")
    .arg(&env.descriptor)
    .arg("install")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build failed"));
}

#[test]
fn build_prints_include_paths() {
  let env = TestEnv::empty();
  env.write_file("atmake.lua", "-- nothing declared\n");

  env
    .atmake_cmd()
    .env("ATMAKE_INCLUDE_PATHS", "/opt/casual/include")
    .arg("build")
    .arg(&env.descriptor)
    .arg("print_include_paths")
    .assert()
    .success()
    .stdout(predicate::str::contains("-I/opt/casual/include"));
}

#[test]
fn build_unknown_target_fails() {
  let env = TestEnv::from_fixture("library.lua");

  env
    .atmake_cmd()
    .arg("build")
    .arg(&env.descriptor)
    .arg("nothing_by_that_name")
    .assert()
    .failure();
}

#[test]
fn build_json_summary() {
  let env = TestEnv::from_fixture("install.lua");
  env.write_file("data.txt", "payload");

  let output = env
    .atmake_cmd()
    .arg("build")
    .arg(&env.descriptor)
    .arg("install")
    .arg("-o")
    .arg("json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(summary["success"], true);
  assert!(!summary["rebuilt"].as_array().unwrap().is_empty());
}

#[test]
fn clean_without_artifacts_succeeds() {
  let env = TestEnv::from_fixture("library.lua");

  env.atmake_cmd().arg("clean").arg(&env.descriptor).assert().success();
}
