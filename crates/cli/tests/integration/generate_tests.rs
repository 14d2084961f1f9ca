//! Generate command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn generate_library_rules() {
  let env = TestEnv::from_fixture("library.lua");

  env.atmake_cmd().arg("generate").arg(&env.descriptor).assert().success();

  let rules = std::fs::read_to_string(env.root().join("atmake.mk")).unwrap();
  let root = env.root().display().to_string();
  assert!(rules.contains(&format!("{root}/bin/libfoo.so: {root}/a.o {root}/b.o")));
  assert!(rules.contains("target_bar:"));
  assert!(rules.contains("clean_files:"));
}

#[test]
fn generate_is_deterministic() {
  let env = TestEnv::from_fixture("library.lua");

  let first = env.atmake_cmd().arg("generate").arg(&env.descriptor).arg("--stdout").output().unwrap();
  let second = env.atmake_cmd().arg("generate").arg(&env.descriptor).arg("--stdout").output().unwrap();

  assert!(first.status.success());
  assert_eq!(first.stdout, second.stdout);
}

#[test]
fn generate_reports_validation_errors() {
  let env = TestEnv::from_fixture("not_a_list.lua");

  env
    .atmake_cmd()
    .arg("generate")
    .arg(&env.descriptor)
    .assert()
    .failure()
    .stderr(predicate::str::contains("not a list"));

  assert!(!env.root().join("atmake.mk").exists());
}

#[test]
fn warnings_go_to_stderr() {
  let env = TestEnv::from_fixture("warning.lua");

  env
    .atmake_cmd()
    .arg("generate")
    .arg(&env.descriptor)
    .arg("--stdout")
    .assert()
    .success()
    .stdout(predicate::str::contains("deprecated").not())
    .stderr(predicate::str::contains("queue definitions are deprecated"));
}

#[test]
fn generate_honours_include_paths() {
  let env = TestEnv::from_fixture("library.lua");

  env
    .atmake_cmd()
    .env("ATMAKE_INCLUDE_PATHS", "/opt/casual/include")
    .arg("generate")
    .arg(&env.descriptor)
    .arg("--stdout")
    .assert()
    .success()
    .stdout(predicate::str::contains("INCLUDE_PATHS ?= -I/opt/casual/include"));
}
