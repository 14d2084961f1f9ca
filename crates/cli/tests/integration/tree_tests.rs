//! Tree command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_content};

fn source_tree() -> TestEnv {
  let env = TestEnv::empty();
  env.write_file("atmake.lua", r#"make.build("queue/atmake.lua")"#);
  env.write_file("queue/atmake.lua", &fixture_content("library.lua"));
  env.write_file("xatmi/atmake.lua", &fixture_content("warning.lua"));
  env
}

#[test]
fn tree_regenerates_every_descriptor() {
  let env = source_tree();

  env
    .atmake_cmd()
    .arg("tree")
    .arg(env.root())
    .assert()
    .success()
    .stdout(predicate::str::contains("Regenerated 3 rule file(s)"))
    .stderr(predicate::str::contains("queue definitions are deprecated"));

  for rules in ["atmake.mk", "queue/atmake.mk", "xatmi/atmake.mk"] {
    assert!(env.root().join(rules).exists(), "{rules} missing");
  }
}

#[test]
fn tree_skips_fresh_rules() {
  let env = source_tree();
  env.atmake_cmd().arg("tree").arg(env.root()).assert().success();

  env
    .atmake_cmd()
    .arg("tree")
    .arg(env.root())
    .assert()
    .success()
    .stdout(predicate::str::contains("Regenerated 0 rule file(s)"));

  env
    .atmake_cmd()
    .arg("tree")
    .arg(env.root())
    .arg("--force")
    .assert()
    .success()
    .stdout(predicate::str::contains("Regenerated 3 rule file(s)"));
}

#[test]
fn tree_json_report() {
  let env = source_tree();

  let output = env.atmake_cmd().arg("tree").arg(env.root()).arg("-o").arg("json").output().unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["regenerated"].as_array().unwrap().len(), 3);
  assert_eq!(report["fresh"].as_array().unwrap().len(), 0);
}

#[test]
fn tree_build_without_top_level_descriptor_fails() {
  let env = TestEnv::empty();
  env.write_file("queue/atmake.lua", r#"make.install("data.txt", "$TEST_OUTPUT_DIR/data.txt")"#);

  env
    .atmake_cmd()
    .arg("tree")
    .arg(env.root())
    .arg("--build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No top-level descriptor"));
}
