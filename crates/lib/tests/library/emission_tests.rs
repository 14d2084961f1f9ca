//! Evaluate descriptors and check the emitted rules.

use atmake_lib::emit::emit;
use atmake_lib::eval::evaluate_descriptor;

use super::common::{SourceTree, linux};

#[test]
fn server_links_against_library_declared_earlier() {
  let tree = SourceTree::new();
  let descriptor = tree.write(
    "atmake.lua",
    r#"
      local lib = make.link_library("queue-common", { "common.o" }, {})
      make.link_server("queue", { "queue.o" }, { "queue-common" }, { "enqueue", "dequeue" })
      make.install(make.paths.server("queue"), "$CASUAL_HOME/bin/queue")
    "#,
  );

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  let rules = emit(&session).unwrap();
  let root = tree.display();

  assert!(rules.contains(&format!("target_queue_xatmi: {root}/bin/queue\n")));
  assert!(rules.contains(&format!("{root}/bin/libqueue-common.so")));
  assert!(rules.contains("-s enqueue dequeue"), "{rules}");
  assert!(rules.contains("install:"));
}

#[test]
fn every_produced_file_is_cleaned_once() {
  let tree = SourceTree::new();
  let descriptor = tree.write(
    "atmake.lua",
    r#"
      make.link_library("foo", { "a.o" }, {})
      make.link_executable("bar", { "bar.o" }, { "foo" })
    "#,
  );

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  let rules = emit(&session).unwrap();

  let clean: Vec<&str> = rules
    .lines()
    .skip_while(|line| *line != "clean_files:")
    .skip(1)
    .take_while(|line| line.starts_with('\t'))
    .collect();
  for artifact in ["bin/libfoo.so", "bin/bar"] {
    let line = format!("\t-rm -f {}", tree.path(artifact).display());
    assert_eq!(clean.iter().filter(|l| **l == line).count(), 1, "{clean:?}");
  }
}

#[test]
fn sub_descriptor_gets_recursion_targets() {
  let tree = SourceTree::new();
  let descriptor = tree.write("atmake.lua", r#"make.build("queue/atmake.lua")"#);
  tree.write("queue/atmake.lua", r#"make.link_library("queue", { "q.o" }, {})"#);

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  let rules = emit(&session).unwrap();
  let sub = tree.path("queue/atmake.mk").display().to_string();

  assert!(rules.contains(&format!("{sub}: {}", tree.path("queue/atmake.lua").display())));
  assert!(rules.contains("$(MAKE) -f"));
  assert!(rules.contains(&format!("atmake generate {}", tree.path("queue/atmake.lua").display())));
}

#[test]
fn emission_is_deterministic() {
  let tree = SourceTree::new();
  let descriptor = tree.write(
    "atmake.lua",
    r#"
      make.link_archive("util", { "u1.o", "u2.o" })
      make.link_library("foo", { "a.o" }, {})
      make.build("queue/atmake.lua")
    "#,
  );
  tree.write("queue/atmake.lua", "");

  let first = emit(&evaluate_descriptor(&descriptor, &linux()).unwrap()).unwrap();
  let second = emit(&evaluate_descriptor(&descriptor, &linux()).unwrap()).unwrap();
  assert_eq!(first, second);
}
