//! Descriptors sharing Lua helper modules.

use atmake_lib::emit::emit;
use atmake_lib::eval::evaluate_descriptor;

use super::common::{SourceTree, display, linux};

#[test]
fn helper_module_declares_targets() {
  let tree = SourceTree::new();
  tree.write(
    "lua/casual.lua",
    r#"
      local M = {}
      function M.library(name)
        return make.link_library(name, { name .. ".o" }, {})
      end
      return M
    "#,
  );
  let descriptor = tree.write(
    "atmake.lua",
    r#"
      local casual = require("casual")
      casual.library("xatmi")
    "#,
  );

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  let xatmi = session.lookup("xatmi").unwrap();
  assert_eq!(xatmi.inputs, vec![tree.path("xatmi.o")]);
}

#[test]
fn platform_is_visible_to_descriptors() {
  let tree = SourceTree::new();
  let descriptor = tree.write(
    "atmake.lua",
    r#"
      if make.platform == "linux" then
        make.link_library("linux-only", { "l.o" }, {})
      end
    "#,
  );

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  assert!(session.lookup("linux-only").is_ok());
}

#[test]
fn sub_rules_depend_on_sub_helper_modules() {
  let tree = SourceTree::new();
  let descriptor = tree.write("atmake.lua", r#"make.build("queue/atmake.lua")"#);
  tree.write("queue/lua/common.lua", r#"return { objects = { "q.o" } }"#);
  tree.write(
    "queue/atmake.lua",
    r#"make.link_library("queue", require("common").objects, {})"#,
  );

  let session = evaluate_descriptor(&descriptor, &linux()).unwrap();
  let rules = emit(&session).unwrap();
  let expected = format!(
    "{}: {} {}\n",
    display(&tree.path("queue/atmake.mk")),
    display(&tree.path("queue/atmake.lua")),
    display(&tree.path("queue/lua/common.lua")),
  );
  assert!(rules.contains(&expected), "{rules}");
}
