//! Fixed names shared across the crate.

pub const APP_NAME: &str = "atmake";

/// Default descriptor file name looked up in a source directory.
pub const DESCRIPTOR_FILE_NAME: &str = "atmake.lua";

/// Extension of the rule file generated next to each descriptor.
pub const RULES_EXTENSION: &str = "mk";

/// Program invoked by generated rules to regenerate a stale rule file.
pub const GENERATOR: &str = "atmake generate";

/// Script invoked for per-artifact deploy targets.
pub const DEPLOY_SCRIPT: &str = "make.deploy.ksh";

/// Directory (relative to the descriptor) receiving linked artifacts.
pub const ARTIFACT_DIR: &str = "bin";

/// Directory (relative to the descriptor) holding `require`-able Lua modules.
pub const MODULE_DIR: &str = "lua";

/// Directory (relative to the descriptor) holding headers.
pub const HEADER_DIR: &str = "inc";

pub const OBJECT_SUFFIX: &str = ".o";
pub const CROSS_OBJECT_SUFFIX: &str = "_crosscompile.o";

/// Meta targets that only aggregate dependencies and never carry recipes.
pub const META_TARGETS: &[&str] = &["all", "compile", "clean", "cross", "deploy", "install"];

/// Pseudo targets pre-registered in every session next to the meta targets.
pub const PSEUDO_TARGETS: &[&str] = &[
  "make",
  "link",
  "clean_files",
  "clean_objectfiles",
  "clean_dependencyfiles",
  "print_include_paths",
];

/// Targets forwarded into every sub-descriptor declared with `make.build`.
pub const GLOBAL_BUILD_TARGETS: &[&str] = &[
  "all",
  "cross",
  "clean_files",
  "clean_objectfiles",
  "clean_dependencyfiles",
  "compile",
  "deploy",
  "install",
  "print_include_paths",
];
