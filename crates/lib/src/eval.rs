//! Descriptor evaluation.
//!
//! [`evaluate_descriptor`] runs a Lua descriptor against a fresh [`Session`]
//! and returns the finalized session holding everything it declared.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::lua::runtime;
use crate::session::{Session, SessionError};

/// Errors that can occur during descriptor evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  /// A declaration was rejected, or the descriptor could not be opened.
  #[error("{}: {source}", descriptor.display())]
  Session {
    descriptor: PathBuf,
    #[source]
    source: SessionError,
  },

  /// The script itself failed.
  #[error("{}: lua error: {source}", descriptor.display())]
  Lua {
    descriptor: PathBuf,
    #[source]
    source: LuaError,
  },

  #[error("{}: declarations are still referenced after evaluation", descriptor.display())]
  Leaked { descriptor: PathBuf },
}

impl EvalError {
  /// The declaration error behind this failure, if any.
  pub fn session_error(&self) -> Option<&SessionError> {
    match self {
      Self::Session { source, .. } => Some(source),
      _ => None,
    }
  }
}

/// Evaluate a descriptor and return its finalized session.
///
/// This function:
/// 1. Opens a session rooted at the descriptor's directory
/// 2. Creates a Lua runtime with the `make` global bound to that session
/// 3. Runs the descriptor
/// 4. Finalizes the session (clean recipes, meta wiring)
///
/// Declaration errors raised inside Lua callbacks surface as
/// [`EvalError::Session`] rather than as opaque Lua errors.
pub fn evaluate_descriptor(path: &Path, config: &Config) -> Result<Session, EvalError> {
  let session = Session::open(path, config.clone()).map_err(|source| EvalError::Session {
    descriptor: path.to_path_buf(),
    source,
  })?;
  let descriptor = session.descriptor().to_path_buf();
  info!(descriptor = %descriptor.display(), "evaluating descriptor");

  let session = Rc::new(RefCell::new(session));

  // The runtime holds clones of the session; it must be gone before unwrapping.
  {
    let lua = runtime::create_runtime(Rc::clone(&session)).map_err(|e| from_lua(&descriptor, e))?;
    runtime::load_file(&lua, &descriptor).map_err(|e| from_lua(&descriptor, e))?;
  }

  let mut session = Rc::try_unwrap(session)
    .map_err(|_| EvalError::Leaked {
      descriptor: descriptor.clone(),
    })?
    .into_inner();

  session.finalize().map_err(|source| EvalError::Session {
    descriptor: descriptor.clone(),
    source,
  })?;

  debug!(
    descriptor = %descriptor.display(),
    targets = session.graph().len(),
    warnings = session.messages().snapshot().len(),
    "descriptor evaluated"
  );
  Ok(session)
}

fn from_lua(descriptor: &Path, error: LuaError) -> EvalError {
  match declaration_error(&error) {
    Some(source) => EvalError::Session {
      descriptor: descriptor.to_path_buf(),
      source,
    },
    None => EvalError::Lua {
      descriptor: descriptor.to_path_buf(),
      source: error,
    },
  }
}

fn declaration_error(error: &LuaError) -> Option<SessionError> {
  match error {
    LuaError::CallbackError { cause, .. } | LuaError::WithContext { cause, .. } => declaration_error(cause),
    LuaError::ExternalError(inner) => inner.downcast_ref::<SessionError>().cloned(),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;
  use crate::graph::{GraphError, TargetKind};
  use crate::platform::PlatformId;
  use crate::recipe::ValidationError;

  fn config() -> Config {
    Config {
      platform: PlatformId::Linux,
      ..Config::default()
    }
  }

  fn evaluate(script: &str) -> (TempDir, Result<Session, EvalError>) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("atmake.lua");
    fs::write(&path, script).unwrap();
    let result = evaluate_descriptor(&path, &config());
    (temp, result)
  }

  mod declarations {
    use super::*;

    #[test]
    fn library_and_executable() {
      let (temp, result) = evaluate(
        r#"
          local foo = make.link_library("foo", { "a.o", "b.o" }, {})
          make.link_executable("bar", { "bar.o" }, { "foo" })
          assert(foo == "target_foo")
        "#,
      );
      let session = result.unwrap();
      let root = dunce::canonicalize(temp.path()).unwrap();

      assert!(session.is_finalized());
      let foo = session.lookup("foo").unwrap();
      assert_eq!(foo.path, Some(root.join("bin/libfoo.so")));
      assert_eq!(foo.inputs[0], root.join("a.o"));
      let bar = session.lookup("bar").unwrap();
      assert_eq!(bar.kind, TargetKind::File);
      session.validate().unwrap();
    }

    #[test]
    fn server_with_services_and_definition_file() {
      let (_temp, result) = evaluate(
        r#"
          make.link_server("queue", { "queue.o" }, {}, { "enqueue", "dequeue" })
          make.link_server("admin", { "admin.o" }, {}, "admin.yaml", { "-v" })
        "#,
      );
      let session = result.unwrap();
      assert_eq!(session.lookup("queue").unwrap().name, "target_queue_xatmi");
      assert!(
        session
          .lookup("admin")
          .unwrap()
          .inputs
          .iter()
          .any(|p| p.ends_with("admin.yaml"))
      );
    }

    #[test]
    fn install_build_and_depends() {
      let (_temp, result) = evaluate(
        r#"
          local bar = make.link_executable("bar", { "bar.o" }, {})
          make.install("bar", "/opt/casual/bin")
          make.build("sub/atmake.lua")
          make.depends(bar, { "target_generated" })
          assert(make.target("bar") == bar)
        "#,
      );
      let session = result.unwrap();
      let deps: Vec<_> = session
        .graph()
        .dependencies("target_bar")
        .into_iter()
        .map(|(t, _)| t.name.clone())
        .collect();
      assert!(deps.contains(&"target_generated".to_string()));
      assert!(
        session
          .graph()
          .dependencies("install")
          .iter()
          .any(|(t, _)| t.kind == TargetKind::Phony)
      );
    }

    #[test]
    fn paths_and_platform() {
      let (temp, result) = evaluate(
        r#"
          assert(make.platform == "linux")
          assert(make.paths.shared_library("foo") == make.dir .. "/bin/libfoo.so")
          assert(make.paths.archive("foo") == make.dir .. "/bin/libfoo.a")
          assert(make.paths.executable("bar") == make.dir .. "/bin/bar")
          assert(make.paths.bind("queue") == make.dir .. "/bin/queue.bnd")
          assert(make.paths.header("queue.h") == make.dir .. "/inc/queue.h")
          assert(make.file == make.dir .. "/atmake.lua")
        "#,
      );
      result.unwrap();
      drop(temp);
    }

    #[test]
    fn warnings_are_buffered() {
      let (_temp, result) = evaluate(r#"make.warn("queue: experimental")"#);
      assert_eq!(
        result.unwrap().messages().snapshot(),
        vec!["queue: experimental".to_string()]
      );
    }
  }

  mod errors {
    use super::*;

    #[test]
    fn string_where_list_expected() {
      let (_temp, result) = evaluate(r#"make.link_library("foo", "a.o", {})"#);
      let err = result.unwrap_err();
      assert!(matches!(
        err.session_error(),
        Some(SessionError::Validation(ValidationError::NotAList(content))) if content == "a.o"
      ));
    }

    #[test]
    fn collision_surfaces_as_graph_error() {
      let (_temp, result) = evaluate(
        r#"
          make.link_library("foo", { "a.o" }, {})
          make.link_library("foo", { "b.o" }, {})
        "#,
      );
      assert!(matches!(
        result.unwrap_err().session_error(),
        Some(SessionError::Graph(GraphError::NameCollision { .. }))
      ));
    }

    #[test]
    fn unknown_target_lookup_fails() {
      let (_temp, result) = evaluate(r#"make.target("nothing")"#);
      assert!(matches!(
        result.unwrap_err().session_error(),
        Some(SessionError::Graph(GraphError::UnresolvedDependency(_)))
      ));
    }

    #[test]
    fn syntax_error_is_a_lua_error() {
      let (_temp, result) = evaluate("make.link_library(");
      assert!(matches!(result.unwrap_err(), EvalError::Lua { .. }));
    }

    #[test]
    fn missing_descriptor() {
      let temp = TempDir::new().unwrap();
      let err = evaluate_descriptor(&temp.path().join("atmake.lua"), &config()).unwrap_err();
      assert!(matches!(
        err.session_error(),
        Some(SessionError::Descriptor { .. })
      ));
    }
  }
}
