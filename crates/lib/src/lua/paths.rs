use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use crate::naming::ArtifactKind;
use crate::session::Session;

/// Create the `make.paths` table: where each kind of artifact ends up.
pub fn create_path_table(lua: &Lua, session: Rc<RefCell<Session>>) -> LuaResult<LuaTable> {
  let paths = lua.create_table()?;

  let kinds = [
    ("executable", ArtifactKind::Executable),
    ("shared_library", ArtifactKind::SharedLibrary),
    ("archive", ArtifactKind::Archive),
    ("server", ArtifactKind::Server),
    ("bind", ArtifactKind::Bind),
  ];
  for (key, kind) in kinds {
    let session = Rc::clone(&session);
    paths.set(
      key,
      lua.create_function(move |_, name: String| {
        Ok(session.borrow().naming().artifact_path(kind, &name).display().to_string())
      })?,
    )?;
  }

  paths.set(
    "header",
    lua.create_function(move |_, name: String| Ok(session.borrow().naming().header_path(&name).display().to_string()))?,
  )?;

  Ok(paths)
}
