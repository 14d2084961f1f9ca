use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::consts::MODULE_DIR;
use crate::lua::globals;
use crate::session::Session;

/// Create a Lua runtime bound to `session`.
///
/// Modules under the descriptor's `lua/` directory can be `require`d, so
/// descriptors in one tree can share helper functions.
pub fn create_runtime(session: Rc<RefCell<Session>>) -> LuaResult<Lua> {
  let lua = Lua::new();
  let root = session.borrow().root().display().to_string();

  let package = lua.globals().get::<LuaTable>("package")?;
  let package_path = package.get::<String>("path")?;
  package.set(
    "path",
    format!("{root}/{MODULE_DIR}/?.lua;{root}/{MODULE_DIR}/?/init.lua;{package_path}"),
  )?;

  globals::register_globals(&lua, session)?;

  Ok(lua)
}

/// Load and run the descriptor at `path`.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<()> {
  let content = std::fs::read_to_string(path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;

  lua.load(&content).set_name(format!("@{}", path.display())).exec()
}
