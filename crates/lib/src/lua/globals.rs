//! The `make` global table.
//!
//! This module registers the `make` table descriptors declare through:
//! - `make.link_library`, `make.link_executable`, `make.link_archive`,
//!   `make.link_server` - linked artifacts, returning the target handle;
//!   servers take an optional sixth `{ resources, configuration }` table
//! - `make.install(source, destination)` - install a file or artifact
//! - `make.build(descriptor)` - hand the global targets to a sub-descriptor
//! - `make.depends(handle, names)` - extra dependencies of a declared target
//! - `make.target(name)` - handle of a declared target
//! - `make.warn(message)` - buffered warning
//! - `make.paths` - artifact locations
//! - `make.platform`, `make.dir`, `make.file`

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use super::paths::create_path_table;
use super::values::{declaration_error, resources, services, string_list};
use crate::session::Session;

type LinkArgs = (String, LuaValue, LuaValue, LuaValue);
type ServerArgs = (String, LuaValue, LuaValue, LuaValue, LuaValue, LuaValue);

/// Register the `make` global bound to `session`.
pub fn register_globals(lua: &Lua, session: Rc<RefCell<Session>>) -> LuaResult<()> {
  let make = lua.create_table()?;

  {
    let current = session.borrow();
    make.set("platform", current.config().platform.as_str())?;
    make.set("dir", current.root().display().to_string())?;
    make.set("file", current.descriptor().display().to_string())?;
  }
  make.set("paths", create_path_table(lua, Rc::clone(&session))?)?;

  let s = Rc::clone(&session);
  make.set(
    "link_library",
    lua.create_function(move |_, (name, objects, libraries, directives): LinkArgs| {
      let objects = string_list(objects)?;
      s.borrow_mut()
        .link_library(&name, &objects, &string_list(libraries)?, &string_list(directives)?)
        .map_err(declaration_error)
    })?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "link_executable",
    lua.create_function(move |_, (name, objects, libraries, directives): LinkArgs| {
      let objects = string_list(objects)?;
      s.borrow_mut()
        .link_executable(&name, &objects, &string_list(libraries)?, &string_list(directives)?)
        .map_err(declaration_error)
    })?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "link_archive",
    lua.create_function(move |_, (name, objects, directives): (String, LuaValue, LuaValue)| {
      let objects = string_list(objects)?;
      s.borrow_mut()
        .link_archive(&name, &objects, &string_list(directives)?)
        .map_err(declaration_error)
    })?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "link_server",
    lua.create_function(
      move |_, (name, objects, libraries, service_list, directives, options): ServerArgs| {
        let objects = string_list(objects)?;
        s.borrow_mut()
          .link_server(
            &name,
            &objects,
            &string_list(libraries)?,
            services(service_list)?,
            resources(options)?,
            &string_list(directives)?,
          )
          .map_err(declaration_error)
      },
    )?,
  )?;

  // A list of sources installs each one and returns a list of handles.
  let s = Rc::clone(&session);
  make.set(
    "install",
    lua.create_function(move |lua, (source, destination): (LuaValue, String)| {
      if let LuaValue::String(source) = &source {
        let name = s
          .borrow_mut()
          .install(&source.to_str()?, &destination)
          .map_err(declaration_error)?;
        return Ok(LuaValue::String(lua.create_string(name)?));
      }

      let mut names = Vec::new();
      for source in string_list(source)? {
        names.push(s.borrow_mut().install(&source, &destination).map_err(declaration_error)?);
      }
      Ok(LuaValue::Table(lua.create_sequence_from(names)?))
    })?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "build",
    lua.create_function(move |_, descriptor: String| s.borrow_mut().build(&descriptor).map_err(declaration_error))?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "depends",
    lua.create_function(move |_, (target, names): (String, LuaValue)| {
      let names = string_list(names)?;
      s.borrow_mut().depend(&target, &names).map_err(declaration_error)
    })?,
  )?;

  let s = Rc::clone(&session);
  make.set(
    "target",
    lua.create_function(move |_, name: String| {
      s.borrow()
        .lookup(&name)
        .map(|target| target.name.clone())
        .map_err(declaration_error)
    })?,
  )?;

  make.set(
    "warn",
    lua.create_function(move |_, message: String| {
      session.borrow().warn(message);
      Ok(())
    })?,
  )?;

  lua.globals().set("make", make)?;

  Ok(())
}
