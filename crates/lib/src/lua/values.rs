//! Conversions from Lua arguments to declaration arguments.

use std::path::PathBuf;

use mlua::prelude::*;

use crate::recipe::{Resources, Services, ValidationError};
use crate::session::SessionError;

/// Wrap a declaration error so it survives the trip through Lua.
pub fn declaration_error(error: impl Into<SessionError>) -> LuaError {
  LuaError::external(error.into())
}

/// A list of strings; `nil` is the empty list.
///
/// A plain string is rejected: `{ "a.o" }` is meant, and silently accepting
/// `"a.o"` would hide typos like a missing table constructor.
pub fn string_list(value: LuaValue) -> LuaResult<Vec<String>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::Table(table) => table.sequence_values::<String>().collect(),
    other => Err(declaration_error(ValidationError::NotAList(describe(&other)))),
  }
}

/// Service names as a list, or a service definition file as a string.
pub fn services(value: LuaValue) -> LuaResult<Services> {
  match value {
    LuaValue::String(path) => Ok(Services::DefinitionFile(PathBuf::from(path.to_str()?.as_ref()))),
    LuaValue::Table(_) => Ok(Services::Names(string_list(value)?)),
    other => Err(declaration_error(ValidationError::NotAList(describe(&other)))),
  }
}

/// Server options table: `{ resources = { "db2-rm" }, configuration = "resources.yaml" }`.
///
/// `nil` means no resources.
pub fn resources(value: LuaValue) -> LuaResult<Resources> {
  match value {
    LuaValue::Nil => Ok(Resources::default()),
    LuaValue::Table(options) => Ok(Resources {
      keys: string_list(options.get::<LuaValue>("resources")?)?,
      configuration: options.get::<Option<String>>("configuration")?.map(PathBuf::from),
    }),
    other => Err(declaration_error(ValidationError::NotAList(describe(&other)))),
  }
}

fn describe(value: &LuaValue) -> String {
  value.to_string().unwrap_or_else(|_| value.type_name().to_string())
}
