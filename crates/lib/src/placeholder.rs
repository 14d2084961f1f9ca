//! Toolchain placeholders in recipe command text.
//!
//! Link templates reference toolchain-wide values that are only known when a
//! recipe is realized: in emission mode they become make variables that the
//! consuming make run may override, in direct mode they are replaced by the
//! configured values.
//!
//! # Placeholder Format
//!
//! `$${name}` where `name` is one of `library_paths`, `default_library_paths`,
//! `default_libs`, `link_directives_exe`, `link_directives_lib`,
//! `include_paths` or `make`.
//!
//! Single `$` characters pass through unchanged, so `$HOME` or make's own
//! `$(VAR)` references survive. Use `$$$` before `{` for a literal `$${`.
//!
//! # Example
//!
//! ```
//! use atmake_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("g++ $${library_paths} -lfoo").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("g++ ".to_string()),
//!     Segment::Placeholder(Placeholder::LibraryPaths),
//!     Segment::Literal(" -lfoo".to_string()),
//! ]);
//! ```

use thiserror::Error;

/// A toolchain-wide value referenced from recipe text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
  LibraryPaths,
  DefaultLibraryPaths,
  DefaultLibs,
  LinkDirectivesExe,
  LinkDirectivesLib,
  IncludePaths,
  /// The make program used for recursion.
  Make,
}

impl Placeholder {
  pub const ALL: [Placeholder; 7] = [
    Self::LibraryPaths,
    Self::DefaultLibraryPaths,
    Self::DefaultLibs,
    Self::LinkDirectivesExe,
    Self::LinkDirectivesLib,
    Self::IncludePaths,
    Self::Make,
  ];

  fn from_name(name: &str) -> Result<Self, PlaceholderError> {
    Self::ALL
      .into_iter()
      .find(|p| p.name() == name)
      .ok_or_else(|| PlaceholderError::Unknown(name.to_string()))
  }

  /// Name as written between the braces.
  pub fn name(&self) -> &'static str {
    match self {
      Self::LibraryPaths => "library_paths",
      Self::DefaultLibraryPaths => "default_library_paths",
      Self::DefaultLibs => "default_libs",
      Self::LinkDirectivesExe => "link_directives_exe",
      Self::LinkDirectivesLib => "link_directives_lib",
      Self::IncludePaths => "include_paths",
      Self::Make => "make",
    }
  }

  /// Name of the make variable carrying this value in generated rules.
  pub fn make_variable(&self) -> &'static str {
    match self {
      Self::LibraryPaths => "LIBRARY_PATHS",
      Self::DefaultLibraryPaths => "DEFAULT_LIBRARY_PATHS",
      Self::DefaultLibs => "DEFAULT_LIBS",
      Self::LinkDirectivesExe => "LINK_DIRECTIVES_EXE",
      Self::LinkDirectivesLib => "LINK_DIRECTIVES_LIB",
      Self::IncludePaths => "INCLUDE_PATHS",
      Self::Make => "MAKE",
    }
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("placeholder '{0}' has no value in this context")]
  Unresolved(&'static str),
}

/// Supplies values for placeholders.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or names an unknown value.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();
            if let Some((_, '{')) = chars.peek() {
              // $$${ -> literal $${
              literal.push_str("$${");
              chars.next();
            } else {
              literal.push_str("$$$");
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut name = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
              if c == '}' {
                closed = true;
                break;
              }
              name.push(c);
            }

            if !closed {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(Placeholder::from_name(name.trim())?));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => result.push_str(&resolver.resolve(*p)?),
    }
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  struct TestResolver {
    values: HashMap<Placeholder, String>,
  }

  impl TestResolver {
    fn new() -> Self {
      Self { values: HashMap::new() }
    }

    fn with(mut self, placeholder: Placeholder, value: &str) -> Self {
      self.values.insert(placeholder, value.to_string());
      self
    }
  }

  impl Resolver for TestResolver {
    fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError> {
      self
        .values
        .get(&placeholder)
        .cloned()
        .ok_or(PlaceholderError::Unresolved(placeholder.name()))
    }
  }

  mod parsing {
    use super::*;

    #[test]
    fn plain_text_is_one_literal() {
      assert_eq!(
        parse("g++ -o out a.o").unwrap(),
        vec![Segment::Literal("g++ -o out a.o".to_string())]
      );
    }

    #[test]
    fn every_known_name_parses() {
      for placeholder in Placeholder::ALL {
        let text = format!("$${{{}}}", placeholder.name());
        assert_eq!(parse(&text).unwrap(), vec![Segment::Placeholder(placeholder)]);
      }
    }

    #[test]
    fn make_variables_pass_through() {
      assert_eq!(
        parse("$(MAKE) -f $HOME/x.mk").unwrap(),
        vec![Segment::Literal("$(MAKE) -f $HOME/x.mk".to_string())]
      );
    }

    #[test]
    fn escaped_placeholder_is_literal() {
      assert_eq!(
        parse("$$${library_paths}").unwrap(),
        vec![Segment::Literal("$${library_paths}".to_string())]
      );
    }

    #[test]
    fn unknown_name_is_rejected() {
      assert_eq!(
        parse("$${compiler}"),
        Err(PlaceholderError::Unknown("compiler".to_string()))
      );
    }

    #[test]
    fn unclosed_placeholder_is_rejected() {
      assert_eq!(parse("g++ $${library_paths"), Err(PlaceholderError::Unclosed(4)));
    }
  }

  mod substitution {
    use super::*;

    #[test]
    fn link_line_with_configured_paths() {
      let resolver = TestResolver::new()
        .with(Placeholder::LibraryPaths, "-L/opt/casual/lib")
        .with(Placeholder::DefaultLibs, "-lpthread");

      let result = substitute("g++ -o bin/x a.o $${library_paths} -lfoo $${default_libs}", &resolver).unwrap();
      assert_eq!(result, "g++ -o bin/x a.o -L/opt/casual/lib -lfoo -lpthread");
    }

    #[test]
    fn missing_value_propagates() {
      let resolver = TestResolver::new();
      assert_eq!(
        substitute("$${make} -f x.mk", &resolver),
        Err(PlaceholderError::Unresolved("make"))
      );
    }
  }
}
