//! Make-compatible rule text for a finalized session.
//!
//! Emission is single-threaded and all-or-nothing: the session is validated
//! first and the whole text is built in memory, so a failing declaration
//! never leaves a partial rule file behind.
//!
//! Layout of the generated file:
//!
//! 1. header and the overridable toolchain variable block (`?=`)
//! 2. `.INTERMEDIATE` declarations and empty rules for placeholders
//! 3. local targets in registration order
//! 4. meta aggregates and the `make`, `link`, `print_include_paths` entries
//! 5. `.PHONY`, the `FORCE_NOTPARALLEL` guard and directory creation rules
//! 6. the clean blocks

use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::consts::{GENERATOR, META_TARGETS, PSEUDO_TARGETS};
use crate::graph::{EdgeKind, Target, TargetKind};
use crate::placeholder::{Placeholder, PlaceholderError, Resolver};
use crate::platform::Toolchain;
use crate::recipe::{ValidationError, render};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum EmitError {
  #[error("invalid session: {0}")]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Placeholder(#[from] PlaceholderError),

  #[error("formatting failed")]
  Format(#[from] std::fmt::Error),
}

/// Resolves placeholders to make variable references.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeResolver;

impl Resolver for MakeResolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError> {
    Ok(format!("$({})", placeholder.make_variable()))
  }
}

const CLEAN_TARGETS: [&str; 4] = ["clean", "clean_objectfiles", "clean_dependencyfiles", "clean_files"];

/// Render the rule file for `session`.
///
/// # Errors
///
/// Nothing is rendered when the session violates an invariant.
pub fn emit(session: &Session) -> Result<String, EmitError> {
  session.validate()?;

  let mut emitter = Emitter {
    session,
    toolchain: session.naming().toolchain(),
    out: String::new(),
  };
  emitter.header()?;
  emitter.intermediates()?;
  emitter.targets()?;
  emitter.aggregates()?;
  emitter.phony()?;
  emitter.directories()?;
  emitter.clean()?;

  debug!(
    descriptor = %session.descriptor().display(),
    bytes = emitter.out.len(),
    "rules emitted"
  );
  Ok(emitter.out)
}

fn is_builtin(name: &str) -> bool {
  META_TARGETS.contains(&name) || PSEUDO_TARGETS.contains(&name)
}

struct Emitter<'a> {
  session: &'a Session,
  toolchain: &'static dyn Toolchain,
  out: String,
}

impl Emitter<'_> {
  fn header(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    let config = session.config();
    writeln!(self.out, "#")?;
    writeln!(
      self.out,
      "# Generated by {GENERATOR} from {}",
      session.descriptor().display()
    )?;
    writeln!(self.out, "# Platform: {}", config.platform)?;
    writeln!(self.out, "#")?;
    writeln!(self.out)?;

    for variable in Placeholder::ALL {
      if let Some(value) = config.variable(variable) {
        writeln!(self.out, "{}", format!("{} ?= {value}", variable.make_variable()).trim_end())?;
      }
    }
    writeln!(self.out)?;
    Ok(())
  }

  fn intermediates(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    let placeholders: Vec<&Target> = session.graph().placeholders().collect();
    if placeholders.is_empty() {
      return Ok(());
    }

    writeln!(self.out, "#")?;
    writeln!(self.out, "# Not produced here; empty rules stand in when the real target is absent")?;
    writeln!(self.out, "#")?;
    for target in &placeholders {
      writeln!(self.out, ".INTERMEDIATE: {}", target.name)?;
    }
    writeln!(self.out)?;
    for target in &placeholders {
      writeln!(self.out, "{}:", target.name)?;
    }
    writeln!(self.out)?;
    Ok(())
  }

  fn targets(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    for target in session.graph().targets() {
      if is_builtin(&target.name) || target.kind == TargetKind::Directory {
        continue;
      }

      match (target.kind, &target.path) {
        (TargetKind::File, Some(path)) => {
          if let Some(kind) = target.artifact {
            let file_name = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
            writeln!(self.out, "# {kind}: {file_name}")?;
          }
          self.rule(&target.name, &[path.display().to_string()], &[], &[])?;
          self.target_rule(&path.display().to_string(), target)?;
        }
        _ => self.target_rule(&target.name, target)?,
      }
    }
    Ok(())
  }

  fn aggregates(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    let graph = session.graph();
    for name in META_TARGETS.iter().filter(|name| **name != "clean") {
      let Some(target) = graph.get(name) else {
        continue;
      };
      let mut prerequisites: Vec<String> = graph
        .dependencies(name)
        .into_iter()
        .map(|(dep, _)| dep.name.clone())
        .collect();
      prerequisites.extend(target.inputs.iter().map(|p| p.display().to_string()));
      self.rule(name, &prerequisites, &[], &[])?;
    }

    for name in ["make", "link", "print_include_paths"] {
      if let Some(target) = graph.get(name) {
        self.target_rule(name, target)?;
      }
    }
    Ok(())
  }

  fn phony(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    let graph = session.graph();
    let mut names: Vec<&str> = Vec::new();
    names.extend(META_TARGETS.iter().copied());
    names.extend(PSEUDO_TARGETS.iter().copied());
    for target in graph.targets() {
      if is_builtin(&target.name) {
        continue;
      }
      // Aliases of file targets are phony too.
      if matches!(target.kind, TargetKind::Phony | TargetKind::File) {
        names.push(&target.name);
      }
    }

    writeln!(self.out, ".PHONY: {}", names.join(" "))?;
    writeln!(self.out)?;

    if !session.config().parallel_make {
      writeln!(self.out, "ifdef FORCE_NOTPARALLEL")?;
      writeln!(self.out, ".NOTPARALLEL:")?;
      writeln!(self.out, "endif")?;
      writeln!(self.out)?;
    }
    Ok(())
  }

  fn directories(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    for directory in session.bookkeeping().directories() {
      let name = directory.display().to_string();
      match session.graph().get(&name) {
        Some(target) => self.target_rule(&name, target)?,
        None => self.rule(&name, &[], &[], &[format!("mkdir -p {name}")])?,
      }
    }
    Ok(())
  }

  fn clean(&mut self) -> Result<(), EmitError> {
    let session = self.session;
    let graph = session.graph();
    for name in CLEAN_TARGETS {
      if let Some(target) = graph.get(name) {
        self.target_rule(name, target)?;
      }
    }
    Ok(())
  }

  /// `head: inputs deps | order-only` followed by the target's recipe lines.
  fn target_rule(&mut self, head: &str, target: &Target) -> Result<(), EmitError> {
    let mut prerequisites: Vec<String> = target.inputs.iter().map(|p| p.display().to_string()).collect();
    let mut order_only: Vec<String> = Vec::new();

    let session = self.session;
    for (dependency, edge) in session.graph().dependencies(&target.name) {
      let reference = prerequisite(dependency);
      match edge {
        EdgeKind::Normal => prerequisites.push(reference),
        EdgeKind::OrderOnly => order_only.push(reference),
      }
    }

    let search_paths = session.link_search_paths(target);
    let mut lines = Vec::new();
    for recipe in &target.recipes {
      lines.extend(render::make_lines(recipe, self.toolchain, &search_paths, &MakeResolver)?);
    }

    self.rule(head, &prerequisites, &order_only, &lines)
  }

  fn rule(&mut self, head: &str, prerequisites: &[String], order_only: &[String], lines: &[String]) -> Result<(), EmitError> {
    let mut seen: Vec<&str> = Vec::new();
    write!(self.out, "{head}:")?;
    for prerequisite in prerequisites {
      if !seen.contains(&prerequisite.as_str()) {
        seen.push(prerequisite);
        write!(self.out, " {prerequisite}")?;
      }
    }
    if !order_only.is_empty() {
      write!(self.out, " |")?;
      for prerequisite in order_only {
        write!(self.out, " {prerequisite}")?;
      }
    }
    writeln!(self.out)?;
    for line in lines {
      writeln!(self.out, "\t{line}")?;
    }
    writeln!(self.out)?;
    Ok(())
  }
}

/// How a dependency is referenced from another rule: produced files by
/// path so make compares timestamps, everything else by name.
fn prerequisite(dependency: &Target) -> String {
  match (&dependency.path, dependency.is_local() && dependency.kind.produces_file()) {
    (Some(path), true) => display(path),
    _ => dependency.name.clone(),
  }
}

fn display(path: &Path) -> String {
  path.display().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::platform::PlatformId;
  use crate::recipe::{Resources, Services};
  use std::path::PathBuf;

  fn config() -> Config {
    Config {
      platform: PlatformId::Linux,
      library_paths: vec![PathBuf::from("/opt/casual/lib")],
      default_libs: vec!["pthread".to_string()],
      ..Config::default()
    }
  }

  fn session() -> Session {
    Session::new(PathBuf::from("/src/casual/atmake.lua"), config()).unwrap()
  }

  fn libs(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
  }

  fn lines_starting_with<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    text.lines().filter(|l| l.starts_with(prefix)).collect()
  }

  mod structure {
    use super::*;

    #[test]
    fn library_and_executable_rules() {
      let mut session = session();
      session.link_library("foo", &["a.o", "b.o"], &[], &[]).unwrap();
      session.link_executable("bar", &["bar.o"], &libs(&["foo"]), &[]).unwrap();
      session.finalize().unwrap();

      let text = emit(&session).unwrap();

      assert!(text.contains("target_foo: /src/casual/bin/libfoo.so\n"));
      assert!(text.contains(
        "/src/casual/bin/libfoo.so: /src/casual/a.o /src/casual/b.o /src/casual/atmake.lua | /src/casual/bin\n"
      ));
      assert!(text.contains(
        "/src/casual/bin/bar: /src/casual/bar.o /src/casual/atmake.lua /src/casual/bin/libfoo.so target_archive_foo | /src/casual/bin\n"
      ));
      assert!(text.contains("\tg++ -o /src/casual/bin/bar /src/casual/bar.o -L/src/casual/bin $(LIBRARY_PATHS)"));
      assert!(text.contains("\nall: target_foo target_bar\n"));
    }

    #[test]
    fn variable_block_carries_configuration() {
      let mut session = session();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();
      assert!(text.contains("LIBRARY_PATHS ?= -L/opt/casual/lib\n"));
      assert!(text.contains("DEFAULT_LIBS ?= -lpthread\n"));
      assert!(text.contains("LINK_DIRECTIVES_EXE ?=\n"));
    }

    #[test]
    fn placeholders_become_intermediate() {
      let mut session = session();
      session
        .link_executable("bar", &["bar.o"], &libs(&["casual-common"]), &[])
        .unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      assert!(text.contains(".INTERMEDIATE: target_casual-common\n"));
      assert!(text.contains(".INTERMEDIATE: target_archive_casual-common\n"));
      assert!(text.contains("\ntarget_casual-common:\n"));
      assert!(text.contains("/src/casual/atmake.lua target_casual-common target_archive_casual-common |"));
    }

    #[test]
    fn unfinalized_session_renders_nothing() {
      let mut session = session();
      session.link_library("foo", &["a.o"], &[], &[]).unwrap();
      assert!(matches!(emit(&session), Err(EmitError::Validation(_))));
    }
  }

  mod bookkeeping {
    use super::*;

    #[test]
    fn clean_lists_each_artifact_once() {
      let mut session = session();
      session.link_library("foo", &["obj/a.o"], &[], &[]).unwrap();
      session.link_library("foo", &["obj/a.o"], &[], &[]).unwrap();
      session.link_archive("foo", &["obj/a.o"], &[]).unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      let removals = lines_starting_with(&text, "\t-rm -f /src/casual/bin/");
      assert_eq!(
        removals,
        vec![
          "\t-rm -f /src/casual/bin/libfoo.a",
          "\t-rm -f /src/casual/bin/libfoo.so"
        ]
      );
      assert!(text.contains("clean_objectfiles:\n\t-rm -f /src/casual/obj/*.o\n"));
      assert!(text.contains("clean_dependencyfiles:\n\t-rm -f /src/casual/obj/*.d\n"));
      assert!(text.contains("clean: clean_objectfiles clean_dependencyfiles clean_files\n"));
    }

    #[test]
    fn output_directory_has_one_create_rule() {
      let mut session = session();
      session.link_library("foo", &["a.o"], &[], &[]).unwrap();
      session.link_executable("bar", &["b.o"], &[], &[]).unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      assert_eq!(lines_starting_with(&text, "/src/casual/bin:").len(), 1);
      assert_eq!(lines_starting_with(&text, "\tmkdir -p /src/casual/bin").len(), 1);
    }

    #[test]
    fn parallel_make_drops_guard() {
      let mut session = session();
      session.finalize().unwrap();
      assert!(emit(&session).unwrap().contains("ifdef FORCE_NOTPARALLEL\n.NOTPARALLEL:\nendif\n"));

      let config = Config {
        parallel_make: true,
        ..config()
      };
      let mut session = Session::new(PathBuf::from("/src/casual/atmake.lua"), config).unwrap();
      session.finalize().unwrap();
      assert!(!emit(&session).unwrap().contains(".NOTPARALLEL"));
    }
  }

  mod recipes {
    use super::*;

    #[test]
    fn server_lists_services_in_order() {
      let mut session = session();
      session
        .link_server(
          "queue",
          &["queue.o"],
          &[],
          Services::Names(libs(&["svc1", "svc2", "svc3"])),
          Resources::default(),
          &[],
        )
        .unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();
      assert!(text.contains("casual-build-server -o /src/casual/bin/queue -s svc1 svc2 svc3 -f"));
      assert!(text.contains("target_deploy_queue_xatmi:\n\t-@make.deploy.ksh queue exe\n"));
    }

    #[test]
    fn server_resources_and_properties_file() {
      let mut session = session();
      session
        .link_server(
          "queue",
          &["queue.o"],
          &[],
          Services::Names(libs(&["svc"])),
          Resources {
            keys: libs(&["db2-rm"]),
            configuration: Some(PathBuf::from("resources.yaml")),
          },
          &[],
        )
        .unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();
      assert!(text.contains(
        "casual-build-server -o /src/casual/bin/queue --resource-keys db2-rm \
         --properties-file /src/casual/resources.yaml -s svc -f"
      ));
      assert!(text.contains("/src/casual/bin/queue: /src/casual/queue.o /src/casual/resources.yaml"));
    }

    #[test]
    fn user_name_depended_on_before_declaration_is_not_intermediate() {
      let mut session = session();
      session.link_executable("bar", &["bar.o"], &[], &[]).unwrap();
      session.depend("bar", &libs(&["foo"])).unwrap();
      session.link_library("foo", &["a.o"], &[], &[]).unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      assert!(!text.contains(".INTERMEDIATE: foo"));
      assert!(text.contains(
        "/src/casual/bin/bar: /src/casual/bar.o /src/casual/atmake.lua /src/casual/bin/libfoo.so | /src/casual/bin\n"
      ));
    }

    #[test]
    fn install_escapes_variables_and_depends_on_artifact() {
      let mut session = session();
      session.link_executable("bar", &["bar.o"], &[], &[]).unwrap();
      let install = session.install("bar", "$CASUAL_HOME/bin/bar").unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      assert!(text.contains(&format!("{install}: /src/casual/bin/bar\n")));
      assert!(text.contains("\trsync --checksum -i /src/casual/bin/bar $$CASUAL_HOME/bin/bar\n"));
      assert!(text.contains(&format!("\ninstall: {install}\n")));
    }

    #[test]
    fn sub_descriptor_forwarding() {
      let mut session = session();
      session.build("queue/atmake.lua").unwrap();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();

      assert!(text.contains(
        "/src/casual/queue/atmake.mk: /src/casual/queue/atmake.lua\n\t@echo generate"
      ));
      assert!(text.contains(
        "target__src_casual_queue_atmake.lua_all: /src/casual/queue/atmake.mk\n\
         \t@echo /src/casual/queue/atmake.lua all\n\
         \t@cd /src/casual/queue && $(MAKE) -f /src/casual/queue/atmake.mk all\n"
      ));
      assert!(text.contains("\nmake: target__src_casual_queue_atmake.lua\n"));
    }

    #[test]
    fn print_include_paths_echoes_variable() {
      let mut session = session();
      session.finalize().unwrap();
      let text = emit(&session).unwrap();
      assert!(text.contains("print_include_paths:\n\t@echo $(INCLUDE_PATHS)\n"));
    }
  }
}
