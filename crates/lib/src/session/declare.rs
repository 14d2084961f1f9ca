//! Declarations a descriptor can make.
//!
//! Each declaration registers its target, wires it into the meta targets,
//! and records what clean and directory creation need to know.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{GLOBAL_BUILD_TARGETS, RULES_EXTENSION};
use crate::descriptor::Descriptor;
use crate::graph::{EdgeKind, TargetKind};
use crate::naming::{
  ArtifactKind, archive_target_name, clean_directory_name, cross_object_name, deploy_target_name,
  path_to_target_name, target_name,
};
use crate::recipe::{Recipe, Resources, Services, ValidationError, validate_name};

use super::{Session, SessionError};

impl Session {
  /// Link a shared library `lib<name>` into `bin/`.
  pub fn link_library<P: AsRef<Path>>(
    &mut self,
    name: &str,
    objects: &[P],
    libraries: &[String],
    directives: &[String],
  ) -> Result<String, SessionError> {
    self.declare(|s| s.link(ArtifactKind::SharedLibrary, name, objects, libraries, directives, None))
  }

  pub fn link_executable<P: AsRef<Path>>(
    &mut self,
    name: &str,
    objects: &[P],
    libraries: &[String],
    directives: &[String],
  ) -> Result<String, SessionError> {
    self.declare(|s| s.link(ArtifactKind::Executable, name, objects, libraries, directives, None))
  }

  /// Archive objects into a static library. Archives link nothing.
  pub fn link_archive<P: AsRef<Path>>(
    &mut self,
    name: &str,
    objects: &[P],
    directives: &[String],
  ) -> Result<String, SessionError> {
    self.declare(|s| s.link(ArtifactKind::Archive, name, objects, &[], directives, None))
  }

  /// Build an XATMI server advertising `services`, linked with `resources`.
  pub fn link_server<P: AsRef<Path>>(
    &mut self,
    name: &str,
    objects: &[P],
    libraries: &[String],
    services: Services,
    resources: Resources,
    directives: &[String],
  ) -> Result<String, SessionError> {
    let server = Some((services, resources));
    self.declare(|s| s.link(ArtifactKind::Server, name, objects, libraries, directives, server))
  }

  /// Copy `source` to `destination` as part of `install`.
  ///
  /// `source` may name an artifact declared earlier; it is then installed
  /// from its artifact path and built first.
  pub fn install(&mut self, source: &str, destination: &str) -> Result<String, SessionError> {
    self.declare(|s| s.declare_install(source, destination))
  }

  fn declare_install(&mut self, source: &str, destination: &str) -> Result<String, SessionError> {
    let (source_path, producer) = match self.graph.lookup(source) {
      Ok(target) if target.kind == TargetKind::File => (target.path.clone().unwrap_or_default(), Some(target.name.clone())),
      _ => (self.naming.normalize(source), None),
    };

    let recipe = Recipe::Install {
      source: source_path.clone(),
      destination: destination.to_string(),
    };
    recipe.validate()?;

    let name = self.naming.unique_target_name(&source_path.display().to_string());
    let descriptor = self.descriptor.clone();
    self
      .graph
      .register(&name, TargetKind::Phony, None, Some(&descriptor))?
      .add_input(source_path);
    self.graph.attach(&name, recipe)?;

    if let Some(producer) = producer {
      self.graph.add_dependency(&name, &[producer], EdgeKind::Normal)?;
    }
    self.graph.add_dependency("install", &[&name], EdgeKind::Normal)?;

    debug!(target = %name, destination, "install declared");
    Ok(name)
  }

  /// Hand the global build targets to a sub-descriptor.
  ///
  /// The sub rule file is regenerated when its descriptor or one of its Lua
  /// modules is newer, and each global target recurses into it.
  pub fn build(&mut self, descriptor: &str) -> Result<String, SessionError> {
    self.declare(|s| s.declare_build(descriptor))
  }

  fn declare_build(&mut self, descriptor: &str) -> Result<String, SessionError> {
    let sub = self.naming.normalize(descriptor);
    if sub == self.descriptor {
      return Err(ValidationError::SelfRecursion(sub).into());
    }

    let rules = sub.with_extension(RULES_EXTENSION);
    let own = self.descriptor.clone();
    let rules_target = path_to_target_name(&rules.display().to_string());
    let sources = Descriptor::new(sub.clone())
      .sources()
      .map_err(|e| SessionError::Descriptor {
        path: sub.clone(),
        message: e.to_string(),
      })?;

    let target = self
      .graph
      .register(&rules_target, TargetKind::File, Some(rules.clone()), Some(&own))?;
    for source in sources {
      target.add_input(source);
    }
    self.graph.attach(
      &rules_target,
      Recipe::Regenerate {
        descriptor: sub.clone(),
        rules: rules.clone(),
      },
    )?;

    let base = path_to_target_name(&sub.display().to_string());
    for global in GLOBAL_BUILD_TARGETS {
      let name = format!("{base}_{global}");
      self.graph.register(&name, TargetKind::Phony, None, Some(&own))?;
      self.graph.add_dependency(&name, &[&rules_target], EdgeKind::Normal)?;
      self.graph.attach(
        &name,
        Recipe::Recurse {
          descriptor: sub.clone(),
          rules: rules.clone(),
          target: global.to_string(),
        },
      )?;
      self.graph.add_dependency(global, &[&name], EdgeKind::Normal)?;
    }

    // `make` regenerates unconditionally, then recurses.
    self.graph.register(&base, TargetKind::Phony, None, Some(&own))?;
    self.graph.attach(
      &base,
      Recipe::Regenerate {
        descriptor: sub.clone(),
        rules: rules.clone(),
      },
    )?;
    self.graph.attach(
      &base,
      Recipe::Recurse {
        descriptor: sub,
        rules,
        target: "make".to_string(),
      },
    )?;
    self.graph.add_dependency("make", &[&base], EdgeKind::Normal)?;

    Ok(rules_target)
  }

  /// Make an already declared target depend on `names`.
  ///
  /// Names not declared (yet) become intermediate placeholders.
  pub fn depend(&mut self, target: &str, names: &[String]) -> Result<(), SessionError> {
    let canonical = self.graph.lookup(target)?.name.clone();
    self.declare(|s| Ok(s.graph.add_dependency(&canonical, names, EdgeKind::Normal)?))
  }

  fn link<P: AsRef<Path>>(
    &mut self,
    kind: ArtifactKind,
    name: &str,
    objects: &[P],
    libraries: &[String],
    directives: &[String],
    server: Option<(Services, Resources)>,
  ) -> Result<String, SessionError> {
    validate_name(name)?;
    for library in libraries {
      validate_name(library)?;
    }

    let objects: Vec<PathBuf> = objects.iter().map(|o| self.naming.normalize(o)).collect();
    let (services, resources) = match server {
      Some((services, resources)) => (Some(services), resources),
      None => (None, Resources::default()),
    };
    let services = services.map(|s| match s {
      Services::DefinitionFile(path) => Services::DefinitionFile(self.naming.normalize(path)),
      names => names,
    });
    let resources = Resources {
      configuration: resources.configuration.map(|path| self.naming.normalize(path)),
      ..resources
    };
    let destination = self.naming.artifact_path(kind, name);

    let recipe = Recipe::Link {
      kind,
      destination: destination.clone(),
      objects: objects.clone(),
      libraries: libraries.to_vec(),
      directives: directives.to_vec(),
      services: services.clone(),
      resources: resources.clone(),
    };
    recipe.validate()?;

    if objects.is_empty() {
      self.warn(format!("{kind} '{name}' is declared without object files"));
    }

    let canonical = kind.target_name(name);
    let descriptor = self.descriptor.clone();
    self
      .graph
      .register(&canonical, TargetKind::File, Some(destination.clone()), Some(&descriptor))?;
    self.graph.attach(&canonical, recipe)?;

    if let Some(target) = self.graph.get_mut(&canonical) {
      target.artifact = Some(kind);
      for object in &objects {
        target.add_input(object.clone());
      }
      if let Some(Services::DefinitionFile(path)) = &services {
        target.add_input(path.clone());
      }
      if let Some(path) = &resources.configuration {
        target.add_input(path.clone());
      }
      target.add_input(descriptor);
    }

    let library_targets = self.library_targets(libraries);
    self.graph.add_dependency(&canonical, &library_targets, EdgeKind::Normal)?;

    let directory = self.output_directory(&destination)?;
    self.graph.add_dependency(&canonical, &[directory], EdgeKind::OrderOnly)?;

    self.bookkeeping.register_file(&destination);
    for object in &objects {
      if let Some(parent) = object.parent() {
        self.bookkeeping.register_object_dir(parent);
      }
    }

    self.graph.add_dependency("all", &[&canonical], EdgeKind::Normal)?;
    if let Some(compile) = self.graph.get_mut("compile") {
      for object in &objects {
        compile.add_input(object.clone());
      }
    }
    if let Some(cross) = self.graph.get_mut("cross") {
      for object in &objects {
        cross.add_input(cross_object_name(object));
      }
    }

    let deploy = match kind {
      ArtifactKind::Server => deploy_target_name(&format!("{name}_xatmi")),
      _ => deploy_target_name(name),
    };
    self.graph.register(&deploy, TargetKind::Phony, None, Some(&self.descriptor))?;
    self.graph.attach(
      &deploy,
      Recipe::Deploy {
        file_name: self.naming.file_name(kind, name),
        kind,
      },
    )?;
    self.graph.add_dependency("deploy", &[&deploy], EdgeKind::Normal)?;

    self.graph.alias(name, &canonical)?;

    debug!(target = %canonical, kind = %kind, objects = objects.len(), "artifact declared");
    Ok(canonical)
  }

  /// Targets standing for each library a link depends on.
  ///
  /// A library may come as a shared library or as an archive, produced here,
  /// by a sibling descriptor, or installed.
  fn library_targets(&mut self, libraries: &[String]) -> Vec<String> {
    let mut targets = Vec::with_capacity(libraries.len() * 2);
    for library in libraries {
      let shared = target_name(library);
      let archive = archive_target_name(library);
      self
        .libraries
        .insert(shared.clone(), (ArtifactKind::SharedLibrary, library.clone()));
      self
        .libraries
        .insert(archive.clone(), (ArtifactKind::Archive, library.clone()));
      targets.push(shared);
      targets.push(archive);
    }
    targets
  }

  /// Register the directory `path` is written into; returns its target name.
  fn output_directory(&mut self, path: &Path) -> Result<String, SessionError> {
    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = clean_directory_name(&directory.display().to_string());

    self.bookkeeping.register_directory(&directory);
    self
      .graph
      .register(&name, TargetKind::Directory, Some(directory.clone()), Some(&self.descriptor))?;
    self.graph.attach(&name, Recipe::CreateDirectory { path: directory })?;

    Ok(name)
  }
}
