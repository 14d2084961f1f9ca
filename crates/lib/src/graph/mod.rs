//! Target registry and dependency graph.
//!
//! Targets live in a petgraph [`StableDiGraph`] with edges pointing from a
//! dependency to its dependent, the same orientation the executor walks when
//! computing waves. Names are unique; the registry maps canonical names and
//! user-facing aliases to node indices. Indices stay valid when a merged
//! placeholder is removed; node order is otherwise the order of first mention.
//!
//! A dependency on a name nobody registered yet creates an
//! [`Resolution::Intermediate`] placeholder. Registering that name later
//! upgrades the placeholder in place, keeping every edge already attached.
//! A placeholder named after a user name is merged into the canonical target
//! once that user name is [aliased](Graph::alias).

mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use tracing::{debug, trace};

use crate::recipe::Recipe;

pub use types::{EdgeKind, GraphError, Resolution, Target, TargetKind};

#[derive(Debug, Default, Clone)]
pub struct Graph {
  graph: StableDiGraph<Target, EdgeKind>,
  names: HashMap<String, NodeIndex>,
  paths: HashMap<PathBuf, NodeIndex>,
  /// User-facing name -> canonical name.
  aliases: HashMap<String, String>,
  /// Local targets in registration order.
  order: Vec<NodeIndex>,
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a target or return the existing one with the same name.
  ///
  /// # Errors
  ///
  /// `NameCollision` if the name is already registered with a different
  /// kind or path, or if another target already produces `path`.
  pub fn register(
    &mut self,
    name: &str,
    kind: TargetKind,
    path: Option<PathBuf>,
    descriptor: Option<&Path>,
  ) -> Result<&mut Target, GraphError> {
    if let Some(path) = &path
      && let Some(&owner) = self.paths.get(path)
      && self.graph[owner].name != name
    {
      return Err(GraphError::NameCollision {
        name: name.to_string(),
        existing: format!("'{}' producing {}", self.graph[owner].name, path.display()),
        requested: path.display().to_string(),
      });
    }

    let idx = match self.names.get(name).copied() {
      Some(idx) => {
        let target = &mut self.graph[idx];
        if target.is_local() {
          if target.kind != kind || target.path != path {
            return Err(GraphError::NameCollision {
              name: name.to_string(),
              existing: describe(target.kind, target.path.as_deref()),
              requested: describe(kind, path.as_deref()),
            });
          }
          trace!(target = %name, "merging re-registration");
        } else {
          debug!(target = %name, "upgrading placeholder to local target");
          target.kind = kind;
          target.path = path.clone();
          target.descriptor = descriptor.map(Path::to_path_buf);
          target.resolution = Resolution::Local;
          self.order.push(idx);
        }
        idx
      }
      None => {
        let target = Target::new(name, kind, path.clone(), descriptor.map(Path::to_path_buf));
        let idx = self.graph.add_node(target);
        self.names.insert(name.to_string(), idx);
        self.order.push(idx);
        idx
      }
    };

    if let Some(path) = path {
      self.paths.insert(path, idx);
    }

    Ok(&mut self.graph[idx])
  }

  /// Make `target` depend on every name in `names`.
  ///
  /// Names nobody registered yet become intermediate placeholders.
  ///
  /// # Errors
  ///
  /// `UnresolvedDependency` if `target` itself is unknown, `Cycle` for a
  /// self-loop or an edge that would close a cycle.
  pub fn add_dependency<S: AsRef<str>>(&mut self, target: &str, names: &[S], edge: EdgeKind) -> Result<(), GraphError> {
    let target_idx = self.index(target)?;

    for name in names {
      let name = name.as_ref();
      let dep_idx = match self.resolve_index(name) {
        Some(idx) => idx,
        None => {
          trace!(dependency = %name, "creating placeholder");
          let idx = self.graph.add_node(Target::placeholder(name));
          self.names.insert(name.to_string(), idx);
          idx
        }
      };

      if dep_idx == target_idx || has_path_connecting(&self.graph, target_idx, dep_idx, None) {
        return Err(GraphError::Cycle {
          target: self.graph[target_idx].name.clone(),
          dependency: self.graph[dep_idx].name.clone(),
        });
      }

      self.connect(dep_idx, target_idx, edge);
    }

    Ok(())
  }

  /// Add an edge, or upgrade an existing order-only edge to a normal one.
  fn connect(&mut self, dependency: NodeIndex, target: NodeIndex, edge: EdgeKind) {
    match self.graph.find_edge(dependency, target) {
      Some(existing) => {
        if edge == EdgeKind::Normal {
          self.graph[existing] = EdgeKind::Normal;
        }
      }
      None => {
        self.graph.add_edge(dependency, target, edge);
      }
    }
  }

  /// Attach a recipe to a target.
  ///
  /// Identical recipes are attached once. A file-producing target accepts
  /// exactly one writing recipe.
  pub fn attach(&mut self, target: &str, recipe: Recipe) -> Result<(), GraphError> {
    let idx = self.index(target)?;
    let target = &mut self.graph[idx];

    if target.kind == TargetKind::Meta {
      return Err(GraphError::MetaRecipe(target.name.clone()));
    }

    if target.recipes.contains(&recipe) {
      return Ok(());
    }

    if target.kind.produces_file()
      && recipe.is_writing()
      && let Some(existing) = target.writing_recipe()
    {
      return Err(GraphError::NameCollision {
        name: target.name.clone(),
        existing: describe_recipe(existing),
        requested: describe_recipe(&recipe),
      });
    }

    target.recipes.push(recipe);
    Ok(())
  }

  /// Record a user-facing name for a canonical target.
  ///
  /// A placeholder created earlier under the user name is merged into the
  /// canonical target. A user name that is a local target of its own keeps
  /// naming that target.
  ///
  /// # Errors
  ///
  /// `UnresolvedDependency` if `canonical` is unknown, `Cycle` if the merge
  /// would close a cycle. The graph is unchanged on error.
  pub fn alias(&mut self, user: &str, canonical: &str) -> Result<(), GraphError> {
    if user == canonical {
      return Ok(());
    }
    let canonical_idx = self.index(canonical)?;

    if let Some(&existing) = self.names.get(user) {
      if existing == canonical_idx {
        return Ok(());
      }
      if self.graph[existing].is_local() {
        debug!(user, canonical, "user name is a target of its own, not aliased");
        return Ok(());
      }
      self.merge_placeholder(existing, canonical_idx)?;
      self.names.remove(user);
    }

    self.aliases.insert(user.to_string(), canonical.to_string());
    Ok(())
  }

  /// Move every edge of `placeholder` onto `into`, then drop the placeholder.
  fn merge_placeholder(&mut self, placeholder: NodeIndex, into: NodeIndex) -> Result<(), GraphError> {
    let mut moved: Vec<_> = self
      .graph
      .edges_directed(placeholder, Direction::Incoming)
      .chain(self.graph.edges_directed(placeholder, Direction::Outgoing))
      .map(|e| (e.id(), e.source(), e.target(), *e.weight()))
      .collect();
    moved.sort_by_key(|(id, ..)| *id);

    let before = self.graph.clone();
    self.graph.remove_node(placeholder);
    for (_, source, target, edge) in moved {
      let source = if source == placeholder { into } else { source };
      let target = if target == placeholder { into } else { target };
      self.connect(source, target, edge);
    }

    if let Err(cycle) = toposort(&self.graph, None) {
      let target = self.graph[cycle.node_id()].name.clone();
      let dependency = self.graph[into].name.clone();
      self.graph = before;
      return Err(GraphError::Cycle { target, dependency });
    }

    debug!(target = %self.graph[into].name, "placeholder merged into target");
    Ok(())
  }

  /// Canonical name for a user name or canonical name.
  pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
    self.aliases.get(name).map(String::as_str).unwrap_or(name)
  }

  /// Find a target produced here or known to exist elsewhere.
  ///
  /// # Errors
  ///
  /// `UnresolvedDependency` when the name is unknown or only a placeholder.
  pub fn lookup(&self, name: &str) -> Result<&Target, GraphError> {
    match self.get(name) {
      Some(target) if target.resolution != Resolution::Intermediate => Ok(target),
      _ => Err(GraphError::UnresolvedDependency(name.to_string())),
    }
  }

  /// Any target with this name, placeholders included.
  pub fn get(&self, name: &str) -> Option<&Target> {
    self.resolve_index(name).map(|idx| &self.graph[idx])
  }

  pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Target> {
    self.resolve_index(name).map(|idx| &mut self.graph[idx])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.resolve_index(name).is_some()
  }

  /// Direct dependencies in the order they were added.
  pub fn dependencies(&self, name: &str) -> Vec<(&Target, EdgeKind)> {
    let Some(idx) = self.resolve_index(name) else {
      return Vec::new();
    };

    let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Incoming).collect();
    edges.sort_by_key(|e| e.id().index());
    edges
      .into_iter()
      .map(|e| (&self.graph[e.source()], *e.weight()))
      .collect()
  }

  /// Every target `name` depends on, directly or not, in node order.
  pub fn transitive_dependencies(&self, name: &str) -> Result<Vec<&Target>, GraphError> {
    let idx = self.index(name)?;
    let mut closure = self.closure_indices(&[idx]);
    closure.remove(&idx);
    Ok(self.sorted(closure).into_iter().map(|i| &self.graph[i]).collect())
  }

  /// The roots and everything they depend on, in node order.
  pub fn closure<S: AsRef<str>>(&self, roots: &[S]) -> Result<Vec<&Target>, GraphError> {
    let indices = roots
      .iter()
      .map(|r| self.index(r.as_ref()))
      .collect::<Result<Vec<_>, _>>()?;
    let closure = self.closure_indices(&indices);
    Ok(self.sorted(closure).into_iter().map(|i| &self.graph[i]).collect())
  }

  /// Kahn levels over the closure of `roots`.
  ///
  /// Every target appears in a later wave than all of its dependencies.
  /// Within a wave targets are in node order.
  pub fn waves<S: AsRef<str>>(&self, roots: &[S]) -> Result<Vec<Vec<String>>, GraphError> {
    let indices = roots
      .iter()
      .map(|r| self.index(r.as_ref()))
      .collect::<Result<Vec<_>, _>>()?;
    let mut remaining = self.closure_indices(&indices);

    let mut in_degree: HashMap<NodeIndex, usize> = remaining
      .iter()
      .map(|&idx| {
        let degree = self
          .graph
          .neighbors_directed(idx, Direction::Incoming)
          .filter(|dep| remaining.contains(dep))
          .count();
        (idx, degree)
      })
      .collect();

    let mut waves = Vec::new();
    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[idx] == 0).copied().collect();

      if ready.is_empty() {
        let name = remaining
          .iter()
          .next()
          .map(|&idx| self.graph[idx].name.clone())
          .unwrap_or_default();
        return Err(GraphError::Cycle {
          target: name.clone(),
          dependency: name,
        });
      }

      ready.sort();
      for &idx in &ready {
        remaining.remove(&idx);
        for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(degree) = in_degree.get_mut(&dependent) {
            *degree = degree.saturating_sub(1);
          }
        }
      }

      waves.push(ready.into_iter().map(|idx| self.graph[idx].name.clone()).collect());
    }

    Ok(waves)
  }

  /// Local targets in registration order.
  pub fn targets(&self) -> impl Iterator<Item = &Target> {
    self.order.iter().map(|&idx| &self.graph[idx])
  }

  /// Targets referenced but not produced by this graph, in node order.
  pub fn placeholders(&self) -> impl Iterator<Item = &Target> {
    self.graph.node_weights().filter(|t| !t.is_local())
  }

  pub fn is_acyclic(&self) -> bool {
    toposort(&self.graph, None).is_ok()
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  fn resolve_index(&self, name: &str) -> Option<NodeIndex> {
    self.names.get(self.canonical_name(name)).copied()
  }

  fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
    self
      .resolve_index(name)
      .ok_or_else(|| GraphError::UnresolvedDependency(name.to_string()))
  }

  fn closure_indices(&self, roots: &[NodeIndex]) -> HashSet<NodeIndex> {
    let reversed = Reversed(&self.graph);
    let mut closure = HashSet::new();
    for &root in roots {
      let mut dfs = Dfs::new(reversed, root);
      while let Some(idx) = dfs.next(reversed) {
        closure.insert(idx);
      }
    }
    closure
  }

  fn sorted(&self, set: HashSet<NodeIndex>) -> Vec<NodeIndex> {
    let mut indices: Vec<_> = set.into_iter().collect();
    indices.sort();
    indices
  }
}

fn describe(kind: TargetKind, path: Option<&Path>) -> String {
  match path {
    Some(path) => format!("{kind:?} {}", path.display()),
    None => format!("{kind:?}"),
  }
}

fn describe_recipe(recipe: &Recipe) -> String {
  match recipe {
    Recipe::Link { objects, .. } => {
      let objects: Vec<_> = objects.iter().map(|o| o.display().to_string()).collect();
      format!("link of [{}]", objects.join(", "))
    }
    other => other.id().to_string(),
  }
}
