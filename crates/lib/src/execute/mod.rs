//! Direct realization of a session's targets.
//!
//! This module runs recipes itself instead of handing a rule file to make.
//! It handles:
//! - wave ordering over the dependency closure of the requested targets
//! - parallel realization of the targets within a wave
//! - timestamp staleness for file targets
//! - failure propagation and skip tracking
//! - recursion into sub-descriptors

pub mod actions;
pub mod resolver;
pub mod staleness;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::graph::GraphError;
use crate::session::Session;

pub use resolver::ConfigResolver;
pub use types::{ExecuteConfig, ExecuteError, RealizeResult, TargetOutcome, TargetStatus};

type WaveResults = Vec<(String, Result<TargetOutcome, ExecuteError>)>;

/// Realize `targets` (default `all`) and everything they depend on.
///
/// 1. computes the dependency closure and its waves
/// 2. realizes each wave in parallel, bounded by `config.parallelism`
/// 3. skips targets whose dependencies failed
///
/// Without `keep_going` no wave starts after one containing a failure; the
/// targets left are reported as skipped.
///
/// # Errors
///
/// Fails on unknown target names, cycles and worker panics. Recipe failures
/// are reported in the result instead.
pub async fn realize(
  session: Arc<Session>,
  targets: Vec<String>,
  config: ExecuteConfig,
) -> Result<RealizeResult, ExecuteError> {
  let roots = if targets.is_empty() {
    vec!["all".to_string()]
  } else {
    targets
  };

  info!(
    descriptor = %session.descriptor().display(),
    targets = ?roots,
    "starting realization"
  );

  let waves = session.graph().waves(&roots)?;
  info!(wave_count = waves.len(), "computed realization waves");

  let mut result = RealizeResult::default();
  // Failed or skipped target -> the failure it traces back to.
  let mut blocked: HashMap<String, String> = HashMap::new();
  let mut rebuilt: HashSet<String> = HashSet::new();
  let mut stopped_by: Option<String> = None;

  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, targets = wave.len(), "realizing wave");

    let mut ready = Vec::new();
    for name in wave {
      let cause = session
        .graph()
        .dependencies(name)
        .into_iter()
        .find_map(|(dep, _)| blocked.get(&dep.name).cloned())
        .or_else(|| stopped_by.clone());

      match cause {
        Some(cause) => {
          warn!(target = %name, failed_dep = %cause, "skipping target");
          blocked.insert(name.clone(), cause.clone());
          result.skipped.insert(name.clone(), cause);
        }
        None => ready.push(name.clone()),
      }
    }

    if ready.is_empty() {
      continue;
    }

    let outcomes = realize_wave(&session, &ready, &config, Arc::new(rebuilt.clone()), semaphore.clone()).await?;
    for (name, outcome) in outcomes {
      match outcome {
        Ok(TargetOutcome { status, output }) => {
          result.output.extend(output);
          match status {
            TargetStatus::Rebuilt => {
              debug!(target = %name, "target realized");
              rebuilt.insert(name.clone());
              result.rebuilt.push(name);
            }
            TargetStatus::UpToDate => result.up_to_date.push(name),
          }
        }
        Err(e) => {
          error!(target = %name, error = %e, "target failed");
          blocked.insert(name.clone(), name.clone());
          if !config.keep_going && stopped_by.is_none() {
            stopped_by = Some(name.clone());
          }
          result.failed.push((name, e));
        }
      }
    }
  }

  info!(
    rebuilt = result.rebuilt.len(),
    up_to_date = result.up_to_date.len(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "realization complete"
  );

  Ok(result)
}

/// [`realize`] behind a boxed future, for realizing sub-descriptors from
/// within a realization.
pub fn realize_boxed(
  session: Arc<Session>,
  targets: Vec<String>,
  config: ExecuteConfig,
) -> Pin<Box<dyn Future<Output = Result<RealizeResult, ExecuteError>> + Send>> {
  Box::pin(realize(session, targets, config))
}

async fn realize_wave(
  session: &Arc<Session>,
  names: &[String],
  config: &ExecuteConfig,
  rebuilt: Arc<HashSet<String>>,
  semaphore: Arc<Semaphore>,
) -> Result<WaveResults, ExecuteError> {
  let mut join_set = JoinSet::new();

  for name in names {
    let name = name.clone();
    let session = Arc::clone(session);
    let config = config.clone();
    let rebuilt = Arc::clone(&rebuilt);
    let semaphore = Arc::clone(&semaphore);

    join_set.spawn(async move {
      let outcome = match semaphore.acquire().await {
        Ok(_permit) => realize_target(&session, &name, &rebuilt, &config).await,
        Err(_) => Err(ExecuteError::Cancelled { target: name.clone() }),
      };
      (name, outcome)
    });
  }

  let mut results = Vec::with_capacity(names.len());
  while let Some(joined) = join_set.join_next().await {
    results.push(joined.map_err(|e| ExecuteError::Join(e.to_string()))?);
  }
  results.sort_by(|a, b| a.0.cmp(&b.0));
  Ok(results)
}

/// Run a single target's recipes if it needs them.
async fn realize_target(
  session: &Session,
  name: &str,
  rebuilt: &HashSet<String>,
  config: &ExecuteConfig,
) -> Result<TargetOutcome, ExecuteError> {
  if config.cancel.is_cancelled() {
    return Err(ExecuteError::Cancelled {
      target: name.to_string(),
    });
  }

  let target = session
    .graph()
    .get(name)
    .ok_or_else(|| GraphError::UnresolvedDependency(name.to_string()))?;

  let up_to_date = TargetOutcome {
    status: TargetStatus::UpToDate,
    output: Vec::new(),
  };

  // Placeholders are trusted; aggregates have nothing to run.
  if !target.is_local() || target.recipes.is_empty() {
    return Ok(up_to_date);
  }

  if target.kind.produces_file() {
    match staleness::check(session, target, rebuilt)? {
      Some(reason) => debug!(target = %name, ?reason, "target is stale"),
      None => return Ok(up_to_date),
    }
  }

  let mut output = Vec::new();
  for recipe in &target.recipes {
    output.extend(actions::execute_recipe(recipe, target, session, config).await?);
  }

  Ok(TargetOutcome {
    status: TargetStatus::Rebuilt,
    output,
  })
}
