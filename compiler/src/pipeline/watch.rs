//! Content-hash polling watcher.
//!
//! Each tick rehashes every discovered source, recompiles the ones whose
//! hash changed and re-emits the registry of every context that changed.
//! A file seen for the first time counts as changed.

use super::{discover, emit_registry, plan_artifact, BuildPipeline, FileError, ViewRegistry};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Last seen content hash (sha256, hex) per source path.
#[derive(Debug, Clone, Default)]
pub struct WatchState {
    hashes: BTreeMap<PathBuf, String>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `hash` for `path`; returns whether it differs from the last one.
    pub fn observe(&mut self, path: &Path, hash: String) -> bool {
        match self.hashes.get(path) {
            Some(previous) if *previous == hash => false,
            _ => {
                self.hashes.insert(path.to_path_buf(), hash);
                true
            }
        }
    }

    /// Drops paths that were not seen in the latest tick.
    pub fn retain_seen(&mut self, seen: &BTreeSet<PathBuf>) -> usize {
        let before = self.hashes.len();
        self.hashes.retain(|path, _| seen.contains(path));
        before - self.hashes.len()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WatchTick {
    pub compiled: Vec<PathBuf>,
    pub removed: usize,
    pub errors: Vec<FileError>,
    pub registries: Vec<PathBuf>,
}

impl WatchTick {
    pub fn is_idle(&self) -> bool {
        self.compiled.is_empty() && self.errors.is_empty() && self.removed == 0
    }
}

impl BuildPipeline {
    /// One polling pass over `contexts`.
    pub fn tick(&self, state: &mut WatchState, contexts: &[&str]) -> WatchTick {
        let mut tick = WatchTick::default();
        let mut seen = BTreeSet::new();
        let suffix = self.options().suffix.clone();

        for name in contexts {
            let Some(context) = self.context(name) else {
                tick.errors.push(FileError {
                    path: PathBuf::new(),
                    message: format!("context '{name}' is not configured"),
                });
                continue;
            };

            let mut registry = ViewRegistry::new();
            let mut changed = false;

            for file in discover(context, &suffix) {
                seen.insert(file.path.clone());
                let artifact = match plan_artifact(context, &file, &suffix) {
                    Ok(artifact) => artifact,
                    Err(err) => {
                        tick.errors.push(FileError::from(&err));
                        continue;
                    }
                };

                let bytes = match std::fs::read(&file.path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::warn!(path = %file.path.display(), error = %err, "cannot read view");
                        tick.errors.push(FileError {
                            path: file.path.clone(),
                            message: err.to_string(),
                        });
                        continue;
                    }
                };

                if state.observe(&file.path, content_hash(&bytes)) {
                    match self.compile_artifact(&context.name, &artifact) {
                        Ok(()) => {
                            tracing::info!(view = %artifact.symbolic_name, "recompiled");
                            tick.compiled.push(file.path.clone());
                            changed = true;
                        }
                        Err(err) => {
                            tracing::warn!(path = %err.path().display(), error = %err, "failed to compile view");
                            tick.errors.push(FileError::from(&err));
                        }
                    }
                } else if tick.compiled.contains(&file.path) {
                    // shared root already recompiled for an earlier context
                    changed = true;
                }
                registry.register(&artifact);
            }

            if changed {
                match emit_registry(context, &registry) {
                    Ok(Some(path)) => tick.registries.push(path),
                    Ok(None) => {}
                    Err(err) => tick.errors.push(FileError::from(&err)),
                }
            }
        }

        tick.removed = state.retain_seen(&seen);
        tick
    }

    /// Polls every `interval` until `cancel` is set. The flag is checked at
    /// the top of each tick.
    pub fn watch<F>(
        &self,
        contexts: &[&str],
        interval: Duration,
        cancel: &AtomicBool,
        mut on_tick: F,
    ) where
        F: FnMut(&WatchTick),
    {
        let mut state = WatchState::new();
        loop {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("watch cancelled");
                break;
            }
            let tick = self.tick(&mut state, contexts);
            on_tick(&tick);
            std::thread::sleep(interval);
        }
    }
}
