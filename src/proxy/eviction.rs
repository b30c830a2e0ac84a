//! Age-based eviction of cached images.
//!
//! Each job takes a lock in the shared [`TransientStore`] before scanning.
//! The lock lives for the job's interval and is never released early, so
//! within one interval only the first caller across all workers scans.

use crate::config::{Config, EvictionSettings};
use crate::error::{AvatarError, AvatarResult};
use crate::store::TransientStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Type directories holding remote-origin images.
pub const REMOTE_TYPES: [&str; 2] = ["gravatar", "user"];

/// Which part of the cache a job sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionScope {
    /// `gravatar/` and `user/`.
    Remote,
    /// Every other type directory.
    Generated,
}

impl EvictionScope {
    pub fn name(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Generated => "generated",
        }
    }

    fn covers(self, type_dir: &str) -> bool {
        let remote = REMOTE_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(type_dir));
        match self {
            Self::Remote => remote,
            Self::Generated => !remote,
        }
    }
}

/// Result of one eviction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionOutcome {
    /// Another caller already ran the job in this interval.
    Skipped,
    Completed { removed: usize },
}

pub struct EvictionJob {
    scope: EvictionScope,
    root: PathBuf,
    settings: EvictionSettings,
    store: Arc<dyn TransientStore>,
}

impl EvictionJob {
    pub fn new(
        scope: EvictionScope,
        root: impl Into<PathBuf>,
        settings: EvictionSettings,
        store: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            scope,
            root: root.into(),
            settings,
            store,
        }
    }

    /// Both jobs with the configured settings.
    pub fn from_config(config: &Config, store: Arc<dyn TransientStore>) -> [Self; 2] {
        [
            Self::new(
                EvictionScope::Remote,
                &config.cache_dir,
                config.eviction.remote,
                Arc::clone(&store),
            ),
            Self::new(
                EvictionScope::Generated,
                &config.cache_dir,
                config.eviction.generated,
                store,
            ),
        ]
    }

    pub fn scope(&self) -> EvictionScope {
        self.scope
    }

    pub fn lock_key(&self) -> String {
        format!("avatar_forge_evict_{}", self.scope.name())
    }

    /// Deletes files older than the maximum age, unless the job already ran
    /// within the current interval.
    pub fn run(&self) -> AvatarResult<EvictionOutcome> {
        let key = self.lock_key();
        let stamp = chrono::Utc::now().to_rfc3339();
        if !self.store.add(&key, &stamp, self.settings.interval())? {
            debug!(job = self.scope.name(), "eviction already ran in this interval");
            return Ok(EvictionOutcome::Skipped);
        }

        let cutoff = SystemTime::now()
            .checked_sub(self.settings.max_age())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let removed = self.sweep(cutoff)?;
        info!(job = self.scope.name(), removed, "eviction finished");
        Ok(EvictionOutcome::Completed { removed })
    }

    /// Removes files in the job's type directories modified before `cutoff`.
    fn sweep(&self, cutoff: SystemTime) -> AvatarResult<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(AvatarError::io(
                    format!("reading cache root {}", self.root.display()),
                    e,
                ));
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| {
                AvatarError::io(format!("reading cache root {}", self.root.display()), e)
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() || !self.scope.covers(name) {
                continue;
            }
            removed += sweep_dir(&entry.path(), cutoff);
        }
        Ok(removed)
    }
}

/// Removes old files under `dir`. Failures on single files are logged and
/// skipped.
fn sweep_dir(dir: &Path, cutoff: SystemTime) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            _ => continue,
        };
        if modified >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to evict file"),
        }
    }
    removed
}
