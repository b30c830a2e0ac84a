//! Runtime configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty or missing file yields a working setup.
//!
//! # Example
//!
//! ```toml
//! parts_dir = "/srv/avatars/parts"
//! cache_dir = "/srv/avatars/cache"
//! store_dir = "/run/avatar-forge"
//! default_size = 100
//! cache_lifetime_secs = 604800
//!
//! [eviction.remote]
//! max_age_secs = 172800
//! interval_secs = 172800
//!
//! [eviction.generated]
//! max_age_secs = 604800
//! interval_secs = 86400
//! ```

use crate::error::{AvatarError, AvatarResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DAY_SECS: u64 = 24 * 60 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the part sources, one subdirectory per avatar style.
    pub parts_dir: PathBuf,

    /// Root of the on-disk render cache.
    pub cache_dir: PathBuf,

    /// Directory of the cross-process transient store.
    pub store_dir: PathBuf,

    /// Pixel size used when a cache path carries none.
    pub default_size: u32,

    /// How far in the future `Expires` is set on served images.
    pub cache_lifetime_secs: u64,

    /// How long a scanned part catalog stays cached.
    pub catalog_ttl_secs: u64,

    pub eviction: EvictionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parts_dir: PathBuf::from("parts"),
            cache_dir: PathBuf::from("cache"),
            store_dir: PathBuf::from("transient"),
            default_size: 100,
            cache_lifetime_secs: 7 * DAY_SECS,
            catalog_ttl_secs: 7 * DAY_SECS,
            eviction: EvictionConfig::default(),
        }
    }
}

/// Eviction settings per origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EvictionSection")]
pub struct EvictionConfig {
    /// Images fetched from a remote service or uploaded by users.
    pub remote: EvictionSettings,

    /// Images produced by the generators.
    pub generated: EvictionSettings,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            remote: EvictionSettings {
                max_age_secs: 2 * DAY_SECS,
                interval_secs: 2 * DAY_SECS,
            },
            generated: EvictionSettings {
                max_age_secs: 7 * DAY_SECS,
                interval_secs: DAY_SECS,
            },
        }
    }
}

/// The `[eviction]` table as written. Either job, and either field of a job,
/// may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EvictionSection {
    remote: Option<PartialSettings>,
    generated: Option<PartialSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialSettings {
    max_age_secs: Option<u64>,
    interval_secs: Option<u64>,
}

impl PartialSettings {
    /// An explicit max age without an interval runs the job once per max age.
    fn resolve(self, fallback: EvictionSettings) -> EvictionSettings {
        let max_age_secs = self.max_age_secs.unwrap_or(fallback.max_age_secs);
        let interval_secs = match (self.interval_secs, self.max_age_secs) {
            (Some(interval), _) => interval,
            (None, Some(max_age)) => max_age,
            (None, None) => fallback.interval_secs,
        };
        EvictionSettings {
            max_age_secs,
            interval_secs,
        }
    }
}

impl From<EvictionSection> for EvictionConfig {
    fn from(section: EvictionSection) -> Self {
        let defaults = Self::default();
        Self {
            remote: section
                .remote
                .map_or(defaults.remote, |s| s.resolve(defaults.remote)),
            generated: section
                .generated
                .map_or(defaults.generated, |s| s.resolve(defaults.generated)),
        }
    }
}

/// Age limit and run cadence of one eviction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionSettings {
    /// Files older than this are deleted.
    pub max_age_secs: u64,

    /// The job runs at most once per interval across all workers.
    pub interval_secs: u64,
}

impl EvictionSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> AvatarResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AvatarError::io(format!("reading config from {}", path.display()), e))?;
        Self::from_toml(&content).map_err(|reason| AvatarError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.default_size == 0 {
            return Err("default_size must be greater than zero".to_string());
        }
        for (name, settings) in [("remote", &self.eviction.remote), ("generated", &self.eviction.generated)] {
            if settings.interval_secs == 0 {
                return Err(format!("eviction.{name}.interval_secs must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }
}
