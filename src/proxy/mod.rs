//! On-demand render cache.
//!
//! The host serves cached images straight from disk and hands every request
//! for a missing file to [`CacheProxy::serve`]. The proxy decodes the path,
//! regenerates the image, writes it to the requested location and answers as
//! for a hit. Nothing is kept between requests; concurrent workers
//! regenerating the same file write identical bytes.

pub mod eviction;
pub mod path;
pub mod response;

pub use eviction::{EvictionJob, EvictionOutcome, EvictionScope};
pub use path::{CachePath, CachePathParser, ImageKind};
pub use response::CachedResponse;

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::generator::{AvatarFactory, GeneratorSpec, OutputFormat};
use crate::store::TransientStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Supplies images that do not come from a generator.
pub trait RemoteImageSource: Send + Sync {
    /// Returns encoded bytes for `hash` in `format`, or `None` when the
    /// source has no image for it.
    fn fetch(&self, kind: &ImageKind, hash: &str, size: u32, format: OutputFormat) -> Option<Vec<u8>>;
}

pub struct CacheProxy {
    root: PathBuf,
    parser: CachePathParser,
    factory: AvatarFactory,
    remote: Option<Box<dyn RemoteImageSource>>,
    cache_lifetime: Duration,
}

impl CacheProxy {
    pub fn new(
        root: impl Into<PathBuf>,
        factory: AvatarFactory,
        default_size: u32,
        cache_lifetime: Duration,
    ) -> ProxyResult<Self> {
        Ok(Self {
            root: root.into(),
            parser: CachePathParser::new(default_size)?,
            factory,
            remote: None,
            cache_lifetime,
        })
    }

    pub fn from_config(config: &Config, store: Arc<dyn TransientStore>) -> ProxyResult<Self> {
        Self::new(
            &config.cache_dir,
            AvatarFactory::from_config(config, store),
            config.default_size,
            config.cache_lifetime(),
        )
    }

    /// Sets the collaborator used for `gravatar` and `user` paths.
    pub fn with_remote_source(mut self, source: Box<dyn RemoteImageSource>) -> Self {
        self.remote = Some(source);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Answers a request for the cache file at `relative`.
    pub fn serve(&self, relative: &str) -> ProxyResult<CachedResponse> {
        let path = self.parser.parse(relative)?;
        let target = self.root.join(&path.relative);

        if !target.is_file() {
            debug!(path = %path.relative, kind = %path.kind, "cache miss");
            let bytes = self.regenerate(&path)?;
            write_replacing(&target, &bytes)?;
            info!(path = %path.relative, bytes = bytes.len(), "regenerated cache file");
        }

        let body = fs::read(&target)
            .map_err(|e| ProxyError::io(format!("reading {}", target.display()), e))?;
        let modified = fs::metadata(&target)
            .and_then(|m| m.modified())
            .map_err(|e| ProxyError::io(format!("reading mtime of {}", target.display()), e))?;

        Ok(CachedResponse::new(
            body,
            path.format,
            modified,
            chrono::Utc::now(),
            self.cache_lifetime,
        ))
    }

    /// Produces the bytes for a missing cache file.
    fn regenerate(&self, path: &CachePath) -> ProxyResult<Vec<u8>> {
        let image = match &path.kind {
            ImageKind::Avatar(style) => {
                let spec = GeneratorSpec::new(*style, path.size, path.format);
                self.factory.build(&spec, &path.hash).map(|image| image.bytes)
            }
            kind @ (ImageKind::Gravatar | ImageKind::User) => {
                let fetched = self
                    .remote
                    .as_ref()
                    .and_then(|source| source.fetch(kind, &path.hash, path.size, path.format));
                match fetched {
                    Some(bytes) if !bytes.is_empty() => Some(bytes),
                    _ => {
                        debug!(kind = %kind, "no remote image, using default icon");
                        self.default_icon(path)
                    }
                }
            }
            ImageKind::Default(_) => self.default_icon(path),
        };

        image.ok_or_else(|| {
            warn!(path = %path.relative, "regeneration failed");
            ProxyError::Regeneration {
                path: path.relative.clone(),
            }
        })
    }

    fn default_icon(&self, path: &CachePath) -> Option<Vec<u8>> {
        self.factory
            .build_default(path.size, path.format)
            .map(|image| image.bytes)
    }
}

/// Writes `bytes` to a sibling temporary file and renames it over `target`.
fn write_replacing(target: &Path, bytes: &[u8]) -> ProxyResult<()> {
    let dir = target
        .parent()
        .ok_or_else(|| ProxyError::invalid_path(target.display().to_string()))?;
    fs::create_dir_all(dir).map_err(|e| ProxyError::io(format!("creating {}", dir.display()), e))?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{file_name}.{}.tmp", std::process::id()));

    let result = fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, target));
    if let Err(e) = result {
        let _ = fs::remove_file(&temp);
        return Err(ProxyError::io(format!("writing {}", target.display()), e));
    }
    Ok(())
}
