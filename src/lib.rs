//! avatar-forge: deterministic procedural avatars with an on-demand render cache
//!
//! Avatars are composed from a seed, usually the 64-digit identity hash of a
//! user. The same seed, size and format always give byte-identical output, so
//! rendered avatars can be cached on disk and regenerated at any time.
//!
//! # Example
//!
//! ```no_run
//! use avatar_forge::{AvatarFactory, AvatarStyle, GeneratorSpec, MemoryStore, OutputFormat};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let factory = AvatarFactory::new("parts", Arc::new(MemoryStore::new()), Duration::from_secs(3600));
//! let spec = GeneratorSpec::new(AvatarStyle::Retro, 64, OutputFormat::Svg);
//! let svg = factory.build(&spec, "9f1c0b2e4d6a8c0e1f3b5d7f9a2c4e6f");
//! ```
//!
//! # Render Cache
//!
//! [`CacheProxy`] answers requests for files missing from the cache
//! directory by regenerating them from their path:
//!
//! ```no_run
//! use avatar_forge::{CacheProxy, Config, FileStore};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let store = Arc::new(FileStore::open(&config.store_dir).unwrap());
//! let proxy = CacheProxy::from_config(&config, store).unwrap();
//! let response = proxy.serve("monster/a/0f3c0b2e4d6a8c0e1f3b5d7f9a2c4e6f8b0d2f4a6c8e0a2c4e6f8a0c2e4f6a8b-64.png");
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod parts;
pub mod proxy;
pub mod raster;
pub mod rng;
pub mod store;
pub mod stream;
pub mod vector;

pub use config::{Config, EvictionConfig, EvictionSettings};
pub use error::{AvatarError, AvatarResult, ProxyError, ProxyResult};
pub use generator::{
    AvatarFactory, AvatarStyle, Generator, GeneratorSpec, OutputFormat, RenderedImage,
};
pub use geometry::{RectPx, SizePx};
pub use parts::{DirectoryCatalog, PartCatalog, PartCatalogProvider};
pub use proxy::{
    CacheProxy, CachedResponse, EvictionJob, EvictionOutcome, EvictionScope, ImageKind,
    RemoteImageSource,
};
pub use store::{FileStore, MemoryStore, TransientStore};
pub use stream::StreamArena;
