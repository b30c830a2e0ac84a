//! Part discovery and selection.
//!
//! A part source is a directory of files named `{category}-{n}.{ext}`, for
//! example `body-1.png` or `eyes-12.svg`. [`DirectoryCatalog`] scans it once,
//! groups the files by category, orders each group naturally
//! (`body-2` before `body-10`) and caches the result in a
//! [`TransientStore`] until the TTL runs out.

pub mod selector;

pub use selector::{DigitSelector, PartSelection, PartSelector, SeededSelector, select_parts};

use crate::error::{AvatarError, AvatarResult};
use crate::store::TransientStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

// ============================================================================
// PartCatalog
// ============================================================================

/// Candidate part files per category, each list in natural order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartCatalog {
    categories: BTreeMap<String, Vec<String>>,
}

impl PartCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from unsorted file names, grouping and ordering them.
    pub fn from_file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in names {
            let name = name.into();
            categories
                .entry(category_of(&name).to_string())
                .or_default()
                .push(name);
        }
        for parts in categories.values_mut() {
            parts.sort_by(|a, b| natural_cmp(a, b));
        }
        Self { categories }
    }

    /// The candidates for `category`, empty if the category is unknown.
    pub fn parts(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Returns the category encoded in a part file name.
///
/// `body-10.png` belongs to `body`; a name without a numeric suffix is its
/// own category.
fn category_of(file_name: &str) -> &str {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _ext)| stem);
    match stem.rsplit_once('-') {
        Some((category, suffix))
            if !category.is_empty() && !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            category
        }
        _ => stem,
    }
}

/// Compares two names treating runs of digits as numbers.
///
/// ```
/// use avatar_forge::parts::natural_cmp;
/// use std::cmp::Ordering;
///
/// assert_eq!(natural_cmp("body-2.png", "body-10.png"), Ordering::Less);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks(a);
    let mut right = Chunks(b);
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => compare_chunks(x, y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.bytes().all(|b| b.is_ascii_digit());
    let y_digits = y.bytes().all(|b| b.is_ascii_digit());
    if x_digits && y_digits {
        let x = x.trim_start_matches('0');
        let y = y.trim_start_matches('0');
        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
    } else {
        x.cmp(y)
    }
}

/// Splits a string into alternating digit and non-digit runs.
struct Chunks<'a>(&'a str);

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.0.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = self
            .0
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(self.0.len());
        let (chunk, rest) = self.0.split_at(end);
        self.0 = rest;
        Some(chunk)
    }
}

// ============================================================================
// PartCatalogProvider
// ============================================================================

/// Supplies the part catalog for one generator and resolves part files.
pub trait PartCatalogProvider: Send + Sync {
    /// Returns the catalog, scanning the source only when no cached copy exists.
    fn get_parts(&self) -> AvatarResult<PartCatalog>;

    /// Resolves a part identifier from the catalog to a file on disk.
    fn part_path(&self, part: &str) -> PathBuf;
}

/// Catalog of the part files in a single directory.
pub struct DirectoryCatalog {
    dir: PathBuf,
    extension: &'static str,
    ttl: Duration,
    store: Arc<dyn TransientStore>,
}

impl DirectoryCatalog {
    /// Creates a catalog over files with `extension` (without the dot) in `dir`.
    pub fn new(
        dir: impl Into<PathBuf>,
        extension: &'static str,
        ttl: Duration,
        store: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            dir: dir.into(),
            extension,
            ttl,
            store,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The store key, derived from the source directory's basename.
    fn cache_key(&self) -> String {
        let basename = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("avatar_forge_parts_{}_{}", basename, self.extension)
    }

    fn scan(&self) -> AvatarResult<PartCatalog> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                AvatarError::io(
                    format!("scanning part directory {}", self.dir.display()),
                    e.into(),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let matches_ext = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension));
            if !matches_ext {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        let catalog = PartCatalog::from_file_names(names);
        debug!(
            dir = %self.dir.display(),
            categories = catalog.categories.len(),
            "scanned part directory"
        );
        Ok(catalog)
    }
}

impl PartCatalogProvider for DirectoryCatalog {
    fn get_parts(&self) -> AvatarResult<PartCatalog> {
        let key = self.cache_key();

        match self.store.get(&key) {
            Ok(Some(json)) => match serde_json::from_str::<PartCatalog>(&json) {
                Ok(catalog) => return Ok(catalog),
                Err(e) => warn!(key = %key, error = %e, "discarding malformed cached catalog"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "part catalog cache unavailable"),
        }

        let catalog = self.scan()?;
        match serde_json::to_string(&catalog) {
            Ok(json) => {
                if let Err(e) = self.store.set(&key, &json, self.ttl) {
                    warn!(key = %key, error = %e, "failed to cache part catalog");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "failed to serialize part catalog"),
        }
        Ok(catalog)
    }

    fn part_path(&self, part: &str) -> PathBuf {
        self.dir.join(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::fs;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn natural_order_not_lexicographic() {
        let catalog = PartCatalog::from_file_names([
            "body-10.png",
            "body-2.png",
            "body-4.png",
            "body-1.png",
            "body-3.png",
        ]);
        assert_eq!(
            catalog.parts("body"),
            ["body-1.png", "body-2.png", "body-3.png", "body-4.png", "body-10.png"]
        );
    }

    #[test]
    fn natural_cmp_basics() {
        assert_eq!(natural_cmp("body-1", "body-10"), Ordering::Less);
        assert_eq!(natural_cmp("body-10", "body-2"), Ordering::Greater);
        assert_eq!(natural_cmp("arms-9", "body-1"), Ordering::Less);
        assert_eq!(natural_cmp("eyes-02", "eyes-2"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn groups_by_category() {
        let catalog =
            PartCatalog::from_file_names(["arms-1.png", "body-1.png", "arms-2.png", "logo.png"]);
        assert_eq!(catalog.categories().collect::<Vec<_>>(), ["arms", "body", "logo"]);
        assert_eq!(catalog.parts("arms").len(), 2);
        assert!(catalog.parts("legs").is_empty());
    }

    #[test]
    fn category_parsing() {
        assert_eq!(category_of("body-10.png"), "body");
        assert_eq!(category_of("left-arm-3.svg"), "left-arm");
        assert_eq!(category_of("mask.png"), "mask");
        assert_eq!(category_of("body-x.png"), "body-x");
    }

    #[test]
    fn scans_directory_with_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["body-1.png", "body-10.png", "body-2.png", "eyes-1.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested-1.png")).unwrap();

        let catalog =
            DirectoryCatalog::new(dir.path(), "png", DAY, Arc::new(MemoryStore::new()));
        let parts = catalog.get_parts().unwrap();
        assert_eq!(parts.parts("body"), ["body-1.png", "body-2.png", "body-10.png"]);
        assert_eq!(parts.parts("eyes"), ["eyes-1.png"]);
        assert!(parts.parts("notes").is_empty());
        assert!(parts.parts("nested").is_empty());
    }

    #[test]
    fn cached_catalog_is_returned_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("body-1.png"), b"x").unwrap();
        let store: Arc<dyn TransientStore> = Arc::new(MemoryStore::new());

        let catalog = DirectoryCatalog::new(dir.path(), "png", DAY, store.clone());
        assert_eq!(catalog.get_parts().unwrap().parts("body").len(), 1);

        // New files are not seen while the cached entry is live.
        fs::write(dir.path().join("body-2.png"), b"x").unwrap();
        assert_eq!(catalog.get_parts().unwrap().parts("body").len(), 1);

        // Once the shared entry expires the next call rescans and re-caches.
        let key = catalog.cache_key();
        let cached = store.get(&key).unwrap().unwrap();
        store.set(&key, &cached, Duration::ZERO).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        assert_eq!(catalog.get_parts().unwrap().parts("body").len(), 2);
        assert!(store.get(&key).unwrap().unwrap().contains("body-2.png"));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirectoryCatalog::new(
            dir.path().join("absent"),
            "png",
            DAY,
            Arc::new(MemoryStore::new()),
        );
        assert!(matches!(catalog.get_parts(), Err(AvatarError::Io { .. })));
    }
}
