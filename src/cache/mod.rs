//! In-memory content cache.
//!
//! The cache maps request paths to preloaded file bodies. A load walks the
//! content root on disk, reads every file into memory, and publishes the
//! result as an immutable [`Snapshot`] behind a readers/writer lock.
//! Lookups run against whichever snapshot is published; a reload builds the
//! replacement offline and swaps it in atomically, so readers either see
//! the old tree or the new one, never a mixture.

pub mod mime;
pub mod snapshot;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tokio::sync::RwLock;

pub use snapshot::{path_hash, Entry, Snapshot};

use snapshot::MAX_ENTRIES;

/// Shared handle to the published content snapshot.
pub struct ContentCache {
    published: RwLock<Arc<Snapshot>>,
}

impl ContentCache {
    /// Creates the cache with an empty snapshot; every lookup misses until
    /// the first successful [`load`](Self::load).
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Rebuilds the snapshot from the content tree under `root` and
    /// atomically replaces the published one. On any failure the previously
    /// published snapshot stays in place. Returns the number of cached
    /// files.
    pub async fn load(&self, root: &Path) -> Result<usize> {
        tracing::info!(root = %root.display(), "loading cache");
        let root = root.to_path_buf();
        let snapshot = tokio::task::spawn_blocking(move || build_snapshot(&root))
            .await
            .context("cache build task failed")??;
        let count = snapshot.len();

        let mut published = self.published.write().await;
        *published = Arc::new(snapshot);
        Ok(count)
    }

    /// Looks up the entry published under `path`. The returned copy stays
    /// valid after the snapshot is replaced by a later load.
    pub async fn find(&self, path: &str) -> Option<Entry> {
        let published = self.published.read().await;
        published.get(path).cloned()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

fn build_snapshot(root: &Path) -> Result<Snapshot> {
    let mut entries = Vec::new();
    walk_dir(root, root, &mut entries)?;
    if entries.len() > MAX_ENTRIES {
        bail!(
            "number of files {} exceeds maximum cache capacity {}",
            entries.len(),
            MAX_ENTRIES
        );
    }
    tracing::debug!(files = entries.len(), "caching files");
    Ok(Snapshot::build(entries))
}

fn walk_dir(root: &Path, dir: &Path, entries: &mut Vec<Entry>) -> Result<()> {
    let listing = std::fs::read_dir(dir)
        .with_context(|| format!("error opening directory {}", dir.display()))?;

    for dirent in listing {
        let dirent = dirent
            .with_context(|| format!("error reading directory {}", dir.display()))?;
        if dirent.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let full_path = dirent.path();
        let kind = dirent
            .file_type()
            .with_context(|| format!("could not stat {}", full_path.display()))?;

        if kind.is_dir() {
            walk_dir(root, &full_path, entries)?;
        } else if kind.is_file() {
            let body = std::fs::read(&full_path)
                .with_context(|| format!("error reading file {}", full_path.display()))?;
            let path = request_path(root, &full_path);
            entries.push(Entry {
                hash: path_hash(&path),
                mime: mime::mime_for_path(&path),
                body: Bytes::from(body),
                path,
            });
        }
    }

    Ok(())
}

/// The request path a file is served under: the on-disk path with the
/// content-root prefix stripped, so it begins with `/`.
fn request_path(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    let mut path = String::with_capacity(rel.as_os_str().len() + 1);
    for component in rel.components() {
        path.push('/');
        path.push_str(&component.as_os_str().to_string_lossy());
    }
    path
}
