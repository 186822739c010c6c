//! Book catalog
//!
//! One directory per book under the vocabulary root, each holding `*.json`
//! source files. The first lookup scans everything into an immutable
//! [`CatalogSnapshot`]; later lookups share it until [`Catalog::reload`]
//! swaps in a fresh one.

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vdp_common::{Error, Result};
use walkdir::WalkDir;

use super::model::{VocabularyBook, VocabularyEntry};
use super::normalize::normalize;
use super::repair::repair;

/// Fully loaded catalog contents, never mutated after construction
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    books: Vec<VocabularyBook>,
    entries: HashMap<String, Vec<VocabularyEntry>>,
}

impl CatalogSnapshot {
    /// Scan `root` synchronously
    ///
    /// Books load in parallel. A missing root gives an empty snapshot.
    pub fn load(root: &Path) -> Self {
        if !root.is_dir() {
            warn!("Vocabulary root {} not found, catalog is empty", root.display());
            return Self::default();
        }

        let book_dirs: Vec<PathBuf> = immediate_children(root)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect();

        let loaded: Vec<(VocabularyBook, Vec<VocabularyEntry>)> =
            book_dirs.par_iter().filter_map(|dir| load_book(dir)).collect();

        let mut snapshot = Self::default();
        for (book, entries) in loaded {
            snapshot.entries.insert(book.id.clone(), entries);
            snapshot.books.push(book);
        }

        info!(
            "Catalog loaded: {} books, {} entries",
            snapshot.books.len(),
            snapshot.entries.values().map(Vec::len).sum::<usize>()
        );
        snapshot
    }

    /// Every book, sorted by id
    pub fn books(&self) -> &[VocabularyBook] {
        &self.books
    }

    pub fn book(&self, id: &str) -> Option<&VocabularyBook> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Entries of one book in file order
    pub fn entries(&self, id: &str) -> Option<&[VocabularyEntry]> {
        self.entries.get(id).map(Vec::as_slice)
    }
}

/// Lazily loaded, reloadable catalog
pub struct Catalog {
    root: PathBuf,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: RwLock::new(None),
        }
    }

    /// Book count of the current snapshot, without triggering a scan
    pub async fn loaded_books(&self) -> Option<usize> {
        self.snapshot.read().await.as_ref().map(|s| s.books().len())
    }

    /// Current snapshot, scanning on first access
    ///
    /// Concurrent first callers may each scan; the last one stored wins and
    /// all of them see equivalent contents.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        self.reload().await
    }

    /// Rebuild the snapshot off the async runtime and swap it in
    pub async fn reload(&self) -> Result<Arc<CatalogSnapshot>> {
        let root = self.root.clone();
        let snapshot = tokio::task::spawn_blocking(move || CatalogSnapshot::load(&root))
            .await
            .map_err(|e| Error::Internal(format!("Catalog scan task failed: {}", e)))?;

        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

/// Depth-1 directory entries sorted by name; unreadable entries are logged
fn immediate_children(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                None
            }
        })
}

fn is_json_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn load_book(dir: &Path) -> Option<(VocabularyBook, Vec<VocabularyEntry>)> {
    let book_id = dir.file_name()?.to_string_lossy().into_owned();

    let mut source_files = Vec::new();
    let mut entries = Vec::new();
    for file in immediate_children(dir).filter(is_json_file) {
        let file_name = file.file_name().to_string_lossy().into_owned();
        entries.extend(load_file(file.path(), &book_id, &file_name));
        source_files.push(file_name);
    }

    debug!("Book {}: {} files, {} entries", book_id, source_files.len(), entries.len());
    let book = VocabularyBook::from_entries(&book_id, source_files, &entries);
    Some((book, entries))
}

/// Read, repair and normalize one file; failures contribute nothing
fn load_file(path: &Path, book_id: &str, file_name: &str) -> Vec<VocabularyEntry> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    match repair(&text) {
        Ok(repaired) => normalize(&repaired.value, book_id, file_name),
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
