//! Content access by content-root-relative path.
//!
//! The standardizer only ever reads and writes whole text resources, so the
//! store abstraction is two methods. [`DirStore`] serves an unpacked EPUB
//! directory, [`MemoryStore`] backs tests, and [`OverlayStore`] captures
//! writes in memory on top of another store for dry runs.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Read and write text resources addressed by package path.
pub trait ContentStore {
    /// Read the resource at `path` as UTF-8 text.
    fn read_text(&self, path: &str) -> io::Result<String>;

    /// Create or replace the resource at `path`.
    fn write_text(&mut self, path: &str, content: &str) -> io::Result<()>;
}

// --- Implementation: Local Directory ---

/// A content root on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a package path to a filesystem path below the root.
    fn full_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path outside content root: {}", path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentStore for DirStore {
    fn read_text(&self, path: &str) -> io::Result<String> {
        let bytes = fs::read(self.full_path(path)?)?;
        String::from_utf8(strip_bom(&bytes).to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_text(&mut self, path: &str, content: &str) -> io::Result<()> {
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, content)
    }
}

// --- Implementation: In-Memory ---

/// A content root held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.files.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl ContentStore for MemoryStore {
    fn read_text(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such resource: {}", path))
        })
    }

    fn write_text(&mut self, path: &str, content: &str) -> io::Result<()> {
        self.files.insert(path.to_string(), content.to_string());
        Ok(())
    }
}

// --- Implementation: Write Overlay ---

/// Reads fall through to `base`; writes are kept in memory.
#[derive(Debug)]
pub struct OverlayStore<S> {
    base: S,
    writes: MemoryStore,
}

impl<S: ContentStore> OverlayStore<S> {
    pub fn new(base: S) -> Self {
        Self {
            base,
            writes: MemoryStore::new(),
        }
    }

    /// Resources written through this overlay.
    pub fn writes(&self) -> &MemoryStore {
        &self.writes
    }
}

impl<S: ContentStore> ContentStore for OverlayStore<S> {
    fn read_text(&self, path: &str) -> io::Result<String> {
        match self.writes.get(path) {
            Some(text) => Ok(text.to_string()),
            None => self.base.read_text(path),
        }
    }

    fn write_text(&mut self, path: &str, content: &str) -> io::Result<()> {
        self.writes.write_text(path, content)
    }
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}
