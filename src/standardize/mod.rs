//! Chapter standardization.
//!
//! Packages built by some authoring tools put several chapters into one
//! XHTML file and address them through `file.xhtml#chapterN` navigation
//! targets. A standardization pass cuts every such file at its anchors,
//! writes one document per navigation entry, and rewrites the manifest,
//! spine and navigation tree to match.
//!
//! ```
//! use chapterize::book::{Manifest, ManifestItem, MediaType, NavNode, Spine, SpineItem};
//! use chapterize::io::MemoryStore;
//! use chapterize::standardize::{Outcome, standardize};
//!
//! let doc = r#"<html><head><title>B</title></head><body>
//! <h1 id="c1">One</h1><p>1</p><h1 id="c2">Two</h1><p>2</p>
//! </body></html>"#;
//! let mut store = MemoryStore::new().with_file("book.xhtml", doc);
//! let manifest = Manifest::new().with_item(ManifestItem::new("book", "book.xhtml", MediaType::Xhtml));
//! let spine = Spine::new().with_item(SpineItem::new("book"));
//! let toc = NavNode::new("B", "root")
//!     .with_child(NavNode::new("One", "n1").with_item("book.xhtml#c1"))
//!     .with_child(NavNode::new("Two", "n2").with_item("book.xhtml#c2"));
//!
//! let outcome = standardize(&mut store, "nav.xhtml", &manifest, &spine, &toc)?;
//! let Outcome::Rewritten(result) = outcome else { panic!("expected a rewrite") };
//! assert_eq!(result.chapters.len(), 2);
//! assert!(store.contains("chapter_0002.xhtml"));
//! # Ok::<(), chapterize::Error>(())
//! ```

mod boundary;
mod emit;
mod locator;
mod patterns;
mod rewrite;
mod sanitize;

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, info, warn};

use crate::book::{Manifest, NavNode, Spine};
use crate::error::Result;
use crate::io::ContentStore;

pub use boundary::{SourceParts, find_anchor_offset, plan_slices};
pub use emit::{ChapterEmitter, ChapterOutput, render_chapter};
pub use locator::{Locator, dedup_locators, has_split_chapters, resolve_locators};
pub(crate) use locator::resolve_target;
pub use rewrite::{rewrite_manifest, rewrite_nav_tree, rewrite_spine};
pub use sanitize::sanitize_paragraphs;

/// Configuration for chapter generation.
#[derive(Debug, Clone)]
pub struct StandardizeConfig {
    /// File name prefix of generated chapters (default `chapter_`).
    pub chapter_prefix: String,
    /// Manifest id prefix of generated chapters (default `std_chapter_`).
    pub id_prefix: String,
    /// Zero-padded width of the chapter index (default 4).
    pub index_width: usize,
    /// Index of the first generated chapter (default 1).
    pub first_index: usize,
    /// Drop page-number and dangling-link paragraphs (default true).
    pub sanitize: bool,
}

impl Default for StandardizeConfig {
    fn default() -> Self {
        Self {
            chapter_prefix: "chapter_".into(),
            id_prefix: "std_chapter_".into(),
            index_width: 4,
            first_index: 1,
            sanitize: true,
        }
    }
}

impl StandardizeConfig {
    pub fn with_chapter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.chapter_prefix = prefix.into();
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn with_index_width(mut self, width: usize) -> Self {
        self.index_width = width;
        self
    }

    pub fn with_first_index(mut self, index: usize) -> Self {
        self.first_index = index;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }
}

/// Why a pass left the package alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoChange {
    /// No file is addressed by more than one fragment.
    NoSplitChapters,
    /// Anchors in `path` appear in a different order than in the navigation.
    NonMonotonic { path: String },
    /// `path` lacks an `<html>`/`<head>`/`<body>` wrapper.
    UnparseableSource { path: String },
    NothingEmitted,
}

impl fmt::Display for NoChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoChange::NoSplitChapters => write!(f, "no file holds more than one chapter"),
            NoChange::NonMonotonic { path } => {
                write!(f, "anchors in {} are out of navigation order", path)
            }
            NoChange::UnparseableSource { path } => {
                write!(f, "{} has no html/head/body wrapper", path)
            }
            NoChange::NothingEmitted => write!(f, "no chapters emitted"),
        }
    }
}

/// The rewritten package.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub manifest: Manifest,
    pub spine: Spine,
    pub toc: NavNode,
    /// Chapters in emission order.
    pub chapters: Vec<ChapterOutput>,
}

/// Result of a standardization pass.
#[derive(Debug, Clone)]
pub enum Outcome {
    Rewritten(Standardized),
    Unchanged(NoChange),
}

/// Runs standardization passes with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Standardizer {
    config: StandardizeConfig,
}

impl Standardizer {
    /// Create a standardizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a standardizer with custom settings.
    pub fn with_config(config: StandardizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StandardizeConfig {
        &self.config
    }

    /// Standardize a package.
    ///
    /// `nav_path` is the content-root-relative path of the document `toc`
    /// was built from. Chapter documents are written to `store` only once
    /// the manifest, spine and tree have all been rewritten; on
    /// [`Outcome::Unchanged`] or an error nothing is written.
    pub fn run<S: ContentStore + ?Sized>(
        &self,
        store: &mut S,
        nav_path: &str,
        manifest: &Manifest,
        spine: &Spine,
        toc: &NavNode,
    ) -> Result<Outcome> {
        let resolved = resolve_locators(toc, nav_path);
        let locators = dedup_locators(resolved.clone());
        if !has_split_chapters(&locators) {
            info!("No split chapters found, nothing to do");
            return Ok(Outcome::Unchanged(NoChange::NoSplitChapters));
        }

        // Group by file, keeping first-seen file order.
        let mut files: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, locator) in locators.iter().enumerate() {
            match files.iter_mut().find(|(path, _)| *path == locator.file_path) {
                Some((_, members)) => members.push(i),
                None => files.push((locator.file_path.as_str(), vec![i])),
            }
        }

        let mut sources: HashMap<&str, SourceParts> = HashMap::new();
        let mut slices = vec![0..0; locators.len()];
        for (path, members) in &files {
            let text = store.read_text(path)?;
            let Some(parts) = SourceParts::parse(&text) else {
                info!("Cannot split {}: no html/head/body wrapper", path);
                return Ok(Outcome::Unchanged(NoChange::UnparseableSource {
                    path: path.to_string(),
                }));
            };

            let file_locators: Vec<&Locator> = members.iter().map(|&i| &locators[i]).collect();
            let Some(planned) = plan_slices(path, &parts.body_inner, &file_locators)? else {
                info!("Anchors in {} are out of navigation order", path);
                return Ok(Outcome::Unchanged(NoChange::NonMonotonic {
                    path: path.to_string(),
                }));
            };
            debug!("Planned {} slices for {}", planned.len(), path);

            for (&i, range) in members.iter().zip(planned) {
                slices[i] = range;
            }
            sources.insert(*path, parts);
        }

        let sliced: HashSet<String> = files.iter().map(|(path, _)| path.to_string()).collect();
        let reserved: HashSet<String> = manifest
            .iter()
            .filter(|item| !rewrite::is_replaced(item, &sliced))
            .map(|item| item.path.clone())
            .collect();

        let mut emitter = ChapterEmitter::new(&self.config, reserved);
        let mut chapters = Vec::with_capacity(locators.len());
        let mut staged = Vec::with_capacity(locators.len());
        for (locator, range) in locators.iter().zip(&slices) {
            let Some(parts) = sources.get(locator.file_path.as_str()) else {
                continue;
            };
            let raw = &parts.body_inner[range.clone()];
            let content = if self.config.sanitize {
                sanitize_paragraphs(raw)
            } else {
                raw.trim().to_string()
            };

            let chapter = emitter.emit(&locator.file_path, &locator.source_id, spine, manifest);
            debug!("{} -> {}", locator.canonical_key(), chapter.file_path);
            staged.push((chapter.file_path.clone(), render_chapter(parts, &content)));
            chapters.push(chapter);
        }

        if chapters.is_empty() {
            return Ok(Outcome::Unchanged(NoChange::NothingEmitted));
        }

        let new_manifest = rewrite_manifest(manifest, &sliced, &mut chapters, &self.config);
        let new_spine = rewrite_spine(spine, manifest, &new_manifest, &chapters);
        let mut chapter_paths: HashMap<&str, &str> = chapters
            .iter()
            .map(|c| (c.source_id.as_str(), c.file_path.as_str()))
            .collect();
        // Repeated targets share the chapter of their first occurrence.
        let by_key: HashMap<String, &str> = locators
            .iter()
            .filter_map(|locator| {
                let path = *chapter_paths.get(locator.source_id.as_str())?;
                Some((locator.canonical_key(), path))
            })
            .collect();
        for locator in &resolved {
            if chapter_paths.contains_key(locator.source_id.as_str()) {
                continue;
            }
            if let Some(&path) = by_key.get(&locator.canonical_key()) {
                warn!(
                    "Navigation entry {} repeats {}, pointing it at {}",
                    locator.source_id,
                    locator.canonical_key(),
                    path
                );
                chapter_paths.insert(locator.source_id.as_str(), path);
            }
        }
        let new_toc = rewrite_nav_tree(toc, &chapter_paths);

        for (path, document) in &staged {
            store.write_text(path, document)?;
        }

        info!(
            "Split {} source file(s) into {} chapter(s)",
            files.len(),
            chapters.len()
        );

        Ok(Outcome::Rewritten(Standardized {
            manifest: new_manifest,
            spine: new_spine,
            toc: new_toc,
            chapters,
        }))
    }
}

/// Standardize a package with the default configuration.
pub fn standardize<S: ContentStore + ?Sized>(
    store: &mut S,
    nav_path: &str,
    manifest: &Manifest,
    spine: &Spine,
    toc: &NavNode,
) -> Result<Outcome> {
    Standardizer::new().run(store, nav_path, manifest, spine, toc)
}
