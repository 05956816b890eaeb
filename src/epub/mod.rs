//! Unpacked EPUB directories.
//!
//! [`EpubDir`] reads `META-INF/container.xml`, the package document and its
//! navigation document, runs a standardization pass against the package
//! directory, and writes the package and navigation documents back.

pub mod nav;
pub mod parser;
pub mod writer;

use std::path::{Path, PathBuf};

use log::debug;

pub use nav::{NavDocument, parse_nav_tree};
pub use parser::{PackageDocument, parse_container_xml, parse_package};
pub use writer::{render_nav_xhtml, render_ncx, render_package};

use crate::book::{Manifest, NavNode, Spine};
use crate::error::{Error, Result};
use crate::io::{ContentStore, DirStore, MemoryStore, OverlayStore};
use crate::standardize::{Outcome, StandardizeConfig, Standardizer, resolve_target};
use crate::util::{file_name, parent_dir, percent_encode_href, relative_to};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// An EPUB extracted to a directory.
///
/// Paths reported by this type are relative to the content root, the
/// directory holding the package document.
#[derive(Debug, Clone)]
pub struct EpubDir {
    root: PathBuf,
    /// Package document path relative to `root`.
    package_path: String,
    package_raw: String,
    package: PackageDocument,
    /// Navigation document the tree was built from.
    nav_path: String,
    ncx_path: Option<String>,
    nav_xhtml_path: Option<String>,
    /// Targets are relative to the directory of `nav_path`.
    toc: NavNode,
}

impl EpubDir {
    /// Open an unpacked EPUB rooted at `root`.
    ///
    /// The NCX named by `spine@toc` is preferred as navigation source; the
    /// manifest item with the `nav` property is used otherwise.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let container = std::fs::read(root.join(CONTAINER_PATH))?;
        let package_path = parse_container_xml(&container)?;

        let package_raw = DirStore::new(&root).read_text(&package_path)?;
        let package = parse_package(&package_raw)?;

        let ncx_path = package
            .spine
            .toc
            .as_deref()
            .and_then(|id| package.manifest.get(id))
            .map(|item| item.path.clone());
        let nav_xhtml_path = package
            .manifest
            .iter()
            .find(|item| item.is_nav())
            .map(|item| item.path.clone());

        let nav_path = ncx_path
            .clone()
            .or_else(|| nav_xhtml_path.clone())
            .ok_or_else(|| Error::InvalidEpub("package has no navigation document".into()))?;

        let store = DirStore::new(root.join(parent_dir(&package_path)));
        let toc = parse_nav_tree(&store.read_text(&nav_path)?)?;
        debug!(
            "Opened {} with {} navigation entries from {}",
            package_path,
            toc.descendant_count(),
            nav_path
        );

        Ok(Self {
            root,
            package_path,
            package_raw,
            package,
            nav_path,
            ncx_path,
            nav_xhtml_path,
            toc,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the package document.
    pub fn content_root(&self) -> PathBuf {
        self.root.join(parent_dir(&self.package_path))
    }

    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    pub fn title(&self) -> &str {
        &self.package.title
    }

    pub fn manifest(&self) -> &Manifest {
        &self.package.manifest
    }

    pub fn spine(&self) -> &Spine {
        &self.package.spine
    }

    pub fn toc(&self) -> &NavNode {
        &self.toc
    }

    /// Content-root-relative path of the navigation source.
    pub fn nav_path(&self) -> &str {
        &self.nav_path
    }

    /// Split multi-chapter files on disk and adopt the rewritten package.
    ///
    /// Chapter files are written immediately; call [`save`](Self::save) to
    /// write the package and navigation documents.
    pub fn standardize(&mut self, config: &StandardizeConfig) -> Result<Outcome> {
        let mut store = DirStore::new(self.content_root());
        let outcome = self.run(&mut store, config)?;
        if let Outcome::Rewritten(ref result) = outcome {
            self.package.manifest = result.manifest.clone();
            self.package.spine = result.spine.clone();
            self.toc = relative_tree(&self.toc, &result.toc, parent_dir(&self.nav_path));
        }
        Ok(outcome)
    }

    /// Run a pass without touching the disk.
    ///
    /// Returns the outcome and the chapter documents that would be written.
    pub fn standardize_dry_run(
        &self,
        config: &StandardizeConfig,
    ) -> Result<(Outcome, MemoryStore)> {
        let mut store = OverlayStore::new(DirStore::new(self.content_root()));
        let outcome = self.run(&mut store, config)?;
        Ok((outcome, store.writes().clone()))
    }

    fn run<S: ContentStore>(&self, store: &mut S, config: &StandardizeConfig) -> Result<Outcome> {
        Standardizer::with_config(config.clone()).run(
            store,
            &self.nav_path,
            &self.package.manifest,
            &self.package.spine,
            &self.toc,
        )
    }

    /// Write the package document and every navigation document.
    pub fn save(&self) -> Result<()> {
        let mut store = DirStore::new(self.content_root());

        let package = render_package(
            &self.package_raw,
            &self.package.manifest,
            &self.package.spine,
        )?;
        store.write_text(file_name(&self.package_path), &package)?;

        let rooted = rooted_tree(&self.toc, parent_dir(&self.nav_path));
        if let Some(ref path) = self.ncx_path {
            let raw = store.read_text(path)?;
            store.write_text(path, &render_ncx(&raw, &rooted, parent_dir(path))?)?;
        }
        if let Some(ref path) = self.nav_xhtml_path {
            let raw = store.read_text(path)?;
            store.write_text(path, &render_nav_xhtml(&raw, &rooted, parent_dir(path))?)?;
        }
        Ok(())
    }
}

/// Re-express the retargeted nodes of `rewritten` relative to `nav_dir`.
///
/// `rewritten` has the shape of `original`; a node whose target changed now
/// holds a content-root-relative chapter path.
fn relative_tree(original: &NavNode, rewritten: &NavNode, nav_dir: &str) -> NavNode {
    let item = match rewritten.item {
        Some(ref path) if rewritten.item != original.item => {
            Some(percent_encode_href(&relative_to(nav_dir, path)))
        }
        _ => original.item.clone(),
    };
    NavNode {
        label: rewritten.label.clone(),
        id: rewritten.id.clone(),
        item,
        children: original
            .children
            .iter()
            .zip(&rewritten.children)
            .map(|(original, rewritten)| relative_tree(original, rewritten, nav_dir))
            .collect(),
    }
}

/// Copy of `tree` whose targets are content-root-relative `path#fragment`.
///
/// Targets that cannot be resolved (external links) are kept as they are.
fn rooted_tree(tree: &NavNode, nav_dir: &str) -> NavNode {
    fn walk(nodes: &[NavNode], nav_dir: &str, last: &mut Option<String>) -> Vec<NavNode> {
        nodes
            .iter()
            .map(|node| {
                let item = node.item.as_deref().map(|raw| {
                    match resolve_target(raw, nav_dir, last.as_deref()) {
                        Some((path, fragment)) => {
                            *last = Some(path.clone());
                            match fragment {
                                Some(fragment) => format!("{}#{}", path, fragment),
                                None => path,
                            }
                        }
                        None => raw.to_string(),
                    }
                });
                NavNode {
                    label: node.label.clone(),
                    id: node.id.clone(),
                    item,
                    children: walk(&node.children, nav_dir, last),
                }
            })
            .collect()
    }

    let mut last = None;
    NavNode {
        label: tree.label.clone(),
        id: tree.id.clone(),
        item: tree.item.clone(),
        children: walk(&tree.children, nav_dir, &mut last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_tree() {
        let tree = NavNode::new("Book", "root")
            .with_child(
                NavNode::new("One", "1")
                    .with_item("../text/a%20b.xhtml#c1")
                    .with_child(NavNode::new("One.A", "2").with_item("#s1")),
            )
            .with_child(NavNode::new("Web", "w").with_item("https://example.com/"));

        let rooted = rooted_tree(&tree, "nav");
        assert_eq!(rooted.children[0].item.as_deref(), Some("text/a b.xhtml#c1"));
        assert_eq!(
            rooted.children[0].children[0].item.as_deref(),
            Some("text/a b.xhtml#s1")
        );
        assert_eq!(rooted.children[1].item.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_relative_tree() {
        let original = NavNode::new("Book", "root")
            .with_child(NavNode::new("One", "1").with_item("../text/a.xhtml#c1"))
            .with_child(NavNode::new("Two", "2").with_item("../text/b.xhtml"));
        let rewritten = NavNode::new("Book", "root")
            .with_child(NavNode::new("One", "1").with_item("text/chapter 0001.xhtml"))
            .with_child(NavNode::new("Two", "2").with_item("../text/b.xhtml"));

        let relative = relative_tree(&original, &rewritten, "nav");
        assert_eq!(
            relative.children[0].item.as_deref(),
            Some("../text/chapter%200001.xhtml")
        );
        assert_eq!(relative.children[1].item.as_deref(), Some("../text/b.xhtml"));
    }
}
