//! Resolve navigation targets into content-root-relative locators.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::book::NavNode;
use crate::util::{parent_dir, percent_decode, resolve_relative_path};

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Id of the navigation node this target came from.
    pub source_id: String,
    /// Content-root-relative path of the target file.
    pub file_path: String,
    pub fragment: Option<String>,
}

impl Locator {
    /// Identity used for deduplication: the path, plus `#fragment` if any.
    pub fn canonical_key(&self) -> String {
        match self.fragment {
            Some(ref fragment) => format!("{}#{}", self.file_path, fragment),
            None => self.file_path.clone(),
        }
    }
}

/// Walk the tree below `root` in document order and resolve every target.
///
/// `nav_path` is the content-root-relative path of the navigation document;
/// raw targets are relative to its directory. A fragment-only target refers
/// to the file of the most recently resolved entry.
pub fn resolve_locators(root: &NavNode, nav_path: &str) -> Vec<Locator> {
    let mut out = Vec::new();
    resolve_nodes(&root.children, parent_dir(nav_path), None, &mut out);
    out
}

fn resolve_nodes(
    nodes: &[NavNode],
    nav_dir: &str,
    mut last_path: Option<String>,
    out: &mut Vec<Locator>,
) -> Option<String> {
    for node in nodes {
        if let Some(item) = node.item.as_deref().filter(|item| !item.is_empty()) {
            match resolve_target(item, nav_dir, last_path.as_deref()) {
                Some((file_path, fragment)) => {
                    last_path = Some(file_path.clone());
                    out.push(Locator {
                        source_id: node.id.clone(),
                        file_path,
                        fragment,
                    });
                }
                None => warn!("Skipping navigation entry {:?} -> {}", node.label, item),
            }
        }
        last_path = resolve_nodes(&node.children, nav_dir, last_path, out);
    }
    last_path
}

/// Split a raw target into a resolved path and an optional fragment.
pub(crate) fn resolve_target(
    item: &str,
    nav_dir: &str,
    last_path: Option<&str>,
) -> Option<(String, Option<String>)> {
    let (file, fragment) = match item.split_once('#') {
        Some((file, fragment)) => (file, Some(fragment).filter(|f| !f.is_empty())),
        None => (item, None),
    };

    let file_path = if file.is_empty() {
        last_path?.to_string()
    } else {
        resolve_relative_path(nav_dir, &percent_decode(file))?
    };

    Some((file_path, fragment.map(str::to_string)))
}

/// Drop repeated canonical keys, keeping the first occurrence in order.
pub fn dedup_locators(locators: Vec<Locator>) -> Vec<Locator> {
    let mut seen = HashSet::new();
    locators
        .into_iter()
        .filter(|locator| seen.insert(locator.canonical_key()))
        .collect()
}

/// Whether some file is addressed by more than one fragment.
pub fn has_split_chapters(locators: &[Locator]) -> bool {
    let mut per_file: HashMap<&str, usize> = HashMap::new();
    for locator in locators.iter().filter(|l| l.fragment.is_some()) {
        let count = per_file.entry(locator.file_path.as_str()).or_default();
        *count += 1;
        if *count > 1 {
            return true;
        }
    }
    false
}
