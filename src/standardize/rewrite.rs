//! Rewrite manifest, spine and navigation tree for emitted chapters.

use std::collections::{HashMap, HashSet};

use super::StandardizeConfig;
use super::emit::ChapterOutput;
use crate::book::{Manifest, ManifestItem, MediaType, NavNode, Spine, SpineItem};

/// Whether the standardized manifest drops `item` in favour of its chapters.
pub(crate) fn is_replaced(item: &ManifestItem, sliced: &HashSet<String>) -> bool {
    sliced.contains(&item.path) && item.media_type.is_document() && !item.is_nav()
}

/// Remove sliced documents and add one entry per chapter.
///
/// Assigns each chapter its manifest id, suffixing `_1`, `_2`, ... when the
/// base id is already taken.
pub fn rewrite_manifest(
    manifest: &Manifest,
    sliced: &HashSet<String>,
    chapters: &mut [ChapterOutput],
    config: &StandardizeConfig,
) -> Manifest {
    let mut rewritten: Manifest = manifest
        .iter()
        .filter(|item| !is_replaced(item, sliced))
        .cloned()
        .collect();

    for chapter in chapters.iter_mut() {
        let base = format!(
            "{}{:0width$}",
            config.id_prefix,
            chapter.index,
            width = config.index_width
        );
        let mut id = base.clone();
        let mut suffix = 1;
        while rewritten.contains_id(&id) {
            id = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        rewritten.insert(ManifestItem::new(&id, &chapter.file_path, MediaType::Xhtml));
        chapter.manifest_id = id;
    }

    rewritten
}

/// New reading order: chapters first, then the untouched original items.
pub fn rewrite_spine(
    spine: &Spine,
    original: &Manifest,
    rewritten: &Manifest,
    chapters: &[ChapterOutput],
) -> Spine {
    let chapter_items = chapters.iter().map(|chapter| SpineItem {
        id: None,
        idref: chapter.manifest_id.clone(),
        linear: chapter.linear,
        extra_attributes: Vec::new(),
    });

    let untouched = spine.items.iter().filter(|item| {
        rewritten
            .get(&item.idref)
            .is_some_and(|kept| original.get(&item.idref) == Some(kept))
    });

    Spine {
        id: spine.id.clone(),
        toc: spine.toc.clone(),
        page_progression: spine.page_progression,
        extra_attributes: spine.extra_attributes.clone(),
        items: chapter_items.chain(untouched.cloned()).collect(),
    }
}

/// Point every node that produced a chapter at that chapter's path.
pub fn rewrite_nav_tree(node: &NavNode, chapter_paths: &HashMap<&str, &str>) -> NavNode {
    NavNode {
        label: node.label.clone(),
        id: node.id.clone(),
        item: match chapter_paths.get(node.id.as_str()) {
            Some(path) => Some(path.to_string()),
            None => node.item.clone(),
        },
        children: node
            .children
            .iter()
            .map(|child| rewrite_nav_tree(child, chapter_paths))
            .collect(),
    }
}
