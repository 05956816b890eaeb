//! Turn body slices into standalone chapter documents.

use std::collections::HashSet;

use super::StandardizeConfig;
use super::boundary::SourceParts;
use crate::book::{Manifest, Spine};
use crate::util::{join_path, parent_dir};

/// Fixed preamble of every emitted chapter.
const PREAMBLE: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n";

/// A chapter produced by a standardization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ChapterOutput {
    pub index: usize,
    pub manifest_id: String,
    pub file_path: String,
    pub source_file_path: String,
    /// Id of the navigation node the chapter was cut for.
    pub source_id: String,
    pub linear: bool,
}

/// Assigns chapter indices and paths across a whole pass.
///
/// The counter is shared by every source file, so chapter numbers follow
/// navigation order through the entire book.
#[derive(Debug)]
pub struct ChapterEmitter<'a> {
    config: &'a StandardizeConfig,
    next_index: usize,
    taken: HashSet<String>,
}

impl<'a> ChapterEmitter<'a> {
    /// `reserved` holds paths that survive in the manifest and must not be
    /// overwritten.
    pub fn new(config: &'a StandardizeConfig, reserved: HashSet<String>) -> Self {
        Self {
            config,
            next_index: config.first_index,
            taken: reserved,
        }
    }

    /// Take the next free index and derive its path next to `source_path`.
    pub fn next_chapter(&mut self, source_path: &str) -> (usize, String) {
        loop {
            let index = self.next_index;
            self.next_index += 1;
            let path = join_path(
                parent_dir(source_path),
                &format!(
                    "{}{:0width$}.xhtml",
                    self.config.chapter_prefix,
                    index,
                    width = self.config.index_width
                ),
            );
            if self.taken.insert(path.clone()) {
                return (index, path);
            }
        }
    }

    /// Build the chapter record for a slice of `source_path`.
    pub fn emit(
        &mut self,
        source_path: &str,
        source_id: &str,
        spine: &Spine,
        manifest: &Manifest,
    ) -> ChapterOutput {
        let (index, file_path) = self.next_chapter(source_path);
        ChapterOutput {
            index,
            manifest_id: String::new(),
            file_path,
            source_file_path: source_path.to_string(),
            source_id: source_id.to_string(),
            linear: inherited_linear(source_path, spine, manifest),
        }
    }
}

/// Linear flag of the first spine item that referenced `source_path`.
fn inherited_linear(source_path: &str, spine: &Spine, manifest: &Manifest) -> bool {
    spine
        .items
        .iter()
        .find(|item| {
            manifest
                .get(&item.idref)
                .is_some_and(|m| m.path == source_path)
        })
        .is_none_or(|item| item.linear)
}

/// Wrap a sanitized slice in the source document's `<html>`/`<head>`/`<body>`.
pub fn render_chapter(parts: &SourceParts, content: &str) -> String {
    format!(
        "{PREAMBLE}<html{}>\n<head>{}</head>\n<body{}>\n{}\n</body>\n</html>\n",
        parts.html_attributes, parts.head_inner, parts.body_attributes, content
    )
}
