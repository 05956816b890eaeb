//! Remove page-number and dangling-link paragraphs from an extracted slice.
//!
//! Splitting a file at anchors leaves behind the clutter that sat between
//! chapters in the original: printed page numbers and "back to contents"
//! links that now point nowhere.

use std::ops::Range;

use log::debug;

use super::patterns::{
    ANCHOR_OPEN_RE, ID_ATTR_RE, IMAGE_TAG_RE, INTERNAL_LINK_RE, NBSP_RE, PAGE_NUMBER_RE,
    PARAGRAPH_RE, TAG_RE,
};

/// Trim `slice` and drop artifact paragraphs from it.
pub fn sanitize_paragraphs(slice: &str) -> String {
    let mut out = slice.trim().to_string();

    let doomed: Vec<Range<usize>> = PARAGRAPH_RE
        .captures_iter(&out)
        .filter_map(|p| {
            let whole = p.get(0)?;
            let attrs = p.get(1).map(|m| m.as_str()).unwrap_or_default();
            let inner = p.get(2).map(|m| m.as_str()).unwrap_or_default();
            is_artifact(attrs, inner).then(|| whole.range())
        })
        .collect();

    for range in doomed.into_iter().rev() {
        debug!("Removing artifact paragraph {:?}", &out[range.clone()]);
        out.replace_range(range, "");
    }
    out
}

fn is_artifact(attrs: &str, inner: &str) -> bool {
    if ID_ATTR_RE.is_match(attrs) || IMAGE_TAG_RE.is_match(inner) {
        return false;
    }
    is_page_number(inner) || is_internal_link(inner)
}

fn is_page_number(inner: &str) -> bool {
    let text = TAG_RE.replace_all(inner, "");
    let text = NBSP_RE.replace_all(&text, " ").replace('\u{a0}', " ");
    PAGE_NUMBER_RE.is_match(text.trim())
}

fn is_internal_link(inner: &str) -> bool {
    let inner = inner.trim();
    INTERNAL_LINK_RE.is_match(inner) && ANCHOR_OPEN_RE.find_iter(inner).count() == 1
}
