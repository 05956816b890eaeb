//! Path and identifier helpers.
//!
//! Package paths are `/`-separated strings relative to the content root,
//! never filesystem paths, so these helpers work on strings rather than
//! `std::path`.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped when a package path is written back as an href.
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Directory part of a package path ("OEBPS/text/ch.xhtml" -> "OEBPS/text").
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// File name part of a package path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a directory and a name with `/`, treating an empty directory as the root.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Resolve `relative` against `base_dir` and normalize `.` and `..`.
///
/// Returns `None` when the result would escape the content root, or when
/// `relative` is absolute or an external URL.
///
/// For example, resolving "../styles/main.css" against "OEBPS/text" gives
/// "OEBPS/styles/main.css".
pub fn resolve_relative_path(base_dir: &str, relative: &str) -> Option<String> {
    if relative.starts_with('/') || relative.contains("://") || relative.starts_with("data:") {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in base_dir.split('/').chain(relative.split('/')) {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            name => parts.push(name),
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Express the content-root-relative `path` relative to directory `from_dir`.
///
/// For example, "OEBPS/text/ch.xhtml" seen from "OEBPS/nav" is "../text/ch.xhtml".
pub fn relative_to(from_dir: &str, path: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count()
        // Never consume the file name itself.
        .min(to.len().saturating_sub(1));

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

/// Percent-decode an href component, replacing invalid UTF-8 sequences.
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    percent_decode_str(s).decode_utf8_lossy()
}

/// Percent-encode a package path for use as an href.
pub fn percent_encode_href(path: &str) -> String {
    utf8_percent_encode(path, HREF_ESCAPE).to_string()
}

/// Generate a fresh opaque identifier, usable as an XML id.
pub fn new_node_id() -> String {
    format!("navpoint-{}", uuid::Uuid::new_v4().simple())
}
