//! Cached regex patterns for markup scanning.
//!
//! Source documents are only ever sliced at tag boundaries, never rebuilt,
//! so these patterns operate on the raw text.

use regex_lite::Regex;
use std::sync::LazyLock;

// === Document wrapper ===

/// Matches the `<html ...>` start tag, capturing its attributes
pub static HTML_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[\w.-]+:)?html(\s[^>]*?)?\s*>").unwrap()
});

/// Matches the `<head>` element, capturing its inner content
pub static HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[\w.-]+:)?head(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?head\s*>").unwrap()
});

/// Matches the `<body ...>` start tag, capturing its attributes
pub static BODY_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[\w.-]+:)?body(\s[^>]*?)?\s*>").unwrap()
});

/// Matches the closing `</body>` tag
pub static BODY_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:[\w.-]+:)?body\s*>").unwrap());

// === Anchors ===

/// Matches any start tag (including self-closing), capturing its attributes
pub static START_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[A-Za-z][\w:.-]*(\s[^<>]*?)?/?>").unwrap()
});

/// Matches one `key="value"` or `key='value'` attribute
pub static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

// === Sanitizer ===

/// Matches a `<p>` element, capturing attributes and inner content.
///
/// Self-closing `<p/>` is not a start tag here, and the content never
/// spans another `<p>` start tag.
pub static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<p(\s[^>]*[^/>])?\s*>((?:[^<]|<[^pP]|<[pP][^\s/>])*?)</p\s*>").unwrap()
});

/// Matches an `<img>` or SVG `<image>` start tag
pub static IMAGE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:[\w.-]+:)?(?:img|image)[\s/>]").unwrap()
});

/// Matches an `id` attribute
pub static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)id\s*=").unwrap());

/// Matches any tag
pub static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Matches the non-breaking space entity spellings
pub static NBSP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&(?:nbsp|#160|#xa0);").unwrap());

/// Matches a bare page number
pub static PAGE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,6}$").unwrap());

/// Matches content that is exactly one `<a>` pointing at an in-document fragment
pub static INTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^<a\s[^>]*?href\s*=\s*["']#[^"']*["'][^>]*>.*</a\s*>$"#).unwrap()
});

/// Matches an opening `<a` tag
pub static ANCHOR_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a[\s>]").unwrap());
