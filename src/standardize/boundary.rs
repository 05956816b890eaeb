//! Split a source document's body at navigation anchors.

use std::ops::Range;

use memchr::memmem;

use super::locator::Locator;
use super::patterns::{ATTR_RE, BODY_CLOSE_RE, BODY_OPEN_RE, HEAD_RE, HTML_OPEN_RE, START_TAG_RE};
use crate::error::{Error, Result};

/// The reusable pieces of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParts {
    /// Raw attribute text of `<html>`, including leading whitespace.
    pub html_attributes: String,
    pub head_inner: String,
    /// Raw attribute text of `<body>`, including leading whitespace.
    pub body_attributes: String,
    pub body_inner: String,
}

impl SourceParts {
    /// Split a document into its wrapper parts.
    ///
    /// Returns `None` unless the document has `<html>`, `<head>` and
    /// `<body>` elements in that order.
    pub fn parse(text: &str) -> Option<Self> {
        let html = HTML_OPEN_RE.captures(text)?;
        let html_end = html.get(0)?.end();

        let head = HEAD_RE.captures(&text[html_end..])?;
        let head_end = html_end + head.get(0)?.end();

        let body = BODY_OPEN_RE.captures(&text[head_end..])?;
        let body_start = head_end + body.get(0)?.end();
        let body_end = body_start + BODY_CLOSE_RE.find_iter(&text[body_start..]).last()?.start();

        Some(Self {
            html_attributes: capture(&html, 1),
            head_inner: capture(&head, 1),
            body_attributes: capture(&body, 1),
            body_inner: text[body_start..body_end].to_string(),
        })
    }
}

fn capture(caps: &regex_lite::Captures<'_>, group: usize) -> String {
    caps.get(group)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Byte offset of the start tag carrying `fragment` as its `id`, or failing
/// that as its `name`.
pub fn find_anchor_offset(body: &str, fragment: &str) -> Option<usize> {
    if memmem::find(body.as_bytes(), fragment.as_bytes()).is_none() {
        return None;
    }

    let mut by_name = None;
    for tag in START_TAG_RE.captures_iter(body) {
        let (Some(whole), Some(attrs)) = (tag.get(0), tag.get(1)) else {
            continue;
        };
        for attr in ATTR_RE.captures_iter(attrs.as_str()) {
            let key = attr.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if value != fragment {
                continue;
            }
            match key {
                "id" => return Some(whole.start()),
                "name" if by_name.is_none() => by_name = Some(whole.start()),
                _ => {}
            }
        }
    }
    by_name
}

/// Compute one body slice per locator of a single file.
///
/// `locators` are in that file's traversal order. Returns `Ok(None)` when
/// the boundaries are not strictly increasing.
pub fn plan_slices(
    path: &str,
    body: &str,
    locators: &[&Locator],
) -> Result<Option<Vec<Range<usize>>>> {
    let boundaries = locators
        .iter()
        .enumerate()
        .map(|(i, locator)| match locator.fragment {
            Some(ref fragment) => {
                find_anchor_offset(body, fragment).ok_or_else(|| Error::NavTargetMissing {
                    path: path.to_string(),
                    fragment: fragment.clone(),
                })
            }
            None if i == 0 => Ok(0),
            None => Ok(body.len()),
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut slices = Vec::with_capacity(boundaries.len());
    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(body.len());
        if end <= start {
            return Ok(None);
        }
        slices.push(start..end);
    }
    Ok(Some(slices))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="en">
<head>
  <title>Book</title>
  <link rel="stylesheet" href="style.css"/>
</head>
<body class="main">
<h1 id="c1">One</h1>
<p>First.</p>
<h1 id="c2">Two</h1>
<p>Second.</p>
</body>
</html>"#;

    fn locator(fragment: Option<&str>) -> Locator {
        Locator {
            source_id: "n".into(),
            file_path: "text.xhtml".into(),
            fragment: fragment.map(str::to_string),
        }
    }

    #[test]
    fn test_source_parts() {
        let parts = SourceParts::parse(DOC).unwrap();
        assert_eq!(parts.html_attributes, r#" xmlns="http://www.w3.org/1999/xhtml" lang="en""#);
        assert!(parts.head_inner.contains(r#"<link rel="stylesheet" href="style.css"/>"#));
        assert_eq!(parts.body_attributes, r#" class="main""#);
        assert!(parts.body_inner.starts_with("\n<h1 id=\"c1\">"));
        assert!(parts.body_inner.ends_with("<p>Second.</p>\n"));
    }

    #[test]
    fn test_source_parts_requires_wrapper() {
        assert_eq!(SourceParts::parse("<html><body><p/></body></html>"), None);
        assert_eq!(SourceParts::parse("<p>fragment</p>"), None);
    }

    #[test]
    fn test_find_anchor_prefers_id_over_name() {
        let body = r#"<a name="x">early</a><p>...</p><h2 id="x">late</h2>"#;
        assert_eq!(find_anchor_offset(body, "x"), body.find("<h2"));
        assert_eq!(find_anchor_offset(r#"<a name="x"/>"#, "x"), Some(0));
    }

    #[test]
    fn test_find_anchor_is_exact() {
        let body = r#"<h1 id="Chapter1">A</h1><h1 id="chapter10">B</h1>"#;
        assert_eq!(find_anchor_offset(body, "chapter1"), None);
        assert_eq!(find_anchor_offset(body, "missing"), None);
    }

    #[test]
    fn test_plan_slices() {
        let body = SourceParts::parse(DOC).unwrap().body_inner;
        let (one, two) = (locator(Some("c1")), locator(Some("c2")));

        let slices = plan_slices("text.xhtml", &body, &[&one, &two]).unwrap().unwrap();
        assert_eq!(slices.len(), 2);
        assert!(body[slices[0].clone()].starts_with("<h1 id=\"c1\">"));
        assert!(body[slices[0].clone()].contains("First."));
        assert!(body[slices[1].clone()].starts_with("<h1 id=\"c2\">"));
        assert_eq!(slices[1].end, body.len());
    }

    #[test]
    fn test_plan_slices_whole_file() {
        let whole = locator(None);
        let slices = plan_slices("a.xhtml", "<p>x</p>", &[&whole]).unwrap().unwrap();
        assert_eq!(slices, vec![0..8]);
    }

    #[test]
    fn test_plan_slices_non_monotonic() {
        let body = SourceParts::parse(DOC).unwrap().body_inner;
        let (one, two) = (locator(Some("c1")), locator(Some("c2")));
        assert_eq!(plan_slices("text.xhtml", &body, &[&two, &one]).unwrap(), None);

        let trailing = locator(None);
        assert_eq!(plan_slices("text.xhtml", &body, &[&one, &trailing]).unwrap(), None);
    }

    #[test]
    fn test_plan_slices_missing_anchor() {
        let missing = locator(Some("nope"));
        let err = plan_slices("text.xhtml", "<p/>", &[&missing]).unwrap_err();
        assert!(matches!(
            err,
            Error::NavTargetMissing { ref path, ref fragment } if path == "text.xhtml" && fragment == "nope"
        ));
    }
}
