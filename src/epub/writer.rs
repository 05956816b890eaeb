//! Write a rewritten manifest, spine and navigation tree back into the raw
//! package and navigation documents.
//!
//! Only the affected element is regenerated (`<manifest>`, `<spine>`,
//! `<navMap>` or the toc `<nav>`); metadata, guides, landmarks and anything
//! else in the document are kept byte for byte.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use crate::book::{Manifest, NavNode, Spine};
use crate::error::{Error, Result};
use crate::util::{percent_encode_href, relative_to};
use crate::xml::escape_xml;

/// Matches the `<manifest>` element (optionally prefixed, e.g. `opf:manifest`)
static MANIFEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<([\w.-]+:)?manifest(\s[^>]*)?>.*?</(?:[\w.-]+:)?manifest\s*>").unwrap()
});

/// Matches the `<spine>` element
static SPINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<([\w.-]+:)?spine(\s[^>]*)?>.*?</(?:[\w.-]+:)?spine\s*>").unwrap()
});

/// Matches the NCX `<navMap>` element
static NAV_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<([\w.-]+:)?navMap(\s[^>]*)?>.*?</(?:[\w.-]+:)?navMap\s*>").unwrap()
});

/// Matches an XHTML `<nav>` element (navs do not nest)
static NAV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<([\w.-]+:)?nav(\s[^>]*)?>(.*?)</(?:[\w.-]+:)?nav\s*>").unwrap()
});

/// Matches an `epub:type` (or any prefixed `type`) attribute value
static TYPE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(?:[\w.-]+:)?type\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Matches the first `<ol>` start tag
static OL_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<ol[\s>]").unwrap());

/// Replace the `<manifest>` and `<spine>` elements of a package document.
pub fn render_package(raw: &str, manifest: &Manifest, spine: &Spine) -> Result<String> {
    let with_manifest = replace_element(raw, &MANIFEST_RE, "manifest", |caps| {
        render_manifest(prefix(caps), attrs(caps), manifest)
    })?;
    replace_element(&with_manifest, &SPINE_RE, "spine", |caps| {
        render_spine(prefix(caps), spine)
    })
}

/// Replace the `<navMap>` of an NCX with navPoints generated from `tree`.
///
/// Tree items must be content-root-relative; they are written relative to
/// `doc_dir`, the directory of the NCX itself.
pub fn render_ncx(raw: &str, tree: &NavNode, doc_dir: &str) -> Result<String> {
    replace_element(raw, &NAV_MAP_RE, "navMap", |caps| {
        let mut out = format!("<{}navMap{}>\n", prefix(caps), attrs(caps));
        let mut play_order = 1;
        for node in &tree.children {
            write_nav_point(&mut out, node, doc_dir, &mut play_order, 2);
        }
        out.push_str(&format!("  </{}navMap>", prefix(caps)));
        out
    })
}

/// Replace the toc `<nav>` of an XHTML navigation document with a list
/// generated from `tree`, keeping any heading before the list.
pub fn render_nav_xhtml(raw: &str, tree: &NavNode, doc_dir: &str) -> Result<String> {
    let navs: Vec<Captures<'_>> = NAV_RE.captures_iter(raw).collect();
    let caps = navs
        .iter()
        .find(|caps| is_toc_nav(attrs(caps)))
        .or_else(|| navs.first())
        .ok_or_else(|| Error::MissingElement("nav".into()))?;

    let Some(whole) = caps.get(0) else {
        return Err(Error::MissingElement("nav".into()));
    };
    let inner = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
    let heading = OL_START_RE
        .find(inner)
        .map(|m| &inner[..m.start()])
        .unwrap_or(inner);

    let mut out = format!("<{}nav{}>", prefix(caps), attrs(caps));
    out.push_str(heading.trim_end());
    out.push('\n');
    write_list(&mut out, &tree.children, doc_dir, 1);
    out.push_str(&format!("</{}nav>", prefix(caps)));

    Ok(format!("{}{}{}", &raw[..whole.start()], out, &raw[whole.end()..]))
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn replace_element(
    raw: &str,
    re: &Regex,
    name: &str,
    render: impl FnOnce(&Captures<'_>) -> String,
) -> Result<String> {
    let caps = re
        .captures(raw)
        .ok_or_else(|| Error::MissingElement(name.to_string()))?;
    let Some(whole) = caps.get(0) else {
        return Err(Error::MissingElement(name.to_string()));
    };
    Ok(format!(
        "{}{}{}",
        &raw[..whole.start()],
        render(&caps),
        &raw[whole.end()..]
    ))
}

fn prefix<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1).map(|m| m.as_str()).unwrap_or_default()
}

fn attrs<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(2).map(|m| m.as_str().trim_end_matches('/')).unwrap_or_default()
}

fn is_toc_nav(attrs: &str) -> bool {
    TYPE_ATTR_RE.captures_iter(attrs).any(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .is_some_and(|v| v.as_str().split_ascii_whitespace().any(|t| t == "toc"))
    })
}

fn render_manifest(prefix: &str, attrs: &str, manifest: &Manifest) -> String {
    let mut out = format!("<{}manifest{}>\n", prefix, attrs);
    for item in manifest.iter() {
        out.push_str(&format!(
            "    <{}item id=\"{}\" href=\"{}\" media-type=\"{}\"",
            prefix,
            escape_xml(&item.id),
            escape_xml(&percent_encode_href(&item.path)),
            escape_xml(item.media_type.mime())
        ));
        if let Some(ref property) = item.property {
            out.push_str(&format!(" properties=\"{}\"", escape_xml(property)));
        }
        write_attributes(&mut out, &item.extra_attributes);
        out.push_str("/>\n");
    }
    out.push_str(&format!("  </{}manifest>", prefix));
    out
}

fn render_spine(prefix: &str, spine: &Spine) -> String {
    let mut out = format!("<{}spine", prefix);
    if let Some(ref id) = spine.id {
        out.push_str(&format!(" id=\"{}\"", escape_xml(id)));
    }
    if let Some(ref toc) = spine.toc {
        out.push_str(&format!(" toc=\"{}\"", escape_xml(toc)));
    }
    if let Some(direction) = spine.page_progression.as_attr() {
        out.push_str(&format!(" page-progression-direction=\"{}\"", direction));
    }
    write_attributes(&mut out, &spine.extra_attributes);
    out.push_str(">\n");

    for item in &spine.items {
        out.push_str(&format!("    <{}itemref", prefix));
        if let Some(ref id) = item.id {
            out.push_str(&format!(" id=\"{}\"", escape_xml(id)));
        }
        out.push_str(&format!(" idref=\"{}\"", escape_xml(&item.idref)));
        if !item.linear {
            out.push_str(" linear=\"no\"");
        }
        write_attributes(&mut out, &item.extra_attributes);
        out.push_str("/>\n");
    }
    out.push_str(&format!("  </{}spine>", prefix));
    out
}

fn write_attributes(out: &mut String, attributes: &[(String, String)]) {
    for (name, value) in attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape_xml(value)));
    }
}

fn write_nav_point(
    ncx: &mut String,
    node: &NavNode,
    doc_dir: &str,
    play_order: &mut usize,
    indent: usize,
) {
    // NCX requires a target on every navPoint; borrow the first one below.
    let Some(target) = first_target(node) else {
        return;
    };
    let indent_str = "  ".repeat(indent);

    ncx.push_str(&format!(
        "{}<navPoint id=\"{}\" playOrder=\"{}\">\n",
        indent_str,
        escape_xml(&node.id),
        play_order
    ));
    ncx.push_str(&format!(
        "{}  <navLabel>\n{}    <text>{}</text>\n{}  </navLabel>\n",
        indent_str,
        indent_str,
        escape_xml(&node.label),
        indent_str
    ));
    ncx.push_str(&format!(
        "{}  <content src=\"{}\"/>\n",
        indent_str,
        escape_xml(&href_for(target, doc_dir))
    ));

    *play_order += 1;

    for child in &node.children {
        write_nav_point(ncx, child, doc_dir, play_order, indent + 1);
    }

    ncx.push_str(&format!("{}</navPoint>\n", indent_str));
}

fn write_list(out: &mut String, nodes: &[NavNode], doc_dir: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}<ol>\n", indent));
    for node in nodes {
        out.push_str(&format!("{}  <li>", indent));
        match node.item {
            Some(ref item) => out.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                escape_xml(&href_for(item, doc_dir)),
                escape_xml(&node.label)
            )),
            None => out.push_str(&format!("<span>{}</span>", escape_xml(&node.label))),
        }
        if node.children.is_empty() {
            out.push_str("</li>\n");
        } else {
            out.push('\n');
            write_list(out, &node.children, doc_dir, depth + 2);
            out.push_str(&format!("{}  </li>\n", indent));
        }
    }
    out.push_str(&format!("{}</ol>\n", indent));
}

fn first_target(node: &NavNode) -> Option<&str> {
    node.item
        .as_deref()
        .or_else(|| node.children.iter().find_map(first_target))
}

/// Express a content-root-relative `file#fragment` relative to `doc_dir`.
fn href_for(item: &str, doc_dir: &str) -> String {
    if item.contains("://") {
        return item.to_string();
    }
    match item.split_once('#') {
        Some(("", fragment)) => format!("#{}", fragment),
        Some((file, fragment)) => {
            format!("{}#{}", percent_encode_href(&relative_to(doc_dir, file)), fragment)
        }
        None => percent_encode_href(&relative_to(doc_dir, item)),
    }
}
