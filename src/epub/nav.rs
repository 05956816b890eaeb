//! Navigation tree builder for both navigation dialects.
//!
//! EPUB 2 packages carry an NCX (`<ncx><navMap><navPoint>…`), EPUB 3
//! packages an XHTML navigation document (`<nav epub:type="toc"><ol><li>…`).
//! Both are parsed into the same [`NavNode`] tree; the dialect is decided
//! once from the root element.

use crate::book::NavNode;
use crate::error::{Error, Result};
use crate::util::new_node_id;
use crate::xml::{Element, collapse_whitespace, parse_document};

/// A parsed navigation document, tagged by dialect.
#[derive(Debug, Clone)]
pub enum NavDocument {
    /// EPUB 2 NCX.
    Ncx(Element),
    /// EPUB 3 XHTML navigation document.
    Xhtml(Element),
}

impl NavDocument {
    /// Parse a navigation document and classify it by its root element.
    pub fn parse(content: &str) -> Result<Self> {
        let root = parse_document(content)?;
        match root.name.as_str() {
            "ncx" => Ok(NavDocument::Ncx(root)),
            "html" => Ok(NavDocument::Xhtml(root)),
            other => Err(Error::InvalidNav(format!("unexpected root element <{}>", other))),
        }
    }

    /// Build the navigation tree.
    pub fn to_tree(&self) -> Result<NavNode> {
        match self {
            NavDocument::Ncx(root) => build_ncx_tree(root),
            NavDocument::Xhtml(root) => Ok(build_xhtml_tree(root)),
        }
    }
}

/// Parse either dialect straight into a navigation tree.
pub fn parse_nav_tree(content: &str) -> Result<NavNode> {
    NavDocument::parse(content)?.to_tree()
}

// ----------------------------------------------------------------------------
// NCX
// ----------------------------------------------------------------------------

fn build_ncx_tree(root: &Element) -> Result<NavNode> {
    let title = root
        .child("docTitle")
        .and_then(|t| t.child("text"))
        .map(|t| collapse_whitespace(&t.text()))
        .unwrap_or_default();

    let mut tree = NavNode::new(title, new_node_id());

    // Stored verbatim: the uid is compared against the package identifier.
    tree.item = root.child("head").and_then(|head| {
        head.children_named("meta")
            .find(|meta| meta.attr("name") == Some("dtb:uid"))
            .and_then(|meta| meta.attr("content"))
            .map(str::to_string)
    });

    if let Some(nav_map) = root.child("navMap") {
        tree.children = build_nav_points(nav_map)?;
    }

    Ok(tree)
}

fn build_nav_points(parent: &Element) -> Result<Vec<NavNode>> {
    parent
        .children_named("navPoint")
        .map(|point| {
            let id = point
                .attr("id")
                .ok_or_else(|| Error::InvalidNav("navPoint without id".into()))?;
            let src = point
                .child("content")
                .and_then(|c| c.attr("src"))
                .ok_or_else(|| {
                    Error::InvalidNav(format!("navPoint {} without content src", id))
                })?;
            let label = point
                .child("navLabel")
                .and_then(|l| l.child("text"))
                .map(|t| collapse_whitespace(&t.text()))
                .unwrap_or_default();

            let mut node = NavNode::new(label, id).with_item(src);
            node.children = build_nav_points(point)?;
            Ok(node)
        })
        .collect()
}

// ----------------------------------------------------------------------------
// XHTML nav
// ----------------------------------------------------------------------------

fn build_xhtml_tree(root: &Element) -> NavNode {
    let title = root
        .child("head")
        .and_then(|head| head.child("title"))
        .map(|t| collapse_whitespace(&t.text()))
        .unwrap_or_default();

    let mut tree = NavNode::new(title, new_node_id());

    let search_root = find_toc_nav(root)
        .or_else(|| root.find_descendant(|e| e.name == "nav"))
        .or_else(|| root.child("body"))
        .unwrap_or(root);

    if let Some(list) = search_root.find_descendant(|e| e.name == "ol") {
        tree.children = build_list_items(list);
    }

    tree
}

/// The `<nav>` whose `epub:type` token list contains `toc`.
pub(crate) fn find_toc_nav(root: &Element) -> Option<&Element> {
    root.find_descendant(|e| {
        e.name == "nav"
            && e.attr("type")
                .is_some_and(|t| t.split_ascii_whitespace().any(|token| token == "toc"))
    })
}

fn build_list_items(list: &Element) -> Vec<NavNode> {
    list.children_named("li").filter_map(build_list_item).collect()
}

fn build_list_item(li: &Element) -> Option<NavNode> {
    let (label, item) = if let Some(a) = li.child("a") {
        (collapse_whitespace(&a.text()), a.attr("href").map(str::to_string))
    } else if let Some(span) = li.child("span") {
        (collapse_whitespace(&span.text()), None)
    } else {
        (collapse_whitespace(&li.own_text()), None)
    };

    if label.is_empty() && item.is_none() {
        return None;
    }

    let mut node = NavNode::new(label, new_node_id());
    node.item = item;
    if let Some(nested) = li.child("ol") {
        node.children = build_list_items(nested);
    }
    Some(node)
}
