//! Minimal element tree over `quick_xml` events.
//!
//! Navigation and package documents are small, so they are materialized
//! into an owned tree that supports attribute lookup, text values and
//! named-child enumeration. Namespace prefixes are dropped from element
//! names; attribute keys keep their qualified form but can be looked up by
//! local name.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name (`dc:title` -> `title`).
    pub name: String,
    /// Qualified attribute keys with unescaped values, in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up an attribute by qualified name, falling back to local name.
    ///
    /// `attr("type")` matches `epub:type`; `attr("epub:type")` matches only
    /// the exact key.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| local_name_str(key) == name)
            })
            .map(|(_, value)| value.as_str())
    }

    /// Element children in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First element child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// All element children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// All descendant elements in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        fn walk<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
            for child in element.elements() {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// First descendant (document order) matching `pred`.
    pub fn find_descendant(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.descendants().into_iter().find(|e| pred(*e))
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        fn collect(element: &Element, out: &mut String) {
            for node in &element.children {
                match node {
                    Node::Text(t) => out.push_str(t),
                    Node::Element(e) => collect(e, out),
                }
            }
        }
        collect(self, &mut out);
        out
    }

    /// Concatenated text of direct text children only.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Parse a document into its root element.
pub fn parse_document(content: &str) -> Result<Element> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    // Open elements; the bottom entry is a synthetic holder for the root.
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from_start(&e)),
            Event::Empty(e) => {
                let element = element_from_start(&e);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Element(element));
                }
            }
            Event::End(_) => {
                if stack.len() > 1
                    && let Some(done) = stack.pop()
                    && let Some(parent) = stack.last_mut()
                {
                    parent.children.push(Node::Element(done));
                }
            }
            Event::Text(e) => push_text(&mut stack, &String::from_utf8_lossy(&e)),
            Event::CData(e) => push_text(&mut stack, &String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(&e);
                if let Some(resolved) = resolve_entity(&entity) {
                    push_text(&mut stack, &resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(Error::InvalidNav(format!(
            "unclosed element <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    stack
        .pop()
        .and_then(|holder| holder.elements().next().cloned())
        .ok_or_else(|| Error::MissingElement("document root".into()))
}

fn element_from_start(e: &BytesStart<'_>) -> Element {
    let name = e.name();
    let mut element = Element::new(String::from_utf8_lossy(local_name(name.as_ref())));

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            Err(_) => raw,
        };
        element.attributes.push((key, value));
    }

    element
}

/// Append text to the innermost open element, merging adjacent text runs.
fn push_text(stack: &mut [Element], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    if let Some(Node::Text(existing)) = current.children.last_mut() {
        existing.push_str(text);
    } else {
        current.children.push(Node::Text(text.to_string()));
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn local_name_str(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Resolve XML entity references.
pub fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text for use in XML content or attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"title"), b"title");
        assert_eq!(local_name(b"dc:title"), b"title");
        assert_eq!(local_name(b"opf:meta"), b"meta");
        assert_eq!(local_name(b""), b"");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("apos"), Some("'".to_string()));
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("nbsp"), Some("\u{a0}".to_string()));
        assert_eq!(resolve_entity("#65"), Some("A".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("invalid"), None);
    }

    #[test]
    fn test_parse_tree_and_lookup() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<html xmlns:epub="http://www.idpf.org/2007/ops">
  <body>
    <nav epub:type="toc" id="toc"><ol><li><a href="a.xhtml">Don&apos;t <em>Stop</em></a></li></ol></nav>
  </body>
</html>"#,
        )
        .unwrap();

        assert_eq!(root.name, "html");
        let nav = root.find_descendant(|e| e.name == "nav").unwrap();
        assert_eq!(nav.attr("type"), Some("toc"));
        assert_eq!(nav.attr("epub:type"), Some("toc"));
        assert_eq!(nav.attr("id"), Some("toc"));

        let a = nav.find_descendant(|e| e.name == "a").unwrap();
        assert_eq!(a.attr("href"), Some("a.xhtml"));
        assert_eq!(a.text(), "Don't Stop");
        assert_eq!(a.own_text(), "Don't ");
    }

    #[test]
    fn test_children_named_and_descendants() {
        let root = parse_document("<r><p>1</p><q/><p>2</p></r>").unwrap();
        let texts: Vec<_> = root.children_named("p").map(|p| p.text()).collect();
        assert_eq!(texts, vec!["1", "2"]);
        let names: Vec<_> = root.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["p", "q", "p"]);
        assert!(root.child("q").is_some());
    }

    #[test]
    fn test_attribute_unescaped() {
        let root = parse_document(r#"<a href="x.xhtml?a=1&amp;b=2"/>"#).unwrap();
        assert_eq!(root.attr("href"), Some("x.xhtml?a=1&b=2"));
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Part\n   One  "), "Part One");
    }
}
